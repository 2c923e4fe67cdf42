//! # Correlation Across Concurrent Calls
//!
//! A controllable responder answers in whatever order, and as often, as
//! each test needs. Every caller must receive the response carrying its own
//! key, exactly once, and nothing else.

#[cfg(test)]
mod tests {
    use super::super::harness::{eventually, provider, provider_config, ManualResponder};
    use fr_02_remote_provider::ProviderError;
    use shared_bus::InMemoryBroker;
    use shared_types::{Envelope, Request, Response};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_out_of_order_responses_reach_their_callers() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = Arc::new(provider(&broker, provider_config(Duration::from_secs(5))).await);

        let first = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.invoke(Request::new("GET", "first")).await })
        };
        let first_request = responder.next_request().await;

        let second = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.invoke(Request::new("GET", "second")).await })
        };
        let second_request = responder.next_request().await;
        assert_ne!(first_request.correlation_key(), second_request.correlation_key());

        // Answer in reverse order.
        responder.reply(&second_request, Response::ok("for second")).await;
        responder.reply(&first_request, Response::ok("for first")).await;

        assert_eq!(second.await.unwrap().unwrap().body_text(), "for second");
        assert_eq!(first.await.unwrap().unwrap().body_text(), "for first");
        assert_eq!(provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_delivered_once() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = Arc::new(provider(&broker, provider_config(Duration::from_secs(5))).await);

        let call = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.invoke(Request::new("GET", "once")).await })
        };
        let request = responder.next_request().await;
        responder.reply(&request, Response::ok("original")).await;
        responder.reply(&request, Response::ok("replay")).await;

        assert_eq!(call.await.unwrap().unwrap().body_text(), "original");

        let stats = provider.registry().stats();
        eventually(|| stats.total_dropped.load(Ordering::Relaxed) == 1).await;
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_late_response_is_dropped() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = provider(&broker, provider_config(Duration::from_millis(100))).await;

        let err = provider
            .invoke(Request::new("GET", "slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));

        let request = responder.next_request().await;
        responder.reply(&request, Response::ok("too late")).await;

        let stats = provider.registry().stats();
        eventually(|| stats.total_dropped.load(Ordering::Relaxed) == 1).await;
        assert_eq!(stats.total_timeouts.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_completed.load(Ordering::Relaxed), 0);
        assert_eq!(provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_key_does_not_disturb_pending_call() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = Arc::new(provider(&broker, provider_config(Duration::from_secs(5))).await);

        let call = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.invoke(Request::new("GET", "mine")).await })
        };
        let request = responder.next_request().await;

        responder
            .reply_with_key("someone-else", Response::ok("not yours"))
            .await;
        let stats = provider.registry().stats();
        eventually(|| stats.total_dropped.load(Ordering::Relaxed) == 1).await;
        assert_eq!(provider.registry().pending_count(), 1);

        responder.reply(&request, Response::ok("yours")).await;
        assert_eq!(call.await.unwrap().unwrap().body_text(), "yours");
    }

    #[tokio::test]
    async fn test_two_providers_share_response_topic() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let config = |id: &str| {
            let mut config = provider_config(Duration::from_secs(5));
            config.client_id = id.to_string();
            config
        };
        let alpha = Arc::new(provider(&broker, config("alpha")).await);
        let beta = Arc::new(provider(&broker, config("beta")).await);

        let alpha_call = {
            let alpha = Arc::clone(&alpha);
            tokio::spawn(async move { alpha.invoke(Request::new("GET", "a")).await })
        };
        let alpha_request = responder.next_request().await;
        let beta_call = {
            let beta = Arc::clone(&beta);
            tokio::spawn(async move { beta.invoke(Request::new("GET", "b")).await })
        };
        let beta_request = responder.next_request().await;

        responder.reply(&beta_request, Response::ok("beta")).await;
        responder.reply(&alpha_request, Response::ok("alpha")).await;

        assert_eq!(alpha_call.await.unwrap().unwrap().body_text(), "alpha");
        assert_eq!(beta_call.await.unwrap().unwrap().body_text(), "beta");

        // Each provider sees the other's response as unknown.
        let alpha_stats = alpha.registry().stats();
        let beta_stats = beta.registry().stats();
        eventually(|| {
            alpha_stats.total_dropped.load(Ordering::Relaxed) == 1
                && beta_stats.total_dropped.load(Ordering::Relaxed) == 1
        })
        .await;
    }
}
