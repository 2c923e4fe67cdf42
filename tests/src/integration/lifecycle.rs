//! # Call and Provider Lifecycle
//!
//! Deadlines, abandoned calls, repeated `init`, shutdown and the legacy
//! fixed-key scheme.

#[cfg(test)]
mod tests {
    use super::super::harness::{
        binding, eventually, harness, legacy_provider, provider, provider_config, ManualResponder,
    };
    use fr_01_pubsub_binding::{Binding, Endpoint};
    use fr_02_remote_provider::{
        ProviderError, PubSubTargetProvider, RegistryStats, TargetProvider,
    };
    use shared_bus::InMemoryBroker;
    use shared_types::{DeploymentSpec, Request, Response};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn greetings() -> Endpoint {
        Endpoint::new("greetings", &["GET"], |_| async {
            Ok(Response::ok("Hi there!!"))
        })
    }

    fn count(counter: &std::sync::atomic::AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    fn settled(stats: &RegistryStats) -> u64 {
        count(&stats.total_completed) + count(&stats.total_timeouts) + count(&stats.total_cancelled)
    }

    // =============================================================================
    // DEADLINES
    // =============================================================================

    #[tokio::test]
    async fn test_silent_target_times_out_within_bound() {
        let broker = InMemoryBroker::new();
        let timeout = Duration::from_millis(300);
        let provider = provider(&broker, provider_config(timeout)).await;

        let started = Instant::now();
        let err = provider
            .invoke(Request::new("GET", "instances"))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ProviderError::Timeout { .. }), "{err:?}");
        assert!(err.is_retryable());
        assert!(elapsed >= timeout, "returned early: {elapsed:?}");
        assert!(elapsed < timeout + Duration::from_millis(500), "returned late: {elapsed:?}");
        assert_eq!(provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_every_registered_call_settles() {
        let h = harness(vec![greetings()], Duration::from_millis(200)).await;

        h.provider.invoke(Request::new("GET", "greetings")).await.unwrap();
        h.provider.invoke(Request::new("GET", "missing")).await.unwrap_err();
        h.binding.shutdown().await.unwrap();
        h.provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap_err();

        let stats = h.provider.registry().stats();
        assert_eq!(count(&stats.total_registered), 3);
        assert_eq!(settled(stats), 3);
        assert_eq!(h.provider.registry().pending_count(), 0);
    }

    // =============================================================================
    // CANCELLATION
    // =============================================================================

    #[tokio::test]
    async fn test_abandoned_call_releases_entry() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = Arc::new(provider(&broker, provider_config(Duration::from_secs(30))).await);

        let call = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.invoke(Request::new("GET", "instances")).await })
        };
        let request = responder.next_request().await;
        assert_eq!(provider.registry().pending_count(), 1);

        call.abort();
        let registry = Arc::clone(provider.registry());
        eventually(|| registry.pending_count() == 0).await;
        assert_eq!(count(&registry.stats().total_cancelled), 1);

        // The answer to the abandoned call goes nowhere.
        responder.reply(&request, Response::ok("unclaimed")).await;
        eventually(|| count(&registry.stats().total_dropped) == 1).await;
    }

    // =============================================================================
    // INIT AND SHUTDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_operations_before_init_fail() {
        let provider = PubSubTargetProvider::new(Arc::new(InMemoryBroker::new()));
        let err = provider
            .get(&DeploymentSpec::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotInitialized));
    }

    #[tokio::test]
    async fn test_double_init_delivers_each_response_once() {
        let h = harness(vec![greetings()], Duration::from_secs(5)).await;
        h.provider
            .init(provider_config(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(h.broker.subscriber_count("coa-response"), 1);

        let response = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "Hi there!!");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = h.provider.registry().stats();
        assert_eq!(count(&stats.total_completed), 1);
        assert_eq!(count(&stats.total_dropped), 0);
    }

    #[tokio::test]
    async fn test_reinit_applies_new_timeout() {
        let h = harness(vec![greetings()], Duration::from_secs(5)).await;
        h.provider
            .init(provider_config(Duration::from_secs(12)))
            .await
            .unwrap();
        let config = h.provider.config().await.unwrap();
        assert_eq!(config.timeout, Duration::from_secs(12));

        let response = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "Hi there!!");
    }

    #[tokio::test]
    async fn test_reinit_with_new_client_id_reconnects() {
        let h = harness(vec![greetings()], Duration::from_secs(5)).await;
        let mut config = provider_config(Duration::from_secs(5));
        config.client_id = "provider-2".to_string();
        h.provider.init(config).await.unwrap();

        // Old session is closed, new one follows the response topic.
        eventually(|| h.broker.subscriber_count("coa-response") == 1).await;
        let response = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "Hi there!!");
    }

    #[tokio::test]
    async fn test_shutdown_then_call() {
        let h = harness(vec![greetings()], Duration::from_secs(5)).await;
        h.provider.shutdown().await.unwrap();

        let err = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotInitialized));
    }

    // =============================================================================
    // LEGACY FIXED KEYS
    // =============================================================================

    #[tokio::test]
    async fn test_operation_name_keys_reject_overlap() {
        let broker = InMemoryBroker::new();
        let responder = ManualResponder::new(&broker).await;
        let provider = Arc::new(legacy_provider(&broker, Duration::from_secs(5)).await);

        let first = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get(&DeploymentSpec::default(), &[]).await })
        };
        let request = responder.next_request().await;
        assert_eq!(
            request.metadata.get("call-context").map(String::as_str),
            Some("TargetProvider-Get")
        );

        let err = provider
            .get(&DeploymentSpec::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::CallInFlight { ref key } if key == "TargetProvider-Get"));

        // A different operation kind is not blocked.
        assert!(!provider.registry().is_pending("TargetProvider-Remove"));

        responder.reply(&request, Response::ok("[]")).await;
        assert!(first.await.unwrap().unwrap().is_empty());
        assert_eq!(provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_operation_name_keys_work_against_binding() {
        let broker = InMemoryBroker::new();
        let _binding = binding(
            &broker,
            vec![Endpoint::new("instances", &["GET"], |_| async {
                Ok(Response::ok("[]"))
            })],
        )
        .await;
        let provider = legacy_provider(&broker, Duration::from_secs(5)).await;

        // Sequential calls reuse the fixed key.
        for _ in 0..3 {
            let components = provider.get(&DeploymentSpec::default(), &[]).await.unwrap();
            assert!(components.is_empty());
        }
    }
}
