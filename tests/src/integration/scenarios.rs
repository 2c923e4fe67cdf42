//! # Request/Response Round Trips
//!
//! A provider calls endpoints served by a binding on the same broker:
//!
//! | Scenario | Endpoint | Expected at the caller |
//! |----------|----------|------------------------|
//! | A | `GET greetings` answers `Hi there!!` | body `Hi there!!` |
//! | B | `GET instances` fails with `BAD!!` | `Remote` error displaying `BAD!!` |
//! | C | `GET instances` answers `[]` | empty component list |
//! | D | nothing serves the route | `Remote` `NotFound`, well before the timeout |

#[cfg(test)]
mod tests {
    use super::super::harness::harness;
    use fr_01_pubsub_binding::{Endpoint, HandlerError};
    use fr_02_remote_provider::{ProviderError, TargetProvider};
    use futures::future::join_all;
    use shared_types::{DeploymentSpec, Request, Response, State};
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    const TIMEOUT: Duration = Duration::from_secs(8);

    fn greetings() -> Endpoint {
        Endpoint::new("greetings", &["GET"], |_| async {
            Ok(Response::ok("Hi there!!"))
        })
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_a_greetings_round_trip() {
        let h = harness(vec![greetings()], TIMEOUT).await;

        let response = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();

        assert_eq!(response.state, State::Ok);
        assert_eq!(response.body_text(), "Hi there!!");
        assert_eq!(h.provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_b_remote_failure_passthrough() {
        let failing = Endpoint::new("instances", &["GET"], |_| async {
            Err(HandlerError::internal("BAD!!"))
        });
        let h = harness(vec![failing], TIMEOUT).await;

        let err = h
            .provider
            .get(&DeploymentSpec::default(), &[])
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert_eq!(err.remote_state(), Some(State::InternalError));
        assert_eq!(err.to_string(), "BAD!!");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_scenario_c_empty_component_list() {
        let empty = Endpoint::new("instances", &["GET"], |_| async { Ok(Response::ok("[]")) });
        let h = harness(vec![empty], TIMEOUT).await;

        let components = h
            .provider
            .get(&DeploymentSpec::default(), &[])
            .await
            .unwrap();
        assert!(components.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_d_unmatched_route_is_not_found_not_timeout() {
        let h = harness(vec![greetings()], TIMEOUT).await;
        let started = Instant::now();

        let result = timeout(
            Duration::from_secs(2),
            h.provider.invoke(Request::new("GET", "nowhere")),
        )
        .await
        .expect("an unmatched route must still be answered");

        let err = result.unwrap_err();
        assert!(
            matches!(err, ProviderError::Remote { state: State::NotFound, .. }),
            "unexpected error: {err:?}"
        );
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test]
    async fn test_accepted_reply_is_not_success() {
        let queued = Endpoint::new("instances", &["GET"], |_| async {
            Ok(Response {
                state: State::Accepted,
                ..Response::ok("queued, not done")
            })
        });
        let h = harness(vec![queued], TIMEOUT).await;

        let err = h
            .provider
            .invoke(Request::new("GET", "instances"))
            .await
            .unwrap_err();
        assert_eq!(err.remote_state(), Some(State::Accepted));
        assert_eq!(err.to_string(), "queued, not done");

        let err = h
            .provider
            .get(&DeploymentSpec::default(), &[])
            .await
            .unwrap_err();
        assert!(err.is_remote());
    }

    // =============================================================================
    // BODIES AND CONCURRENCY
    // =============================================================================

    #[tokio::test]
    async fn test_request_body_reaches_handler_unchanged() {
        let echo = Endpoint::new("echo", &["POST"], |request: Request| async move {
            Ok(Response::ok(request.body))
        });
        let h = harness(vec![echo], TIMEOUT).await;

        let mut request = Request::new("POST", "echo");
        request.body = vec![0, 159, 146, 150, 255];
        let response = h.provider.invoke(request).await.unwrap();
        assert_eq!(response.body, vec![0, 159, 146, 150, 255]);
    }

    #[tokio::test]
    async fn test_concurrent_calls_each_get_their_own_answer() {
        let echo = Endpoint::new("echo", &["POST"], |request: Request| async move {
            // Stagger completion so responses come back out of order.
            let delay = request.body.first().copied().unwrap_or(0) % 7;
            tokio::time::sleep(Duration::from_millis(u64::from(delay) * 5)).await;
            Ok(Response::ok(request.body))
        });
        let h = harness(vec![echo], TIMEOUT).await;

        let calls = (0u8..50).map(|i| {
            let mut request = Request::new("POST", "echo");
            request.body = vec![i];
            h.provider.invoke(request)
        });
        let responses = join_all(calls).await;

        for (i, response) in responses.into_iter().enumerate() {
            assert_eq!(response.unwrap().body, vec![i as u8]);
        }
        assert_eq!(h.provider.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_handler_panic_surfaces_as_internal_error() {
        let broken = Endpoint::new("broken", &["GET"], |_| async {
            if true {
                panic!("handler exploded");
            }
            Ok(Response::ok(""))
        });
        let h = harness(vec![broken, greetings()], TIMEOUT).await;

        let err = h
            .provider
            .invoke(Request::new("GET", "broken"))
            .await
            .unwrap_err();
        assert_eq!(err.remote_state(), Some(State::InternalError));
        assert!(err.to_string().contains("handler exploded"));

        // The binding keeps serving.
        let response = h
            .provider
            .invoke(Request::new("GET", "greetings"))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "Hi there!!");
    }
}
