//! Request router: payload in, response out.
//!
//! Stateless apart from the endpoint table, which is fixed at construction.
//! Every inbound payload yields exactly one response, including payloads
//! that do not decode and handlers that panic.

use crate::domain::{ConfigError, Endpoint};
use shared_types::envelope::salvage_correlation_key;
use shared_types::{Envelope, Request, Response, State, CORRELATION_KEY};
use std::any::Any;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

/// Immutable endpoint table.
#[derive(Debug)]
pub struct Router {
    endpoints: Vec<Endpoint>,
}

impl Router {
    /// Build the table, rejecting two endpoints that claim the same verb
    /// on the same route.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        for (i, endpoint) in endpoints.iter().enumerate() {
            for method in &endpoint.methods {
                let clash = endpoints[..i]
                    .iter()
                    .any(|earlier| earlier.matches(method, &endpoint.route));
                if clash {
                    return Err(ConfigError::DuplicateEndpoint {
                        method: method.clone(),
                        route: endpoint.route.clone(),
                    });
                }
            }
        }
        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Endpoint for an exact route and a case-insensitive method.
    pub fn resolve(&self, method: &str, route: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.matches(method, route))
    }

    /// Turn one inbound payload into the response to publish.
    pub async fn handle(&self, payload: &[u8]) -> Response {
        let request = match Request::decode(payload) {
            Ok(request) => request,
            Err(e) => {
                let key = salvage_correlation_key(payload);
                warn!(
                    correlation_id = key.as_deref().unwrap_or("-"),
                    error = %e,
                    "Undecodable request"
                );
                let response = Response::error(State::InternalError, e.to_string());
                return match key {
                    Some(key) => response.with_correlation_key(key),
                    None => response,
                };
            }
        };

        let key = request.correlation_key().map(str::to_owned);
        let response = self.dispatch(request).await;
        match key {
            Some(key) => response.with_correlation_key(key),
            None => response,
        }
    }

    async fn dispatch(&self, request: Request) -> Response {
        let correlation_id = request
            .metadata
            .get(CORRELATION_KEY)
            .cloned()
            .unwrap_or_default();

        let Some(endpoint) = self.resolve(&request.method, &request.route) else {
            debug!(
                correlation_id = %correlation_id,
                method = %request.method,
                route = %request.route,
                "No endpoint"
            );
            return Response::error(
                State::NotFound,
                format!("no endpoint for {} {}", request.method, request.route),
            );
        };

        debug!(
            correlation_id = %correlation_id,
            method = %request.method,
            route = %request.route,
            "Dispatching request"
        );

        // Own task so a panicking handler surfaces as a JoinError.
        let handler = endpoint.handler.clone();
        match tokio::spawn(handler(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(failure)) => failure.into_response(),
            Err(join_error) => {
                let message = join_failure(join_error);
                error!(correlation_id = %correlation_id, error = %message, "Handler failed");
                Response::error(State::InternalError, message)
            }
        }
    }
}

fn join_failure(err: JoinError) -> String {
    if err.is_panic() {
        format!("handler panicked: {}", panic_text(err.into_panic()))
    } else {
        "handler was cancelled".to_string()
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(text) => *text,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(text) => (*text).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}
