//! Endpoints: a verb set and a route bound to a handler.

use futures::future::BoxFuture;
use shared_types::{Request, Response, State};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Failure reported by a handler; becomes a response with `state` and
/// `message` as the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub state: State,
    pub message: String,
}

impl HandlerError {
    pub fn new(state: State, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(State::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(State::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(State::InternalError, message)
    }

    pub fn into_response(self) -> Response {
        Response::error(self.state, self.message)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.state)
    }
}

impl std::error::Error for HandlerError {}

pub type HandlerResult = Result<Response, HandlerError>;

/// Async request handler.
pub type EndpointHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A `(methods, route)` pair bound to a handler.
#[derive(Clone)]
pub struct Endpoint {
    /// Accepted verbs, compared case-insensitively.
    pub methods: Vec<String>,
    /// Exact route name.
    pub route: String,
    pub handler: EndpointHandler,
}

impl Endpoint {
    /// Bind an async closure to `route` for `methods`.
    pub fn new<F, Fut>(route: impl Into<String>, methods: &[&str], handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            route: route.into(),
            handler: Arc::new(move |request| -> BoxFuture<'static, HandlerResult> {
                Box::pin(handler(request))
            }),
        }
    }

    pub fn accepts(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn matches(&self, method: &str, route: &str) -> bool {
        self.route == route && self.accepts(method)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("methods", &self.methods)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}
