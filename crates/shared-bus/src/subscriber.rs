//! # Subscriber Side
//!
//! Message handlers and the per-subscription pump that fans inbound
//! messages out to independent tasks.

use crate::message::BusMessage;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Callback invoked once per inbound message.
///
/// Invocations run concurrently; implementations must not assume that
/// messages on the same topic arrive one at a time.
pub type MessageHandler = Arc<dyn Fn(BusMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(BusMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |message| -> BoxFuture<'static, ()> { Box::pin(f(message)) })
}

/// Run `handler` for `message` in a task of its own.
pub(crate) fn dispatch(handler: &MessageHandler, message: BusMessage) {
    tokio::spawn(handler(message));
}

/// Drain a broadcast receiver into `handler` until the topic closes.
///
/// Lagging drops the skipped messages; delivery is at-most-once.
pub(crate) fn spawn_pump(
    topic: String,
    mut receiver: broadcast::Receiver<BusMessage>,
    handler: MessageHandler,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(message) => dispatch(&handler, message),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(topic = %topic, lagged = count, "Subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(topic = %topic, "Topic closed, subscription ended");
                    break;
                }
            }
        }
    })
}
