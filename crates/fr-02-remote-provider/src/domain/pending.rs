//! Correlation Registry - matches asynchronous responses to waiting calls.
//!
//! Flow:
//! 1. Caller picks a correlation key and calls `register()`
//! 2. Caller publishes the request carrying that key
//! 3. The response subscription decodes replies and calls `complete()`
//! 4. Caller awaits `PendingCall::wait()`, which resolves or times out
//!
//! Each entry is removed exactly once: by `complete()`, by the waiter on
//! timeout, or by the `PendingCall` drop guard when the caller goes away.
//! Anything arriving for a key that is no longer registered is dropped.

use crate::domain::error::RegistryError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::Response;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A live entry.
struct PendingEntry {
    /// Distinguishes this registration from a later one under the same key.
    seq: u64,
    sender: oneshot::Sender<Response>,
    created_at: Instant,
    deadline: Instant,
}

/// Counters for diagnostics.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls resolved by a response
    pub total_completed: AtomicU64,
    /// Total calls that hit their deadline
    pub total_timeouts: AtomicU64,
    /// Total calls abandoned by their caller
    pub total_cancelled: AtomicU64,
    /// Responses that matched no live call (unknown, late or duplicate)
    pub total_dropped: AtomicU64,
}

impl RegistryStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-memory map from correlation key to waiting caller.
///
/// Backed by a sharded concurrent map; no operation awaits while holding a
/// shard lock.
pub struct CorrelationRegistry {
    pending: DashMap<String, PendingEntry>,
    next_seq: AtomicU64,
    stats: RegistryStats,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_seq: AtomicU64::new(0),
            stats: RegistryStats::default(),
        }
    }

    /// Register a call under `key` with a deadline `timeout` from now.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateKey` if `key` already has a live entry,
    /// `RegistryError::InvalidTimeout` if the deadline is not representable.
    pub fn register(
        self: &Arc<Self>,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Result<PendingCall, RegistryError> {
        let key = key.into();
        let created_at = Instant::now();
        let deadline = created_at
            .checked_add(timeout)
            .ok_or(RegistryError::InvalidTimeout(timeout))?;
        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        match self.pending.entry(key.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::DuplicateKey(key)),
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    seq,
                    sender: tx,
                    created_at,
                    deadline,
                });
            }
        }
        RegistryStats::bump(&self.stats.total_registered);

        debug!(
            correlation_id = %key,
            timeout_ms = timeout.as_millis() as u64,
            "Registered pending call"
        );

        Ok(PendingCall {
            key,
            seq,
            timeout,
            deadline,
            receiver: rx,
            registry: Arc::clone(self),
            settled: false,
        })
    }

    /// Deliver `response` to the call waiting on `key`.
    ///
    /// Returns true if a waiting caller received it. Unknown, already
    /// resolved and already expired keys are dropped silently.
    pub fn complete(&self, key: &str, response: Response) -> bool {
        let Some((_, entry)) = self.pending.remove(key) else {
            RegistryStats::bump(&self.stats.total_dropped);
            debug!(correlation_id = %key, "Response for unknown or expired call, dropping");
            return false;
        };

        let elapsed = entry.created_at.elapsed();
        match entry.sender.send(response) {
            Ok(()) => {
                RegistryStats::bump(&self.stats.total_completed);
                debug!(
                    correlation_id = %key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped between removal and send
                RegistryStats::bump(&self.stats.total_dropped);
                debug!(correlation_id = %key, "Waiter gone, dropping response");
                false
            }
        }
    }

    /// Get number of currently pending calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a key is pending
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Remove `key` only if it still belongs to registration `seq`.
    fn remove_own(&self, key: &str, seq: u64) -> bool {
        self.pending.remove_if(key, |_, entry| entry.seq == seq).is_some()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one registered call.
///
/// Dropping it before it resolves removes the registry entry immediately.
#[must_use = "a pending call does nothing unless waited on"]
pub struct PendingCall {
    key: String,
    seq: u64,
    timeout: Duration,
    deadline: Instant,
    receiver: oneshot::Receiver<Response>,
    registry: Arc<CorrelationRegistry>,
    settled: bool,
}

impl PendingCall {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the matching response or the deadline.
    ///
    /// # Errors
    ///
    /// `RegistryError::TimedOut` when the deadline passes first; the entry
    /// is gone by the time this returns, so a late response is dropped.
    pub async fn wait(mut self) -> Result<Response, RegistryError> {
        let outcome = tokio::time::timeout_at(self.deadline, &mut self.receiver).await;
        self.settled = true;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RegistryError::Abandoned(self.key.clone())),
            Err(_) => {
                if self.registry.remove_own(&self.key, self.seq) {
                    RegistryStats::bump(&self.registry.stats.total_timeouts);
                    warn!(
                        correlation_id = %self.key,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Pending call timed out"
                    );
                    return Err(RegistryError::TimedOut {
                        key: self.key.clone(),
                        timeout: self.timeout,
                    });
                }
                // Lost the race with complete(); the response may already be here.
                match self.receiver.try_recv() {
                    Ok(response) => Ok(response),
                    Err(_) => {
                        RegistryStats::bump(&self.registry.stats.total_timeouts);
                        Err(RegistryError::TimedOut {
                            key: self.key.clone(),
                            timeout: self.timeout,
                        })
                    }
                }
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if !self.settled && self.registry.remove_own(&self.key, self.seq) {
            RegistryStats::bump(&self.registry.stats.total_cancelled);
            debug!(correlation_id = %self.key, "Pending call cancelled by caller");
        }
    }
}
