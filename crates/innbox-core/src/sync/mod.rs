//! Queue drain and replay against the Remote Data Service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Action, QueuedOperation};
use crate::queue::OperationQueue;
use crate::remote::{RemoteDataService, RemoteError};

/// Backoff and dead-letter policy for failing operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Failed applies allowed before an operation is dead-lettered
    pub max_attempts: u32,
    /// Delay after the first failure; doubles per subsequent failure
    pub base_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Whether an operation with this many failed attempts is spent
    #[must_use]
    pub const fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Earliest Unix-ms time the next attempt may run after failure number
    /// `attempts` at time `now`
    #[must_use]
    pub fn next_attempt_at(&self, attempts: u32, now: i64) -> i64 {
        let base = i64::try_from(self.base_delay.as_millis()).unwrap_or(i64::MAX);
        let cap = i64::try_from(self.max_delay.as_millis()).unwrap_or(i64::MAX);
        // Shift clamped so the multiplier stays positive; the cap applies
        // long before that matters for realistic attempt counts.
        let multiplier = 1_i64 << attempts.saturating_sub(1).min(32);
        let delay = base.saturating_mul(multiplier).min(cap);
        now.saturating_add(delay)
    }
}

/// Outcome of one `drain()` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations applied and removed
    pub applied: usize,
    /// Operations that failed and stay pending with backoff
    pub retained: usize,
    /// Operations moved to the dead bucket
    pub buried: usize,
    /// Operations skipped because their backoff window hasn't elapsed
    pub deferred: usize,
    /// True when another drain pass was already in flight and this call
    /// did nothing
    pub already_draining: bool,
}

/// Drains the operation queue in timestamp order.
///
/// Drain passes are serialized by a single-flight guard; this is the only
/// mechanism preserving causal order between dependent operations, so a
/// second concurrent `drain()` is a no-op rather than a parallel pass.
pub struct SyncProcessor {
    queue: OperationQueue,
    remote: Arc<dyn RemoteDataService>,
    policy: RetryPolicy,
    draining: AtomicBool,
}

impl SyncProcessor {
    #[must_use]
    pub fn new(queue: OperationQueue, remote: Arc<dyn RemoteDataService>) -> Self {
        Self::with_policy(queue, remote, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_policy(
        queue: OperationQueue,
        remote: Arc<dyn RemoteDataService>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            remote,
            policy,
            draining: AtomicBool::new(false),
        }
    }

    /// Replay pending operations against the backend, oldest first.
    ///
    /// Each success removes its entry; each remote failure is logged and the
    /// pass continues with the next operation. Store failures abort the pass.
    pub async fn drain(&self) -> Result<DrainReport> {
        if self.draining.swap(true, Ordering::SeqCst) {
            tracing::debug!("Drain already in progress, skipping");
            return Ok(DrainReport {
                already_draining: true,
                ..DrainReport::default()
            });
        }

        let result = self.drain_pass().await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    /// Spawn a periodic drain task (one of the drain triggers, alongside
    /// connectivity-regained events and post-enqueue opportunistic drains)
    pub fn spawn_periodic(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.drain().await {
                    Ok(report) if report.applied > 0 => {
                        tracing::info!(applied = report.applied, "Periodic drain applied operations");
                    }
                    Ok(_) => {}
                    Err(error) => tracing::warn!(%error, "Periodic drain failed"),
                }
            }
        })
    }

    async fn drain_pass(&self) -> Result<DrainReport> {
        let ops = self.queue.list_pending().await?;
        let mut report = DrainReport::default();
        if ops.is_empty() {
            return Ok(report);
        }

        let now = chrono::Utc::now().timestamp_millis();
        tracing::debug!(pending = ops.len(), "Draining operation queue");

        for op in ops {
            if op.next_attempt_at > now {
                report.deferred += 1;
                continue;
            }

            match self.apply(&op).await {
                Ok(()) => {
                    // Remove only after the backend confirmed the apply; a
                    // crash in between replays the op (at-least-once).
                    self.queue.remove(op.id).await?;
                    report.applied += 1;
                }
                Err(RemoteError::Connectivity(reason)) => {
                    // Still offline. Waiting out disconnection is the queue's
                    // job, so this neither counts against the retry budget
                    // nor starts a backoff window.
                    tracing::debug!(id = %op.id, %reason, "Backend unreachable, keeping operation pending");
                    report.retained += 1;
                }
                Err(error @ RemoteError::Api(_)) => {
                    tracing::warn!(
                        id = %op.id,
                        entity = %op.target_entity,
                        action = %op.action,
                        %error,
                        "Failed to apply queued operation"
                    );
                    let attempts = op.retry_count + 1;
                    if self.policy.is_exhausted(attempts) {
                        self.queue.bury(op, &error.to_string(), now).await?;
                        report.buried += 1;
                    } else {
                        let next = self.policy.next_attempt_at(attempts, now);
                        self.queue.retain_failed(op, next).await?;
                        report.retained += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn apply(&self, op: &QueuedOperation) -> std::result::Result<(), RemoteError> {
        match op.action {
            Action::Insert => {
                self.remote.insert(&op.target_entity, &op.payload).await?;
            }
            Action::Update => {
                let id = op.record_id().ok_or_else(|| {
                    RemoteError::Api("update payload is missing the record id".to_string())
                })?;
                self.remote.update(&op.target_entity, id, &op.payload).await?;
            }
            Action::Delete => {
                let id = op.record_id().ok_or_else(|| {
                    RemoteError::Api("delete payload is missing the record id".to_string())
                })?;
                self.remote.delete(&op.target_entity, id).await?;
            }
        }
        Ok(())
    }
}
