//! Durable pending-operation queue

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{OperationId, OperationStatus, QueuedOperation};
use crate::store::{DurableStore, DEAD_BUCKET, PENDING_BUCKET};

/// An operation that exhausted its retry budget, parked for operator review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadOperation {
    /// The operation as it last failed
    pub op: QueuedOperation,
    /// When it was dead-lettered (Unix ms)
    pub failed_at: i64,
    /// Last apply error
    pub last_error: String,
}

/// Ordered pending-operation set on top of a [`DurableStore`].
///
/// The queue is the sole writer of the pending and dead buckets; ordering is
/// computed at read time from `enqueued_at`, there is no separate index.
#[derive(Clone)]
pub struct OperationQueue {
    store: Arc<dyn DurableStore>,
}

impl OperationQueue {
    /// Create a queue over the given store handle
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Enqueue a mutation for later replay.
    ///
    /// Assigns `enqueued_at` if not already set, forces `Pending` status and
    /// fresh retry bookkeeping, and persists durably before returning. A
    /// store failure here loses the mutation; there is no recovery path.
    pub async fn enqueue(&self, mut op: QueuedOperation) -> Result<QueuedOperation> {
        if op.enqueued_at.is_none() {
            op.enqueued_at = Some(chrono::Utc::now().timestamp_millis());
        }
        op.status = OperationStatus::Pending;
        op.retry_count = 0;
        op.next_attempt_at = 0;

        self.persist_pending(&op).await?;
        tracing::debug!(
            id = %op.id,
            entity = %op.target_entity,
            action = %op.action,
            "Enqueued operation"
        );
        Ok(op)
    }

    /// List pending operations sorted ascending by `(enqueued_at, id)`.
    ///
    /// The ordering is load-bearing: causally dependent operations (a guest
    /// insert a booking insert references) must replay in creation order.
    /// UUIDv7 ids make the tie-break follow insertion order.
    pub async fn list_pending(&self) -> Result<Vec<QueuedOperation>> {
        let keys = self.store.list_keys(PENDING_BUCKET).await?;

        let mut ops = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.get(PENDING_BUCKET, &key).await? {
                let op: QueuedOperation = serde_json::from_value(value)?;
                if op.status == OperationStatus::Pending {
                    ops.push(op);
                }
            }
        }

        ops.sort_by(|a, b| {
            a.enqueued_at
                .unwrap_or(0)
                .cmp(&b.enqueued_at.unwrap_or(0))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(ops)
    }

    /// Remove an operation after a confirmed successful apply.
    ///
    /// Idempotent: removing an unknown or already-removed id is a no-op.
    pub async fn remove(&self, id: OperationId) -> Result<()> {
        self.store.delete(PENDING_BUCKET, &id.as_str()).await
    }

    /// Re-persist a failed operation with incremented retry bookkeeping
    pub async fn retain_failed(
        &self,
        mut op: QueuedOperation,
        next_attempt_at: i64,
    ) -> Result<QueuedOperation> {
        op.retry_count += 1;
        op.next_attempt_at = next_attempt_at;
        self.persist_pending(&op).await?;
        Ok(op)
    }

    /// Move an operation that exhausted its retry budget to the dead bucket
    pub async fn bury(&self, op: QueuedOperation, last_error: &str, now: i64) -> Result<()> {
        let id = op.id;
        let dead = DeadOperation {
            op,
            failed_at: now,
            last_error: last_error.to_string(),
        };
        self.store
            .put(DEAD_BUCKET, &id.as_str(), &serde_json::to_value(&dead)?)
            .await?;
        self.store.delete(PENDING_BUCKET, &id.as_str()).await?;
        tracing::warn!(id = %id, error = %dead.last_error, "Dead-lettered operation");
        Ok(())
    }

    /// List dead-lettered operations, oldest failure first
    pub async fn list_dead(&self) -> Result<Vec<DeadOperation>> {
        let keys = self.store.list_keys(DEAD_BUCKET).await?;

        let mut dead = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.get(DEAD_BUCKET, &key).await? {
                dead.push(serde_json::from_value::<DeadOperation>(value)?);
            }
        }
        dead.sort_by_key(|entry| entry.failed_at);
        Ok(dead)
    }

    async fn persist_pending(&self, op: &QueuedOperation) -> Result<()> {
        let value: Value = serde_json::to_value(op)?;
        self.store.put(PENDING_BUCKET, &op.id.as_str(), &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{collections, Action};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn queue() -> OperationQueue {
        OperationQueue::new(Arc::new(MemoryStore::new()))
    }

    fn op(payload: Value) -> QueuedOperation {
        QueuedOperation::new(collections::BOOKINGS, Action::Insert, payload)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_assigns_timestamp_and_pending_status() {
        let queue = queue();
        let stored = queue.enqueue(op(json!({"id": "b-1"}))).await.unwrap();

        assert!(stored.enqueued_at.is_some());
        assert_eq!(stored.status, OperationStatus::Pending);

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending, vec![stored]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_keeps_preset_timestamp() {
        let queue = queue();
        let mut preset = op(json!({"id": "b-1"}));
        preset.enqueued_at = Some(42);

        let stored = queue.enqueue(preset).await.unwrap();
        assert_eq!(stored.enqueued_at, Some(42));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_pending_sorted_by_enqueued_at() {
        let queue = queue();

        // Insert out of order; listing must come back 1, 2, 3
        for ts in [3_i64, 1, 2] {
            let mut entry = op(json!({"id": format!("b-{ts}")}));
            entry.enqueued_at = Some(ts);
            queue.enqueue(entry).await.unwrap();
        }

        let pending = queue.list_pending().await.unwrap();
        let stamps: Vec<i64> = pending.iter().map(|o| o.enqueued_at.unwrap()).collect();
        assert_eq!(stamps, vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_pending_ties_broken_by_insertion_order() {
        let queue = queue();

        let mut first = op(json!({"id": "b-1"}));
        first.id = "00000000-0000-7000-8000-000000000001".parse().unwrap();
        first.enqueued_at = Some(7);
        let mut second = op(json!({"id": "b-2"}));
        second.id = "00000000-0000-7000-8000-000000000002".parse().unwrap();
        second.enqueued_at = Some(7);

        let first_id = first.id;
        let second_id = second.id;
        // Store in reverse to prove sorting does the work
        queue.enqueue(second).await.unwrap();
        queue.enqueue(first).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(
            pending.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![first_id, second_id]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_is_idempotent() {
        let queue = queue();
        let stored = queue.enqueue(op(json!({"id": "b-1"}))).await.unwrap();

        queue.remove(stored.id).await.unwrap();
        queue.remove(stored.id).await.unwrap();
        queue.remove(OperationId::new()).await.unwrap();

        assert!(queue.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retain_failed_increments_retry_count() {
        let queue = queue();
        let stored = queue.enqueue(op(json!({"id": "b-1"}))).await.unwrap();

        let retained = queue.retain_failed(stored, 9_999).await.unwrap();
        assert_eq!(retained.retry_count, 1);
        assert_eq!(retained.next_attempt_at, 9_999);

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending[0].retry_count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bury_moves_to_dead_bucket() {
        let queue = queue();
        let stored = queue.enqueue(op(json!({"id": "b-1"}))).await.unwrap();
        let id = stored.id;

        queue.bury(stored, "backend rejected", 1_000).await.unwrap();

        assert!(queue.list_pending().await.unwrap().is_empty());
        let dead = queue.list_dead().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].op.id, id);
        assert_eq!(dead[0].last_error, "backend rejected");
        assert_eq!(dead[0].failed_at, 1_000);
    }
}
