//! Mutation entry point for booking and inventory flows

use serde_json::Value;
use std::sync::Arc;

use crate::conflict::ConflictDetector;
use crate::error::{Error, Result};
use crate::models::{Action, Booking, BookingPatch, BookingStatus, QueuedOperation};
use crate::queue::OperationQueue;
use crate::remote::{RemoteDataService, RemoteError};
use crate::sync::SyncProcessor;

/// How a submitted mutation was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Applied directly against the backend
    Confirmed {
        /// Record as returned by the backend (null for deletes)
        record: Value,
    },
    /// Backend unreachable; saved locally, will sync on the next drain
    AcceptedLocally,
}

/// Fire-and-forget side-channel for downstream SMS/push dispatch.
///
/// Called only on confirmed mutations. The call is infallible by
/// construction, so notification-channel problems can never affect the
/// mutation's own outcome; implementations forward into their own queue.
pub trait NotificationSink: Send + Sync {
    fn mutation_confirmed(&self, op: &QueuedOperation);
}

/// Façade used by booking-create/edit and inventory flows.
///
/// Happy path goes straight to the backend (after conflict validation);
/// connectivity failures fall back to the durable queue.
pub struct MutationCoordinator {
    remote: Arc<dyn RemoteDataService>,
    detector: ConflictDetector,
    queue: OperationQueue,
    processor: Arc<SyncProcessor>,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl MutationCoordinator {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        queue: OperationQueue,
        processor: Arc<SyncProcessor>,
    ) -> Self {
        Self {
            detector: ConflictDetector::new(remote.clone()),
            remote,
            queue,
            processor,
            notifier: None,
        }
    }

    /// Attach a notification sink invoked on confirmed mutations
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Submit a mutation.
    ///
    /// Validation and conflict errors surface immediately and never touch
    /// the queue; a connectivity failure enqueues the operation and reports
    /// [`SubmitOutcome::AcceptedLocally`] so the caller can tell the user
    /// their change is pending sync.
    pub async fn submit(&self, op: QueuedOperation) -> Result<SubmitOutcome> {
        Self::validate(&op)?;

        if op.is_booking_mutation() && op.action != Action::Delete {
            self.check_booking_conflicts(&op).await?;
        }

        match self.apply_direct(&op).await {
            Ok(record) => {
                if let Some(notifier) = &self.notifier {
                    notifier.mutation_confirmed(&op);
                }
                Ok(SubmitOutcome::Confirmed { record })
            }
            Err(RemoteError::Connectivity(reason)) => {
                tracing::info!(
                    id = %op.id,
                    entity = %op.target_entity,
                    %reason,
                    "Backend unreachable, queueing operation locally"
                );
                self.queue.enqueue(op).await?;

                // Opportunistic, best-effort: not required for correctness,
                // the periodic drain picks the entry up either way.
                let processor = self.processor.clone();
                tokio::spawn(async move {
                    if let Err(error) = processor.drain().await {
                        tracing::debug!(%error, "Post-enqueue drain attempt failed");
                    }
                });

                Ok(SubmitOutcome::AcceptedLocally)
            }
            Err(err @ RemoteError::Api(_)) => Err(err.into()),
        }
    }

    fn validate(op: &QueuedOperation) -> Result<()> {
        if op.target_entity.trim().is_empty() {
            return Err(Error::Validation("target entity must not be empty".to_string()));
        }

        match op.action {
            Action::Insert | Action::Update => {
                if !op.payload.is_object() {
                    return Err(Error::Validation(format!(
                        "{} payload must be an object",
                        op.action
                    )));
                }
                if op.action == Action::Update && op.record_id().is_none() {
                    return Err(Error::Validation(
                        "update payload must include the record id".to_string(),
                    ));
                }
            }
            Action::Delete => {
                if op.record_id().is_none() {
                    return Err(Error::Validation(
                        "delete payload must include the record id".to_string(),
                    ));
                }
            }
        }

        if op.is_booking_mutation() {
            Self::validate_booking_payload(op)?;
        }
        Ok(())
    }

    fn validate_booking_payload(op: &QueuedOperation) -> Result<()> {
        let (check_in, check_out) = match op.action {
            Action::Insert => {
                let booking: Booking = serde_json::from_value(op.payload.clone())
                    .map_err(|e| Error::Validation(format!("invalid booking payload: {e}")))?;
                if booking.id.trim().is_empty()
                    || booking.room_id.trim().is_empty()
                    || booking.guest_id.trim().is_empty()
                {
                    return Err(Error::Validation(
                        "booking requires id, room_id and guest_id".to_string(),
                    ));
                }
                (booking.check_in, booking.check_out)
            }
            Action::Update => {
                let patch: BookingPatch = serde_json::from_value(op.payload.clone())
                    .map_err(|e| Error::Validation(format!("invalid booking patch: {e}")))?;
                match patch.interval() {
                    Some((_, check_in, check_out)) => (check_in, check_out),
                    None => return Ok(()),
                }
            }
            Action::Delete => return Ok(()),
        };

        if check_in >= check_out {
            return Err(Error::Validation(
                "check_out must be after check_in".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the conflict gate for a booking insert/update.
    ///
    /// If the detector itself cannot reach the backend the check is skipped:
    /// the offline path has no local conflict detection, and such operations
    /// are accepted locally and only collide once replayed.
    async fn check_booking_conflicts(&self, op: &QueuedOperation) -> Result<()> {
        let (room_id, check_in, check_out, exclude) = match op.action {
            Action::Insert => {
                let booking: Booking = serde_json::from_value(op.payload.clone())
                    .map_err(|e| Error::Validation(format!("invalid booking payload: {e}")))?;
                (booking.room_id, booking.check_in, booking.check_out, None)
            }
            Action::Update => {
                let patch: BookingPatch = serde_json::from_value(op.payload.clone())
                    .map_err(|e| Error::Validation(format!("invalid booking patch: {e}")))?;
                match patch.interval() {
                    Some((room_id, check_in, check_out)) => {
                        (room_id.to_string(), check_in, check_out, Some(patch.id.clone()))
                    }
                    // Patch doesn't move the stay interval
                    None => return Ok(()),
                }
            }
            Action::Delete => return Ok(()),
        };

        let result = self
            .detector
            .find_conflicts(
                &room_id,
                check_in,
                check_out,
                exclude.as_deref(),
                &BookingStatus::active_statuses(),
            )
            .await;

        match result {
            Ok(conflicts) if conflicts.is_empty() => Ok(()),
            Ok(conflicts) => Err(Error::Conflict {
                room_id,
                check_in,
                check_out,
                conflicts,
            }),
            Err(Error::Connectivity(reason)) => {
                tracing::debug!(%reason, "Conflict check skipped, backend unreachable");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn apply_direct(&self, op: &QueuedOperation) -> std::result::Result<Value, RemoteError> {
        match op.action {
            Action::Insert => self.remote.insert(&op.target_entity, &op.payload).await,
            Action::Update => {
                // Validated above; record_id is present for updates
                let id = op.record_id().unwrap_or_default();
                self.remote.update(&op.target_entity, id, &op.payload).await
            }
            Action::Delete => {
                let id = op.record_id().unwrap_or_default();
                self.remote.delete(&op.target_entity, id).await?;
                Ok(Value::Null)
            }
        }
    }
}
