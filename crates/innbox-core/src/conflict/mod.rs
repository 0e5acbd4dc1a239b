//! Double-booking detection
//!
//! Enforces the room invariant: no two active bookings on a room may have
//! overlapping half-open `[check_in, check_out)` intervals. Runs at original
//! submission time only; queued operations are not re-checked at replay.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Booking, BookingStatus};
use crate::remote::RemoteDataService;

/// Detector querying the backend for conflicting bookings
#[derive(Clone)]
pub struct ConflictDetector {
    remote: Arc<dyn RemoteDataService>,
}

impl ConflictDetector {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDataService>) -> Self {
        Self { remote }
    }

    /// Find active bookings on `room_id` that overlap the given interval.
    ///
    /// `exclude_booking_id` drops the booking being edited from its own
    /// conflict set. The backend already filters, but the exclude, status,
    /// and overlap predicates are re-applied here so the invariant does not
    /// depend on the backend's query semantics.
    pub async fn find_conflicts(
        &self,
        room_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_booking_id: Option<&str>,
        active_statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>> {
        let candidates = self
            .remote
            .find_overlapping(room_id, check_in, check_out, exclude_booking_id, active_statuses)
            .await?;

        let conflicts: Vec<Booking> = candidates
            .into_iter()
            .filter(|b| b.room_id == room_id)
            .filter(|b| active_statuses.contains(&b.status))
            .filter(|b| exclude_booking_id != Some(b.id.as_str()))
            .filter(|b| b.overlaps(check_in, check_out))
            .collect();

        if !conflicts.is_empty() {
            tracing::debug!(
                room_id,
                %check_in,
                %check_out,
                count = conflicts.len(),
                "Found booking conflicts"
            );
        }
        Ok(conflicts)
    }
}
