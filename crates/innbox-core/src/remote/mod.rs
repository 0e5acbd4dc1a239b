//! Remote Data Service interface
//!
//! The authoritative backend is consumed, not implemented, by this core.
//! Applies must be idempotent: the queue is at-least-once, so an insert that
//! reuses a caller-assigned id has to upsert rather than duplicate.

mod http;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Booking, BookingStatus};

pub use http::HttpRemoteService;

/// Errors from Remote Data Service calls
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure; the backend was never reached.
    /// Triggers the offline enqueue fallback.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The backend was reached and rejected the call
    #[error("Remote API error: {0}")]
    Api(String),
}

impl From<RemoteError> for crate::Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Connectivity(msg) => Self::Connectivity(msg),
            RemoteError::Api(msg) => Self::RemoteApply(msg),
        }
    }
}

/// The authoritative backend for bookings, guests, and inventory
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// Insert a record into the named collection; idempotent on record id
    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, RemoteError>;

    /// Apply a partial patch to a record
    async fn update(&self, collection: &str, id: &str, patch: &Value)
        -> Result<Value, RemoteError>;

    /// Delete a record
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// Find bookings on a room whose stay intersects the given half-open
    /// interval, restricted to the given statuses, excluding `exclude_id`
    async fn find_overlapping(
        &self,
        room_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_id: Option<&str>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RemoteError>;
}
