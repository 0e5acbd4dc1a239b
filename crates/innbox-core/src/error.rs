//! Error types for innbox-core

use thiserror::Error;

use crate::models::Booking;

/// Result type alias using innbox-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in innbox-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Submitted operation is missing required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Booking would overlap an existing active booking on the same room
    #[error("Room {room_id} already has {n} active booking(s) between {check_in} and {check_out}", n = .conflicts.len())]
    Conflict {
        room_id: String,
        check_in: chrono::NaiveDate,
        check_out: chrono::NaiveDate,
        conflicts: Vec<Booking>,
    },

    /// Backend unreachable; the mutation can fall back to the local queue
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Backend reached but rejected the mutation
    #[error("Remote apply error: {0}")]
    RemoteApply(String),

    /// Durable store failure; fatal for the operation in flight
    #[error("Durable store error: {0}")]
    Store(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
