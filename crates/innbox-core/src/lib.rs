//! innbox-core - Core library for Innbox
//!
//! Offline-capable mutation system for staff terminals: a durable local
//! queue, an ordered drain/replay protocol against the backend, and the
//! booking interval-conflict detector the submission path runs through.

pub mod conflict;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod store;
pub mod sync;

pub use conflict::ConflictDetector;
pub use coordinator::{MutationCoordinator, NotificationSink, SubmitOutcome};
pub use error::{Error, Result};
pub use models::{Action, Booking, BookingStatus, OperationId, QueuedOperation};
pub use queue::OperationQueue;
pub use remote::{HttpRemoteService, RemoteDataService, RemoteError};
pub use store::{DurableStore, LibSqlStore, MemoryStore};
pub use sync::{DrainReport, RetryPolicy, SyncProcessor};
