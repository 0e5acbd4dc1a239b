//! Data models for Innbox

mod booking;
mod inventory;
mod operation;

pub use booking::{Booking, BookingPatch, BookingStatus};
pub use inventory::InventoryItem;
pub use operation::{collections, Action, OperationId, OperationStatus, QueuedOperation};
