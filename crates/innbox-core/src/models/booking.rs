//! Booking model and the no-double-booking overlap test

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that occupy the room and therefore participate in
    /// overlap conflicts.
    #[must_use]
    pub const fn active_statuses() -> [Self; 2] {
        [Self::Confirmed, Self::CheckedIn]
    }

    /// Wire name used in query parameters
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A room booking as held by the Remote Data Service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier
    pub id: String,
    /// Room being booked
    pub room_id: String,
    /// Guest the booking belongs to
    pub guest_id: String,
    /// Arrival date (inclusive)
    pub check_in: NaiveDate,
    /// Departure date (exclusive)
    pub check_out: NaiveDate,
    /// Lifecycle state
    pub status: BookingStatus,
}

impl Booking {
    /// Half-open interval overlap test against `[check_in, check_out)`.
    ///
    /// Exactly-adjacent stays (one checking out the day the other checks in)
    /// do not overlap.
    #[must_use]
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && self.check_out > check_in
    }
}

/// Partial booking update payload.
///
/// Carries the record id plus whichever fields the edit touches. An interval
/// conflict check is only possible when `room_id`, `check_in` and
/// `check_out` are all present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl BookingPatch {
    /// Returns the patched interval when the patch moves the booking,
    /// i.e. carries room and both dates.
    #[must_use]
    pub fn interval(&self) -> Option<(&str, NaiveDate, NaiveDate)> {
        match (&self.room_id, self.check_in, self.check_out) {
            (Some(room_id), Some(check_in), Some(check_out)) => {
                Some((room_id.as_str(), check_in, check_out))
            }
            _ => None,
        }
    }
}
