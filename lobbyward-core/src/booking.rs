//! Reservation-request fan-out.
//!
//! A member fills in a date and time; the request is summarized and sent to
//! each configured reviewer. Delivery is best-effort per reviewer; one
//! unreachable reviewer never fails the submission.

use crate::types::UserId;
use thiserror::Error;

/// Booking validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("missing {0}")]
    MissingField(&'static str),
}

/// A validated reservation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub user: UserId,
    pub display_name: String,
    pub date: String,
    pub time: String,
}

impl BookingRequest {
    /// Validate and build a request. Fields are free text; only presence is
    /// checked here, the reviewers coordinate the rest out of band.
    pub fn new(
        user: UserId,
        display_name: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Result<Self, BookingError> {
        let display_name = display_name.into();
        let date = date.into();
        let time = time.into();

        if date.trim().is_empty() {
            return Err(BookingError::MissingField("date"));
        }
        if time.trim().is_empty() {
            return Err(BookingError::MissingField("time"));
        }

        Ok(BookingRequest {
            user,
            display_name,
            date,
            time,
        })
    }

    /// Reviewer-facing summary of the request
    pub fn summary(&self) -> String {
        format!(
            "New reservation request\nUser: {} ({})\nDate: {}\nTime: {}",
            self.display_name, self.user, self.date, self.time
        )
    }
}
