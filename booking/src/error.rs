//! Error types for the booking engine.

use crate::types::SeatNumber;
use thiserror::Error;

/// Result alias for booking operations
pub type BookingResult<T> = Result<T, BookingError>;

/// Local precondition failures; never involve a network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Submit with nothing selected
    #[error("Please select seats")]
    EmptySelection,

    /// Selection above the per-booking limit
    #[error("Maximum {max} seats can be selected")]
    TooManySeats {
        /// Configured limit
        max: usize,
    },

    /// No theatre and showtime chosen yet
    #[error("Please select a theatre and showtime")]
    NoActiveShowing,

    /// Movie details not loaded yet
    #[error("Movie details are not loaded")]
    MovieNotLoaded,

    /// Theatre index out of range
    #[error("Unknown theatre")]
    UnknownTheatre,

    /// Showtime not listed by the theatre
    #[error("Showtime {0} is not offered by this theatre")]
    UnknownShowtime(String),

    /// Theatre base price is zero
    #[error("Theatre has no valid base price")]
    InvalidBasePrice,

    /// A submission is already in flight
    #[error("A booking is already being submitted")]
    SubmissionInProgress,

    /// Booking cannot be cancelled (not confirmed, or showtime passed)
    #[error("This booking can no longer be cancelled")]
    NotCancellable,

    /// Booking id not present in the ledger
    #[error("Booking not found")]
    BookingNotFound,

    /// Malformed seat label
    #[error("Invalid seat number: {0}")]
    InvalidSeatNumber(String),
}

/// Every failure the booking engine reports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Local precondition failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport failure or timeout
    #[error("Network error: {message}")]
    Network {
        /// Transport error text
        message: String,
    },

    /// The service answered with a non-success result
    #[error("Booking service rejected the request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    ServiceRejection {
        /// HTTP status code
        status: u16,
        /// Server message, when it sent one
        message: Option<String>,
    },

    /// Some requested seats were taken by someone else
    #[error("Seats no longer available: {}", format_seats(.seats))]
    SeatConflict {
        /// Seats the service reported as taken
        seats: Vec<SeatNumber>,
    },

    /// Missing or expired credentials
    #[error("Please log in to continue")]
    Unauthorized,

    /// Response body did not match the expected shape
    #[error("Unexpected response from booking service: {message}")]
    Decode {
        /// Decoder error text
        message: String,
    },
}

/// User-facing operation, used to pick fallback messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Loading movie details
    LoadMovie,
    /// Loading seat occupancy
    LoadSeats,
    /// Creating and paying for a booking
    CreateBooking,
    /// Loading a booking's details
    FetchBooking,
    /// Loading the booking list
    ListBookings,
    /// Cancelling a booking
    CancelBooking,
}

impl Operation {
    /// Shown when the service rejects the request without a message
    #[must_use]
    pub const fn rejection_fallback(self) -> &'static str {
        match self {
            Self::LoadMovie => "Movie not found",
            Self::LoadSeats => "Seat availability is unavailable",
            Self::CreateBooking => "Booking failed",
            Self::FetchBooking => "Booking not found",
            Self::ListBookings => "Failed to fetch bookings",
            Self::CancelBooking => "Failed to cancel booking",
        }
    }

    /// Shown when the request never got an answer
    #[must_use]
    pub const fn network_fallback(self) -> &'static str {
        match self {
            Self::LoadMovie => "Error fetching movie details",
            Self::LoadSeats => "Error fetching seat availability",
            Self::CreateBooking => "Error creating booking",
            Self::FetchBooking => "Error fetching booking details",
            Self::ListBookings => "Error fetching bookings",
            Self::CancelBooking => "Error cancelling booking",
        }
    }
}

impl BookingError {
    /// Builds a network error from any displayable transport error
    pub fn network(error: impl std::fmt::Display) -> Self {
        Self::Network {
            message: error.to_string(),
        }
    }

    /// Builds a decode error from any displayable decoder error
    pub fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: error.to_string(),
        }
    }

    /// Message to show the user for a failure of `operation`
    ///
    /// Server messages are shown verbatim; otherwise the operation's fallback.
    #[must_use]
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::ServiceRejection {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::ServiceRejection { .. } => operation.rejection_fallback().to_string(),
            Self::Network { .. } | Self::Decode { .. } => operation.network_fallback().to_string(),
            Self::SeatConflict { .. } | Self::Unauthorized => self.to_string(),
        }
    }

    /// True for failures worth retrying by hand (nothing is retried automatically)
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

fn format_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
