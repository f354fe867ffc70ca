//! Actions of the booking flow.

use crate::error::{BookingError, ValidationError};
use crate::types::{Booking, Movie, MovieId, SeatNumber};
use marquee_macros::Action;

/// Commands from the customer and events from the services
///
/// Every event produced by an effect carries the generation it was issued
/// under so results of an abandoned flow can be recognised and dropped.
#[derive(Action, Clone, Debug, PartialEq)]
pub enum BookingAction {
    // Commands
    /// Load a movie and its theatres
    #[command]
    LoadMovie {
        /// Movie to load
        movie_id: MovieId,
    },

    /// Open the seat map for a theatre's showtime
    #[command]
    ChooseShowtime {
        /// Index into the movie's theatres
        theatre_index: usize,
        /// One of the theatre's showtimes
        showtime: String,
    },

    /// Select or deselect a seat
    #[command]
    ToggleSeat {
        /// Seat to toggle
        seat: SeatNumber,
    },

    /// Go back to theatre selection
    #[command]
    ChangeShowtime,

    /// Re-query occupancy for the active showing
    #[command]
    RefreshSeatMap,

    /// Submit the selection
    #[command]
    Submit,

    /// Leave the flow; in-flight results will be ignored
    #[command]
    Abandon,

    // Events
    /// Movie arrived
    #[event]
    MovieLoaded {
        /// Flow instance
        generation: u64,
        /// Movie with theatres
        movie: Movie,
    },

    /// Movie could not be loaded
    #[event]
    MovieLoadFailed {
        /// Flow instance
        generation: u64,
        /// Failure
        error: BookingError,
    },

    /// Occupancy of the active showing arrived
    #[event]
    OccupancyLoaded {
        /// Flow instance
        generation: u64,
        /// Booked seats
        booked: Vec<SeatNumber>,
    },

    /// Occupancy could not be loaded
    #[event]
    OccupancyFailed {
        /// Flow instance
        generation: u64,
        /// Failure
        error: BookingError,
    },

    /// Booking created, payment still to be recorded (two-step)
    #[event]
    BookingCreated {
        /// Flow instance
        generation: u64,
        /// Created booking, payment pending
        booking: Booking,
    },

    /// Booking persisted and paid
    #[event]
    #[terminal]
    BookingConfirmed {
        /// Flow instance
        generation: u64,
        /// Confirmed booking
        booking: Booking,
    },

    /// Submission failed
    #[event]
    #[terminal]
    SubmissionFailed {
        /// Flow instance
        generation: u64,
        /// Failure
        error: BookingError,
        /// Booking created before the failure, if any
        pending: Option<Booking>,
    },

    /// A command was rejected locally
    #[event]
    ValidationFailed {
        /// Failed precondition
        error: ValidationError,
    },
}

impl BookingAction {
    /// Generation carried by effect results
    #[must_use]
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::MovieLoaded { generation, .. }
            | Self::MovieLoadFailed { generation, .. }
            | Self::OccupancyLoaded { generation, .. }
            | Self::OccupancyFailed { generation, .. }
            | Self::BookingCreated { generation, .. }
            | Self::BookingConfirmed { generation, .. }
            | Self::SubmissionFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// True for occupancy results of `generation`
    #[must_use]
    pub const fn is_occupancy_result(&self, generation: u64) -> bool {
        matches!(
            self,
            Self::OccupancyLoaded { generation: g, .. } | Self::OccupancyFailed { generation: g, .. }
                if *g == generation
        )
    }

    /// True for movie load results of `generation`
    #[must_use]
    pub const fn is_movie_result(&self, generation: u64) -> bool {
        matches!(
            self,
            Self::MovieLoaded { generation: g, .. } | Self::MovieLoadFailed { generation: g, .. }
                if *g == generation
        )
    }

    /// True for the final outcome of a submission in `generation`
    #[must_use]
    pub fn is_submission_result(&self, generation: u64) -> bool {
        self.is_terminal() && self.generation() == Some(generation)
    }
}
