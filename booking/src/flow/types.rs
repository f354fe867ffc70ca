//! State of one booking session.

use crate::draft::BookingDraft;
use crate::error::{BookingError, ValidationError};
use crate::pricing;
use crate::seat_map::SeatMap;
use crate::selection::{SelectionSet, ToggleOutcome};
use crate::types::{Booking, IdempotencyKey, Movie, MovieId, Price, SeatLine, Showing, Tier};
use chrono::{DateTime, Utc};

/// Where the session is in the booking flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingPhase {
    /// Choosing a theatre and showtime
    #[default]
    SelectingTheatre,
    /// Waiting for occupancy of the chosen showing
    LoadingSeats,
    /// Seat map shown, selection editable
    SelectingSeats,
    /// A submission is in flight
    Submitting,
    /// Booking persisted and paid
    Confirmed,
    /// Last submission failed; map and selection kept for a retry
    Failed,
}

impl BookingPhase {
    /// Phases in which the selection can change and a submit is allowed
    #[must_use]
    pub const fn accepts_seat_changes(self) -> bool {
        matches!(self, Self::SelectingSeats | Self::Failed)
    }
}

/// A draft on its way to the Booking Service
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Payload
    pub draft: BookingDraft,
    /// Reused for every attempt of this draft
    pub idempotency_key: IdempotencyKey,
    /// Booking created but not yet paid (two-step confirmation)
    pub created: Option<Booking>,
    /// First attempt
    pub submitted_at: DateTime<Utc>,
    /// Attempts so far
    pub attempts: u32,
}

impl Submission {
    /// First attempt at `draft`
    #[must_use]
    pub fn new(draft: BookingDraft, submitted_at: DateTime<Utc>) -> Self {
        Self {
            draft,
            idempotency_key: IdempotencyKey::new(),
            created: None,
            submitted_at,
            attempts: 1,
        }
    }
}

/// State of one booking session
#[derive(Debug, Clone)]
pub struct BookingState {
    /// Current phase
    pub phase: BookingPhase,
    /// Movie requested by the last load
    pub movie_id: Option<MovieId>,
    /// Loaded movie with its theatres
    pub movie: Option<Movie>,
    /// A movie load is in flight
    pub loading_movie: bool,
    /// Active theatre and showtime
    pub showing: Option<Showing>,
    /// Seat map of the active showing
    pub seat_map: Option<SeatMap>,
    /// Selected seats
    pub selection: SelectionSet,
    /// Current or last failed submission
    pub submission: Option<Submission>,
    /// Booking confirmed by the last successful submission
    pub confirmed: Option<Booking>,
    /// Last failure, cleared by the next attempt
    pub last_error: Option<BookingError>,
    /// Non-fatal message for the customer
    pub notice: Option<String>,
    /// Outcome of the last seat toggle
    pub last_toggle: Option<ToggleOutcome>,
    /// Identifies the current flow instance; results from older ones are dropped
    pub generation: u64,
}

impl BookingState {
    /// Fresh session allowing `max_seats` per booking
    #[must_use]
    pub const fn new(max_seats: usize) -> Self {
        Self {
            phase: BookingPhase::SelectingTheatre,
            movie_id: None,
            movie: None,
            loading_movie: false,
            showing: None,
            seat_map: None,
            selection: SelectionSet::new(max_seats),
            submission: None,
            confirmed: None,
            last_error: None,
            notice: None,
            last_toggle: None,
            generation: 0,
        }
    }

    /// True if `generation` is the current flow instance
    #[must_use]
    pub const fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Total of the selected seats
    #[must_use]
    pub fn total(&self) -> Price {
        self.seat_map
            .as_ref()
            .map_or(Price::ZERO, |map| pricing::total(self.selection.as_slice(), map))
    }

    /// Booking lines for the selected seats
    #[must_use]
    pub fn line_items(&self) -> Vec<SeatLine> {
        self.seat_map
            .as_ref()
            .map(|map| pricing::line_items(self.selection.as_slice(), map))
            .unwrap_or_default()
    }

    /// Count and subtotal per tier
    #[must_use]
    pub fn breakdown(&self) -> Vec<(Tier, usize, Price)> {
        self.seat_map
            .as_ref()
            .map(|map| pricing::breakdown(self.selection.as_slice(), map))
            .unwrap_or_default()
    }

    /// Booking created by a failed two-step submission, still awaiting payment
    #[must_use]
    pub fn pending_booking(&self) -> Option<&Booking> {
        self.submission.as_ref().and_then(|s| s.created.as_ref())
    }

    /// Checks that a showtime can be opened, returning the showing
    ///
    /// # Errors
    ///
    /// The first unmet precondition.
    pub fn check_showtime(
        &self,
        theatre_index: usize,
        showtime: &str,
    ) -> Result<Showing, ValidationError> {
        if self.phase == BookingPhase::Submitting {
            return Err(ValidationError::SubmissionInProgress);
        }
        let movie = self.movie.as_ref().ok_or(ValidationError::MovieNotLoaded)?;
        let theatre = movie
            .theatres
            .get(theatre_index)
            .ok_or(ValidationError::UnknownTheatre)?;
        if !theatre.offers(showtime) {
            return Err(ValidationError::UnknownShowtime(showtime.to_string()));
        }
        if !theatre.price.is_valid_base() {
            return Err(ValidationError::InvalidBasePrice);
        }
        Ok(Showing {
            theatre: theatre.clone(),
            showtime: showtime.to_string(),
        })
    }

    /// Checks that the selection can be submitted
    ///
    /// # Errors
    ///
    /// The first unmet precondition.
    pub fn check_submittable(&self) -> Result<(), ValidationError> {
        match self.phase {
            BookingPhase::Submitting => return Err(ValidationError::SubmissionInProgress),
            phase if !phase.accepts_seat_changes() => return Err(ValidationError::NoActiveShowing),
            _ => {},
        }
        if self.showing.is_none() || self.seat_map.is_none() {
            return Err(ValidationError::NoActiveShowing);
        }
        if self.movie.is_none() {
            return Err(ValidationError::MovieNotLoaded);
        }
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        if self.selection.len() > self.selection.max() {
            return Err(ValidationError::TooManySeats {
                max: self.selection.max(),
            });
        }
        Ok(())
    }

    /// Drops everything tied to the active showing
    pub(crate) fn clear_showing(&mut self) {
        self.showing = None;
        self.seat_map = None;
        self.selection.reset();
        self.submission = None;
        self.confirmed = None;
        self.last_error = None;
        self.notice = None;
        self.last_toggle = None;
    }
}

impl Default for BookingState {
    fn default() -> Self {
        Self::new(crate::selection::DEFAULT_MAX_SEATS)
    }
}
