//! Reducer for the booking flow.
//!
//! ```text
//! SelectingTheatre ─ChooseShowtime→ LoadingSeats ─OccupancyLoaded→ SelectingSeats
//!        ↑                               │                            │ Submit
//!        └──────── OccupancyFailed ──────┘                            ↓
//!                                                    Failed ←──── Submitting ───→ Confirmed
//!                                                      │ ToggleSeat / Submit
//!                                                      └───────────→ SelectingSeats / Submitting
//! ```
//!
//! All I/O leaves the reducer as [`Effect::Future`]s whose results come back
//! as events stamped with the generation they were issued under.

use crate::config::ConfirmationMode;
use crate::draft::BookingDraft;
use crate::error::{BookingError, ValidationError};
use crate::flow::{BookingAction, BookingEnvironment, BookingPhase, BookingState, Submission};
use crate::pricing;
use crate::seat_map::SeatMap;
use crate::selection::ToggleOutcome;
use crate::service::CreateBooking;
use crate::types::{Booking, MovieId, SeatNumber, Showing};
use marquee_core::{effect::Effect, reducer::Reducer};
use smallvec::{smallvec, SmallVec};

/// Reducer for the booking flow
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `Submit` and assembles the draft
    fn validate_submit(state: &BookingState, env: &BookingEnvironment) -> Result<BookingDraft, ValidationError> {
        state.check_submittable()?;
        let (Some(movie), Some(showing), Some(map)) = (&state.movie, &state.showing, &state.seat_map)
        else {
            return Err(ValidationError::NoActiveShowing);
        };
        let lines = pricing::line_items(state.selection.as_slice(), map);
        BookingDraft::new(movie.id.clone(), showing, lines, env.payment_method)
    }

    /// Applies an event to state
    #[allow(clippy::too_many_lines)] // One arm per event
    fn apply_event(state: &mut BookingState, action: &BookingAction) {
        match action {
            BookingAction::MovieLoaded { movie, .. } => {
                tracing::info!(
                    movie_id = %movie.id,
                    title = %movie.title,
                    theatres = movie.theatres.len(),
                    "Movie loaded"
                );
                state.movie = Some(movie.clone());
                state.loading_movie = false;
                state.last_error = None;
            },

            BookingAction::MovieLoadFailed { error, .. } => {
                tracing::warn!(%error, "Movie load failed");
                state.loading_movie = false;
                state.last_error = Some(error.clone());
            },

            BookingAction::OccupancyLoaded { booked, .. } => {
                let Some(base_price) = state.showing.as_ref().map(|s| s.theatre.price) else {
                    return;
                };
                match state.phase {
                    BookingPhase::LoadingSeats => match SeatMap::generate(base_price, booked) {
                        Ok(map) => {
                            tracing::info!(
                                available = map.available_count(),
                                booked = booked.len(),
                                "Seat map ready"
                            );
                            state.seat_map = Some(map);
                            state.phase = BookingPhase::SelectingSeats;
                        },
                        Err(error) => {
                            state.showing = None;
                            state.phase = BookingPhase::SelectingTheatre;
                            state.last_error = Some(error.into());
                        },
                    },
                    BookingPhase::SelectingSeats | BookingPhase::Failed => {
                        // Seats held by our own unpaid booking stay selectable
                        let held: Vec<SeatNumber> = state
                            .pending_booking()
                            .map(|booking| booking.seat_numbers().collect())
                            .unwrap_or_default();
                        let booked = booked.iter().filter(|seat| !held.contains(*seat));
                        let Ok(map) = SeatMap::generate(base_price, booked) else {
                            return;
                        };
                        let dropped = state.selection.retain_available(&map);
                        if !dropped.is_empty() {
                            tracing::info!(dropped = dropped.len(), "Selected seats were taken");
                            state.notice = Some(BookingError::SeatConflict { seats: dropped }.to_string());
                        }
                        state.seat_map = Some(map);
                    },
                    phase => {
                        tracing::debug!(?phase, "Ignoring occupancy outside seat selection");
                    },
                }
            },

            BookingAction::OccupancyFailed { error, .. } => {
                tracing::warn!(%error, "Occupancy query failed");
                if state.phase == BookingPhase::LoadingSeats {
                    state.showing = None;
                    state.phase = BookingPhase::SelectingTheatre;
                }
                state.last_error = Some(error.clone());
            },

            BookingAction::BookingCreated { booking, .. } => {
                tracing::info!(
                    booking_id = %booking.id,
                    reference = %booking.booking_reference,
                    "Booking created, recording payment"
                );
                if let Some(submission) = state.submission.as_mut() {
                    submission.created = Some(booking.clone());
                }
            },

            BookingAction::BookingConfirmed { booking, .. } => {
                tracing::info!(
                    booking_id = %booking.id,
                    reference = %booking.booking_reference,
                    total = booking.total_amount.units(),
                    "Booking confirmed"
                );
                if let Some(map) = state.seat_map.as_mut() {
                    map.mark_booked(booking.seats.iter().map(|line| &line.seat_number));
                }
                metrics::counter!("booking.confirmed.total").increment(1);
                state.selection.reset();
                state.submission = None;
                state.confirmed = Some(booking.clone());
                state.last_error = None;
                state.notice = None;
                state.phase = BookingPhase::Confirmed;
            },

            BookingAction::SubmissionFailed { error, pending, .. } => {
                tracing::warn!(
                    %error,
                    pending_booking = pending.as_ref().map(|b| b.booking_reference.as_str()),
                    "Submission failed"
                );
                metrics::counter!("booking.submissions.failed", "kind" => failure_kind(error)).increment(1);
                if let (Some(submission), Some(created)) = (state.submission.as_mut(), pending) {
                    submission.created = Some(created.clone());
                }
                if let BookingError::SeatConflict { seats } = error {
                    if let Some(map) = state.seat_map.as_mut() {
                        map.mark_booked(seats);
                        state.selection.retain_available(map);
                    }
                }
                state.last_error = Some(error.clone());
                state.phase = BookingPhase::Failed;
            },

            BookingAction::ValidationFailed { error } => {
                tracing::debug!(%error, "Command rejected");
                if matches!(error, ValidationError::TooManySeats { .. }) {
                    state.notice = Some(error.to_string());
                }
                state.last_error = Some(error.clone().into());
            },

            // Commands are not events
            _ => {},
        }
    }

    fn fetch_movie(env: &BookingEnvironment, movie_id: &MovieId, generation: u64) -> Effect<BookingAction> {
        let request = env.catalog.fetch_movie(movie_id);
        Effect::future(async move {
            Some(match request.await {
                Ok(movie) => BookingAction::MovieLoaded { generation, movie },
                Err(error) => BookingAction::MovieLoadFailed { generation, error },
            })
        })
    }

    fn query_occupancy(env: &BookingEnvironment, showing: &Showing, generation: u64) -> Effect<BookingAction> {
        let request = env.occupancy.booked_seats(showing);
        Effect::future(async move {
            Some(match request.await {
                Ok(booked) => BookingAction::OccupancyLoaded { generation, booked },
                Err(error) => BookingAction::OccupancyFailed { generation, error },
            })
        })
    }

    fn create_booking(
        env: &BookingEnvironment,
        submission: &Submission,
        generation: u64,
    ) -> Effect<BookingAction> {
        let confirm_payment = env.confirmation == ConfirmationMode::Atomic;
        let request = env.bookings.create_booking(
            &env.session,
            CreateBooking {
                draft: submission.draft.clone(),
                idempotency_key: submission.idempotency_key,
                confirm_payment,
            },
        );
        Effect::future(async move {
            Some(match request.await {
                Ok(booking) if confirm_payment => BookingAction::BookingConfirmed { generation, booking },
                Ok(booking) => BookingAction::BookingCreated { generation, booking },
                Err(error) => BookingAction::SubmissionFailed {
                    generation,
                    error,
                    pending: None,
                },
            })
        })
    }

    fn complete_payment(env: &BookingEnvironment, booking: Booking, generation: u64) -> Effect<BookingAction> {
        let request = env.bookings.complete_payment(&env.session, &booking.id);
        Effect::future(async move {
            Some(match request.await {
                Ok(booking) => BookingAction::BookingConfirmed { generation, booking },
                Err(error) => BookingAction::SubmissionFailed {
                    generation,
                    error,
                    pending: Some(booking),
                },
            })
        })
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // Flow orchestration
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Load Movie ==========
            BookingAction::LoadMovie { movie_id } => {
                if state.phase == BookingPhase::Submitting {
                    tracing::info!("Leaving an in-flight submission; its result will be ignored");
                }
                let max_seats = state.selection.max();
                let generation = state.generation + 1;
                *state = BookingState::new(max_seats);
                state.generation = generation;
                state.movie_id = Some(movie_id.clone());
                state.loading_movie = true;

                smallvec![Self::fetch_movie(env, &movie_id, generation)]
            },

            // ========== Step 1: Choose Showtime ==========
            BookingAction::ChooseShowtime {
                theatre_index,
                showtime,
            } => {
                let showing = match state.check_showtime(theatre_index, &showtime) {
                    Ok(showing) => showing,
                    Err(error) => {
                        Self::apply_event(state, &BookingAction::ValidationFailed { error });
                        return SmallVec::new();
                    },
                };

                state.generation += 1;
                state.clear_showing();
                tracing::info!(showing = %showing.key(), "Loading seats");
                let effect = Self::query_occupancy(env, &showing, state.generation);
                state.showing = Some(showing);
                state.phase = BookingPhase::LoadingSeats;

                smallvec![effect]
            },

            // ========== Step 2: Select Seats ==========
            BookingAction::ToggleSeat { seat } => {
                let outcome = match state.seat_map.as_ref() {
                    Some(map) if state.phase.accepts_seat_changes() => state.selection.toggle(seat, map),
                    _ => ToggleOutcome::Ignored,
                };
                state.last_toggle = Some(outcome);

                match outcome {
                    ToggleOutcome::Added | ToggleOutcome::Removed => {
                        state.notice = None;
                        if state.phase == BookingPhase::Failed {
                            state.phase = BookingPhase::SelectingSeats;
                        }
                    },
                    ToggleOutcome::LimitReached => {
                        let error = ValidationError::TooManySeats {
                            max: state.selection.max(),
                        };
                        Self::apply_event(state, &BookingAction::ValidationFailed { error });
                    },
                    ToggleOutcome::Ignored => {
                        tracing::debug!(%seat, phase = ?state.phase, "Seat toggle ignored");
                    },
                }
                SmallVec::new()
            },

            BookingAction::RefreshSeatMap => match state.showing.as_ref() {
                Some(showing) if state.phase.accepts_seat_changes() => {
                    smallvec![Self::query_occupancy(env, showing, state.generation)]
                },
                _ => SmallVec::new(),
            },

            BookingAction::ChangeShowtime => match state.phase {
                BookingPhase::Submitting => {
                    Self::apply_event(
                        state,
                        &BookingAction::ValidationFailed {
                            error: ValidationError::SubmissionInProgress,
                        },
                    );
                    SmallVec::new()
                },
                BookingPhase::SelectingTheatre => SmallVec::new(),
                _ => {
                    state.generation += 1;
                    state.clear_showing();
                    state.phase = BookingPhase::SelectingTheatre;
                    SmallVec::new()
                },
            },

            // ========== Step 3: Submit ==========
            BookingAction::Submit => {
                let draft = match Self::validate_submit(state, env) {
                    Ok(draft) => draft,
                    Err(error) => {
                        Self::apply_event(state, &BookingAction::ValidationFailed { error });
                        return SmallVec::new();
                    },
                };

                let submission = match state.submission.take() {
                    Some(mut previous) if previous.draft == draft => {
                        previous.attempts += 1;
                        previous
                    },
                    previous => {
                        if let Some(orphan) = previous.and_then(|p| p.created) {
                            tracing::warn!(
                                booking_id = %orphan.id,
                                "Selection changed; leaving unpaid booking behind"
                            );
                        }
                        Submission::new(draft, env.clock.now())
                    },
                };

                let generation = state.generation;
                let effect = match submission.created.clone() {
                    // Created by an earlier attempt; only the payment is retried
                    Some(created) => Self::complete_payment(env, created, generation),
                    None => Self::create_booking(env, &submission, generation),
                };
                tracing::info!(
                    key = %submission.idempotency_key,
                    attempt = submission.attempts,
                    seats = submission.draft.seats().len(),
                    total = submission.draft.total_amount().units(),
                    "Submitting booking"
                );

                metrics::counter!("booking.submissions.total").increment(1);
                state.submission = Some(submission);
                state.last_error = None;
                state.notice = None;
                state.phase = BookingPhase::Submitting;

                smallvec![effect]
            },

            // ========== Abandon ==========
            BookingAction::Abandon => {
                if state.phase == BookingPhase::Submitting {
                    tracing::info!("Abandoning an in-flight submission; its result will be ignored");
                }
                state.generation += 1;
                state.loading_movie = false;
                state.clear_showing();
                state.phase = BookingPhase::SelectingTheatre;
                SmallVec::new()
            },

            // ========== Two-step: created, now pay ==========
            BookingAction::BookingCreated { generation, .. } if state.is_current(generation) => {
                Self::apply_event(state, &action);
                match action {
                    BookingAction::BookingCreated { booking, .. } => {
                        smallvec![Self::complete_payment(env, booking, generation)]
                    },
                    _ => SmallVec::new(),
                }
            },

            // ========== Conflict without seat list: refresh the map ==========
            BookingAction::SubmissionFailed {
                generation,
                error: BookingError::SeatConflict { ref seats },
                ..
            } if state.is_current(generation) && seats.is_empty() => {
                Self::apply_event(state, &action);
                match state.showing.as_ref() {
                    Some(showing) => {
                        tracing::info!("Conflict named no seats, refreshing seat map");
                        smallvec![Self::query_occupancy(env, showing, generation)]
                    },
                    None => SmallVec::new(),
                }
            },

            // ========== Events from effects ==========
            event => {
                if let Some(generation) = event.generation() {
                    if !state.is_current(generation) {
                        log_stale(&event, generation, state.generation);
                        return SmallVec::new();
                    }
                }
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}

const fn failure_kind(error: &BookingError) -> &'static str {
    match error {
        BookingError::Validation(_) => "validation",
        BookingError::Network { .. } => "network",
        BookingError::ServiceRejection { .. } => "rejected",
        BookingError::SeatConflict { .. } => "conflict",
        BookingError::Unauthorized => "unauthorized",
        BookingError::Decode { .. } => "decode",
    }
}

fn log_stale(event: &BookingAction, generation: u64, current: u64) {
    match event {
        BookingAction::BookingCreated { booking, .. } | BookingAction::BookingConfirmed { booking, .. } => {
            tracing::warn!(
                booking_id = %booking.id,
                generation,
                current,
                "Booking completed after the flow was abandoned"
            );
        },
        _ => {
            tracing::debug!(action = event.action_name(), generation, current, "Dropping stale result");
        },
    }
}
