//! Async facade over the booking store.

use crate::config::Config;
use crate::error::{BookingError, BookingResult, ValidationError};
use crate::flow::{BookingAction, BookingEnvironment, BookingPhase, BookingReducer, BookingState};
use crate::selection::ToggleOutcome;
use crate::types::{Booking, Movie, MovieId, SeatNumber};
use marquee_runtime::{Store, StoreError};
use std::time::Duration;
use tokio::sync::broadcast;

/// Store running the booking reducer
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// One customer's booking session
///
/// Each operation sends a command to the store and, when the command starts
/// I/O, waits for the matching result event. Results are already reduced
/// when an operation returns, so [`BookingFlow::snapshot`] reflects them.
/// Operations are meant to be called one at a time.
#[derive(Clone)]
pub struct BookingFlow {
    store: BookingStore,
    wait_timeout: Duration,
}

impl BookingFlow {
    /// Creates a flow allowing `max_seats` per booking
    #[must_use]
    pub fn new(environment: BookingEnvironment, max_seats: usize, wait_timeout: Duration) -> Self {
        Self {
            store: Store::new(BookingState::new(max_seats), BookingReducer::new(), environment),
            wait_timeout,
        }
    }

    /// Creates a flow with limits from `config`
    #[must_use]
    pub fn with_config(config: &Config, environment: BookingEnvironment) -> Self {
        Self::new(
            environment.configured(config),
            config.booking.max_seats,
            config.flow_wait_timeout(),
        )
    }

    /// Creates a flow against the configured Booking Service
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be built.
    pub fn connect(config: &Config) -> BookingResult<Self> {
        Ok(Self::with_config(config, BookingEnvironment::from_config(config)?))
    }

    /// Loads a movie with its theatres, starting a new flow
    ///
    /// # Errors
    ///
    /// The catalog's failure.
    pub async fn load_movie(&self, movie_id: MovieId) -> BookingResult<Movie> {
        let generation = self.generation().await + 1;
        let result = self
            .send_and_wait(BookingAction::LoadMovie { movie_id }, move |a| {
                a.is_movie_result(generation)
            })
            .await?;

        match result {
            BookingAction::MovieLoaded { movie, .. } => Ok(movie),
            BookingAction::MovieLoadFailed { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Opens the seat map for a theatre's showtime
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] for an unknown theatre or showtime (no request is
    /// made), or the occupancy query's failure.
    pub async fn choose_showtime(
        &self,
        theatre_index: usize,
        showtime: impl Into<String>,
    ) -> BookingResult<()> {
        let showtime = showtime.into();
        let (check, generation) = self
            .store
            .state(|s| (s.check_showtime(theatre_index, &showtime).map(|_| ()), s.generation))
            .await;
        let command = BookingAction::ChooseShowtime {
            theatre_index,
            showtime,
        };
        if let Err(error) = check {
            self.send(command).await?;
            return Err(error.into());
        }

        let next = generation + 1;
        match self
            .send_and_wait(command, move |a| a.is_occupancy_result(next))
            .await?
        {
            BookingAction::OccupancyFailed { error, .. } => Err(error),
            _ => self.seat_map_outcome().await,
        }
    }

    /// Goes back to theatre selection, discarding map and selection
    ///
    /// # Errors
    ///
    /// [`ValidationError::SubmissionInProgress`] while submitting.
    pub async fn change_showtime(&self) -> BookingResult<()> {
        let submitting = self.phase().await == BookingPhase::Submitting;
        self.send(BookingAction::ChangeShowtime).await?;
        if submitting {
            return Err(ValidationError::SubmissionInProgress.into());
        }
        Ok(())
    }

    /// Selects or deselects a seat
    ///
    /// # Errors
    ///
    /// Only if the store is shutting down.
    pub async fn toggle_seat(&self, seat: SeatNumber) -> BookingResult<ToggleOutcome> {
        self.send(BookingAction::ToggleSeat { seat }).await?;
        Ok(self
            .store
            .state(|s| s.last_toggle.unwrap_or(ToggleOutcome::Ignored))
            .await)
    }

    /// Re-queries occupancy, keeping selected seats that are still free
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoActiveShowing`] outside seat selection, or the
    /// occupancy query's failure.
    pub async fn refresh_seat_map(&self) -> BookingResult<()> {
        let (ready, generation) = self
            .store
            .state(|s| (s.phase.accepts_seat_changes() && s.showing.is_some(), s.generation))
            .await;
        if !ready {
            return Err(ValidationError::NoActiveShowing.into());
        }

        match self
            .send_and_wait(BookingAction::RefreshSeatMap, move |a| {
                a.is_occupancy_result(generation)
            })
            .await?
        {
            BookingAction::OccupancyFailed { error, .. } => Err(error),
            _ => Ok(()),
        }
    }

    /// Submits the selection and waits for the outcome
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] when the selection cannot be submitted (no
    /// request is made); otherwise the Booking Service's failure. The flow is
    /// left in [`BookingPhase::Failed`] and can be retried.
    pub async fn submit(&self) -> BookingResult<Booking> {
        let (check, generation) = self
            .store
            .state(|s| (s.check_submittable(), s.generation))
            .await;
        if let Err(error) = check {
            self.send(BookingAction::Submit).await?;
            return Err(error.into());
        }

        let result = self
            .send_and_wait(BookingAction::Submit, move |a| {
                a.is_submission_result(generation)
            })
            .await?;

        match result {
            BookingAction::BookingConfirmed { booking, .. } => Ok(booking),
            BookingAction::SubmissionFailed { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Leaves the flow; results still in flight are ignored
    ///
    /// # Errors
    ///
    /// Only if the store is shutting down.
    pub async fn abandon(&self) -> BookingResult<()> {
        self.send(BookingAction::Abandon).await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> BookingState {
        self.store.state(Clone::clone).await
    }

    /// Reads the current state through a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&BookingState) -> T,
    {
        self.store.state(f).await
    }

    /// Current phase
    pub async fn phase(&self) -> BookingPhase {
        self.store.state(|s| s.phase).await
    }

    /// Subscribes to result events as they are reduced
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookingAction> {
        self.store.subscribe_actions()
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &BookingStore {
        &self.store
    }

    /// Stops accepting commands and waits for in-flight requests
    ///
    /// # Errors
    ///
    /// Returns a network error if requests are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> BookingResult<()> {
        self.store.shutdown(timeout).await.map_err(store_error)
    }

    async fn generation(&self) -> u64 {
        self.store.state(|s| s.generation).await
    }

    async fn seat_map_outcome(&self) -> BookingResult<()> {
        self.store
            .state(|s| match (s.phase, &s.last_error) {
                (BookingPhase::SelectingSeats, _) => Ok(()),
                (_, Some(error)) => Err(error.clone()),
                _ => Err(ValidationError::NoActiveShowing.into()),
            })
            .await
    }

    async fn send(&self, action: BookingAction) -> BookingResult<()> {
        self.store.send(action).await.map(|_| ()).map_err(store_error)
    }

    async fn send_and_wait<F>(&self, action: BookingAction, predicate: F) -> BookingResult<BookingAction>
    where
        F: Fn(&BookingAction) -> bool,
    {
        self.store
            .send_and_wait_for(action, predicate, self.wait_timeout)
            .await
            .map_err(store_error)
    }
}

fn store_error(error: StoreError) -> BookingError {
    match error {
        StoreError::Timeout => BookingError::network("timed out waiting for the Booking Service"),
        other => BookingError::network(other),
    }
}

fn unexpected(action: &BookingAction) -> BookingError {
    BookingError::network(format!("unexpected result {}", action.action_name()))
}
