//! In-process Booking Service.
//!
//! A working backend kept in memory: movies, bookings, occupancy derived from
//! active bookings, seat conflicts, idempotent creates and cancellation. Every
//! call is recorded and failures can be scripted per call kind, which makes it
//! the backend of choice for flow tests and the CLI's offline mode.

use super::{BookingService, CreateBooking, MovieCatalog, ServiceFuture};
use crate::error::{BookingError, BookingResult};
use crate::occupancy::{OccupancySource, SeededOccupancy};
use crate::session::Session;
use crate::types::{
    Booking, BookingId, BookingStatus, IdempotencyKey, Movie, MovieId, MovieRef, MovieSummary,
    PaymentStatus, Price, SeatNumber, Showing, ShowtimeSlot, Theatre, TheatreRef,
};
use chrono::NaiveDate;
use marquee_core::environment::{Clock, SystemClock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Kind of service call, used to script failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `fetch_movie`
    FetchMovie,
    /// `booked_seats`
    BookedSeats,
    /// `create_booking`
    CreateBooking,
    /// `complete_payment`
    CompletePayment,
    /// `fetch_booking`
    FetchBooking,
    /// `list_bookings`
    ListBookings,
    /// `cancel_booking`
    CancelBooking,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// Movie lookup
    FetchMovie(MovieId),
    /// Occupancy query, by showing key
    BookedSeats(String),
    /// Booking creation
    CreateBooking {
        /// Key sent with the request
        idempotency_key: IdempotencyKey,
        /// Payment recorded in the same request
        confirm_payment: bool,
        /// Requested seats
        seats: Vec<SeatNumber>,
    },
    /// Payment completion
    CompletePayment(BookingId),
    /// Booking lookup
    FetchBooking(BookingId),
    /// Booking list
    ListBookings,
    /// Cancellation
    CancelBooking(BookingId),
}

impl ServiceCall {
    /// Kind of this call
    #[must_use]
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::FetchMovie(_) => CallKind::FetchMovie,
            Self::BookedSeats(_) => CallKind::BookedSeats,
            Self::CreateBooking { .. } => CallKind::CreateBooking,
            Self::CompletePayment(_) => CallKind::CompletePayment,
            Self::FetchBooking(_) => CallKind::FetchBooking,
            Self::ListBookings => CallKind::ListBookings,
            Self::CancelBooking(_) => CallKind::CancelBooking,
        }
    }
}

#[derive(Default)]
struct Backend {
    movies: HashMap<MovieId, Movie>,
    bookings: Vec<Booking>,
    by_key: HashMap<IdempotencyKey, BookingId>,
    taken: HashMap<String, HashSet<SeatNumber>>,
    seeded: Option<SeededOccupancy>,
    scripted: HashMap<CallKind, VecDeque<BookingError>>,
    calls: Vec<ServiceCall>,
    next_id: u64,
}

impl Backend {
    fn record(&mut self, call: ServiceCall) -> BookingResult<()> {
        let kind = call.kind();
        self.calls.push(call);
        match self.scripted.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => {
                tracing::debug!(?kind, %error, "Scripted failure");
                Err(error)
            },
            None => Ok(()),
        }
    }

    fn occupied(&self, key: &str) -> HashSet<SeatNumber> {
        let mut occupied: HashSet<SeatNumber> = self
            .bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
            .filter(|b| slot_key(&b.theatre, &b.showtime) == key)
            .flat_map(Booking::seat_numbers)
            .collect();
        if let Some(extra) = self.taken.get(key) {
            occupied.extend(extra.iter().copied());
        }
        if let Some(seeded) = &self.seeded {
            occupied.extend(seeded.pattern_for_key(key));
        }
        occupied
    }

    fn booking_mut(&mut self, id: &BookingId) -> BookingResult<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| rejection(404, "Booking not found"))
    }

    fn create(&mut self, request: &CreateBooking, now: chrono::DateTime<chrono::Utc>) -> BookingResult<Booking> {
        if let Some(id) = self.by_key.get(&request.idempotency_key).cloned() {
            tracing::debug!(booking_id = %id, "Replaying idempotent create");
            let confirm = request.confirm_payment;
            let booking = self.booking_mut(&id)?;
            if confirm && booking.payment_status == PaymentStatus::Pending {
                booking.payment_status = PaymentStatus::Completed;
            }
            return Ok(booking.clone());
        }

        let draft = &request.draft;
        let key = slot_key(draft.theatre(), draft.showtime());
        let occupied = self.occupied(&key);
        let mut conflicting: Vec<SeatNumber> = draft
            .seats()
            .iter()
            .map(|line| line.seat_number)
            .filter(|seat| occupied.contains(seat))
            .collect();
        if !conflicting.is_empty() {
            conflicting.sort();
            return Err(BookingError::SeatConflict { seats: conflicting });
        }

        self.next_id += 1;
        let id = BookingId::new(format!("bk-{:04}", self.next_id));
        let movie = self.movies.get(draft.movie_id()).map_or_else(
            || MovieRef::Id(draft.movie_id().clone()),
            |movie| {
                MovieRef::Summary(MovieSummary {
                    id: movie.id.clone(),
                    title: movie.title.clone(),
                    poster: movie.poster.clone(),
                    duration: movie.duration.clone(),
                    language: movie.language.clone(),
                })
            },
        );
        let booking = Booking {
            id: id.clone(),
            booking_reference: format!("BK{:06}", self.next_id),
            user: None,
            movie,
            theatre: draft.theatre().clone(),
            showtime: draft.showtime().clone(),
            seats: draft.seats().to_vec(),
            total_amount: draft.total_amount(),
            payment_method: draft.payment_method(),
            payment_status: if request.confirm_payment {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Pending
            },
            status: BookingStatus::Confirmed,
            booking_date: Some(now),
            created_at: Some(now),
        };

        self.by_key.insert(request.idempotency_key, id);
        self.bookings.push(booking.clone());
        Ok(booking)
    }
}

/// Booking Service and Movie Catalog kept in memory
///
/// Clones share the same backend.
#[derive(Clone)]
pub struct InMemoryBookingService {
    backend: Arc<Mutex<Backend>>,
    clock: Arc<dyn Clock>,
    latency: Duration,
}

impl InMemoryBookingService {
    /// Empty service with no latency
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend::default())),
            clock: Arc::new(SystemClock),
            latency: Duration::ZERO,
        }
    }

    /// Service preloaded with [`sample_movie`], seeded occupancy and no latency
    #[must_use]
    pub fn demo(date: NaiveDate) -> Self {
        Self::new()
            .with_movie(sample_movie(date))
            .with_seeded_occupancy(SeededOccupancy::default())
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Adds a movie to the catalog
    #[must_use]
    pub fn with_movie(self, movie: Movie) -> Self {
        self.add_movie(movie);
        self
    }

    /// Adds a seeded pattern on top of booked seats
    #[must_use]
    pub fn with_seeded_occupancy(self, seeded: SeededOccupancy) -> Self {
        self.lock().seeded = Some(seeded);
        self
    }

    /// Delays every call by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Stamps bookings with `clock`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds a movie to the catalog
    pub fn add_movie(&self, movie: Movie) {
        self.lock().movies.insert(movie.id.clone(), movie);
    }

    /// Stores an existing booking as-is
    pub fn insert_booking(&self, booking: Booking) {
        self.lock().bookings.push(booking);
    }

    /// Marks seats taken as if another customer had booked them
    pub fn take_seats(&self, showing: &Showing, seats: &[SeatNumber]) {
        self.lock()
            .taken
            .entry(showing.key())
            .or_default()
            .extend(seats.iter().copied());
    }

    /// Fails the next call of `kind` with `error`
    ///
    /// Scripted failures queue up; each is used once.
    pub fn fail_next(&self, kind: CallKind, error: BookingError) {
        self.lock().scripted.entry(kind).or_default().push_back(error);
    }

    /// Every call received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of `kind` received so far
    #[must_use]
    pub fn call_count(&self, kind: CallKind) -> usize {
        self.lock().calls.iter().filter(|c| c.kind() == kind).count()
    }

    /// Snapshot of all stored bookings
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().bookings.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` against the backend after the configured latency
    fn call<T, F>(&self, op: F) -> ServiceFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Backend, &dyn Clock) -> BookingResult<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let clock = Arc::clone(&self.clock);
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut *backend, clock.as_ref())
        })
    }
}

impl Default for InMemoryBookingService {
    fn default() -> Self {
        Self::new()
    }
}

impl MovieCatalog for InMemoryBookingService {
    fn fetch_movie(&self, movie_id: &MovieId) -> ServiceFuture<Movie> {
        let movie_id = movie_id.clone();
        self.call(move |backend, _| {
            backend.record(ServiceCall::FetchMovie(movie_id.clone()))?;
            backend
                .movies
                .get(&movie_id)
                .cloned()
                .ok_or_else(|| rejection(404, "Movie not found"))
        })
    }
}

impl OccupancySource for InMemoryBookingService {
    fn booked_seats(&self, showing: &Showing) -> ServiceFuture<Vec<SeatNumber>> {
        let key = showing.key();
        self.call(move |backend, _| {
            backend.record(ServiceCall::BookedSeats(key.clone()))?;
            let mut seats: Vec<SeatNumber> = backend.occupied(&key).into_iter().collect();
            seats.sort();
            Ok(seats)
        })
    }
}

impl BookingService for InMemoryBookingService {
    fn create_booking(&self, session: &Session, request: CreateBooking) -> ServiceFuture<Booking> {
        let authorized = session.is_authenticated();
        self.call(move |backend, clock| {
            backend.record(ServiceCall::CreateBooking {
                idempotency_key: request.idempotency_key,
                confirm_payment: request.confirm_payment,
                seats: request.draft.seats().iter().map(|l| l.seat_number).collect(),
            })?;
            require(authorized)?;
            let booking = backend.create(&request, clock.now())?;
            tracing::info!(
                booking_id = %booking.id,
                reference = %booking.booking_reference,
                total = booking.total_amount.units(),
                "In-memory booking created"
            );
            Ok(booking)
        })
    }

    fn complete_payment(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        let authorized = session.is_authenticated();
        let id = booking_id.clone();
        self.call(move |backend, _| {
            backend.record(ServiceCall::CompletePayment(id.clone()))?;
            require(authorized)?;
            let booking = backend.booking_mut(&id)?;
            if booking.status == BookingStatus::Cancelled {
                return Err(rejection(400, "Booking is cancelled"));
            }
            booking.payment_status = PaymentStatus::Completed;
            Ok(booking.clone())
        })
    }

    fn fetch_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        let authorized = session.is_authenticated();
        let id = booking_id.clone();
        self.call(move |backend, _| {
            backend.record(ServiceCall::FetchBooking(id.clone()))?;
            require(authorized)?;
            backend.booking_mut(&id).map(|booking| booking.clone())
        })
    }

    fn list_bookings(&self, session: &Session) -> ServiceFuture<Vec<Booking>> {
        let authorized = session.is_authenticated();
        self.call(move |backend, _| {
            backend.record(ServiceCall::ListBookings)?;
            require(authorized)?;
            // Newest first, like the service.
            Ok(backend.bookings.iter().rev().cloned().collect())
        })
    }

    fn cancel_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        let authorized = session.is_authenticated();
        let id = booking_id.clone();
        self.call(move |backend, _| {
            backend.record(ServiceCall::CancelBooking(id.clone()))?;
            require(authorized)?;
            let booking = backend.booking_mut(&id)?;
            if booking.status != BookingStatus::Confirmed {
                return Err(rejection(400, "Booking cannot be cancelled"));
            }
            booking.status = BookingStatus::Cancelled;
            if booking.payment_status == PaymentStatus::Completed {
                booking.payment_status = PaymentStatus::Refunded;
            }
            Ok(booking.clone())
        })
    }
}

/// A movie with two theatres on `date`, for demos and tests
#[must_use]
pub fn sample_movie(date: NaiveDate) -> Movie {
    Movie {
        id: MovieId::new("demo-interstellar"),
        title: "Interstellar".to_string(),
        poster: None,
        duration: Some("2h 49m".to_string()),
        rating: Some("8.7".to_string()),
        language: Some("English".to_string()),
        theatres: vec![
            Theatre {
                name: "PVR Phoenix".to_string(),
                location: "Lower Parel".to_string(),
                date,
                showtimes: vec!["10:00 AM".to_string(), "6:30 PM".to_string()],
                price: Price::from_units(500),
            },
            Theatre {
                name: "INOX".to_string(),
                location: "Nariman Point".to_string(),
                date,
                showtimes: vec!["1:15 PM".to_string(), "9:45 PM".to_string()],
                price: Price::from_units(350),
            },
        ],
    }
}

fn slot_key(theatre: &TheatreRef, showtime: &ShowtimeSlot) -> String {
    format!("{}|{}|{}|{}", theatre.name, theatre.location, showtime.date, showtime.time)
}

fn rejection(status: u16, message: &str) -> BookingError {
    BookingError::ServiceRejection {
        status,
        message: Some(message.to_string()),
    }
}

fn require(authorized: bool) -> BookingResult<()> {
    if authorized {
        Ok(())
    } else {
        Err(BookingError::Unauthorized)
    }
}
