//! Booking Service clients.
//!
//! The engine talks to two remote collaborators: the Movie Catalog (movie and
//! theatre listings) and the Booking Service (bookings, payment status and
//! seat occupancy). Both are traits so the flow can run against
//! [`HttpBookingClient`] in production and [`InMemoryBookingService`] in tests
//! and offline demos.

mod http;
mod memory;

pub use http::HttpBookingClient;
pub use memory::{sample_movie, CallKind, InMemoryBookingService, ServiceCall};

use crate::draft::BookingDraft;
use crate::error::BookingResult;
use crate::session::Session;
use crate::types::{Booking, BookingId, IdempotencyKey, Movie, MovieId};
use futures::future::BoxFuture;

/// Boxed future returned by every service call
pub type ServiceFuture<T> = BoxFuture<'static, BookingResult<T>>;

/// A request to persist a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBooking {
    /// Payload
    pub draft: BookingDraft,
    /// Lets the service collapse retries of the same draft
    pub idempotency_key: IdempotencyKey,
    /// Ask the service to record the payment in the same request
    pub confirm_payment: bool,
}

/// Movie and theatre listings
pub trait MovieCatalog: Send + Sync {
    /// Fetches a movie with the theatres showing it
    ///
    /// # Errors
    ///
    /// [`BookingError::ServiceRejection`](crate::error::BookingError) for an
    /// unknown movie; transport failures as `Network`.
    fn fetch_movie(&self, movie_id: &MovieId) -> ServiceFuture<Movie>;
}

/// Persisted bookings
///
/// Every call requires an authenticated [`Session`].
pub trait BookingService: Send + Sync {
    /// Persists a draft
    ///
    /// # Errors
    ///
    /// `SeatConflict` when some seats were taken in the meantime.
    fn create_booking(&self, session: &Session, request: CreateBooking) -> ServiceFuture<Booking>;

    /// Marks a created booking as paid
    ///
    /// # Errors
    ///
    /// `ServiceRejection` when the payment is refused.
    fn complete_payment(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking>;

    /// Fetches one booking
    ///
    /// # Errors
    ///
    /// `ServiceRejection` for an unknown booking.
    fn fetch_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking>;

    /// Lists the session's bookings
    ///
    /// # Errors
    ///
    /// `Unauthorized` without credentials.
    fn list_bookings(&self, session: &Session) -> ServiceFuture<Vec<Booking>>;

    /// Cancels a booking, returning it with status `Cancelled`
    ///
    /// # Errors
    ///
    /// `ServiceRejection` when the service refuses.
    fn cancel_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking>;
}
