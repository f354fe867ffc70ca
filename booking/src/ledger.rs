//! The customer's persisted bookings.
//!
//! [`BookingLedger`] is the view model behind the booking list and detail
//! screens. Mutations go through the Booking Service and the ledger entry is
//! replaced with whatever the service returns.

use crate::error::{BookingError, BookingResult, Operation, ValidationError};
use crate::service::BookingService;
use crate::session::Session;
use crate::types::{Booking, BookingId, BookingStatus};
use chrono::{DateTime, Utc};

/// Which bookings a list shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingFilter {
    /// Every booking
    #[default]
    All,
    /// Only bookings with this status
    Status(BookingStatus),
}

impl BookingFilter {
    /// True when `booking` passes the filter
    #[must_use]
    pub fn matches(self, booking: &Booking) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => booking.status == status,
        }
    }
}

/// True for confirmed bookings whose showing date has not started yet
#[must_use]
pub fn can_cancel(booking: &Booking, now: DateTime<Utc>) -> bool {
    booking.status == BookingStatus::Confirmed && booking.showtime_start() >= now
}

/// Loaded bookings plus the last user-facing error
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingLedger {
    bookings: Vec<Booking>,
    error: Option<String>,
}

impl BookingLedger {
    /// Ledger over already-loaded bookings
    #[must_use]
    pub const fn new(bookings: Vec<Booking>) -> Self {
        Self {
            bookings,
            error: None,
        }
    }

    /// Lists the session's bookings
    ///
    /// # Errors
    ///
    /// The list call's failure; `Unauthorized` for an anonymous session.
    #[tracing::instrument(skip_all)]
    pub async fn load(service: &dyn BookingService, session: &Session) -> BookingResult<Self> {
        let bookings = service.list_bookings(session).await.map_err(|error| {
            tracing::warn!(%error, "Failed to list bookings");
            error
        })?;
        tracing::debug!(count = bookings.len(), "Bookings loaded");
        Ok(Self::new(bookings))
    }

    /// Bookings in service order
    #[must_use]
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Bookings passing `filter`
    pub fn filtered(&self, filter: BookingFilter) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(move |b| filter.matches(b))
    }

    /// Number of bookings with `status`
    #[must_use]
    pub fn count(&self, status: BookingStatus) -> usize {
        self.filtered(BookingFilter::Status(status)).count()
    }

    /// Booking by id
    #[must_use]
    pub fn get(&self, booking_id: &BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| &b.id == booking_id)
    }

    /// Number of loaded bookings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    /// True when nothing is loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Message of the last failed operation
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the entry with the same id, or appends a new one
    pub fn apply(&mut self, booking: Booking) {
        match self.bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(entry) => *entry = booking,
            None => self.bookings.push(booking),
        }
    }

    /// Cancels a booking and stores the service's result
    ///
    /// The ledger stays usable after a failure; [`BookingLedger::error`]
    /// holds the message to show.
    ///
    /// # Errors
    ///
    /// Without a request: [`ValidationError::BookingNotFound`] for an id the
    /// ledger does not hold, [`ValidationError::NotCancellable`] when the
    /// booking is not confirmed or its showing has started. Otherwise the
    /// service's failure.
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn cancel(
        &mut self,
        service: &dyn BookingService,
        session: &Session,
        booking_id: &BookingId,
        now: DateTime<Utc>,
    ) -> BookingResult<&Booking> {
        let local = match self.get(booking_id) {
            None => Some(ValidationError::BookingNotFound),
            Some(booking) if !can_cancel(booking, now) => Some(ValidationError::NotCancellable),
            Some(_) => None,
        };
        if let Some(error) = local {
            return Err(self.fail(error.into(), Operation::CancelBooking));
        }

        match service.cancel_booking(session, booking_id).await {
            Ok(booking) => {
                tracing::info!(
                    reference = %booking.booking_reference,
                    status = %booking.status,
                    payment = ?booking.payment_status,
                    "Booking cancelled"
                );
                self.error = None;
                let id = booking.id.clone();
                self.apply(booking);
                self.get(&id)
                    .ok_or_else(|| BookingError::decode("cancelled booking missing from ledger"))
            },
            Err(error) => Err(self.fail(error, Operation::CancelBooking)),
        }
    }

    fn fail(&mut self, error: BookingError, operation: Operation) -> BookingError {
        tracing::warn!(%error, ?operation, "Ledger operation failed");
        self.error = Some(error.user_message(operation));
        error
    }
}

/// Fetches one booking for the detail view
///
/// # Errors
///
/// The service's failure; its [`BookingError::user_message`] for
/// [`Operation::FetchBooking`] reads "Booking not found" when the service
/// gives no reason.
#[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
pub async fn fetch_detail(
    service: &dyn BookingService,
    session: &Session,
    booking_id: &BookingId,
) -> BookingResult<Booking> {
    service.fetch_booking(session, booking_id).await
}
