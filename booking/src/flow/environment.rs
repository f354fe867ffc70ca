//! Dependencies of the booking flow.

use crate::config::{Config, ConfirmationMode, OccupancyMode};
use crate::error::BookingResult;
use crate::occupancy::{OccupancySource, SeededOccupancy};
use crate::service::{BookingService, HttpBookingClient, InMemoryBookingService, MovieCatalog};
use crate::session::Session;
use crate::types::PaymentMethod;
use marquee_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Environment dependencies for the booking reducer
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Movie and theatre listings
    pub catalog: Arc<dyn MovieCatalog>,
    /// Booking persistence and payment status
    pub bookings: Arc<dyn BookingService>,
    /// Booked seats per showing
    pub occupancy: Arc<dyn OccupancySource>,
    /// Credentials for booking calls
    pub session: Session,
    /// Clock for submission timestamps
    pub clock: Arc<dyn Clock>,
    /// How submissions are confirmed
    pub confirmation: ConfirmationMode,
    /// Payment method sent with drafts
    pub payment_method: PaymentMethod,
}

impl BookingEnvironment {
    /// Creates an environment with atomic confirmation and card payment
    #[must_use]
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        bookings: Arc<dyn BookingService>,
        occupancy: Arc<dyn OccupancySource>,
        session: Session,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            bookings,
            occupancy,
            session,
            clock,
            confirmation: ConfirmationMode::Atomic,
            payment_method: PaymentMethod::Card,
        }
    }

    /// Production environment talking to the configured Booking Service
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> BookingResult<Self> {
        let client = Arc::new(HttpBookingClient::from_config(config)?);
        let occupancy: Arc<dyn OccupancySource> = match config.booking.occupancy {
            OccupancyMode::Service => client.clone(),
            OccupancyMode::Seeded => Arc::new(SeededOccupancy::new(config.booking.demo_booked_ratio)),
        };
        let session = config
            .api
            .auth_token
            .as_ref()
            .map_or_else(Session::anonymous, Session::with_token);

        Ok(Self::new(client.clone(), client, occupancy, session, Arc::new(SystemClock))
            .configured(config))
    }

    /// Environment backed entirely by an in-memory service
    #[must_use]
    pub fn in_memory(service: &Arc<InMemoryBookingService>, session: Session) -> Self {
        Self::new(
            service.clone(),
            service.clone(),
            service.clone(),
            session,
            Arc::new(SystemClock),
        )
    }

    /// Applies the confirmation mode and payment method from `config`
    #[must_use]
    pub fn configured(self, config: &Config) -> Self {
        self.with_confirmation(config.booking.confirmation)
            .with_payment_method(config.booking.payment_method)
    }

    /// Sets the confirmation mode
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: ConfirmationMode) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Sets the payment method
    #[must_use]
    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    /// Replaces the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
