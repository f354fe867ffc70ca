//! Client-assembled booking payload.

use crate::error::ValidationError;
use crate::types::{MovieId, PaymentMethod, Price, SeatLine, Showing, ShowtimeSlot, TheatreRef};
use serde::Serialize;

/// A booking that has not been persisted yet
///
/// Built once through [`BookingDraft::new`]; the total always equals the sum
/// of the seat prices and there is at least one seat. Serializes to the body
/// of `POST /api/bookings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    movie_id: MovieId,
    theatre: TheatreRef,
    showtime: ShowtimeSlot,
    seats: Vec<SeatLine>,
    total_amount: Price,
    payment_method: PaymentMethod,
}

impl BookingDraft {
    /// Assembles a draft for `seats` at `showing`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySelection`] when `seats` is empty.
    pub fn new(
        movie_id: MovieId,
        showing: &Showing,
        seats: Vec<SeatLine>,
        payment_method: PaymentMethod,
    ) -> Result<Self, ValidationError> {
        if seats.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        let total_amount = seats.iter().map(|line| line.price).sum();

        Ok(Self {
            movie_id,
            theatre: TheatreRef {
                name: showing.theatre.name.clone(),
                location: showing.theatre.location.clone(),
            },
            showtime: ShowtimeSlot {
                date: showing.theatre.date,
                time: showing.showtime.clone(),
            },
            seats,
            total_amount,
            payment_method,
        })
    }

    /// Movie being booked
    #[must_use]
    pub const fn movie_id(&self) -> &MovieId {
        &self.movie_id
    }

    /// Theatre name and location
    #[must_use]
    pub const fn theatre(&self) -> &TheatreRef {
        &self.theatre
    }

    /// Date and time of the showing
    #[must_use]
    pub const fn showtime(&self) -> &ShowtimeSlot {
        &self.showtime
    }

    /// Seat lines in selection order
    #[must_use]
    pub fn seats(&self) -> &[SeatLine] {
        &self.seats
    }

    /// Sum of the seat prices
    #[must_use]
    pub const fn total_amount(&self) -> Price {
        self.total_amount
    }

    /// Payment method
    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }
}
