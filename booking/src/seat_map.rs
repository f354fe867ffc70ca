//! Seat map generation.
//!
//! A showing has a fixed 10 × 10 grid. Rows A-C are VIP, D-F Premium and
//! G-J Regular; prices derive from the theatre's base price. Booked seats come
//! from an [`OccupancySource`](crate::occupancy::OccupancySource), never from
//! the map itself.

use crate::error::ValidationError;
use crate::types::{Price, ROW_LETTERS, SEATS_PER_ROW, SeatLine, SeatNumber, Tier};
use serde::Serialize;
use std::collections::HashMap;

/// One seat of a showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    /// Seat label
    pub seat_number: SeatNumber,
    /// Tier
    #[serde(rename = "type")]
    pub tier: Tier,
    /// Price for this seat
    pub price: Price,
    /// Taken by another booking
    pub is_booked: bool,
}

impl Seat {
    /// Copies this seat onto a booking line
    #[must_use]
    pub const fn line(&self) -> SeatLine {
        SeatLine {
            seat_number: self.seat_number,
            tier: self.tier,
            price: self.price,
        }
    }
}

/// All seats of a showing, row-major, indexed by seat number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    base_price: Price,
    seats: Vec<Seat>,
    index: HashMap<SeatNumber, usize>,
}

impl SeatMap {
    /// Total seats in a map
    pub const CAPACITY: usize = ROW_LETTERS.len() * SEATS_PER_ROW as usize;

    /// Builds the map for `base_price`, marking `booked` seats as taken
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidBasePrice`] for a zero base price or one above [`Price::MAX_BASE`].
    pub fn generate<'a>(
        base_price: Price,
        booked: impl IntoIterator<Item = &'a SeatNumber>,
    ) -> Result<Self, ValidationError> {
        if !base_price.is_valid_base() {
            return Err(ValidationError::InvalidBasePrice);
        }

        let mut seats = Vec::with_capacity(Self::CAPACITY);
        let mut index = HashMap::with_capacity(Self::CAPACITY);

        for row_index in 0..ROW_LETTERS.len() {
            let tier = Tier::for_row(row_index);
            let price = tier.price(base_price);
            for column in 1..=SEATS_PER_ROW {
                let Some(seat_number) = SeatNumber::from_position(row_index, column) else {
                    continue;
                };
                index.insert(seat_number, seats.len());
                seats.push(Seat {
                    seat_number,
                    tier,
                    price,
                    is_booked: false,
                });
            }
        }

        let mut map = Self {
            base_price,
            seats,
            index,
        };
        map.mark_booked(booked);
        Ok(map)
    }

    /// Marks seats as booked, returning how many changed
    ///
    /// Used when occupancy arrives and when the service reports a conflict.
    pub fn mark_booked<'a>(&mut self, seats: impl IntoIterator<Item = &'a SeatNumber>) -> usize {
        let mut changed = 0;
        for seat_number in seats {
            if let Some(&position) = self.index.get(seat_number) {
                let seat = &mut self.seats[position];
                if !seat.is_booked {
                    seat.is_booked = true;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Seat by label
    #[must_use]
    pub fn get(&self, seat_number: SeatNumber) -> Option<&Seat> {
        self.index.get(&seat_number).map(|&position| &self.seats[position])
    }

    /// True if the seat exists and is free
    #[must_use]
    pub fn is_available(&self, seat_number: SeatNumber) -> bool {
        self.get(seat_number).is_some_and(|seat| !seat.is_booked)
    }

    /// All seats, row-major
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Seats grouped by row, front to back
    pub fn rows(&self) -> impl Iterator<Item = (char, &[Seat])> {
        ROW_LETTERS
            .iter()
            .copied()
            .zip(self.seats.chunks(usize::from(SEATS_PER_ROW)))
    }

    /// Base (Regular tier) price the map was built from
    #[must_use]
    pub const fn base_price(&self) -> Price {
        self.base_price
    }

    /// Number of free seats
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.seats.iter().filter(|seat| !seat.is_booked).count()
    }

    /// Seats currently booked
    pub fn booked(&self) -> impl Iterator<Item = SeatNumber> + '_ {
        self.seats
            .iter()
            .filter(|seat| seat.is_booked)
            .map(|seat| seat.seat_number)
    }

    /// Number of seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// True for an empty map; generated maps never are
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// Price legend for a base price, most expensive tier first
#[must_use]
pub fn tier_prices(base_price: Price) -> [(Tier, Price); 3] {
    Tier::all().map(|tier| (tier, tier.price(base_price)))
}
