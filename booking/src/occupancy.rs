//! Where booked seats come from.
//!
//! Seat maps never invent occupancy. Production asks the Booking Service;
//! demos use [`SeededOccupancy`], which derives a fixed pattern from the
//! showing so the same showing always looks the same.

use crate::service::ServiceFuture;
use crate::types::{SeatNumber, Showing, ROW_LETTERS, SEATS_PER_ROW};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Answers which seats of a showing are already taken
pub trait OccupancySource: Send + Sync {
    /// Booked seats for `showing`
    ///
    /// # Errors
    ///
    /// Service-backed sources fail like any other Booking Service call.
    fn booked_seats(&self, showing: &Showing) -> ServiceFuture<Vec<SeatNumber>>;
}

/// Deterministic pseudo-random occupancy for demos
#[derive(Debug, Clone, Copy)]
pub struct SeededOccupancy {
    ratio: f64,
}

impl SeededOccupancy {
    /// Default share of booked seats
    pub const DEFAULT_RATIO: f64 = 0.3;

    /// Books each seat with probability `ratio` (clamped to `[0, 1]`)
    #[must_use]
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { Self::DEFAULT_RATIO };
        Self { ratio }
    }

    /// The fixed pattern for a showing
    #[must_use]
    pub fn pattern(&self, showing: &Showing) -> Vec<SeatNumber> {
        self.pattern_for_key(&showing.key())
    }

    /// The fixed pattern for a showing key (see [`Showing::key`])
    #[must_use]
    pub fn pattern_for_key(&self, key: &str) -> Vec<SeatNumber> {
        let mut rng = StdRng::seed_from_u64(stable_seed(key));
        let mut booked = Vec::new();
        for row_index in 0..ROW_LETTERS.len() {
            for column in 1..=SEATS_PER_ROW {
                let taken = rng.gen_bool(self.ratio);
                if let (true, Some(seat)) = (taken, SeatNumber::from_position(row_index, column)) {
                    booked.push(seat);
                }
            }
        }
        booked
    }
}

impl Default for SeededOccupancy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO)
    }
}

impl OccupancySource for SeededOccupancy {
    fn booked_seats(&self, showing: &Showing) -> ServiceFuture<Vec<SeatNumber>> {
        let booked = self.pattern(showing);
        tracing::debug!(showing = %showing.key(), booked = booked.len(), "Seeded occupancy");
        Box::pin(async move { Ok(booked) })
    }
}

/// FNV-1a, stable across processes and toolchains
fn stable_seed(key: &str) -> u64 {
    key.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{Price, Theatre};
    use chrono::NaiveDate;

    fn showing(time: &str) -> Showing {
        Showing {
            theatre: Theatre {
                name: "INOX".to_string(),
                location: "Nariman Point".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                showtimes: vec![time.to_string()],
                price: Price::from_units(400),
            },
            showtime: time.to_string(),
        }
    }

    #[test]
    fn same_showing_same_pattern() {
        let source = SeededOccupancy::default();
        assert_eq!(source.pattern(&showing("6:30 PM")), source.pattern(&showing("6:30 PM")));
    }

    #[test]
    fn different_showings_differ() {
        let source = SeededOccupancy::default();
        assert_ne!(source.pattern(&showing("6:30 PM")), source.pattern(&showing("9:45 PM")));
    }

    #[test]
    fn ratio_bounds() {
        assert!(SeededOccupancy::new(0.0).pattern(&showing("1:00 PM")).is_empty());
        assert_eq!(SeededOccupancy::new(1.0).pattern(&showing("1:00 PM")).len(), 100);
        assert_eq!(SeededOccupancy::new(7.0).pattern(&showing("1:00 PM")).len(), 100);
    }

    #[test]
    fn ratio_is_roughly_respected() {
        let booked = SeededOccupancy::default().pattern(&showing("6:30 PM")).len();
        assert!((10..=55).contains(&booked), "{booked} seats booked");
    }

    #[tokio::test]
    async fn source_matches_pattern() {
        let source = SeededOccupancy::default();
        let booked = source.booked_seats(&showing("6:30 PM")).await.unwrap();
        assert_eq!(booked, source.pattern(&showing("6:30 PM")));
    }

    #[test]
    fn seed_is_stable() {
        assert_eq!(stable_seed(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(stable_seed("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
