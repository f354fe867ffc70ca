//! Pricing over a selection.
//!
//! Prices always come from the seat map; seats missing from the map add
//! nothing.

use crate::seat_map::SeatMap;
use crate::types::{Price, SeatLine, SeatNumber, Tier};

/// Price of a tier for a base price
#[must_use]
pub const fn tier_price(tier: Tier, base_price: Price) -> Price {
    tier.price(base_price)
}

/// Sum of the map prices of the selected seats
#[must_use]
pub fn total(selection: &[SeatNumber], map: &SeatMap) -> Price {
    selection
        .iter()
        .filter_map(|seat| map.get(*seat))
        .map(|seat| seat.price)
        .sum()
}

/// Booking lines for the selected seats, in selection order
#[must_use]
pub fn line_items(selection: &[SeatNumber], map: &SeatMap) -> Vec<SeatLine> {
    selection
        .iter()
        .filter_map(|seat| map.get(*seat))
        .map(crate::seat_map::Seat::line)
        .collect()
}

/// Selected seat count and subtotal per tier, most expensive tier first
#[must_use]
pub fn breakdown(selection: &[SeatNumber], map: &SeatMap) -> Vec<(Tier, usize, Price)> {
    Tier::all()
        .into_iter()
        .filter_map(|tier| {
            let lines: Vec<Price> = selection
                .iter()
                .filter_map(|seat| map.get(*seat))
                .filter(|seat| seat.tier == tier)
                .map(|seat| seat.price)
                .collect();
            (!lines.is_empty()).then(|| (tier, lines.len(), lines.into_iter().sum()))
        })
        .collect()
}
