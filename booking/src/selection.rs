//! Seat selection state.

use crate::seat_map::SeatMap;
use crate::types::SeatNumber;

/// Default number of seats one booking may hold
pub const DEFAULT_MAX_SEATS: usize = 10;

/// What a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Seat added to the selection
    Added,
    /// Seat removed from the selection
    Removed,
    /// Seat unknown or already booked; nothing changed
    Ignored,
    /// Selection already full; nothing changed
    LimitReached,
}

impl ToggleOutcome {
    /// True if the selection changed
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Added | Self::Removed)
    }
}

/// Insertion-ordered set of selected seats with an upper bound
///
/// Never holds a seat that is booked in the map it was toggled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    seats: Vec<SeatNumber>,
    max: usize,
}

impl SelectionSet {
    /// Empty selection with a limit of `max` seats
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            seats: Vec::new(),
            max,
        }
    }

    /// Selects or deselects a seat
    ///
    /// Booked or unknown seats are ignored. Deselecting always works; selecting
    /// is refused once the limit is reached.
    pub fn toggle(&mut self, seat_number: SeatNumber, map: &SeatMap) -> ToggleOutcome {
        match map.get(seat_number) {
            None => return ToggleOutcome::Ignored,
            Some(seat) if seat.is_booked => return ToggleOutcome::Ignored,
            Some(_) => {},
        }

        if let Some(position) = self.seats.iter().position(|s| *s == seat_number) {
            self.seats.remove(position);
            return ToggleOutcome::Removed;
        }

        if self.seats.len() >= self.max {
            return ToggleOutcome::LimitReached;
        }

        self.seats.push(seat_number);
        ToggleOutcome::Added
    }

    /// Clears the selection
    pub fn reset(&mut self) {
        self.seats.clear();
    }

    /// Drops seats the map now shows as booked, returning them
    pub fn retain_available(&mut self, map: &SeatMap) -> Vec<SeatNumber> {
        let mut dropped = Vec::new();
        self.seats.retain(|seat| {
            let keep = map.is_available(*seat);
            if !keep {
                dropped.push(*seat);
            }
            keep
        });
        dropped
    }

    /// Selected seats in the order they were picked
    #[must_use]
    pub fn as_slice(&self) -> &[SeatNumber] {
        &self.seats
    }

    /// True if the seat is selected
    #[must_use]
    pub fn contains(&self, seat_number: SeatNumber) -> bool {
        self.seats.contains(&seat_number)
    }

    /// Number of selected seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// True if nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Upper bound on selected seats
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// True once no more seats can be added
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.max
    }
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEATS)
    }
}
