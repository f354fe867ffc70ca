//! Booking flow orchestration.
//!
//! One customer's path from a movie to a confirmed booking, modelled as a
//! reducer over [`BookingState`] and driven by [`BookingAction`]s:
//!
//! 1. `LoadMovie` fetches the movie and its theatres
//! 2. `ChooseShowtime` opens the seat map once occupancy arrives
//! 3. `ToggleSeat` edits the selection, priced by tier
//! 4. `Submit` creates (and pays for) the booking
//!
//! Requests run as effects in the runtime store. [`BookingFlow`] wraps the
//! store with async operations that wait for each result.
//!
//! A failed submission leaves the flow in [`BookingPhase::Failed`] with map and
//! selection intact. Resubmitting the same draft reuses its idempotency key,
//! and under two-step confirmation a booking that was created but not paid is
//! only re-paid, never created twice.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use actions::BookingAction;
pub use environment::BookingEnvironment;
pub use reducer::BookingReducer;
pub use store::{BookingFlow, BookingStore};
pub use types::{BookingPhase, BookingState, Submission};
