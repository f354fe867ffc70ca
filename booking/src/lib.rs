//! # Marquee Booking
//!
//! Seat booking and pricing for movie showings.
//!
//! A booking session loads a movie, picks a theatre and showtime, builds the
//! 10 × 10 seat map from the showing's occupancy, lets the customer select up to
//! ten seats, prices them by tier and submits the booking to the Booking
//! Service. Persisted bookings are listed, inspected and cancelled through the
//! [`ledger`].
//!
//! ## Layout
//!
//! - [`seat_map`], [`selection`], [`pricing`]: pure seat logic
//! - [`occupancy`]: where booked seats come from
//! - [`flow`]: the booking orchestrator (reducer, actions, store facade)
//! - [`service`]: Booking Service clients (HTTP and in-memory)
//! - [`ledger`]: booking list, detail and cancellation
//!
//! ## Example
//!
//! ```no_run
//! use marquee_booking::config::Config;
//! use marquee_booking::flow::BookingFlow;
//! use marquee_booking::types::MovieId;
//!
//! # async fn run() -> Result<(), marquee_booking::error::BookingError> {
//! let config = Config::from_env();
//! let flow = BookingFlow::connect(&config)?;
//!
//! let movie = flow.load_movie(MovieId::new("6650f1c2")).await?;
//! let showtime = movie.theatres[0].showtimes[0].clone();
//! flow.choose_showtime(0, showtime).await?;
//! flow.toggle_seat("A1".parse()?).await?;
//! let booking = flow.submit().await?;
//! println!("Booked {}", booking.booking_reference);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod draft;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod occupancy;
pub mod pricing;
pub mod seat_map;
pub mod selection;
pub mod service;
pub mod session;
pub mod types;

pub use error::{BookingError, BookingResult, Operation, ValidationError};
pub use flow::{BookingAction, BookingFlow, BookingPhase, BookingState};
pub use seat_map::{Seat, SeatMap};
pub use selection::{SelectionSet, ToggleOutcome};
pub use session::Session;
