//! Marquee command-line booking
//!
//! Books seats for a movie showtime, or lists the session's bookings.
//!
//! # Usage
//!
//! ```bash
//! # Book two seats against the configured Booking Service
//! MARQUEE_AUTH_TOKEN=... cargo run --bin marquee -- 6650f1c2 0 "6:30 PM" A1 A2
//!
//! # Same flow against a seeded in-memory service
//! cargo run --bin marquee -- --offline demo-interstellar 0 "6:30 PM" D4 D5
//!
//! # List bookings with status counts
//! cargo run --bin marquee -- --list
//! ```

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use marquee_booking::{
    BookingFlow, Operation, SeatMap, Session, ToggleOutcome,
    config::Config,
    flow::BookingEnvironment,
    ledger::{BookingFilter, BookingLedger},
    service::{BookingService, HttpBookingClient, InMemoryBookingService},
    types::{Booking, BookingStatus, Movie, MovieId, SeatNumber},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const OFFLINE_TOKEN: &str = "offline-demo";

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Book movie seats, or list your bookings", long_about = None)]
struct Cli {
    /// Use a seeded in-memory Booking Service instead of the configured one
    #[arg(long)]
    offline: bool,

    /// List bookings with status counts
    #[arg(long)]
    list: bool,

    /// Movie to book
    #[arg(required_unless_present = "list")]
    movie_id: Option<String>,

    /// Position of the theatre in the movie's listing, starting at 0
    #[arg(required_unless_present = "list")]
    theatre_index: Option<usize>,

    /// Showtime as listed by the theatre, e.g. "6:30 PM"
    #[arg(required_unless_present = "list")]
    showtime: Option<String>,

    /// Seats to book, e.g. A1 D4
    #[arg(required_unless_present = "list")]
    seats: Vec<SeatNumber>,
}

/// What to do once the service is set up
enum Command {
    Book {
        movie_id: MovieId,
        theatre_index: usize,
        showtime: String,
        seats: Vec<SeatNumber>,
    },
    List,
}

impl Cli {
    fn into_command(self) -> Command {
        match (self.list, self.movie_id, self.theatre_index, self.showtime) {
            (false, Some(movie_id), Some(theatre_index), Some(showtime)) => Command::Book {
                movie_id: MovieId::new(movie_id),
                theatre_index,
                showtime,
                seats: self.seats,
            },
            _ => Command::List,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marquee_booking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let offline = cli.offline;
    let config = Config::from_env();
    config.validate().context("invalid configuration")?;

    let (bookings, env): (Arc<dyn BookingService>, BookingEnvironment) = if offline {
        let service = InMemoryBookingService::demo(Utc::now().date_naive()).shared();
        let session = Session::with_token(
            config.api.auth_token.clone().unwrap_or_else(|| OFFLINE_TOKEN.to_string()),
        );
        let env = BookingEnvironment::in_memory(&service, session);
        let bookings: Arc<dyn BookingService> = service;
        (bookings, env)
    } else {
        let bookings: Arc<dyn BookingService> = Arc::new(HttpBookingClient::from_config(&config)?);
        (bookings, BookingEnvironment::from_config(&config)?)
    };
    let session = env.session.clone();

    match cli.into_command() {
        Command::List => list(bookings.as_ref(), &session).await,
        Command::Book {
            movie_id,
            theatre_index,
            showtime,
            seats,
        } => {
            let flow = BookingFlow::with_config(&config, env);
            let outcome = book(&flow, movie_id, theatre_index, showtime, &seats).await;
            flow.shutdown(Duration::from_secs(5)).await?;
            if offline && outcome.is_ok() {
                println!();
                list(bookings.as_ref(), &session).await?;
            }
            outcome
        },
    }
}

async fn book(
    flow: &BookingFlow,
    movie_id: MovieId,
    theatre_index: usize,
    showtime: String,
    seats: &[SeatNumber],
) -> anyhow::Result<()> {
    let movie = flow
        .load_movie(movie_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(Operation::LoadMovie)))?;
    print_movie(&movie);

    flow.choose_showtime(theatre_index, showtime)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(Operation::LoadSeats)))?;

    for &seat in seats {
        match flow.toggle_seat(seat).await? {
            ToggleOutcome::Added => {},
            ToggleOutcome::Removed => println!("  {seat} listed twice, deselected"),
            ToggleOutcome::Ignored => println!("  {seat} is not available, skipped"),
            ToggleOutcome::LimitReached => {
                let notice = flow.state(|s| s.notice.clone()).await.unwrap_or_default();
                println!("  {seat} skipped: {notice}");
            },
        }
    }

    let state = flow.snapshot().await;
    if let Some(map) = &state.seat_map {
        print_seat_map(map, state.selection.as_slice());
    }
    println!("\nSelected: {}", join(state.selection.as_slice()));
    for (tier, count, subtotal) in state.breakdown() {
        println!("  {tier:<8} x{count:<2} {subtotal}");
    }
    println!("  Total       {}", state.total());

    let booking = flow
        .submit()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(Operation::CreateBooking)))?;
    println!("\nBooking confirmed");
    print_booking(&booking);
    Ok(())
}

async fn list(service: &dyn BookingService, session: &Session) -> anyhow::Result<()> {
    let ledger = BookingLedger::load(service, session)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(Operation::ListBookings)))?;

    if ledger.is_empty() {
        println!("No bookings yet");
        return Ok(());
    }
    println!(
        "{} bookings: {} confirmed, {} completed, {} cancelled",
        ledger.len(),
        ledger.count(BookingStatus::Confirmed),
        ledger.count(BookingStatus::Completed),
        ledger.count(BookingStatus::Cancelled),
    );
    for booking in ledger.filtered(BookingFilter::All) {
        println!();
        print_booking(booking);
    }
    Ok(())
}

fn print_movie(movie: &Movie) {
    println!("{}", movie.title);
    for (index, theatre) in movie.theatres.iter().enumerate() {
        println!(
            "  [{index}] {}, {} on {}: {} (from {})",
            theatre.name,
            theatre.location,
            theatre.date,
            theatre.showtimes.join(", "),
            theatre.price,
        );
    }
}

fn print_seat_map(map: &SeatMap, selected: &[SeatNumber]) {
    println!("\n      SCREEN");
    for (row, seats) in map.rows() {
        let cells: String = seats
            .iter()
            .map(|seat| {
                if selected.contains(&seat.seat_number) {
                    '*'
                } else if seat.is_booked {
                    'x'
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {row}  {cells}");
    }
}

fn print_booking(booking: &Booking) {
    let title = booking
        .movie
        .title()
        .map_or_else(|| booking.movie.id().to_string(), str::to_string);
    println!("  {} [{}] {title}", booking.booking_reference, booking.status);
    println!(
        "  {}, {} on {} at {}",
        booking.theatre.name, booking.theatre.location, booking.showtime.date, booking.showtime.time
    );
    let seats: Vec<SeatNumber> = booking.seat_numbers().collect();
    println!("  Seats {} for {}", join(&seats), booking.total_amount);
}

fn join(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
