//! Core domain types for seat booking.
//!
//! Wire names follow the Booking Service's JSON (camelCase, Mongo-style `_id`).

use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use uuid::Uuid;

/// Row letters of the auditorium, front to back
pub const ROW_LETTERS: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Seats in every row
pub const SEATS_PER_ROW: u8 = 10;

// ============================================================================
// Identifiers
// ============================================================================

/// Server-assigned movie identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    /// Wraps a raw identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned booking identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    /// Wraps a raw identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key that lets the Booking Service collapse repeated create requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Creates a new random key
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat label: row letter `A`-`J` followed by column `1`-`10`
///
/// Ordered front-to-back, then left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatNumber {
    row: u8,
    column: u8,
}

impl SeatNumber {
    /// Builds a seat number from a 0-based row index and 1-based column
    #[must_use]
    pub fn from_position(row_index: usize, column: u8) -> Option<Self> {
        let row = u8::try_from(row_index).ok()?;
        if usize::from(row) >= ROW_LETTERS.len() || column == 0 || column > SEATS_PER_ROW {
            return None;
        }
        Some(Self { row, column })
    }

    /// 0-based row index (A = 0)
    #[must_use]
    pub const fn row_index(self) -> usize {
        self.row as usize
    }

    /// 1-based column
    #[must_use]
    pub const fn column(self) -> u8 {
        self.column
    }

    /// Row letter
    #[must_use]
    pub const fn row_letter(self) -> char {
        ROW_LETTERS[self.row as usize]
    }
}

impl FromStr for SeatNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidSeatNumber(s.to_string());
        let mut chars = s.trim().chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let row = ROW_LETTERS
            .iter()
            .position(|l| *l == letter)
            .ok_or_else(invalid)?;
        let column: u8 = chars.as_str().parse().map_err(|_| invalid())?;
        Self::from_position(row, column).ok_or_else(invalid)
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.column)
    }
}

impl Serialize for SeatNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Seat category that determines the price multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Back rows, base price
    Regular,
    /// Middle rows, base × 1.25
    Premium,
    /// Front rows, base × 1.5
    #[serde(rename = "VIP")]
    Vip,
}

impl Tier {
    /// Tier of a 0-based row index: rows 0-2 VIP, 3-5 Premium, the rest Regular
    #[must_use]
    pub const fn for_row(row_index: usize) -> Self {
        if row_index < 3 {
            Self::Vip
        } else if row_index < 6 {
            Self::Premium
        } else {
            Self::Regular
        }
    }

    /// Price of this tier for a base price, rounded half-up to whole units
    #[must_use]
    pub const fn price(self, base: Price) -> Price {
        match self {
            Self::Regular => base,
            Self::Premium => base.scaled(5, 4),
            Self::Vip => base.scaled(3, 2),
        }
    }

    /// All tiers, most expensive first
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Vip, Self::Premium, Self::Regular]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "Regular",
            Self::Premium => "Premium",
            Self::Vip => "VIP",
        })
    }
}

// ============================================================================
// Money
// ============================================================================

/// Non-negative amount in whole currency units
///
/// JSON numbers with a fractional part are rounded on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a price from whole units
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Whole units
    #[must_use]
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Largest usable base price; a full house at VIP prices stays below `u64::MAX`
    pub const MAX_BASE: Self = Self(u64::MAX / 200);

    /// `round(self × numerator / denominator)`, halves rounded up, saturating at `u64::MAX`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Bounded by the check above
    pub const fn scaled(self, numerator: u64, denominator: u64) -> Self {
        let scaled = (self.0 as u128 * numerator as u128 + denominator as u128 / 2) / denominator as u128;
        if scaled > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(scaled as u64)
        }
    }

    /// True when the amount can serve as a theatre base price
    #[must_use]
    pub const fn is_valid_base(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX_BASE.0
    }

    /// Adds two prices, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// True for a zero amount
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rs {}", self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if !raw.is_finite() || raw < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid price: {raw}")));
        }
        // Range checked above; rounding matches the service's display rounding.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(raw.round() as u64))
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A theatre screening a movie on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theatre {
    /// Theatre name
    pub name: String,
    /// Theatre location
    pub location: String,
    /// Screening date
    #[serde(deserialize_with = "lenient_date")]
    pub date: NaiveDate,
    /// Time-of-day slots, in listing order
    #[serde(default)]
    pub showtimes: Vec<String>,
    /// Base (Regular tier) price
    pub price: Price,
}

impl Theatre {
    /// True if the theatre lists this showtime
    #[must_use]
    pub fn offers(&self, showtime: &str) -> bool {
        self.showtimes.iter().any(|s| s == showtime)
    }
}

/// A movie with the theatres showing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Identifier
    #[serde(rename = "_id")]
    pub id: MovieId,
    /// Title
    pub title: String,
    /// Poster URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Running time as listed (e.g. "2h 28m")
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Rating as listed
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    /// Language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Theatres showing this movie
    #[serde(default)]
    pub theatres: Vec<Theatre>,
}

/// The active theatre and showtime pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Showing {
    /// Snapshot of the chosen theatre
    pub theatre: Theatre,
    /// Chosen showtime
    pub showtime: String,
}

impl Showing {
    /// Stable key used to look up occupancy
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.theatre.name, self.theatre.location, self.theatre.date, self.showtime
        )
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Theatre as recorded on a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheatreRef {
    /// Theatre name
    pub name: String,
    /// Theatre location
    pub location: String,
}

/// Date and time of a booked showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowtimeSlot {
    /// Screening date
    #[serde(deserialize_with = "lenient_date")]
    pub date: NaiveDate,
    /// Time-of-day slot
    pub time: String,
}

/// One seat on a draft or booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatLine {
    /// Seat label
    pub seat_number: SeatNumber,
    /// Seat tier
    #[serde(rename = "type")]
    pub tier: Tier,
    /// Price charged for the seat
    pub price: Price,
}

/// How the customer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Card payment
    #[default]
    Card,
    /// UPI transfer
    #[serde(rename = "UPI")]
    Upi,
    /// Net banking
    NetBanking,
    /// Wallet
    Wallet,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "netbanking" | "net-banking" => Ok(Self::NetBanking),
            "wallet" => Ok(Self::Wallet),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Lifecycle status of a persisted booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Seats held and paid, showing still ahead
    Confirmed,
    /// Cancelled by the customer
    Cancelled,
    /// Showing has happened
    Completed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        })
    }
}

/// Payment status of a persisted booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Created, payment not yet recorded
    Pending,
    /// Paid
    Completed,
    /// Payment attempt failed
    Failed,
    /// Refunded after cancellation
    Refunded,
}

/// Contact details attached to a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Movie summary embedded in a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    /// Identifier
    #[serde(rename = "_id")]
    pub id: MovieId,
    /// Title
    pub title: String,
    /// Poster URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Running time as listed
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A booking's movie: a bare id, or a summary when the service expands it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MovieRef {
    /// Expanded summary
    Summary(MovieSummary),
    /// Bare identifier
    Id(MovieId),
}

impl MovieRef {
    /// Identifier of the referenced movie
    #[must_use]
    pub const fn id(&self) -> &MovieId {
        match self {
            Self::Summary(summary) => &summary.id,
            Self::Id(id) => id,
        }
    }

    /// Title when the service expanded the movie
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Summary(summary) => Some(&summary.title),
            Self::Id(_) => None,
        }
    }
}

/// A booking persisted by the Booking Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Identifier
    #[serde(rename = "_id")]
    pub id: BookingId,
    /// Human-facing reference code
    pub booking_reference: String,
    /// Customer, when the service includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Customer>,
    /// Booked movie
    pub movie: MovieRef,
    /// Theatre
    pub theatre: TheatreRef,
    /// Showing date and time
    pub showtime: ShowtimeSlot,
    /// Seats
    pub seats: Vec<SeatLine>,
    /// Amount charged
    pub total_amount: Price,
    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Booking status
    pub status: BookingStatus,
    /// When the booking was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_date: Option<DateTime<Utc>>,
    /// When the record was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Seat labels in booking order
    pub fn seat_numbers(&self) -> impl Iterator<Item = SeatNumber> + '_ {
        self.seats.iter().map(|line| line.seat_number)
    }

    /// Midnight UTC at the start of the showing's date
    #[must_use]
    pub fn showtime_start(&self) -> DateTime<Utc> {
        self.showtime.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping the date part
pub(crate) fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// Accepts a string or a number and keeps it as text
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}
