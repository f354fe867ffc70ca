//! Configuration management for the booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::types::PaymentMethod;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Booking Service connection
    pub api: ApiConfig,
    /// Booking flow behaviour
    pub booking: BookingConfig,
}

/// Booking Service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL shared by the catalog and booking endpoints
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Bearer token for the session (never serialized)
    #[serde(skip)]
    pub auth_token: Option<String>,
}

/// Booking flow behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Seats one booking may hold
    pub max_seats: usize,
    /// How a submission is confirmed
    pub confirmation: ConfirmationMode,
    /// Payment method sent with every draft
    pub payment_method: PaymentMethod,
    /// Where booked seats come from
    pub occupancy: OccupancyMode,
    /// Probability of a seat being booked under seeded occupancy
    pub demo_booked_ratio: f64,
}

/// How a submission becomes a paid booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationMode {
    /// One create request carrying the payment status and an idempotency key
    #[default]
    Atomic,
    /// Create, then mark payment complete in a second request
    TwoStep,
}

impl FromStr for ConfirmationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "two-step" | "two_step" | "twostep" => Ok(Self::TwoStep),
            other => Err(ConfigError::Invalid {
                key: "MARQUEE_CONFIRMATION",
                value: other.to_string(),
            }),
        }
    }
}

/// Source of booked seats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OccupancyMode {
    /// Ask the Booking Service
    #[default]
    Service,
    /// Deterministic demo pattern per showing
    Seeded,
}

impl FromStr for OccupancyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "seeded" | "demo" => Ok(Self::Seeded),
            other => Err(ConfigError::Invalid {
                key: "MARQUEE_OCCUPANCY",
                value: other.to_string(),
            }),
        }
    }
}

/// Rejected configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value could not be understood
    #[error("Invalid value for {key}: {value}")]
    Invalid {
        /// Environment variable
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// Request timeout of zero
    #[error("Request timeout must be at least one second")]
    ZeroTimeout,

    /// Seat limit of zero
    #[error("Maximum seats per booking must be at least one")]
    ZeroMaxSeats,

    /// Ratio outside `[0, 1]`
    #[error("Demo booked ratio must be between 0 and 1 (got {0})")]
    RatioOutOfRange(f64),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults; call
    /// [`Config::validate`] before use.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: lookup("MARQUEE_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "http://localhost:5000".to_string()),
                request_timeout_secs: lookup("MARQUEE_REQUEST_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
                auth_token: lookup("MARQUEE_AUTH_TOKEN").filter(|token| !token.trim().is_empty()),
            },
            booking: BookingConfig {
                max_seats: lookup("MARQUEE_MAX_SEATS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(crate::selection::DEFAULT_MAX_SEATS),
                confirmation: lookup("MARQUEE_CONFIRMATION")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                payment_method: lookup("MARQUEE_PAYMENT_METHOD")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                occupancy: lookup("MARQUEE_OCCUPANCY")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                demo_booked_ratio: lookup("MARQUEE_DEMO_BOOKED_RATIO")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.3),
            },
        }
    }

    /// Checks values that would make the engine unusable
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.booking.max_seats == 0 {
            return Err(ConfigError::ZeroMaxSeats);
        }
        let ratio = self.booking.demo_booked_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::RatioOutOfRange(ratio));
        }
        Ok(())
    }

    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// How long the flow waits for a result action
    ///
    /// Two-step confirmation makes two requests, plus slack.
    #[must_use]
    pub const fn flow_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs.saturating_mul(3))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
