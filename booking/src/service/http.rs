//! REST client for the Movie Catalog and Booking Service.

use super::{BookingService, CreateBooking, MovieCatalog, ServiceFuture};
use crate::config::Config;
use crate::draft::BookingDraft;
use crate::error::{BookingError, BookingResult};
use crate::occupancy::OccupancySource;
use crate::session::Session;
use crate::types::{Booking, BookingId, Movie, MovieId, PaymentStatus, SeatNumber, Showing};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON envelope every endpoint answers with
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictData {
    #[serde(default)]
    conflicting_seats: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccupancyData {
    #[serde(default)]
    booked_seats: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody<'a> {
    #[serde(flatten)]
    draft: &'a BookingDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<PaymentStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    payment_status: PaymentStatus,
}

/// Booking Service over HTTP
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpBookingClient {
    client: Client,
    base_url: String,
}

impl HttpBookingClient {
    /// Creates a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BookingResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BookingError::network)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> BookingResult<Self> {
        Self::new(config.api.base_url.clone(), config.request_timeout())
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authorized(&self, method: Method, path: &str, session: &Session) -> BookingResult<RequestBuilder> {
        let token = session.bearer().ok_or(BookingError::Unauthorized)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    #[tracing::instrument(skip_all, fields(movie_id = %movie_id))]
    async fn fetch_movie_inner(self, movie_id: MovieId) -> BookingResult<Movie> {
        let path = format!("/api/movies/{}", movie_id.as_str());
        execute(self.request(Method::GET, &path)).await
    }

    #[tracing::instrument(skip_all, fields(showing = %showing.key()))]
    async fn booked_seats_inner(self, showing: Showing) -> BookingResult<Vec<SeatNumber>> {
        let date = showing.theatre.date.to_string();
        let url = Url::parse_with_params(
            &self.url("/api/bookings/occupancy"),
            [
                ("theatre", showing.theatre.name.as_str()),
                ("location", showing.theatre.location.as_str()),
                ("date", date.as_str()),
                ("time", showing.showtime.as_str()),
            ],
        )
        .map_err(BookingError::network)?;

        let data: OccupancyData = execute(self.client.get(url)).await?;
        Ok(parse_seats(&data.booked_seats))
    }

    #[tracing::instrument(skip_all, fields(key = %request.idempotency_key, seats = request.draft.seats().len()))]
    async fn create_booking_inner(
        self,
        session: Session,
        request: CreateBooking,
    ) -> BookingResult<Booking> {
        let body = CreateBody {
            draft: &request.draft,
            payment_status: request.confirm_payment.then_some(PaymentStatus::Completed),
        };
        let builder = self
            .authorized(Method::POST, "/api/bookings", &session)?
            .header("Idempotency-Key", request.idempotency_key.to_string())
            .json(&body);

        let booking: Booking = execute(builder).await?;
        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.booking_reference,
            payment_status = ?booking.payment_status,
            "Booking created"
        );
        Ok(booking)
    }

    #[tracing::instrument(skip_all, fields(booking_id = %id))]
    async fn complete_payment_inner(self, session: Session, id: BookingId) -> BookingResult<Booking> {
        let path = format!("/api/bookings/{}/payment", id.as_str());
        let builder = self
            .authorized(Method::PUT, &path, &session)?
            .json(&PaymentBody {
                payment_status: PaymentStatus::Completed,
            });
        execute(builder).await
    }

    #[tracing::instrument(skip_all, fields(booking_id = %id))]
    async fn fetch_booking_inner(self, session: Session, id: BookingId) -> BookingResult<Booking> {
        let path = format!("/api/bookings/{}", id.as_str());
        execute(self.authorized(Method::GET, &path, &session)?).await
    }

    #[tracing::instrument(skip_all)]
    async fn list_bookings_inner(self, session: Session) -> BookingResult<Vec<Booking>> {
        execute(self.authorized(Method::GET, "/api/bookings", &session)?).await
    }

    #[tracing::instrument(skip_all, fields(booking_id = %id))]
    async fn cancel_booking_inner(self, session: Session, id: BookingId) -> BookingResult<Booking> {
        let path = format!("/api/bookings/{}/cancel", id.as_str());
        execute(self.authorized(Method::PUT, &path, &session)?).await
    }
}

/// Sends a request and unwraps the `{ success, data, message }` envelope
async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> BookingResult<T> {
    let response = builder.send().await.map_err(|e| {
        tracing::warn!(error = %e, "Booking Service unreachable");
        BookingError::network(e)
    })?;
    let status = response.status();
    let body = response.bytes().await.map_err(BookingError::network)?;
    let envelope = serde_json::from_slice::<ApiEnvelope>(&body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            tracing::warn!(status = status.as_u16(), "Booking Service refused credentials");
            return Err(BookingError::Unauthorized);
        },
        StatusCode::CONFLICT => {
            let conflict = envelope
                .ok()
                .and_then(|e| e.data)
                .and_then(|data| serde_json::from_value::<ConflictData>(data).ok())
                .unwrap_or_default();
            let seats = parse_seats(&conflict.conflicting_seats);
            tracing::warn!(seats = seats.len(), "Seat conflict");
            return Err(BookingError::SeatConflict { seats });
        },
        status if !status.is_success() => {
            let message = envelope.ok().and_then(|e| e.message);
            tracing::warn!(status = status.as_u16(), ?message, "Booking Service rejected request");
            return Err(BookingError::ServiceRejection {
                status: status.as_u16(),
                message,
            });
        },
        _ => {},
    }

    let envelope = envelope.map_err(BookingError::decode)?;
    if !envelope.success {
        return Err(BookingError::ServiceRejection {
            status: status.as_u16(),
            message: envelope.message,
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| BookingError::decode("response carried no data"))?;
    serde_json::from_value(data).map_err(BookingError::decode)
}

/// Parses seat labels, dropping ones outside the grid
fn parse_seats(raw: &[String]) -> Vec<SeatNumber> {
    raw.iter()
        .filter_map(|label| match label.parse() {
            Ok(seat) => Some(seat),
            Err(error) => {
                tracing::debug!(%error, "Ignoring unknown seat number");
                None
            },
        })
        .collect()
}

impl MovieCatalog for HttpBookingClient {
    fn fetch_movie(&self, movie_id: &MovieId) -> ServiceFuture<Movie> {
        Box::pin(self.clone().fetch_movie_inner(movie_id.clone()))
    }
}

impl OccupancySource for HttpBookingClient {
    fn booked_seats(&self, showing: &Showing) -> ServiceFuture<Vec<SeatNumber>> {
        Box::pin(self.clone().booked_seats_inner(showing.clone()))
    }
}

impl BookingService for HttpBookingClient {
    fn create_booking(&self, session: &Session, request: CreateBooking) -> ServiceFuture<Booking> {
        Box::pin(self.clone().create_booking_inner(session.clone(), request))
    }

    fn complete_payment(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        Box::pin(self.clone().complete_payment_inner(session.clone(), booking_id.clone()))
    }

    fn fetch_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        Box::pin(self.clone().fetch_booking_inner(session.clone(), booking_id.clone()))
    }

    fn list_bookings(&self, session: &Session) -> ServiceFuture<Vec<Booking>> {
        Box::pin(self.clone().list_bookings_inner(session.clone()))
    }

    fn cancel_booking(&self, session: &Session, booking_id: &BookingId) -> ServiceFuture<Booking> {
        Box::pin(self.clone().cancel_booking_inner(session.clone(), booking_id.clone()))
    }
}
