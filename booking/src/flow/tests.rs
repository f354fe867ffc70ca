//! Unit tests for `BookingReducer`.
//!
//! Covers the flow phases, seat selection limits, submission preconditions,
//! seat conflicts, two-step recovery and stale result handling.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use super::*;
use crate::config::ConfirmationMode;
use crate::error::{BookingError, ValidationError};
use crate::selection::ToggleOutcome;
use crate::service::{sample_movie, CallKind, InMemoryBookingService, ServiceCall};
use crate::session::Session;
use crate::types::{
    Booking, BookingId, BookingStatus, MovieId, MovieRef, PaymentMethod, PaymentStatus, Price,
    SeatLine, SeatNumber, ShowtimeSlot, TheatreRef, Tier,
};
use chrono::NaiveDate;
use marquee_core::{effect::Effect, environment::Clock, reducer::Reducer};
use marquee_testing::{assertions, test_clock, ReducerTest};
use std::sync::Arc;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
}

fn seat(label: &str) -> SeatNumber {
    label.parse().unwrap()
}

fn movie_id() -> MovieId {
    MovieId::new("demo-interstellar")
}

fn service() -> Arc<InMemoryBookingService> {
    InMemoryBookingService::new()
        .with_movie(sample_movie(date()))
        .shared()
}

fn env_for(service: &Arc<InMemoryBookingService>) -> BookingEnvironment {
    BookingEnvironment::in_memory(service, Session::with_token("token"))
        .with_clock(Arc::new(test_clock()))
}

fn test_env() -> BookingEnvironment {
    env_for(&service())
}

/// Movie loaded (generation 1), showtime chosen (generation 2), B4 booked
fn ready_actions() -> Vec<BookingAction> {
    vec![
        BookingAction::LoadMovie { movie_id: movie_id() },
        BookingAction::MovieLoaded {
            generation: 1,
            movie: sample_movie(date()),
        },
        BookingAction::ChooseShowtime {
            theatre_index: 0,
            showtime: "6:30 PM".to_string(),
        },
        BookingAction::OccupancyLoaded {
            generation: 2,
            booked: vec![seat("B4")],
        },
    ]
}

fn with_toggles(labels: &[&str]) -> Vec<BookingAction> {
    let mut actions = ready_actions();
    actions.extend(labels.iter().map(|l| BookingAction::ToggleSeat { seat: seat(l) }));
    actions
}

fn replay(reducer: &BookingReducer, env: &BookingEnvironment, actions: Vec<BookingAction>) -> BookingState {
    let mut state = BookingState::default();
    for action in actions {
        let _ = reducer.reduce(&mut state, action, env);
    }
    state
}

async fn run_effect(effect: Effect<BookingAction>) -> Option<BookingAction> {
    match effect {
        Effect::Future(future) => future.await,
        other => panic!("expected a future effect, got {other:?}"),
    }
}

pub(crate) fn booking_fixture() -> Booking {
    Booking {
        id: BookingId::new("bk-0001"),
        booking_reference: "BK000001".to_string(),
        user: None,
        movie: MovieRef::Id(movie_id()),
        theatre: TheatreRef {
            name: "PVR Phoenix".to_string(),
            location: "Lower Parel".to_string(),
        },
        showtime: ShowtimeSlot {
            date: date(),
            time: "6:30 PM".to_string(),
        },
        seats: vec![SeatLine {
            seat_number: seat("A1"),
            tier: Tier::Vip,
            price: Price::from_units(750),
        }],
        total_amount: Price::from_units(750),
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Completed,
        status: BookingStatus::Confirmed,
        booking_date: None,
        created_at: None,
    }
}

// ============================================================================
// Movie and showtime
// ============================================================================

#[test]
fn load_movie_starts_a_new_generation() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .when_action(BookingAction::LoadMovie { movie_id: movie_id() })
        .then_state(|state| {
            assert_eq!(state.generation, 1);
            assert!(state.loading_movie);
            assert_eq!(state.movie_id, Some(movie_id()));
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
        })
        .then_effects(assertions::assert_has_future_effect)
        .run();
}

#[test]
fn choose_showtime_requires_a_movie() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .when_action(BookingAction::ChooseShowtime {
            theatre_index: 0,
            showtime: "6:30 PM".to_string(),
        })
        .then_state(|state| {
            assert_eq!(
                state.last_error,
                Some(BookingError::Validation(ValidationError::MovieNotLoaded))
            );
            assert_eq!(state.generation, 0);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn choose_showtime_rejects_unlisted_showtime() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(2))
        .when_action(BookingAction::ChooseShowtime {
            theatre_index: 0,
            showtime: "11:59 PM".to_string(),
        })
        .then_state(|state| {
            assert_eq!(
                state.last_error,
                Some(BookingError::Validation(ValidationError::UnknownShowtime(
                    "11:59 PM".to_string()
                )))
            );
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn choose_showtime_rejects_unknown_theatre() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(2))
        .when_action(BookingAction::ChooseShowtime {
            theatre_index: 9,
            showtime: "6:30 PM".to_string(),
        })
        .then_state(|state| {
            assert_eq!(
                state.last_error,
                Some(BookingError::Validation(ValidationError::UnknownTheatre))
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn choose_showtime_queries_occupancy() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(2))
        .when_action(BookingAction::ChooseShowtime {
            theatre_index: 0,
            showtime: "6:30 PM".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::LoadingSeats);
            assert_eq!(state.generation, 2);
            assert!(state.seat_map.is_none());
            assert_eq!(state.showing.as_ref().unwrap().showtime, "6:30 PM");
        })
        .then_effects(|effects| assertions::assert_effects_count(effects, 1))
        .run();
}

#[test]
fn occupancy_opens_the_seat_map() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions())
        .when_action(BookingAction::ToggleSeat { seat: seat("A1") })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingSeats);
            let map = state.seat_map.as_ref().unwrap();
            assert_eq!(map.len(), 100);
            assert!(!map.is_available(seat("B4")));
            assert_eq!(map.base_price(), Price::from_units(500));
        })
        .run();
}

#[test]
fn occupancy_failure_returns_to_theatre_selection() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(3))
        .when_action(BookingAction::OccupancyFailed {
            generation: 2,
            error: BookingError::network("connection reset"),
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
            assert!(state.showing.is_none());
            assert!(matches!(state.last_error, Some(BookingError::Network { .. })));
        })
        .run();
}

#[test]
fn stale_occupancy_is_dropped() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(3))
        .when_action(BookingAction::OccupancyLoaded {
            generation: 1,
            booked: vec![],
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::LoadingSeats);
            assert!(state.seat_map.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn change_showtime_discards_the_map() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]))
        .when_action(BookingAction::ChangeShowtime)
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
            assert!(state.seat_map.is_none());
            assert!(state.selection.is_empty());
            assert_eq!(state.generation, 3);
            assert!(state.movie.is_some());
        })
        .run();
}

// ============================================================================
// Seat selection
// ============================================================================

#[test]
fn selection_is_priced_by_tier() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]))
        .when_action(BookingAction::ToggleSeat { seat: seat("D1") })
        .then_state(|state| {
            assert_eq!(state.last_toggle, Some(ToggleOutcome::Added));
            assert_eq!(state.total(), Price::from_units(1375));
            assert_eq!(state.line_items().len(), 2);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn booked_seat_cannot_be_selected() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions())
        .when_action(BookingAction::ToggleSeat { seat: seat("B4") })
        .then_state(|state| {
            assert_eq!(state.last_toggle, Some(ToggleOutcome::Ignored));
            assert!(state.selection.is_empty());
        })
        .run();
}

#[test]
fn eleventh_seat_is_refused_with_notice() {
    let ten = ["J1", "J2", "J3", "J4", "J5", "J6", "J7", "J8", "J9", "J10"];
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&ten))
        .when_action(BookingAction::ToggleSeat { seat: seat("A1") })
        .then_state(|state| {
            assert_eq!(state.last_toggle, Some(ToggleOutcome::LimitReached));
            assert_eq!(state.selection.len(), 10);
            assert!(!state.selection.contains(seat("A1")));
            assert_eq!(state.notice.as_deref(), Some("Maximum 10 seats can be selected"));
        })
        .run();
}

#[test]
fn toggles_are_ignored_before_the_map_exists() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions().into_iter().take(3))
        .when_action(BookingAction::ToggleSeat { seat: seat("A1") })
        .then_state(|state| {
            assert_eq!(state.last_toggle, Some(ToggleOutcome::Ignored));
            assert!(state.selection.is_empty());
        })
        .run();
}

#[test]
fn refresh_drops_seats_taken_meanwhile() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1", "A2"]))
        .when_action(BookingAction::OccupancyLoaded {
            generation: 2,
            booked: vec![seat("A2"), seat("B4")],
        })
        .then_state(|state| {
            assert_eq!(state.selection.as_slice(), &[seat("A1")]);
            assert_eq!(state.notice.as_deref(), Some("Seats no longer available: A2"));
            assert_eq!(state.phase, BookingPhase::SelectingSeats);
        })
        .run();
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn empty_submit_is_rejected_locally() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(ready_actions())
        .when_action(BookingAction::Submit)
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingSeats);
            assert_eq!(
                state.last_error.as_ref().map(ToString::to_string).as_deref(),
                Some("Please select seats")
            );
            assert!(state.submission.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn submit_builds_the_draft() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1", "D1"]))
        .when_action(BookingAction::Submit)
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Submitting);
            let submission = state.submission.as_ref().unwrap();
            assert_eq!(submission.attempts, 1);
            assert_eq!(submission.draft.total_amount(), Price::from_units(1375));
            assert_eq!(submission.submitted_at, test_clock().now());
        })
        .then_effects(|effects| assertions::assert_effects_count(effects, 1))
        .run();
}

#[test]
fn second_submit_while_in_flight_is_rejected() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::Submit)
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Submitting);
            assert_eq!(
                state.last_error,
                Some(BookingError::Validation(ValidationError::SubmissionInProgress))
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn seat_conflict_marks_and_deselects() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1", "A2"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::SubmissionFailed {
            generation: 2,
            error: BookingError::SeatConflict {
                seats: vec![seat("A2")],
            },
            pending: None,
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Failed);
            assert!(!state.seat_map.as_ref().unwrap().is_available(seat("A2")));
            assert_eq!(state.selection.as_slice(), &[seat("A1")]);
            assert!(matches!(state.last_error, Some(BookingError::SeatConflict { .. })));
        })
        .run();
}

#[test]
fn conflict_without_seats_refreshes_the_map() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1", "A2"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::SubmissionFailed {
            generation: 2,
            error: BookingError::SeatConflict { seats: Vec::new() },
            pending: None,
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Failed);
            assert_eq!(state.selection.as_slice(), &[seat("A1"), seat("A2")]);
            assert_eq!(state.seat_map.as_ref().unwrap().available_count(), 99);
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn refresh_in_failed_keeps_seats_of_pending_booking() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([
            BookingAction::Submit,
            BookingAction::SubmissionFailed {
                generation: 2,
                error: BookingError::network("payment timeout"),
                pending: Some(booking_fixture()),
            },
        ]))
        .when_action(BookingAction::OccupancyLoaded {
            generation: 2,
            booked: vec![seat("A1"), seat("B4"), seat("J9")],
        })
        .then_state(|state| {
            let map = state.seat_map.as_ref().unwrap();
            assert!(map.is_available(seat("A1")));
            assert!(!map.is_available(seat("J9")));
            assert_eq!(state.selection.as_slice(), &[seat("A1")]);
            assert_eq!(state.notice, None);
            assert!(state.pending_booking().is_some());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn toggle_after_failure_resumes_selection() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([
            BookingAction::Submit,
            BookingAction::SubmissionFailed {
                generation: 2,
                error: BookingError::network("timeout"),
                pending: None,
            },
        ]))
        .when_action(BookingAction::ToggleSeat { seat: seat("A2") })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingSeats);
            assert_eq!(state.selection.len(), 2);
        })
        .run();
}

#[test]
fn confirmation_books_the_seats() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::BookingConfirmed {
            generation: 2,
            booking: booking_fixture(),
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Confirmed);
            assert_eq!(state.confirmed.as_ref().unwrap().id, BookingId::new("bk-0001"));
            assert!(state.selection.is_empty());
            assert!(state.submission.is_none());
            assert!(!state.seat_map.as_ref().unwrap().is_available(seat("A1")));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn resubmitting_the_same_draft_reuses_the_key() {
    let reducer = BookingReducer::new();
    let env = test_env();
    let mut state = replay(
        &reducer,
        &env,
        with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]).collect(),
    );
    let first_key = state.submission.as_ref().unwrap().idempotency_key;

    let _ = reducer.reduce(
        &mut state,
        BookingAction::SubmissionFailed {
            generation: 2,
            error: BookingError::network("timeout"),
            pending: None,
        },
        &env,
    );
    let effects = reducer.reduce(&mut state, BookingAction::Submit, &env);

    assert_eq!(effects.len(), 1);
    let submission = state.submission.as_ref().unwrap();
    assert_eq!(submission.idempotency_key, first_key);
    assert_eq!(submission.attempts, 2);
}

#[test]
fn changed_selection_gets_a_new_key() {
    let reducer = BookingReducer::new();
    let env = test_env();
    let mut state = replay(
        &reducer,
        &env,
        with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]).collect(),
    );
    let first_key = state.submission.as_ref().unwrap().idempotency_key;

    for action in [
        BookingAction::SubmissionFailed {
            generation: 2,
            error: BookingError::network("timeout"),
            pending: None,
        },
        BookingAction::ToggleSeat { seat: seat("A2") },
        BookingAction::Submit,
    ] {
        let _ = reducer.reduce(&mut state, action, &env);
    }

    let submission = state.submission.as_ref().unwrap();
    assert_ne!(submission.idempotency_key, first_key);
    assert_eq!(submission.attempts, 1);
}

// ============================================================================
// Abandon and stale results
// ============================================================================

#[test]
fn abandon_bumps_generation() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::Abandon)
        .then_state(|state| {
            assert_eq!(state.generation, 3);
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
            assert!(state.submission.is_none());
        })
        .run();
}

#[test]
fn late_confirmation_after_abandon_is_ignored() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(
            with_toggles(&["A1"])
                .into_iter()
                .chain([BookingAction::Submit, BookingAction::Abandon]),
        )
        .when_action(BookingAction::BookingConfirmed {
            generation: 2,
            booking: booking_fixture(),
        })
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::SelectingTheatre);
            assert!(state.confirmed.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn stale_created_booking_is_not_paid() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env().with_confirmation(ConfirmationMode::TwoStep))
        .given_state(BookingState::default())
        .given_actions(
            with_toggles(&["A1"])
                .into_iter()
                .chain([BookingAction::Submit, BookingAction::Abandon]),
        )
        .when_action(BookingAction::BookingCreated {
            generation: 2,
            booking: booking_fixture(),
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn change_showtime_is_refused_while_submitting() {
    ReducerTest::new(BookingReducer::new())
        .with_env(test_env())
        .given_state(BookingState::default())
        .given_actions(with_toggles(&["A1"]).into_iter().chain([BookingAction::Submit]))
        .when_action(BookingAction::ChangeShowtime)
        .then_state(|state| {
            assert_eq!(state.phase, BookingPhase::Submitting);
            assert_eq!(
                state.last_error,
                Some(BookingError::Validation(ValidationError::SubmissionInProgress))
            );
        })
        .run();
}

// ============================================================================
// Effects against the in-memory service
// ============================================================================

#[tokio::test]
async fn atomic_submit_confirms_in_one_request() {
    let service = service();
    let env = env_for(&service);
    let reducer = BookingReducer::new();
    let mut state = replay(&reducer, &env, with_toggles(&["A1", "D1"]));

    let mut effects = reducer.reduce(&mut state, BookingAction::Submit, &env);
    let result = run_effect(effects.remove(0)).await.unwrap();

    let BookingAction::BookingConfirmed { booking, .. } = result else {
        panic!("expected confirmation, got {result:?}");
    };
    assert_eq!(booking.total_amount, Price::from_units(1375));
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
    assert_eq!(service.call_count(CallKind::CreateBooking), 1);
    assert_eq!(service.call_count(CallKind::CompletePayment), 0);
    assert!(matches!(
        service.calls().last(),
        Some(ServiceCall::CreateBooking {
            confirm_payment: true,
            ..
        })
    ));
}

#[tokio::test]
async fn two_step_retry_only_repays() {
    let service = service();
    let env = env_for(&service).with_confirmation(ConfirmationMode::TwoStep);
    let reducer = BookingReducer::new();
    let mut state = replay(&reducer, &env, with_toggles(&["A1"]));

    // Create succeeds with payment pending
    let mut effects = reducer.reduce(&mut state, BookingAction::Submit, &env);
    let created = run_effect(effects.remove(0)).await.unwrap();
    assert!(matches!(created, BookingAction::BookingCreated { .. }));

    // Payment fails
    service.fail_next(
        CallKind::CompletePayment,
        BookingError::ServiceRejection {
            status: 402,
            message: Some("Payment declined".to_string()),
        },
    );
    let mut effects = reducer.reduce(&mut state, created, &env);
    let failed = run_effect(effects.remove(0)).await.unwrap();
    let _ = reducer.reduce(&mut state, failed, &env);

    assert_eq!(state.phase, BookingPhase::Failed);
    let pending = state.pending_booking().unwrap();
    assert_eq!(pending.payment_status, PaymentStatus::Pending);
    let reference = pending.booking_reference.clone();

    // Retry re-issues only the payment
    let mut effects = reducer.reduce(&mut state, BookingAction::Submit, &env);
    let confirmed = run_effect(effects.remove(0)).await.unwrap();
    let _ = reducer.reduce(&mut state, confirmed, &env);

    assert_eq!(state.phase, BookingPhase::Confirmed);
    assert_eq!(state.confirmed.as_ref().unwrap().booking_reference, reference);
    assert_eq!(service.call_count(CallKind::CreateBooking), 1);
    assert_eq!(service.call_count(CallKind::CompletePayment), 2);
    assert_eq!(service.bookings().len(), 1);
}
