//! Integration tests for Store action broadcasting
//!
//! Observers only see actions produced by effects, and only after the store
//! has reduced them.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use marquee_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use marquee_runtime::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum CheckoutAction {
    Start { id: u64 },
    Held { id: u64 },
    Charged { id: u64 },
    Confirmed { id: u64 },
    Declined { id: u64 },
    Ping,
    Pong,
}

#[derive(Debug, Clone, Default)]
struct CheckoutState {
    log: Vec<String>,
    confirmed: Vec<u64>,
}

#[derive(Clone)]
struct CheckoutEnvironment {
    decline: bool,
}

#[derive(Clone)]
struct CheckoutReducer;

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::Start { id } => {
                state.log.push(format!("start:{id}"));
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(CheckoutAction::Held { id })
                }))]
            },
            CheckoutAction::Held { id } => {
                state.log.push(format!("held:{id}"));
                let decline = env.decline;
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    if decline {
                        Some(CheckoutAction::Declined { id })
                    } else {
                        Some(CheckoutAction::Charged { id })
                    }
                }))]
            },
            CheckoutAction::Charged { id } => {
                state.log.push(format!("charged:{id}"));
                smallvec![Effect::Future(Box::pin(async move {
                    Some(CheckoutAction::Confirmed { id })
                }))]
            },
            CheckoutAction::Confirmed { id } => {
                state.confirmed.push(id);
                smallvec![Effect::None]
            },
            CheckoutAction::Declined { id } => {
                state.log.push(format!("declined:{id}"));
                smallvec![Effect::None]
            },
            CheckoutAction::Ping => smallvec![Effect::Delay {
                duration: Duration::from_millis(10),
                action: Box::new(CheckoutAction::Pong),
            }],
            CheckoutAction::Pong => smallvec![Effect::None],
        }
    }
}

fn store(decline: bool) -> Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer> {
    Store::new(
        CheckoutState::default(),
        CheckoutReducer,
        CheckoutEnvironment { decline },
    )
}

const fn is_terminal(action: &CheckoutAction) -> bool {
    matches!(
        action,
        CheckoutAction::Confirmed { .. } | CheckoutAction::Declined { .. }
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn wait_for_terminal_action_after_multi_step_flow() {
    let store = store(false);

    let result = store
        .send_and_wait_for(CheckoutAction::Start { id: 7 }, is_terminal, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, CheckoutAction::Confirmed { id: 7 });
    // The terminal action is already applied when the wait resolves.
    assert_eq!(store.state(|s| s.confirmed.clone()).await, vec![7]);
    assert_eq!(
        store.state(|s| s.log.clone()).await,
        vec!["start:7", "held:7", "charged:7"]
    );
}

#[tokio::test]
async fn wait_for_failure_branch() {
    let store = store(true);

    let result = store
        .send_and_wait_for(CheckoutAction::Start { id: 3 }, is_terminal, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, CheckoutAction::Declined { id: 3 });
    assert!(store.state(|s| s.confirmed.is_empty()).await);
}

#[tokio::test]
async fn wait_times_out_when_nothing_matches() {
    let store = store(false);

    let result = store
        .send_and_wait_for(
            CheckoutAction::Start { id: 1 },
            |a| matches!(a, CheckoutAction::Declined { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert_eq!(result.unwrap_err(), StoreError::Timeout);
}

#[tokio::test]
async fn concurrent_waiters_filter_by_id() {
    let store = Arc::new(store(false));

    let mut handles = Vec::new();
    for id in 1..=4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    CheckoutAction::Start { id },
                    move |a| matches!(a, CheckoutAction::Confirmed { id: done } if *done == id),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (index, handle) in handles.into_iter().enumerate() {
        let id = u64::try_from(index).unwrap() + 1;
        let result = handle.await.expect("task panicked").unwrap();
        assert_eq!(result, CheckoutAction::Confirmed { id });
    }

    let mut confirmed = store.state(|s| s.confirmed.clone()).await;
    confirmed.sort_unstable();
    assert_eq!(confirmed, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn initial_actions_are_not_broadcast() {
    let store = store(false);
    let mut rx = store.subscribe_actions();

    store.send(CheckoutAction::Ping).await.unwrap();

    let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for delayed action")
        .expect("channel closed");
    assert_eq!(action, CheckoutAction::Pong);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn every_subscriber_sees_every_effect_action() {
    let store = store(false);
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    store
        .send_and_wait_for(CheckoutAction::Start { id: 9 }, is_terminal, Duration::from_secs(1))
        .await
        .unwrap();

    let drain = |rx: &mut tokio::sync::broadcast::Receiver<CheckoutAction>| {
        std::iter::from_fn(|| rx.try_recv().ok()).collect::<Vec<_>>()
    };
    let seen_first = drain(&mut first);
    let seen_second = drain(&mut second);

    assert_eq!(seen_first.len(), 3);
    assert!(seen_first.contains(&CheckoutAction::Held { id: 9 }));
    assert!(seen_first.contains(&CheckoutAction::Charged { id: 9 }));
    assert!(seen_first.contains(&CheckoutAction::Confirmed { id: 9 }));
    assert_eq!(seen_first, seen_second);
}
