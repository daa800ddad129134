// src/session/countdown.rs

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::{SessionHandle, SessionRegistry, SessionState, Tick};
use crate::config::{AUTO_SUBMIT_ATTEMPTS, AUTO_SUBMIT_RETRY_DELAY};
use crate::store::SharedStore;

/// `interval` rejects a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Drives a session's countdown: one `tick` per `period` until the session
/// leaves `InProgress`. On expiry the captured answers are written, retrying
/// transient store failures a bounded number of times.
pub fn spawn_countdown(
    handle: SessionHandle,
    store: SharedStore,
    registry: SessionRegistry,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run_countdown(handle, store, registry, period))
}

async fn run_countdown(
    handle: SessionHandle,
    store: SharedStore,
    registry: SessionRegistry,
    period: Duration,
) {
    if period < MIN_PERIOD {
        tracing::warn!("Countdown period {:?} is too short, using {:?}", period, MIN_PERIOD);
    }
    let mut ticker = interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let mut session = handle.lock().await;
        match session.tick() {
            Tick::Counting(_) => continue,
            Tick::Idle => return,
            Tick::Expired => break,
        }
    }

    // The lock is held for one attempt at a time, never across the retry delay.
    for attempt in 1..=AUTO_SUBMIT_ATTEMPTS {
        let mut session = handle.lock().await;
        let err = match session.submit(store.as_ref()).await {
            Ok(_) => {
                if session.state() == SessionState::Submitted {
                    registry.remove(&session.id());
                }
                return;
            }
            Err(e) => e,
        };
        let id = session.id();
        drop(session);

        if err.is_retriable() && attempt < AUTO_SUBMIT_ATTEMPTS {
            tracing::warn!(
                session = %id,
                "Auto-submit failed, retrying in {:?}... (Attempt {})",
                AUTO_SUBMIT_RETRY_DELAY,
                attempt
            );
            tokio::time::sleep(AUTO_SUBMIT_RETRY_DELAY).await;
        } else {
            tracing::error!(session = %id, "Auto-submit gave up, awaiting manual retry: {}", err);
            return;
        }
    }
}
