use async_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::phase::{PhaseClock, SignalPhaseState};

#[derive(Default)]
struct DriverState {
    clock: Option<PhaseClock>,
    subscribers: Vec<Sender<SignalPhaseState>>,
}

impl DriverState {
    fn emit(&mut self, state: SignalPhaseState) {
        self.subscribers.retain(|tx| tx.try_send(state).is_ok());
    }
}

fn lock(state: &Mutex<DriverState>) -> MutexGuard<'_, DriverState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Advances a [`PhaseClock`] by one second per tick and publishes the countdown.
///
/// Stopping is synchronous: once [`stop`](Self::stop) returns no further state
/// reaches any subscriber, and the clock is discarded.
pub struct PhaseDriver {
    state: Arc<Mutex<DriverState>>,
    task: Option<JoinHandle<()>>,
}

impl PhaseDriver {
    /// Must be called inside a tokio runtime.
    pub fn start(clock: PhaseClock, period: Duration) -> Self {
        let state = Arc::new(Mutex::new(DriverState {
            clock: Some(clock),
            subscribers: vec![],
        }));

        let task = tokio::spawn(tick_loop(state.clone(), period));

        Self {
            state,
            task: Some(task),
        }
    }

    /// The receiver immediately holds the current state.
    pub fn subscribe(&self) -> Receiver<SignalPhaseState> {
        let (tx, rx) = async_channel::unbounded();
        let mut state = lock(&self.state);

        if let Some(current) = state.clock.as_ref().and_then(|c| c.state().ok()) {
            let _ = tx.try_send(current);
            state.subscribers.push(tx);
        }

        rx
    }

    pub fn current(&self) -> Option<SignalPhaseState> {
        lock(&self.state).clock.as_ref().and_then(|c| c.state().ok())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).clock.is_some()
    }

    pub fn stop(&mut self) {
        {
            let mut state = lock(&self.state);
            state.clock = None;
            state.subscribers.clear();
        }

        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("phase driver stopped");
        }
    }
}

impl Drop for PhaseDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(state: Arc<Mutex<DriverState>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut state = lock(&state);
        let Some(clock) = state.clock.as_mut() else {
            break;
        };
        let current = clock.tick();
        state.emit(current);
    }
}
