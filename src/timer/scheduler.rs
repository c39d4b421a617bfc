use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// Set to true to log every scheduled/cancelled ticker
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

/// What a tick callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

pub type TickFn = Box<dyn FnMut() -> TickControl + Send + 'static>;

/// Source of periodic ticks.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, interval: Duration, on_tick: TickFn) -> TickHandle;
}

/// Open/closed flag that tick bodies run under.
///
/// Closing takes the same lock a running tick holds, so `close` waits for an
/// in-flight tick and no tick body starts afterwards.
#[derive(Clone)]
pub struct TickGate {
    open: Arc<Mutex<bool>>,
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TickGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(Mutex::new(true)),
        }
    }

    /// Runs `on_tick` if the gate is still open. Returns `None` when closed.
    pub fn run(&self, on_tick: &mut TickFn) -> Option<TickControl> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return None;
        }
        let control = on_tick();
        if control == TickControl::Stop {
            *open = false;
        }
        Some(control)
    }

    pub fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned handle to a running ticker. Dropping it cancels the ticker.
pub struct TickHandle {
    gate: TickGate,
    token: CancellationToken,
}

impl TickHandle {
    pub fn new(gate: TickGate, token: CancellationToken) -> Self {
        Self { gate, token }
    }

    /// Stops the ticker. Once this returns no further tick body runs, and any
    /// tick that was mid-flight has finished.
    ///
    /// Must not be called from inside a tick callback.
    pub fn cancel(&self) {
        self.gate.close();
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Ticks driven by the tokio timer. Must be used inside a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, interval: Duration, mut on_tick: TickFn) -> TickHandle {
        let gate = TickGate::new();
        let token = CancellationToken::new();

        let task_gate = gate.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            // First tick one full interval after scheduling, not immediately.
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        match task_gate.run(&mut on_tick) {
                            Some(TickControl::Continue) => {}
                            Some(TickControl::Stop) | None => break,
                        }
                    }
                }
            }
            log_debug!("ticker stopped");
        });

        log_info!("ticker scheduled every {interval:?}");
        TickHandle::new(gate, token)
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counting(counter: &Arc<AtomicU32>, stop_after: u32) -> TickFn {
        let counter = Arc::clone(counter);
        Box::new(move || {
            let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if seen >= stop_after {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let _handle = TokioScheduler.schedule(Duration::from_secs(1), counting(&counter, u32::MAX));

        time::sleep(Duration::from_millis(900)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(2_200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_fires_after_cancel_returns() {
        let counter = Arc::new(AtomicU32::new(0));
        let handle = TokioScheduler.schedule(Duration::from_secs(1), counting(&counter, u32::MAX));

        time::sleep(Duration::from_millis(2_500)).await;
        handle.cancel();
        let at_cancel = counter.load(Ordering::SeqCst);
        assert_eq!(at_cancel, 2);
        assert!(!handle.is_active());

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_stop_its_own_ticker() {
        let counter = Arc::new(AtomicU32::new(0));
        let handle = TokioScheduler.schedule(Duration::from_secs(1), counting(&counter, 3));

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let counter = Arc::new(AtomicU32::new(0));
        drop(TokioScheduler.schedule(Duration::from_secs(1), counting(&counter, u32::MAX)));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closed_gate_skips_the_callback() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut on_tick = counting(&counter, u32::MAX);
        let gate = TickGate::new();

        assert_eq!(gate.run(&mut on_tick), Some(TickControl::Continue));
        gate.close();
        assert_eq!(gate.run(&mut on_tick), None);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
