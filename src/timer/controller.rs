use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    error::{StoreError, TransitionError},
    launcher::LaunchParams,
    models::Run,
    store::{KeyValueStore, ProjectStore},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

use super::{
    display::{format_clock, ColorHint},
    scheduler::{Scheduler, TickControl, TickHandle},
    state::{Lap, TickOutcome, TimerMode, TimerPhase, TimerSession},
};

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub mode: TimerMode,
    pub clock_secs: u32,
    pub target_secs: u32,
    pub time_spent_secs: u32,
    /// Clock formatted as `MM:SS`.
    pub display: String,
    pub color: ColorHint,
    pub laps: Vec<Lap>,
    pub run_name: String,
    pub quick_start: bool,
}

impl From<&TimerSession> for TimerSnapshot {
    fn from(session: &TimerSession) -> Self {
        Self {
            phase: session.phase,
            mode: session.mode,
            clock_secs: session.clock_secs,
            target_secs: session.target_secs,
            time_spent_secs: session.time_spent(),
            display: format_clock(session.clock_secs),
            color: session.color_hint(),
            laps: session.laps.clone(),
            run_name: session.run_name.clone(),
            quick_start: session.is_quick_start(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// The clock moved by one second.
    Tick(TimerSnapshot),
    /// The terminal tick fired. Raised once per expiry.
    Expired,
}

/// Result of committing a finished session.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Quick-start sessions are never persisted.
    Skipped,
    Saved(Run),
    /// The run was lost; the session has ended anyway.
    Failed(StoreError),
}

struct SessionSlot {
    session: TimerSession,
    ended: bool,
}

/// Live handle to one rehearsal session.
///
/// Clones share the same session. Ticks come from the injected
/// [`Scheduler`]; every command that stops the clock cancels the ticker
/// before touching session state.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<SessionSlot>>,
    ticker: Arc<Mutex<Option<TickHandle>>>,
    scheduler: Arc<dyn Scheduler>,
    events: mpsc::UnboundedSender<TimerEvent>,
    tick_interval: Duration,
}

impl TimerController {
    /// Each tick counts as one second, so `tick_interval` should be one
    /// second outside tests.
    pub fn new(
        params: LaunchParams,
        scheduler: Arc<dyn Scheduler>,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            state: Arc::new(Mutex::new(SessionSlot {
                session: TimerSession::new(params),
                ended: false,
            })),
            ticker: Arc::new(Mutex::new(None)),
            scheduler,
            events,
            tick_interval,
        };
        (controller, receiver)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from(&self.lock_state().session)
    }

    pub fn start(&self) -> Result<TimerSnapshot, TransitionError> {
        let snapshot = self.with_session(|session| session.start())?;
        self.spawn_ticker();
        log_info!("Timer started ({}, {}s)", snapshot.mode, snapshot.target_secs);
        Ok(snapshot)
    }

    pub fn pause(&self) -> Result<TimerSnapshot, TransitionError> {
        self.ensure_live()?;
        self.cancel_ticker();
        self.with_session(|session| session.pause())
    }

    pub fn resume(&self) -> Result<TimerSnapshot, TransitionError> {
        let snapshot = self.with_session(|session| session.resume())?;
        self.spawn_ticker();
        Ok(snapshot)
    }

    /// Start, pause or resume depending on the current phase.
    pub fn toggle_pause(&self) -> Result<TimerSnapshot, TransitionError> {
        match self.snapshot().phase {
            TimerPhase::Idle | TimerPhase::Expired => self.start(),
            TimerPhase::Running => self.pause(),
            TimerPhase::Paused => self.resume(),
        }
    }

    pub fn reset(&self) -> Result<TimerSnapshot, TransitionError> {
        self.ensure_live()?;
        self.cancel_ticker();
        self.with_session(|session| {
            session.reset();
            Ok(())
        })
    }

    pub fn toggle_mode(&self) -> Result<TimerSnapshot, TransitionError> {
        self.ensure_live()?;
        self.cancel_ticker();
        let snapshot = self.with_session(|session| {
            session.toggle_mode();
            Ok(())
        })?;
        log_info!("Timer switched to {}", snapshot.mode);
        Ok(snapshot)
    }

    pub fn lap(&self) -> Result<Lap, TransitionError> {
        let mut slot = self.lock_state();
        if slot.ended {
            return Err(TransitionError::SessionEnded);
        }
        slot.session.lap()
    }

    /// Ends the session and, for project runs, appends the run to `store`.
    ///
    /// The session ends whether or not the append succeeds.
    pub async fn save<K: KeyValueStore>(
        &self,
        store: &ProjectStore<K>,
    ) -> Result<CommitOutcome, TransitionError> {
        self.cancel_ticker();

        let pending = {
            let mut slot = self.lock_state();
            if slot.ended {
                return Err(TransitionError::SessionEnded);
            }
            slot.ended = true;
            slot.session.build_run(Utc::now())
        };

        let Some((project_id, run)) = pending else {
            log_info!("Quick-start session ended without saving");
            return Ok(CommitOutcome::Skipped);
        };

        match store.append_run(&project_id, run.clone()).await {
            Ok(()) => Ok(CommitOutcome::Saved(run)),
            Err(err) => {
                log_error!("Failed to save {} for project {}: {}", run.name, project_id, err);
                Ok(CommitOutcome::Failed(err))
            }
        }
    }

    /// Ends the session without persisting anything.
    pub fn abandon(&self) {
        self.cancel_ticker();
        self.lock_state().ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.lock_state().ended
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionSlot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<(), TransitionError> {
        if self.lock_state().ended {
            Err(TransitionError::SessionEnded)
        } else {
            Ok(())
        }
    }

    fn with_session<F>(&self, apply: F) -> Result<TimerSnapshot, TransitionError>
    where
        F: FnOnce(&mut TimerSession) -> Result<(), TransitionError>,
    {
        let mut slot = self.lock_state();
        if slot.ended {
            return Err(TransitionError::SessionEnded);
        }
        apply(&mut slot.session)?;
        Ok(TimerSnapshot::from(&slot.session))
    }

    fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = ticker_guard.take() {
            handle.cancel();
        }

        let state = Arc::clone(&self.state);
        let events = self.events.clone();

        let handle = self.scheduler.schedule(
            self.tick_interval,
            Box::new(move || {
                let (outcome, snapshot) = {
                    let mut slot = state.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.ended {
                        return TickControl::Stop;
                    }
                    let outcome = slot.session.tick();
                    (outcome, TimerSnapshot::from(&slot.session))
                };

                match outcome {
                    TickOutcome::Ignored => TickControl::Stop,
                    TickOutcome::Advanced => {
                        let _ = events.send(TimerEvent::Tick(snapshot));
                        TickControl::Continue
                    }
                    TickOutcome::Expired => {
                        log_info!("Time's up for {}", snapshot.run_name);
                        let _ = events.send(TimerEvent::Tick(snapshot));
                        let _ = events.send(TimerEvent::Expired);
                        TickControl::Stop
                    }
                }
            }),
        );

        *ticker_guard = Some(handle);
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.cancel();
        }
    }
}
