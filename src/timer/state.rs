use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::launcher::LaunchParams;
use crate::models::Run;

use super::display::{format_clock, ColorHint};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    /// Reached zero (countdown) or the target (stopwatch). Only `reset` or a
    /// mode toggle leaves this phase.
    Expired,
}

impl TimerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::Expired => "expired",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Countdown,
    Stopwatch,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Countdown => "countdown",
            TimerMode::Stopwatch => "stopwatch",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TimerMode::Countdown => TimerMode::Stopwatch,
            TimerMode::Stopwatch => TimerMode::Countdown,
        }
    }

    /// Clock value a fresh session starts from.
    pub fn zero_point(self, target_secs: u32) -> u32 {
        match self {
            TimerMode::Countdown => target_secs,
            TimerMode::Stopwatch => 0,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "countdown" => Ok(TimerMode::Countdown),
            "stopwatch" => Ok(TimerMode::Stopwatch),
            other => Err(format!("unknown timer mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Reset,
    ToggleMode,
    Lap,
    Save,
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerCommand::Start => "start",
            TimerCommand::Pause => "pause",
            TimerCommand::Resume => "resume",
            TimerCommand::Reset => "reset",
            TimerCommand::ToggleMode => "toggle mode",
            TimerCommand::Lap => "record a lap",
            TimerCommand::Save => "save",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub sequence_number: u32,
    pub time_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not running; nothing changed.
    Ignored,
    Advanced,
    /// This tick was the terminal one.
    Expired,
}

/// In-memory state of one rehearsal, from launch until it is saved or
/// abandoned.
#[derive(Debug, Clone)]
pub struct TimerSession {
    pub mode: TimerMode,
    pub phase: TimerPhase,
    pub target_secs: u32,
    /// Value on the clock: seconds remaining for a countdown, seconds elapsed
    /// for a stopwatch. Always within `0..=target_secs`.
    pub clock_secs: u32,
    pub laps: Vec<Lap>,
    pub project_id: Option<String>,
    pub run_name: String,
}

impl TimerSession {
    pub fn new(params: LaunchParams) -> Self {
        Self {
            mode: params.mode,
            phase: TimerPhase::Idle,
            target_secs: params.target_secs,
            clock_secs: params.mode.zero_point(params.target_secs),
            laps: Vec::new(),
            project_id: params.project_id,
            run_name: params.name,
        }
    }

    pub fn is_quick_start(&self) -> bool {
        self.project_id.is_none()
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(TimerCommand::Start, TimerPhase::Idle, TimerPhase::Running)
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        self.transition(TimerCommand::Pause, TimerPhase::Running, TimerPhase::Paused)
    }

    pub fn resume(&mut self) -> Result<(), TransitionError> {
        self.transition(TimerCommand::Resume, TimerPhase::Paused, TimerPhase::Running)
    }

    /// Back to idle at the mode's zero point. A no-op when already idle.
    pub fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
        self.clock_secs = self.mode.zero_point(self.target_secs);
        self.laps.clear();
    }

    /// Flips countdown/stopwatch from any phase and resets the clock.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.reset();
    }

    pub fn lap(&mut self) -> Result<Lap, TransitionError> {
        if self.phase != TimerPhase::Running {
            return Err(TransitionError::InvalidTransition {
                from: self.phase,
                command: TimerCommand::Lap,
            });
        }

        let lap = Lap {
            sequence_number: self.laps.len() as u32 + 1,
            time_label: format_clock(self.time_spent()),
        };
        self.laps.push(lap.clone());
        Ok(lap)
    }

    /// Advances the clock by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Ignored;
        }

        match self.mode {
            TimerMode::Countdown => {
                if self.clock_secs <= 1 {
                    self.clock_secs = 0;
                    self.phase = TimerPhase::Expired;
                    return TickOutcome::Expired;
                }
                self.clock_secs -= 1;
            }
            TimerMode::Stopwatch => {
                if self.clock_secs >= self.target_secs.saturating_sub(1) {
                    self.clock_secs = self.target_secs;
                    self.phase = TimerPhase::Expired;
                    return TickOutcome::Expired;
                }
                self.clock_secs += 1;
            }
        }
        TickOutcome::Advanced
    }

    /// Seconds actually rehearsed, whichever way the clock runs.
    pub fn time_spent(&self) -> u32 {
        match self.mode {
            TimerMode::Countdown => self.target_secs.saturating_sub(self.clock_secs),
            TimerMode::Stopwatch => self.clock_secs,
        }
    }

    pub fn color_hint(&self) -> ColorHint {
        ColorHint::classify(self.mode, self.clock_secs, self.target_secs)
    }

    /// The run to commit for this session, paired with its project id.
    /// Quick-start sessions have nothing to commit.
    pub fn build_run(&self, completed_at: DateTime<Utc>) -> Option<(String, Run)> {
        let project_id = self.project_id.clone()?;
        let run = Run::new(
            self.run_name.clone(),
            completed_at,
            self.time_spent(),
            self.mode,
        );
        Some((project_id, run))
    }

    fn transition(
        &mut self,
        command: TimerCommand,
        from: TimerPhase,
        to: TimerPhase,
    ) -> Result<(), TransitionError> {
        if self.phase != from {
            return Err(TransitionError::InvalidTransition {
                from: self.phase,
                command,
            });
        }
        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(mode: TimerMode, target_secs: u32) -> TimerSession {
        TimerSession::new(LaunchParams {
            target_secs,
            mode,
            project_id: Some("p1".into()),
            name: "Run #1".into(),
        })
    }

    fn advance(session: &mut TimerSession, ticks: u32) {
        for _ in 0..ticks {
            session.tick();
        }
    }

    #[test]
    fn fresh_sessions_start_idle_at_the_zero_point() {
        let countdown = session(TimerMode::Countdown, 90);
        assert_eq!(countdown.phase, TimerPhase::Idle);
        assert_eq!(countdown.clock_secs, 90);

        let stopwatch = session(TimerMode::Stopwatch, 90);
        assert_eq!(stopwatch.clock_secs, 0);
    }

    #[test]
    fn countdown_expires_at_zero_after_target_ticks() {
        for target in [1, 2, 10, 61] {
            let mut s = session(TimerMode::Countdown, target);
            s.start().unwrap();
            advance(&mut s, target - 1);
            assert_eq!(s.phase, TimerPhase::Running);
            assert_eq!(s.clock_secs, 1);

            assert_eq!(s.tick(), TickOutcome::Expired);
            assert_eq!(s.phase, TimerPhase::Expired);
            assert_eq!(s.clock_secs, 0);
        }
    }

    #[test]
    fn stopwatch_expires_at_target_after_target_ticks() {
        for target in [1, 2, 10, 61] {
            let mut s = session(TimerMode::Stopwatch, target);
            s.start().unwrap();
            advance(&mut s, target - 1);
            assert_eq!(s.phase, TimerPhase::Running);

            assert_eq!(s.tick(), TickOutcome::Expired);
            assert_eq!(s.phase, TimerPhase::Expired);
            assert_eq!(s.clock_secs, target);
        }
    }

    #[test]
    fn ticks_after_expiry_are_ignored() {
        let mut s = session(TimerMode::Countdown, 2);
        s.start().unwrap();
        advance(&mut s, 2);
        assert_eq!(s.tick(), TickOutcome::Ignored);
        assert_eq!(s.clock_secs, 0);
    }

    #[test]
    fn start_from_expired_requires_reset() {
        let mut s = session(TimerMode::Countdown, 1);
        s.start().unwrap();
        s.tick();

        assert_eq!(
            s.start(),
            Err(TransitionError::InvalidTransition {
                from: TimerPhase::Expired,
                command: TimerCommand::Start,
            })
        );

        s.reset();
        assert_eq!(s.phase, TimerPhase::Idle);
        assert_eq!(s.clock_secs, 1);
        assert!(s.start().is_ok());
    }

    #[test]
    fn pausing_preserves_time() {
        let mut paused = session(TimerMode::Stopwatch, 100);
        paused.start().unwrap();
        advance(&mut paused, 7);
        paused.pause().unwrap();
        advance(&mut paused, 5);
        assert_eq!(paused.clock_secs, 7);
        paused.resume().unwrap();
        advance(&mut paused, 3);

        let mut straight = session(TimerMode::Stopwatch, 100);
        straight.start().unwrap();
        advance(&mut straight, 10);

        assert_eq!(paused.clock_secs, straight.clock_secs);
        assert_eq!(paused.phase, straight.phase);
    }

    #[test]
    fn toggle_resets_clock_and_laps_from_every_phase() {
        let setups: [fn(&mut TimerSession); 4] = [
            |_| {},
            |s| {
                s.start().unwrap();
                s.tick();
                s.lap().unwrap();
            },
            |s| {
                s.start().unwrap();
                s.tick();
                s.lap().unwrap();
                s.pause().unwrap();
            },
            |s| {
                s.start().unwrap();
                for _ in 0..5 {
                    s.tick();
                }
            },
        ];

        for setup in setups {
            let mut s = session(TimerMode::Countdown, 5);
            setup(&mut s);
            s.toggle_mode();
            assert_eq!(s.mode, TimerMode::Stopwatch);
            assert_eq!(s.phase, TimerPhase::Idle);
            assert_eq!(s.clock_secs, 0);
            assert!(s.laps.is_empty());

            s.toggle_mode();
            assert_eq!(s.mode, TimerMode::Countdown);
            assert_eq!(s.clock_secs, 5);
        }
    }

    #[test]
    fn laps_only_while_running() {
        let mut s = session(TimerMode::Countdown, 300);
        assert!(s.lap().is_err());

        s.start().unwrap();
        advance(&mut s, 65);
        let lap = s.lap().unwrap();
        assert_eq!(lap.sequence_number, 1);
        assert_eq!(lap.time_label, "01:05");

        s.pause().unwrap();
        assert!(s.lap().is_err());
        assert_eq!(s.laps.len(), 1);

        s.resume().unwrap();
        s.tick();
        assert_eq!(s.lap().unwrap().sequence_number, 2);
    }

    #[test]
    fn reset_clears_laps_and_returns_to_zero_point() {
        let mut s = session(TimerMode::Stopwatch, 30);
        s.start().unwrap();
        advance(&mut s, 4);
        s.lap().unwrap();
        s.reset();

        assert_eq!(s.phase, TimerPhase::Idle);
        assert_eq!(s.clock_secs, 0);
        assert!(s.laps.is_empty());
    }

    #[test]
    fn countdown_with_pause_records_full_target() {
        let mut s = session(TimerMode::Countdown, 10);
        s.start().unwrap();
        advance(&mut s, 4);
        assert_eq!(s.clock_secs, 6);
        s.pause().unwrap();
        s.resume().unwrap();
        advance(&mut s, 6);

        assert_eq!(s.phase, TimerPhase::Expired);
        assert_eq!(s.clock_secs, 0);

        let (project_id, run) = s.build_run(Utc::now()).unwrap();
        assert_eq!(project_id, "p1");
        assert_eq!(run.duration, 10);
        assert_eq!(run.run_type, TimerMode::Countdown);
    }

    #[test]
    fn stopwatch_saved_early_records_elapsed() {
        let mut s = session(TimerMode::Stopwatch, 300);
        s.start().unwrap();
        advance(&mut s, 120);

        let (_, run) = s.build_run(Utc::now()).unwrap();
        assert_eq!(run.duration, 120);
        assert_eq!(run.run_type, TimerMode::Stopwatch);
        assert_eq!(run.name, "Run #1");
    }

    #[test]
    fn quick_start_builds_no_run() {
        let s = TimerSession::new(LaunchParams {
            target_secs: 60,
            mode: TimerMode::Countdown,
            project_id: None,
            name: "Quick Start".into(),
        });
        assert!(s.is_quick_start());
        assert!(s.build_run(Utc::now()).is_none());
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Stopwatch".parse::<TimerMode>(), Ok(TimerMode::Stopwatch));
        assert!("lap".parse::<TimerMode>().is_err());
    }
}
