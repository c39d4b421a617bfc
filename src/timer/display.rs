use serde::Serialize;

use super::TimerMode;

/// Stopwatch progress at which the clock leaves the safe band.
const WARNING_PROGRESS: f64 = 0.7;
/// Once no more than this many seconds remain, the stopwatch is critical.
const CRITICAL_REMAINING_SECS: u32 = 60;

/// Colour band for the running clock.
///
/// Only the stopwatch is classified; a countdown always reports `Neutral`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ColorHint {
    Neutral,
    Safe,
    Warning,
    Critical,
}

impl ColorHint {
    pub fn classify(mode: TimerMode, clock_secs: u32, target_secs: u32) -> Self {
        if mode == TimerMode::Countdown {
            return ColorHint::Neutral;
        }
        if target_secs == 0 {
            return ColorHint::Critical;
        }

        let progress = f64::from(clock_secs) / f64::from(target_secs);
        let remaining = target_secs.saturating_sub(clock_secs);
        if progress < WARNING_PROGRESS {
            ColorHint::Safe
        } else if remaining > CRITICAL_REMAINING_SECS {
            ColorHint::Warning
        } else {
            ColorHint::Critical
        }
    }
}

/// `MM:SS`, as shown on the timer face and in lap labels.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `M:SS`, as shown in run history.
pub fn format_run_duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
