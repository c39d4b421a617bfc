pub mod controller;
pub mod display;
pub mod scheduler;
pub mod state;

pub use controller::{CommitOutcome, TimerController, TimerEvent, TimerSnapshot};
pub use display::{format_clock, format_run_duration, ColorHint};
pub use scheduler::{Scheduler, TickControl, TickHandle, TokioScheduler};
pub use state::{Lap, TickOutcome, TimerCommand, TimerMode, TimerPhase, TimerSession};
