use thiserror::Error;

use crate::timer::{TimerCommand, TimerPhase};

/// Failures surfaced by the project store.
///
/// These are recovered at the store's callers: a failed load degrades to an
/// empty list and a failed commit is reported without blocking exit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project storage is unavailable: {0}")]
    StorageUnavailable(String),

    #[error("project {0} not found")]
    NotFound(String),

    #[error("failed to write projects: {0}")]
    StorageWriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {command} while the timer is {from}")]
    InvalidTransition {
        from: TimerPhase,
        command: TimerCommand,
    },

    #[error("the session has already ended")]
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("run duration must be greater than zero")]
    ZeroDuration,

    #[error("run name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("please enter a project name")]
    EmptyName,

    #[error("please enter a duration")]
    ZeroDuration,
}
