//! Project records and creation-time helpers.
//!
//! The stored layout keeps the target duration as `{ minutes, seconds }`
//! under `duration`; in memory it is a single count of seconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProjectError;

use super::Run;

const DEFAULT_PROJECT_NAME: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(rename = "duration", with = "minutes_seconds")]
    pub target_secs: u32,
    pub word_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
    /// Completion order; only ever appended to.
    #[serde(default)]
    pub runs: Vec<Run>,
}

/// Input for creating a project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub minutes: u32,
    pub seconds: u32,
    pub word_count: u32,
    pub script_name: Option<String>,
}

impl NewProject {
    pub fn into_project(self) -> Result<Project, ProjectError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }

        let (minutes, seconds) = normalize_duration(self.minutes, self.seconds);
        let target_secs = minutes.saturating_mul(60).saturating_add(seconds);
        if target_secs == 0 {
            return Err(ProjectError::ZeroDuration);
        }

        Ok(Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            target_secs,
            word_count: self.word_count,
            script_name: self.script_name.filter(|script| !script.trim().is_empty()),
            runs: Vec::new(),
        })
    }
}

/// Carries whole minutes out of a seconds entry above 59.
pub fn normalize_duration(minutes: u32, seconds: u32) -> (u32, u32) {
    if seconds > 59 {
        (minutes.saturating_add(seconds / 60), seconds % 60)
    } else {
        (minutes, seconds)
    }
}

/// First of `Untitled`, `Untitled 1`, `Untitled 2`, ... not already taken.
pub fn suggest_name(existing: &[Project]) -> String {
    let taken = |candidate: &str| existing.iter().any(|project| project.name == candidate);

    let mut candidate = DEFAULT_PROJECT_NAME.to_string();
    let mut counter = 1;
    while taken(&candidate) {
        candidate = format!("{DEFAULT_PROJECT_NAME} {counter}");
        counter += 1;
    }
    candidate
}

mod minutes_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct MinutesSeconds {
        minutes: u32,
        seconds: u32,
    }

    pub fn serialize<S: Serializer>(total_secs: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        MinutesSeconds {
            minutes: total_secs / 60,
            seconds: total_secs % 60,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = MinutesSeconds::deserialize(deserializer)?;
        Ok(value
            .minutes
            .saturating_mul(60)
            .saturating_add(value.seconds))
    }
}
