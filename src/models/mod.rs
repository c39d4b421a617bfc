pub mod project;
pub mod run;

pub use project::{normalize_duration, suggest_name, NewProject, Project};
pub use run::{run_label, Run};
