//! Read-side queries over tasks and sprints.

pub mod sprint;

pub use sprint::{resolve_active_sprint, sprint_tasks};
