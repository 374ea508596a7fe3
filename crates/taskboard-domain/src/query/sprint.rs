//! Sprint-specific query functions.
//!
//! [`resolve_active_sprint`] decides which sprint a dashboard should show for a
//! date. It keeps no state, so callers re-run it whenever the sprint list or
//! the reference date changes.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::{Sprint, SprintId, Task};

/// Pick the sprint to treat as active on `reference`.
///
/// In priority order:
/// 1. a sprint whose window contains the date, earliest start first;
/// 2. otherwise the most recently concluded sprint (latest end);
/// 3. otherwise the first upcoming sprint (earliest start).
///
/// Remaining ties go to the smallest id. Returns `None` for an empty list.
pub fn resolve_active_sprint(sprints: &[Sprint], reference: NaiveDate) -> Option<&Sprint> {
    let by_start = |a: &&Sprint, b: &&Sprint| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.id.cmp(&b.id))
    };

    let current = sprints
        .iter()
        .filter(|s| s.contains(reference))
        .min_by(by_start);
    if current.is_some() {
        return current;
    }

    let concluded = sprints
        .iter()
        .filter(|s| s.end_date < reference)
        .min_by(|a, b| latest_end_first(a, b));
    if concluded.is_some() {
        return concluded;
    }

    sprints.iter().min_by(by_start)
}

fn latest_end_first(a: &Sprint, b: &Sprint) -> Ordering {
    b.end_date.cmp(&a.end_date).then_with(|| a.id.cmp(&b.id))
}

/// Tasks scheduled in a sprint.
pub fn sprint_tasks(sprint_id: SprintId, tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.sprint_id == Some(sprint_id))
        .collect()
}
