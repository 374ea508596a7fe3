//! Dashboard analytics derived from board state.
//!
//! Nothing here is cached; every figure is recomputed from the tasks passed in.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Board, Sprint, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: TaskStatus,
    pub count: usize,
    /// Whole percent of all tasks on the board. Shares need not sum to 100.
    pub percent: u32,
}

/// One entry per column, in column order.
pub fn status_distribution(board: &Board) -> Vec<StatusShare> {
    let total = board.len();
    board
        .columns()
        .iter()
        .map(|column| StatusShare {
            status: column.status,
            count: column.len(),
            percent: percent_of(column.len(), total),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub count: usize,
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Tasks due on each of the seven days of the week containing `week_start`,
/// Monday first.
pub fn due_date_heatmap<'a, I>(tasks: I, week_start: NaiveDate) -> Vec<HeatmapDay>
where
    I: IntoIterator<Item = &'a Task>,
{
    let monday = week_start_of(week_start);
    let mut days: Vec<HeatmapDay> = (0..7)
        .map(|offset| HeatmapDay {
            date: monday + Duration::days(offset),
            count: 0,
        })
        .collect();

    for due in tasks.into_iter().filter_map(|t| t.due) {
        let offset = (due - monday).num_days();
        if (0..7).contains(&offset) {
            days[offset as usize].count += 1;
        }
    }
    days
}

/// Completion summary for a sprint dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintProgress {
    pub sprint_id: crate::SprintId,
    pub total: usize,
    pub done: usize,
    pub percent: u32,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    /// Open tasks whose due date is before the reference date.
    pub overdue: usize,
}

/// Summarize the tasks scheduled in `sprint` as of `reference`.
///
/// Tasks outside the sprint are ignored, so callers can pass a whole board.
pub fn sprint_progress<'a, I>(sprint: &Sprint, tasks: I, reference: NaiveDate) -> SprintProgress
where
    I: IntoIterator<Item = &'a Task>,
{
    let scheduled: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| t.sprint_id == Some(sprint.id))
        .collect();
    let total = scheduled.len();
    let done = scheduled.iter().filter(|t| t.is_done()).count();
    let overdue = scheduled
        .iter()
        .filter(|t| !t.is_done() && t.due.is_some_and(|due| due < reference))
        .count();

    let duration = sprint.duration_days();
    let days_elapsed = ((reference - sprint.start_date).num_days() + 1).clamp(0, duration);

    SprintProgress {
        sprint_id: sprint.id,
        total,
        done,
        percent: percent_of(done, total),
        days_elapsed,
        days_remaining: sprint.days_remaining(reference),
        overdue,
    }
}

fn percent_of(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}
