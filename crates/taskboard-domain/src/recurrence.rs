//! Recurring task planning.
//!
//! The sweep is a pure function of the tasks on the board and today's date:
//! every recurring task due today yields one draft for its next occurrence,
//! unless an occurrence of the same series with that due date already exists.
//! Running it repeatedly, or from several sessions, never plans duplicates.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::{Task, TaskDraft, TaskId};

/// A follow-up occurrence to create.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOccurrence {
    /// Task whose due date triggered the occurrence.
    pub source: TaskId,
    pub draft: TaskDraft,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurrencePlan {
    pub occurrences: Vec<PlannedOccurrence>,
    /// Recurring tasks due today whose next occurrence already exists.
    pub skipped_existing: usize,
}

impl RecurrencePlan {
    /// Drop planned occurrences that already exist among `tasks`, typically
    /// the store's full task set when the plan came from a scoped board.
    pub fn without_existing<'a, I>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let existing: HashSet<(TaskId, NaiveDate)> = tasks
            .into_iter()
            .filter_map(|t| t.due.map(|due| (t.series_id(), due)))
            .collect();

        let before = self.occurrences.len();
        self.occurrences.retain(|occurrence| {
            match (occurrence.draft.recurrence_parent, occurrence.draft.due) {
                (Some(series), Some(due)) => !existing.contains(&(series, due)),
                _ => true,
            }
        });
        self.skipped_existing += before - self.occurrences.len();
        self
    }
}

/// Plan the next occurrence of every recurring task due on `today`.
pub fn plan_occurrences<'a, I>(tasks: I, today: NaiveDate) -> RecurrencePlan
where
    I: IntoIterator<Item = &'a Task>,
{
    let tasks: Vec<&Task> = tasks.into_iter().collect();
    let mut existing: HashSet<(TaskId, NaiveDate)> = tasks
        .iter()
        .filter_map(|t| t.due.map(|due| (t.series_id(), due)))
        .collect();

    let mut plan = RecurrencePlan::default();
    for task in tasks {
        let (Some(recurrence), Some(due)) = (task.recurrence, task.due) else {
            continue;
        };
        if due != today {
            continue;
        }

        let next_due = recurrence.next_due(due);
        let series = task.series_id();
        if !existing.insert((series, next_due)) {
            plan.skipped_existing += 1;
            continue;
        }

        let mut draft = task.to_draft();
        draft.due = Some(next_due);
        draft.recurrence_parent = Some(series);
        plan.occurrences.push(PlannedOccurrence {
            source: task.id,
            draft,
        });
    }
    plan
}
