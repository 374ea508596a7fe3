use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskboard_core::{TaskboardError, TaskboardResult};
use uuid::Uuid;

pub type SprintId = Uuid;
pub type ProjectId = Uuid;

/// Where a sprint sits relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintPhase {
    Upcoming,
    Current,
    Concluded,
}

/// A sprint window. Both `start_date` and `end_date` are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Sprint {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            start_date,
            end_date,
        }
    }

    pub fn validate(&self) -> TaskboardResult<()> {
        if self.name.trim().is_empty() {
            return Err(TaskboardError::Validation(
                "Sprint name must not be empty".to_string(),
            ));
        }
        if self.start_date > self.end_date {
            return Err(TaskboardError::Validation(format!(
                "Sprint '{}' starts on {} after it ends on {}",
                self.name, self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn phase(&self, date: NaiveDate) -> SprintPhase {
        if date < self.start_date {
            SprintPhase::Upcoming
        } else if date > self.end_date {
            SprintPhase::Concluded
        } else {
            SprintPhase::Current
        }
    }

    /// Inclusive length of the window in days.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Days left after `date`, clamped to `0..=duration_days`.
    pub fn days_remaining(&self, date: NaiveDate) -> i64 {
        (self.end_date - date)
            .num_days()
            .clamp(0, self.duration_days())
    }
}
