use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use taskboard_core::{TaskboardError, TaskboardResult};
use uuid::Uuid;

use crate::field_update::FieldUpdate;
use crate::sprint::{ProjectId, SprintId};

pub type TaskId = Uuid;

/// Column a task occupies. The board has exactly one column per variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Position of this status in the fixed column layout.
    pub fn index(&self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(TaskboardError::Validation(format!(
                "Unknown status '{}'. Expected one of: todo, in_progress, done",
                other
            ))),
        }
    }
}

/// Cycle at which a recurring task regenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    Weekly,
    /// Fixed 30-day step, not calendar-month aware.
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn offset_days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub fn next_due(&self, due: NaiveDate) -> NaiveDate {
        due + Duration::days(self.offset_days())
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = TaskboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(TaskboardError::Validation(format!(
                "Unknown recurrence '{}'. Expected one of: daily, weekly, monthly",
                other
            ))),
        }
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_due_date(s: &str) -> TaskboardResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        TaskboardError::Validation(format!(
            "Invalid date '{}'. Expected a calendar date as YYYY-MM-DD",
            s
        ))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub order: f64,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// First task of the recurring series this task was generated from.
    #[serde(default)]
    pub recurrence_parent: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn from_draft(id: TaskId, draft: TaskDraft, order: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: draft.title,
            content: draft.content,
            status: draft.status,
            due: draft.due,
            tags: draft.tags,
            recurrence: draft.recurrence,
            created_by: draft.created_by,
            assigned_to: draft.assigned_to,
            order,
            sprint_id: draft.sprint_id,
            project_id: draft.project_id,
            recurrence_parent: draft.recurrence_parent,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> TaskboardResult<()> {
        validate_title(&self.title)?;
        validate_order(self.order)
    }

    /// Return a copy placed in `column`. Siblings are reordered by the board, not here.
    pub fn move_to_column(&self, column: TaskStatus) -> Self {
        let mut moved = self.clone();
        moved.status = column;
        moved.updated_at = Utc::now();
        moved
    }

    /// Identifier shared by every occurrence of a recurring series.
    pub fn series_id(&self) -> TaskId {
        self.recurrence_parent.unwrap_or(self.id)
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        patch.content.apply_to(&mut self.content);
        if let Some(status) = patch.status {
            self.status = status;
        }
        patch.due.apply_to(&mut self.due);
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        patch.recurrence.apply_to(&mut self.recurrence);
        patch.created_by.apply_to(&mut self.created_by);
        patch.assigned_to.apply_to(&mut self.assigned_to);
        if let Some(order) = patch.order {
            self.order = order;
        }
        patch.sprint_id.apply_to(&mut self.sprint_id);
        self.updated_at = Utc::now();
    }

    /// Draft that recreates this task, keeping every field but the id.
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            status: self.status,
            due: self.due,
            tags: self.tags.clone(),
            recurrence: self.recurrence,
            created_by: self.created_by.clone(),
            assigned_to: self.assigned_to.clone(),
            sprint_id: self.sprint_id,
            project_id: self.project_id,
            recurrence_parent: self.recurrence_parent,
        }
    }
}

/// Payload for creating a task. The store assigns id, order and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub recurrence_parent: Option<TaskId>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_sprint(mut self, sprint_id: SprintId) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }

    pub fn validate(&self) -> TaskboardResult<()> {
        validate_title(&self.title)
    }
}

/// Partial update for a task.
///
/// Optional fields use [`FieldUpdate`] so a patch can distinguish "leave as is"
/// from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub content: FieldUpdate<String>,
    pub status: Option<TaskStatus>,
    pub due: FieldUpdate<NaiveDate>,
    pub tags: Option<BTreeSet<String>>,
    pub recurrence: FieldUpdate<Recurrence>,
    pub created_by: FieldUpdate<String>,
    pub assigned_to: FieldUpdate<String>,
    pub order: Option<f64>,
    pub sprint_id: FieldUpdate<SprintId>,
}

impl TaskPatch {
    /// Patch sent to the store after a drag between columns.
    pub fn placement(status: TaskStatus, order: f64) -> Self {
        Self {
            status: Some(status),
            order: Some(order),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> TaskboardResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(order) = self.order {
            validate_order(order)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn validate_title(title: &str) -> TaskboardResult<()> {
    if title.trim().is_empty() {
        return Err(TaskboardError::Validation(
            "Task title must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_order(order: f64) -> TaskboardResult<()> {
    if !order.is_finite() {
        return Err(TaskboardError::Validation(format!(
            "Task order must be a finite number, got {}",
            order
        )));
    }
    Ok(())
}
