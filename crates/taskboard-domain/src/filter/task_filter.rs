use serde::{Deserialize, Serialize};

use crate::sprint::{ProjectId, SprintId};
use crate::Task;

/// Trait for filtering tasks by various criteria.
pub trait TaskFilter: Send + Sync {
    /// Returns true if the task matches the filter criteria.
    fn matches(&self, task: &Task) -> bool;
}

/// Filter tasks scheduled in a sprint.
pub struct SprintFilter {
    sprint_id: SprintId,
}

impl SprintFilter {
    pub fn new(sprint_id: SprintId) -> Self {
        Self { sprint_id }
    }
}

impl TaskFilter for SprintFilter {
    fn matches(&self, task: &Task) -> bool {
        task.sprint_id == Some(self.sprint_id)
    }
}

/// Filter tasks belonging to a project.
pub struct ProjectFilter {
    project_id: ProjectId,
}

impl ProjectFilter {
    pub fn new(project_id: ProjectId) -> Self {
        Self { project_id }
    }
}

impl TaskFilter for ProjectFilter {
    fn matches(&self, task: &Task) -> bool {
        task.project_id == Some(self.project_id)
    }
}

/// Filter tasks assigned to someone (case-insensitive exact match).
pub struct AssigneeFilter {
    assignee: String,
}

impl AssigneeFilter {
    pub fn new(assignee: impl Into<String>) -> Self {
        Self {
            assignee: assignee.into().to_lowercase(),
        }
    }
}

impl TaskFilter for AssigneeFilter {
    fn matches(&self, task: &Task) -> bool {
        task.assigned_to
            .as_deref()
            .is_some_and(|a| a.to_lowercase() == self.assignee)
    }
}

/// Combine multiple filters with AND logic.
#[derive(Default)]
pub struct CompositeFilter {
    filters: Vec<Box<dyn TaskFilter>>,
}

impl CompositeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Box<dyn TaskFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl TaskFilter for CompositeFilter {
    fn matches(&self, task: &Task) -> bool {
        self.filters.iter().all(|f| f.matches(task))
    }
}

/// Restriction passed to the store when listing tasks. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl TaskQuery {
    pub fn for_sprint(sprint_id: SprintId) -> Self {
        Self {
            sprint_id: Some(sprint_id),
            ..Default::default()
        }
    }

    pub fn to_filter(&self) -> CompositeFilter {
        let mut filter = CompositeFilter::new();
        if let Some(id) = self.sprint_id {
            filter = filter.with_filter(Box::new(SprintFilter::new(id)));
        }
        if let Some(id) = self.project_id {
            filter = filter.with_filter(Box::new(ProjectFilter::new(id)));
        }
        if let Some(assignee) = &self.assigned_to {
            filter = filter.with_filter(Box::new(AssigneeFilter::new(assignee.clone())));
        }
        filter
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.to_filter().matches(task)
    }
}
