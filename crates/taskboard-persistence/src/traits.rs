use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use taskboard_core::TaskboardResult;
use taskboard_domain::{ProjectId, Sprint, Task, TaskDraft, TaskId, TaskPatch, TaskQuery};
use uuid::Uuid;

/// Metadata written alongside every save of the store file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// ID of the instance that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Request/response contract of the store that owns tasks and sprints.
///
/// The board engine treats the remote as the source of truth: ids, default
/// ranks and timestamps of created tasks come from here.
#[async_trait]
pub trait TaskRemote: Send + Sync {
    /// Tasks matching `query`. An empty query returns every task.
    async fn list_tasks(&self, query: &TaskQuery) -> TaskboardResult<Vec<Task>>;

    /// Create a task, assigning its id, timestamps and a rank at the end of
    /// its status column.
    async fn create_task(&self, draft: TaskDraft) -> TaskboardResult<Task>;

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> TaskboardResult<Task>;

    async fn delete_task(&self, id: TaskId) -> TaskboardResult<()>;

    /// Sprints of a project, earliest start first.
    async fn list_sprints(&self, project_id: ProjectId) -> TaskboardResult<Vec<Sprint>>;

    async fn create_sprint(&self, sprint: Sprint) -> TaskboardResult<Sprint>;
}

/// Notices when another process rewrites the store file, so a long-running
/// session can reload its board.
#[async_trait]
pub trait ChangeDetector: Send + Sync {
    async fn start_watching(&self, path: PathBuf) -> TaskboardResult<()>;

    async fn stop_watching(&self) -> TaskboardResult<()>;

    /// Receiver that yields a [`ChangeEvent`] each time the file is written.
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent>;

    fn is_watching(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub detected_at: DateTime<Utc>,
}
