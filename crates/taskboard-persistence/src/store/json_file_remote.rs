use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{PersistenceMetadata, TaskRemote};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taskboard_core::{TaskboardError, TaskboardResult};
use taskboard_domain::{
    rank_between, ProjectId, Sprint, Task, TaskDraft, TaskFilter, TaskId, TaskPatch, TaskQuery,
    TaskStatus,
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const FORMAT_VERSION: u32 = 1;

/// Everything the store owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub sprints: Vec<Sprint>,
}

/// On-disk layout of the store file
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: StoreData,
}

/// [`TaskRemote`] backed by a single JSON file.
///
/// Every call re-reads the file, so edits made by other processes are seen
/// on the next request. Writes within this process are serialized; each one
/// replaces the file atomically.
#[derive(Debug)]
pub struct JsonFileRemote {
    path: PathBuf,
    instance_id: Uuid,
    write_lock: Mutex<()>,
}

impl JsonFileRemote {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    /// Create a store with a specific instance ID
    /// (useful for testing or coordinating across instances)
    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            write_lock: Mutex::new(()),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents. A missing file is an empty store.
    pub async fn read_data(&self) -> TaskboardResult<StoreData> {
        let Some(bytes) = AtomicWriter::read_optional(&self.path).await? else {
            tracing::debug!("No store at {}, starting empty", self.path.display());
            return Ok(StoreData::default());
        };

        let envelope: JsonEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| TaskboardError::Serialization(e.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(TaskboardError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }
        Ok(envelope.data)
    }

    async fn write_data(&self, data: StoreData) -> TaskboardResult<PersistenceMetadata> {
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata: PersistenceMetadata::new(self.instance_id),
            data,
        };
        let json_bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| TaskboardError::Serialization(e.to_string()))?;

        AtomicWriter::write_atomic(&self.path, &json_bytes).await?;

        tracing::info!(
            "Saved {} tasks and {} sprints to {}",
            envelope.data.tasks.len(),
            envelope.data.sprints.len(),
            self.path.display()
        );
        Ok(envelope.metadata)
    }
}

fn end_of_column(tasks: &[Task], status: TaskStatus) -> f64 {
    let last = tasks
        .iter()
        .filter(|t| t.status == status)
        .map(|t| t.order)
        .max_by(f64::total_cmp);
    rank_between(last, None)
}

fn task_not_found(id: TaskId) -> TaskboardError {
    TaskboardError::NotFound(format!("Task {} not found", id))
}

#[async_trait::async_trait]
impl TaskRemote for JsonFileRemote {
    async fn list_tasks(&self, query: &TaskQuery) -> TaskboardResult<Vec<Task>> {
        let data = self.read_data().await?;
        let filter = query.to_filter();
        Ok(data
            .tasks
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect())
    }

    async fn create_task(&self, draft: TaskDraft) -> TaskboardResult<Task> {
        draft.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut data = self.read_data().await?;
        let order = end_of_column(&data.tasks, draft.status);
        let task = Task::from_draft(Uuid::new_v4(), draft, order);
        data.tasks.push(task.clone());
        self.write_data(data).await?;

        tracing::info!("Created task {} '{}'", task.id, task.title);
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> TaskboardResult<Task> {
        patch.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut data = self.read_data().await?;
        let task = data
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| task_not_found(id))?;
        task.apply_patch(patch);
        task.validate()?;
        let updated = task.clone();
        self.write_data(data).await?;

        tracing::info!("Updated task {}", id);
        Ok(updated)
    }

    async fn delete_task(&self, id: TaskId) -> TaskboardResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut data = self.read_data().await?;
        let index = data
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| task_not_found(id))?;
        data.tasks.remove(index);
        self.write_data(data).await?;

        tracing::info!("Deleted task {}", id);
        Ok(())
    }

    async fn list_sprints(&self, project_id: ProjectId) -> TaskboardResult<Vec<Sprint>> {
        let data = self.read_data().await?;
        let mut sprints: Vec<Sprint> = data
            .sprints
            .into_iter()
            .filter(|s| s.project_id == project_id)
            .collect();
        sprints.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(sprints)
    }

    async fn create_sprint(&self, sprint: Sprint) -> TaskboardResult<Sprint> {
        sprint.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut data = self.read_data().await?;
        if data.sprints.iter().any(|s| s.id == sprint.id) {
            return Err(TaskboardError::Validation(format!(
                "Sprint {} already exists",
                sprint.id
            )));
        }
        data.sprints.push(sprint.clone());
        self.write_data(data).await?;

        tracing::info!("Created sprint {} '{}'", sprint.id, sprint.name);
        Ok(sprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskboard_domain::FieldUpdate;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileRemote::new(dir.path().join("tasks.json"));

        assert!(store.list_tasks(&TaskQuery::default()).await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_end_of_column_rank() {
        let dir = tempdir().unwrap();
        let store = JsonFileRemote::new(dir.path().join("tasks.json"));

        let first = store.create_task(TaskDraft::new("First")).await.unwrap();
        let second = store.create_task(TaskDraft::new("Second")).await.unwrap();
        let mut done = TaskDraft::new("Done already");
        done.status = TaskStatus::Done;
        let done = store.create_task(done).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.order, 0.0);
        assert_eq!(second.order, 1.0);
        assert_eq!(done.order, 0.0);
        assert_eq!(store.list_tasks(&TaskQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_file_uses_versioned_envelope() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let instance_id = Uuid::new_v4();
        let store = JsonFileRemote::with_instance_id(&path, instance_id);
        store.create_task(TaskDraft::new("Saved")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["metadata"]["instance_id"], instance_id.to_string());
        assert_eq!(raw["data"]["tasks"][0]["title"], "Saved");
        assert_eq!(raw["data"]["tasks"][0]["status"], "todo");
    }

    #[tokio::test]
    async fn test_unsupported_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let envelope = serde_json::json!({
            "version": 7,
            "metadata": { "instance_id": Uuid::new_v4(), "saved_at": "2024-01-01T00:00:00Z" },
            "data": {}
        });
        std::fs::write(&path, envelope.to_string()).unwrap();

        let err = JsonFileRemote::new(&path)
            .list_tasks(&TaskQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskboardError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let dir = tempdir().unwrap();
        let store = JsonFileRemote::new(dir.path().join("tasks.json"));
        let task = store.create_task(TaskDraft::new("Draft")).await.unwrap();

        let patch = TaskPatch {
            title: Some("Final".into()),
            due: FieldUpdate::Set(date(2024, 5, 1)),
            ..Default::default()
        };
        let updated = store.update_task(task.id, patch).await.unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.due, Some(date(2024, 5, 1)));

        store.delete_task(task.id).await.unwrap();
        assert!(store.list_tasks(&TaskQuery::default()).await.unwrap().is_empty());

        let err = store.delete_task(task.id).await.unwrap_err();
        assert!(matches!(err, TaskboardError::NotFound(_)));
        let err = store
            .update_task(task.id, TaskPatch::placement(TaskStatus::Done, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskboardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_tasks_applies_query() {
        let dir = tempdir().unwrap();
        let store = JsonFileRemote::new(dir.path().join("tasks.json"));
        let sprint_id = Uuid::new_v4();
        store
            .create_task(TaskDraft::new("Scheduled").with_sprint(sprint_id))
            .await
            .unwrap();
        store.create_task(TaskDraft::new("Backlog")).await.unwrap();

        let scheduled = store
            .list_tasks(&TaskQuery::for_sprint(sprint_id))
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].title, "Scheduled");
    }

    #[tokio::test]
    async fn test_sprints_are_listed_per_project_by_start() {
        let dir = tempdir().unwrap();
        let store = JsonFileRemote::new(dir.path().join("tasks.json"));
        let project = Uuid::new_v4();

        store
            .create_sprint(Sprint::new(project, "S2", date(2024, 1, 15), date(2024, 1, 28)))
            .await
            .unwrap();
        store
            .create_sprint(Sprint::new(project, "S1", date(2024, 1, 1), date(2024, 1, 14)))
            .await
            .unwrap();
        store
            .create_sprint(Sprint::new(Uuid::new_v4(), "Other", date(2024, 1, 1), date(2024, 1, 2)))
            .await
            .unwrap();

        let names: Vec<_> = store
            .list_sprints(project)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["S1", "S2"]);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = JsonFileRemote::new(&path);

        assert!(store.create_task(TaskDraft::new(" ")).await.unwrap_err().is_validation());
        let backwards = Sprint::new(Uuid::new_v4(), "Bad", date(2024, 2, 1), date(2024, 1, 1));
        assert!(store.create_sprint(backwards).await.unwrap_err().is_validation());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_all_kept() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileRemote::new(dir.path().join("tasks.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create_task(TaskDraft::new(format!("T{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let tasks = store.list_tasks(&TaskQuery::default()).await.unwrap();
        assert_eq!(tasks.len(), 8);
    }
}
