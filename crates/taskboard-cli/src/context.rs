use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskboard_core::{AppConfig, TaskboardError, TaskboardResult};
use taskboard_domain::{BoardScope, ProjectId, Sprint, SprintId, Task, TaskId};
use taskboard_engine::BoardManager;
use taskboard_persistence::{JsonFileRemote, TaskRemote};

/// One CLI invocation's view of the store: the JSON remote, a board manager
/// over it and the user's config.
pub struct CliContext {
    pub board: BoardManager,
    remote: Arc<JsonFileRemote>,
    config: AppConfig,
}

impl CliContext {
    /// `--file` wins over the config's `store_path`.
    pub fn open(file: Option<PathBuf>, config: AppConfig) -> anyhow::Result<Self> {
        let path = file.or_else(|| config.store_path.clone()).ok_or_else(|| {
            anyhow::anyhow!("--file is required (or set TASKBOARD_FILE, or store_path in config)")
        })?;
        tracing::debug!("Opening store {}", path.display());

        let remote = Arc::new(JsonFileRemote::new(&path));
        let board = BoardManager::new(remote.clone());
        Ok(Self {
            board,
            remote,
            config,
        })
    }

    pub fn store_path(&self) -> &Path {
        self.remote.path()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Load the sprint board when a sprint is given, otherwise every task.
    pub async fn load_board(&self, sprint_id: Option<SprintId>) -> TaskboardResult<()> {
        let scope = sprint_id.map_or(BoardScope::Unscoped, BoardScope::Sprint);
        self.board.load(scope).await
    }

    pub fn project_id(&self, explicit: Option<ProjectId>) -> anyhow::Result<ProjectId> {
        explicit
            .or(self.config.default_project_id)
            .ok_or_else(|| anyhow::anyhow!("--project-id is required (or set default_project_id in config)"))
    }

    pub fn task(&self, id: TaskId) -> TaskboardResult<Task> {
        self.board
            .get(id)
            .ok_or_else(|| TaskboardError::NotFound(format!("Task {}", id)))
    }

    pub async fn list_sprints(&self, project_id: ProjectId) -> TaskboardResult<Vec<Sprint>> {
        self.remote.list_sprints(project_id).await
    }

    pub async fn create_sprint(&self, sprint: Sprint) -> TaskboardResult<Sprint> {
        self.remote.create_sprint(sprint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn test_file_flag_overrides_config() {
        let dir = tempdir().unwrap();
        let config = AppConfig {
            store_path: Some(dir.path().join("config.json")),
            ..Default::default()
        };
        let ctx = CliContext::open(Some(dir.path().join("flag.json")), config).unwrap();
        assert_eq!(ctx.store_path(), dir.path().join("flag.json"));
    }

    #[test]
    fn test_missing_store_path_is_an_error() {
        assert!(CliContext::open(None, AppConfig::default()).is_err());
    }

    #[test]
    fn test_project_falls_back_to_config() {
        let dir = tempdir().unwrap();
        let default_project = Uuid::new_v4();
        let config = AppConfig {
            default_project_id: Some(default_project),
            ..Default::default()
        };
        let ctx = CliContext::open(Some(dir.path().join("t.json")), config).unwrap();

        assert_eq!(ctx.project_id(None).unwrap(), default_project);
        let explicit = Uuid::new_v4();
        assert_eq!(ctx.project_id(Some(explicit)).unwrap(), explicit);
    }
}
