#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskboard_core::{TaskboardError, TaskboardResult};
use taskboard_domain::{
    rank_between, ProjectId, Sprint, Task, TaskDraft, TaskId, TaskPatch, TaskQuery,
};
use taskboard_engine::BoardManager;
use taskboard_persistence::TaskRemote;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Store requests in the order they reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(String),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
}

/// In-memory store whose writes can be failed or held back on demand.
#[derive(Default)]
pub struct ScriptedRemote {
    tasks: Mutex<Vec<Task>>,
    sprints: Mutex<Vec<Sprint>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    entered: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let remote = Self::default();
        *remote.tasks.lock() = tasks;
        Arc::new(remote)
    }

    pub fn add_sprint(&self, sprint: Sprint) {
        self.sprints.lock().push(sprint);
    }

    pub fn stored(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Writes that have reached the store, including ones held at the gate.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every write until released.
    pub fn hold_writes(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held writes through, in arrival order.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(n);
        }
    }

    pub fn release_all(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.add_permits(1024);
        }
    }

    async fn pass_gate(&self) -> TaskboardResult<()> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| TaskboardError::Internal(e.to_string()))?
                .forget();
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TaskboardError::Internal("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRemote for ScriptedRemote {
    async fn list_tasks(&self, query: &TaskQuery) -> TaskboardResult<Vec<Task>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TaskboardError::Internal("store unreachable".to_string()));
        }
        Ok(self
            .tasks
            .lock()
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn create_task(&self, draft: TaskDraft) -> TaskboardResult<Task> {
        let title = draft.title.clone();
        let result = self.pass_gate().await;
        self.calls.lock().push(Call::Create(title));
        result?;

        let mut tasks = self.tasks.lock();
        let last = tasks
            .iter()
            .filter(|t| t.status == draft.status)
            .map(|t| t.order)
            .max_by(f64::total_cmp);
        let task = Task::from_draft(Uuid::new_v4(), draft, rank_between(last, None));
        tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> TaskboardResult<Task> {
        let result = self.pass_gate().await;
        self.calls.lock().push(Call::Update(id, patch.clone()));
        result?;

        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskboardError::NotFound(id.to_string()))?;
        task.apply_patch(patch);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> TaskboardResult<()> {
        let result = self.pass_gate().await;
        self.calls.lock().push(Call::Delete(id));
        result?;

        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(TaskboardError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_sprints(&self, project_id: ProjectId) -> TaskboardResult<Vec<Sprint>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TaskboardError::Internal("store unreachable".to_string()));
        }
        Ok(self
            .sprints
            .lock()
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_sprint(&self, sprint: Sprint) -> TaskboardResult<Sprint> {
        self.sprints.lock().push(sprint.clone());
        Ok(sprint)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn stored_task(title: &str, status: taskboard_domain::TaskStatus, order: f64) -> Task {
    let mut task = Task::from_draft(Uuid::new_v4(), TaskDraft::new(title), order);
    task.status = status;
    task
}

pub async fn loaded_board(remote: &Arc<ScriptedRemote>) -> BoardManager {
    let board = BoardManager::new(remote.clone());
    board
        .load(taskboard_domain::BoardScope::Unscoped)
        .await
        .unwrap();
    board
}

/// Give spawned settle tasks a chance to run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn titles(board: &BoardManager, status: taskboard_domain::TaskStatus) -> Vec<String> {
    board
        .snapshot()
        .column(status)
        .tasks
        .iter()
        .map(|t| t.title.clone())
        .collect()
}
