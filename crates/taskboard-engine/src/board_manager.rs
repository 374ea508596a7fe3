//! Session-owned board with optimistic writes.
//!
//! Every write follows the same two phases: the change is applied to the local
//! board at once, then the store call runs in the background and either
//! confirms the change (adopting the store's copy of the task) or rolls it
//! back. Store calls for one task are serialized through a [`MutationQueue`],
//! but a write that has to wait is still shown on the board immediately.
//!
//! Each task with unsettled writes keeps a ledger: the store's last known
//! copy of the task plus the writes layered on top of it. Settling a write or
//! reloading the board rebuilds the task from its ledger, so a rollback undoes
//! only the failed write and a reload never loses a write still in flight.
//!
//! Board state sits behind a synchronous mutex that is never held across an
//! `.await`, so each apply and each settle step is atomic.

use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use taskboard_core::{TaskboardError, TaskboardResult};
use taskboard_domain::{
    due_date_heatmap, resolve_active_sprint, search_board, status_distribution, Board,
    BoardScope, HeatmapDay, ProjectId, Rerank, Sprint, StatusShare, Task, TaskDraft, TaskId,
    TaskPatch, TaskQuery, TaskStatus,
};
use taskboard_persistence::TaskRemote;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::mutation_queue::{MutationPermit, MutationQueue};
use crate::pending::PendingWrite;

type Settled = oneshot::Sender<TaskboardResult<Task>>;

/// A change as the caller asked for it, replayable on any copy of the task.
#[derive(Debug, Clone)]
enum Change {
    Create { task: Task, draft: TaskDraft },
    Move { to: TaskStatus, index: usize },
    Update(TaskPatch),
    Delete,
}

/// Store request that confirms an applied change.
#[derive(Debug, Clone)]
enum RemoteCall {
    Create(TaskDraft),
    /// `reranked` are siblings renumbered to make room for the task.
    Update {
        patch: TaskPatch,
        reranked: Vec<Rerank>,
    },
    /// Carries the task as it was removed, which is what the caller gets back.
    Delete(Task),
}

#[derive(Debug)]
struct PendingChange {
    seq: u64,
    change: Change,
    /// Request derived the last time the change was applied. `None` when the
    /// change no longer alters the task.
    call: Option<RemoteCall>,
    settled: Settled,
}

/// Unsettled writes on one task over the store's last known copy of it.
#[derive(Debug, Default)]
struct Ledger {
    /// `None` while a create is unconfirmed, or once the task left the store
    /// or the board's scope.
    base: Option<Task>,
    writes: VecDeque<PendingChange>,
}

enum Staged {
    Unchanged(Task),
    Pending,
}

#[derive(Debug, Default)]
struct BoardState {
    board: Board,
    /// Keyed by the id the task has on the board.
    ledgers: HashMap<TaskId, Ledger>,
    /// Temporary ids of confirmed creates, mapped to the store's ids.
    aliases: HashMap<TaskId, TaskId>,
    next_seq: u64,
    unsettled: usize,
}

impl BoardState {
    fn resolve(&self, id: TaskId) -> TaskId {
        self.aliases.get(&id).copied().unwrap_or(id)
    }

    /// Apply `change` to the board and record it in the task's ledger.
    fn stage(&mut self, id: TaskId, change: Change, settled: Settled) -> TaskboardResult<Staged> {
        let base = if self.ledgers.contains_key(&id) {
            None
        } else {
            self.board.get(id).cloned()
        };

        let Some(call) = apply_change(&mut self.board, id, &change)? else {
            let task = self.board.get(id).cloned().ok_or_else(|| not_on_board(id))?;
            return Ok(Staged::Unchanged(task));
        };

        self.next_seq += 1;
        self.unsettled += 1;
        let seq = self.next_seq;
        let ledger = self.ledgers.entry(id).or_insert_with(|| Ledger {
            base,
            writes: VecDeque::new(),
        });
        ledger.writes.push_back(PendingChange {
            seq,
            change,
            call: Some(call),
            settled,
        });
        Ok(Staged::Pending)
    }

    /// Sequence number and request of the oldest unsettled write on `id`.
    fn next_write(&self, id: TaskId) -> Option<(u64, Option<RemoteCall>)> {
        self.ledgers
            .get(&id)
            .and_then(|ledger| ledger.writes.front())
            .map(|write| (write.seq, write.call.clone()))
    }

    fn take_write(&mut self, id: TaskId, seq: u64) -> (Ledger, Option<PendingChange>) {
        let mut ledger = self.ledgers.remove(&id).unwrap_or_default();
        let write = ledger
            .writes
            .iter()
            .position(|w| w.seq == seq)
            .and_then(|i| ledger.writes.remove(i));
        (ledger, write)
    }

    fn finish(&mut self, write: PendingChange, result: TaskboardResult<Task>) {
        self.unsettled -= 1;
        let _ = write.settled.send(result);
    }

    /// Settle a write that turned into a no-op while it waited.
    fn settle_unchanged(&mut self, id: TaskId, seq: u64) {
        let (ledger, write) = self.take_write(id, seq);
        if !ledger.writes.is_empty() {
            self.ledgers.insert(id, ledger);
        }
        if let Some(write) = write {
            let result = self.board.get(id).cloned().ok_or_else(|| not_on_board(id));
            self.finish(write, result);
        }
    }

    /// Fold the store's answer for write `seq` into the ledger and rebuild the
    /// task from it.
    fn settle(&mut self, id: TaskId, seq: u64, call: RemoteCall, response: TaskboardResult<Task>) {
        let (mut ledger, write) = self.take_write(id, seq);
        if write.is_none() && response.is_err() {
            // Already settled by a replay that found the task gone.
            if !ledger.writes.is_empty() {
                self.ledgers.insert(id, ledger);
            }
            return;
        }

        let result = match (call, response) {
            (RemoteCall::Create(_), Ok(task)) => {
                self.board.remove(id);
                self.aliases.insert(id, task.id);
                ledger.base = Some(task.clone());
                self.rebuild(task.id, ledger, &[]);
                tracing::info!("Created task {} (was {})", task.id, id);
                Ok(task)
            }
            (RemoteCall::Delete(removed), Ok(_)) => {
                ledger.base = None;
                self.rebuild(id, ledger, &[]);
                self.aliases.retain(|_, target| *target != id);
                tracing::info!("Confirmed delete of task {}", id);
                Ok(removed)
            }
            (RemoteCall::Update { .. }, Ok(task)) => {
                ledger.base = Some(task.clone());
                self.rebuild(id, ledger, &[]);
                tracing::info!("Confirmed write to task {}", id);
                Ok(task)
            }
            (call, Err(e)) => {
                let reranked: &[Rerank] = match &call {
                    RemoteCall::Update { reranked, .. } => reranked.as_slice(),
                    _ => &[],
                };
                self.rebuild(id, ledger, reranked);
                tracing::warn!("Write to task {} rolled back: {}", id, e);
                Err(e)
            }
        };

        if let Some(write) = write {
            self.finish(write, result);
        }
    }

    /// Undo the local effect of every write in `ledger`, then replay the
    /// writes over its base. `rolled_back` are re-ranks of a write that has
    /// just failed and is no longer in the ledger.
    fn rebuild(&mut self, id: TaskId, ledger: Ledger, rolled_back: &[Rerank]) {
        for write in ledger.writes.iter().rev() {
            if let Some(RemoteCall::Update { reranked, .. }) = &write.call {
                self.board.revert_reranks(reranked);
            }
        }
        self.board.revert_reranks(rolled_back);
        self.replay(id, ledger);
    }

    /// Put the ledger's base on the board and re-apply its writes in order.
    ///
    /// A write that no longer applies (its task is gone) settles with the
    /// error at once.
    fn replay(&mut self, id: TaskId, mut ledger: Ledger) {
        self.board.remove(id);
        if let Some(base) = &ledger.base {
            if self.board.scope().query().matches(base) {
                self.board.insert_ranked(base.clone());
            }
        }

        let writes = std::mem::take(&mut ledger.writes);
        for mut write in writes {
            match apply_change(&mut self.board, id, &write.change) {
                Ok(call) => {
                    write.call = call;
                    ledger.writes.push_back(write);
                }
                Err(e) => {
                    tracing::debug!("Dropping write {} to task {}: {}", write.seq, id, e);
                    self.finish(write, Err(e));
                }
            }
        }

        if !ledger.writes.is_empty() {
            self.ledgers.insert(id, ledger);
        }
    }

    /// Record a sibling's confirmed rank.
    fn adopt(&mut self, task: Task) {
        match self.ledgers.get_mut(&task.id) {
            Some(ledger) => {
                if let Some(base) = &mut ledger.base {
                    base.order = task.order;
                }
            }
            None => {
                self.board.replace(task.id, task);
            }
        }
    }
}

struct Inner {
    remote: Arc<dyn TaskRemote>,
    state: Mutex<BoardState>,
    queue: MutationQueue,
}

/// One board as seen by one session.
///
/// Cloning is cheap and yields another handle to the same board. Write methods
/// spawn onto the current tokio runtime and must be called from within one.
#[derive(Clone)]
pub struct BoardManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BoardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BoardManager")
            .field("scope", &state.board.scope())
            .field("tasks", &state.board.len())
            .field("unsettled", &state.unsettled)
            .finish()
    }
}

impl BoardManager {
    pub fn new(remote: Arc<dyn TaskRemote>) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                state: Mutex::new(BoardState::default()),
                queue: MutationQueue::new(),
            }),
        }
    }

    /// Replace the board with the tasks the store holds for `scope`.
    ///
    /// Writes still in flight are re-applied on top of the fresh tasks. On
    /// failure the previous board stays in place untouched.
    pub async fn load(&self, scope: BoardScope) -> TaskboardResult<()> {
        let tasks = self
            .inner
            .remote
            .list_tasks(&scope.query())
            .await
            .map_err(|e| {
                tracing::warn!("Failed to load board {:?}: {}", scope, e);
                TaskboardError::remote_read(e)
            })?;

        let count = tasks.len();
        let mut state = self.inner.state.lock();
        state.board = Board::from_tasks(scope, tasks);

        let mut ledgers: Vec<_> = std::mem::take(&mut state.ledgers).into_iter().collect();
        ledgers.sort_by_key(|(_, ledger)| ledger.writes.front().map(|w| w.seq));
        for (id, mut ledger) in ledgers {
            // A ledger without a base is an unconfirmed create.
            if ledger.base.is_some() {
                ledger.base = state.board.get(id).cloned();
            }
            state.replay(id, ledger);
        }

        tracing::info!(
            "Loaded {} tasks for {:?} ({} writes unsettled)",
            count,
            scope,
            state.unsettled
        );
        Ok(())
    }

    /// Reload the current scope.
    pub async fn refresh(&self) -> TaskboardResult<()> {
        self.load(self.scope()).await
    }

    /// Every task the store holds, whatever the board's scope.
    pub async fn fetch_all(&self) -> TaskboardResult<Vec<Task>> {
        self.inner
            .remote
            .list_tasks(&TaskQuery::default())
            .await
            .map_err(TaskboardError::remote_read)
    }

    /// Resolve the project's active sprint for `reference` and load its tasks.
    ///
    /// A project without sprints loads the unscoped board.
    pub async fn load_active_sprint(
        &self,
        project_id: ProjectId,
        reference: NaiveDate,
    ) -> TaskboardResult<Option<Sprint>> {
        let sprints = self
            .inner
            .remote
            .list_sprints(project_id)
            .await
            .map_err(TaskboardError::remote_read)?;
        let active = resolve_active_sprint(&sprints, reference).cloned();

        let scope = active
            .as_ref()
            .map_or(BoardScope::Unscoped, |s| BoardScope::Sprint(s.id));
        self.load(scope).await?;
        Ok(active)
    }

    pub fn scope(&self) -> BoardScope {
        self.inner.state.lock().board.scope()
    }

    pub fn snapshot(&self) -> Board {
        self.inner.state.lock().board.clone()
    }

    /// All tasks in board order, optimistic entries included.
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.state.lock().board.tasks().cloned().collect()
    }

    /// Current copy of a task. Temporary ids of confirmed creates still work.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        let state = self.inner.state.lock();
        state.board.get(state.resolve(id)).cloned()
    }

    /// Writes not yet confirmed or rolled back.
    pub fn pending_writes(&self) -> usize {
        self.inner.state.lock().unsettled
    }

    pub fn search(&self, term: &str) -> Vec<Task> {
        let state = self.inner.state.lock();
        search_board(&state.board, term).into_iter().cloned().collect()
    }

    pub fn status_distribution(&self) -> Vec<StatusShare> {
        status_distribution(&self.inner.state.lock().board)
    }

    pub fn due_date_heatmap(&self, week_start: NaiveDate) -> Vec<HeatmapDay> {
        due_date_heatmap(self.inner.state.lock().board.tasks(), week_start)
    }

    /// Add a task to the end of the todo column and ask the store to create it.
    ///
    /// On a sprint board a draft without a sprint joins the board's sprint.
    /// Until confirmed the task carries a temporary id; once the store answers
    /// it is replaced by the store's task and the temporary id keeps resolving
    /// to it.
    pub fn create(&self, mut draft: TaskDraft) -> TaskboardResult<PendingWrite<Task>> {
        draft.validate()?;
        draft.status = TaskStatus::Todo;
        if draft.sprint_id.is_none() {
            draft.sprint_id = self.scope().sprint_id();
        }

        let temp_id = Uuid::new_v4();
        let task = Task::from_draft(temp_id, draft.clone(), 0.0);
        tracing::debug!("Optimistically creating task {}", temp_id);
        self.submit(temp_id, None, Change::Create { task, draft })
    }

    /// Drag a task from `from` to position `index` of `to`.
    ///
    /// The index is clamped to the target column. Dropping a task where it
    /// already is settles immediately without a store call.
    pub fn move_task(
        &self,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        index: usize,
    ) -> TaskboardResult<PendingWrite<Task>> {
        self.submit(id, Some(from), Change::Move { to, index })
    }

    /// Apply `patch` to a task. A status change moves the task to the end of
    /// its new column.
    pub fn update(&self, id: TaskId, patch: TaskPatch) -> TaskboardResult<PendingWrite<Task>> {
        patch.validate()?;
        self.submit(id, None, Change::Update(patch))
    }

    /// Remove a task. The handle resolves to the removed task.
    pub fn delete(&self, id: TaskId) -> TaskboardResult<PendingWrite<Task>> {
        self.submit(id, None, Change::Delete)
    }

    fn submit(
        &self,
        id: TaskId,
        origin: Option<TaskStatus>,
        change: Change,
    ) -> TaskboardResult<PendingWrite<Task>> {
        let (tx, pending) = PendingWrite::channel();
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.resolve(id);
            if let Some(from) = origin {
                check_origin(&state.board, id, from)?;
            }
            if let Staged::Unchanged(task) = state.stage(id, change, tx)? {
                return Ok(PendingWrite::ready(Ok(task)));
            }
            id
        };

        let permit = self.inner.queue.try_acquire(id);
        if permit.is_none() {
            tracing::debug!("Task {} has a write in flight, queueing", id);
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let (id, permit) = match permit {
                Some(permit) => (id, permit),
                None => inner.acquire_resolved(id).await,
            };
            inner.send_next(id).await;
            drop(permit);
        });
        Ok(pending)
    }
}

impl Inner {
    /// Wait for the task's queue, following it if its id was replaced by a
    /// confirmed create while waiting.
    async fn acquire_resolved(&self, mut id: TaskId) -> (TaskId, MutationPermit) {
        loop {
            let permit = self.queue.acquire(id).await;
            let resolved = self.state.lock().resolve(id);
            if resolved == id {
                return (id, permit);
            }
            id = resolved;
        }
    }

    /// Send the oldest unsettled write on `id` to the store and settle it.
    ///
    /// Must be called with the task's permit held. Each staged write spawns one
    /// call, so every write is sent exactly once and in submission order.
    async fn send_next(&self, id: TaskId) {
        let next = self.state.lock().next_write(id);
        let Some((seq, call)) = next else {
            return;
        };
        let Some(call) = call else {
            self.state.lock().settle_unchanged(id, seq);
            return;
        };

        let response = match &call {
            RemoteCall::Create(draft) => self.remote.create_task(draft.clone()).await,
            RemoteCall::Update { patch, .. } => self.remote.update_task(id, patch.clone()).await,
            RemoteCall::Delete(removed) => {
                self.remote.delete_task(id).await.map(|_| removed.clone())
            }
        }
        .map_err(TaskboardError::remote_write);

        if let (Ok(_), RemoteCall::Update { reranked, .. }) = (&response, &call) {
            self.store_reranks(reranked).await;
        }
        self.state.lock().settle(id, seq, call, response);
    }

    /// Persist sibling ranks changed by a confirmed move. A failure leaves the
    /// sibling's local rank in place; the next load corrects it.
    async fn store_reranks(&self, reranked: &[Rerank]) {
        for rerank in reranked {
            let patch = TaskPatch {
                order: Some(rerank.order),
                ..Default::default()
            };
            match self.remote.update_task(rerank.id, patch).await {
                Ok(task) => self.state.lock().adopt(task),
                Err(e) => tracing::warn!("Failed to store rank of task {}: {}", rerank.id, e),
            }
        }
    }
}

fn not_on_board(id: TaskId) -> TaskboardError {
    TaskboardError::NotFound(format!("Task {} is not on the board", id))
}

fn check_origin(board: &Board, id: TaskId, from: TaskStatus) -> TaskboardResult<()> {
    let placement = board.placement(id).ok_or_else(|| not_on_board(id))?;
    if placement.status != from {
        return Err(TaskboardError::Validation(format!(
            "Task {} is in {}, not {}",
            id, placement.status, from
        )));
    }
    Ok(())
}

/// Apply a change to the board, returning the store request that confirms it.
fn apply_change(
    board: &mut Board,
    id: TaskId,
    change: &Change,
) -> TaskboardResult<Option<RemoteCall>> {
    match change {
        Change::Create { task, draft } => {
            board.push_back(TaskStatus::Todo, task.clone());
            Ok(Some(RemoteCall::Create(draft.clone())))
        }
        Change::Move { to, index } => apply_move(board, id, *to, *index),
        Change::Update(patch) => apply_update(board, id, patch.clone()),
        Change::Delete => apply_delete(board, id),
    }
}

fn apply_move(
    board: &mut Board,
    id: TaskId,
    to: TaskStatus,
    index: usize,
) -> TaskboardResult<Option<RemoteCall>> {
    let placement = board.placement(id).ok_or_else(|| not_on_board(id))?;
    let from = placement.status;

    let target_len = board.column(to).len() - usize::from(from == to);
    let index = index.min(target_len);
    if from == to && index == placement.index {
        return Ok(None);
    }

    let (_, original) = board.remove(id).ok_or_else(|| not_on_board(id))?;
    let insertion = board.insert_at(to, index, original.move_to_column(to));
    let order = board.get(id).map(|t| t.order).ok_or_else(|| not_on_board(id))?;
    tracing::debug!("Moved task {} from {} to {}[{}]", id, from, to, insertion.index);

    Ok(Some(RemoteCall::Update {
        patch: TaskPatch::placement(to, order),
        reranked: insertion.reranked,
    }))
}

fn apply_update(
    board: &mut Board,
    id: TaskId,
    mut patch: TaskPatch,
) -> TaskboardResult<Option<RemoteCall>> {
    let original = board.get(id).cloned().ok_or_else(|| not_on_board(id))?;
    let mut updated = original.clone();
    updated.apply_patch(patch.clone());
    updated.validate()?;

    if updated.status != original.status && patch.order.is_none() {
        board.remove(id);
        board.push_back(updated.status, updated);
        patch.order = board.get(id).map(|t| t.order);
    } else {
        board.replace(id, updated);
    }
    tracing::debug!("Updated task {}", id);

    Ok(Some(RemoteCall::Update {
        patch,
        reranked: Vec::new(),
    }))
}

fn apply_delete(board: &mut Board, id: TaskId) -> TaskboardResult<Option<RemoteCall>> {
    let (_, original) = board.remove(id).ok_or_else(|| not_on_board(id))?;
    tracing::debug!("Deleted task {}", id);
    Ok(Some(RemoteCall::Delete(original)))
}
