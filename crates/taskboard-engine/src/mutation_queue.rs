//! Per-task write serialization.
//!
//! Each task id maps to an async lock. A write holds the task's lock while its
//! store round trip runs and settles, so a second store call on the same task
//! waits its turn while writes on other tasks run freely.
//! Entries are removed as soon as nobody holds or waits on them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use taskboard_domain::TaskId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Clone, Default)]
pub struct MutationQueue {
    slots: Arc<Mutex<HashMap<TaskId, Slot>>>,
}

/// Exclusive right to write one task. Released on drop.
#[derive(Debug)]
pub struct MutationPermit {
    id: TaskId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Mutex<HashMap<TaskId, Slot>>>,
}

impl MutationPermit {
    pub fn task_id(&self) -> TaskId {
        self.id
    }
}

impl Drop for MutationPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock();
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.id);
        }
    }
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: TaskId) -> Slot {
        self.slots.lock().entry(id).or_default().clone()
    }

    fn permit(&self, id: TaskId, guard: OwnedMutexGuard<()>) -> MutationPermit {
        MutationPermit {
            id,
            guard: Some(guard),
            slots: self.slots.clone(),
        }
    }

    /// Take the task's lock if no other write holds or awaits it.
    pub fn try_acquire(&self, id: TaskId) -> Option<MutationPermit> {
        let slot = self.slot(id);
        match slot.try_lock_owned() {
            Ok(guard) => Some(self.permit(id, guard)),
            Err(_) => None,
        }
    }

    /// Wait for the task's lock. Waiters are served in arrival order.
    pub async fn acquire(&self, id: TaskId) -> MutationPermit {
        let guard = self.slot(id).lock_owned().await;
        self.permit(id, guard)
    }

    /// Number of tasks with a write held or queued.
    pub fn busy_tasks(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_busy(&self, id: TaskId) -> bool {
        self.slots.lock().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_second_writer_waits_for_first() {
        let queue = MutationQueue::new();
        let id = Uuid::new_v4();

        let first = queue.try_acquire(id).unwrap();
        assert!(queue.try_acquire(id).is_none());

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.acquire(id).await.task_id() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(waiter.await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_other_tasks_are_independent() {
        let queue = MutationQueue::new();
        let _a = queue.try_acquire(Uuid::new_v4()).unwrap();
        assert!(queue.try_acquire(Uuid::new_v4()).is_some());
    }

    #[tokio::test]
    async fn test_idle_entries_are_removed() {
        let queue = MutationQueue::new();
        let id = Uuid::new_v4();

        let permit = queue.try_acquire(id).unwrap();
        assert!(queue.is_busy(id));
        drop(permit);
        assert!(!queue.is_busy(id));
        assert_eq!(queue.busy_tasks(), 0);
    }

    #[tokio::test]
    async fn test_entry_survives_while_someone_waits() {
        let queue = MutationQueue::new();
        let id = Uuid::new_v4();
        let first = queue.try_acquire(id).unwrap();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let permit = queue.acquire(id).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
                drop(permit);
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        assert!(queue.is_busy(id));

        waiter.await.unwrap();
        assert!(!queue.is_busy(id));
    }
}
