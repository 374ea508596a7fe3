use taskboard_core::{TaskboardError, TaskboardResult};
use tokio::sync::oneshot;

/// Confirmation handle for an optimistic write.
///
/// The board already shows the change when the handle is returned; awaiting
/// [`wait`](Self::wait) yields the store's confirmed value, or the error after
/// the change has been rolled back. Dropping the handle ignores the outcome
/// without cancelling the write.
#[derive(Debug)]
pub struct PendingWrite<T> {
    rx: oneshot::Receiver<TaskboardResult<T>>,
}

impl<T> PendingWrite<T> {
    pub(crate) fn channel() -> (oneshot::Sender<TaskboardResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A handle that is already settled.
    pub(crate) fn ready(result: TaskboardResult<T>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    pub async fn wait(self) -> TaskboardResult<T> {
        self.rx.await.unwrap_or_else(|_| {
            Err(TaskboardError::Internal(
                "write was abandoned before it settled".to_string(),
            ))
        })
    }
}
