use serde::{Deserialize, Serialize};

use crate::sort::ChainedSorter;
use crate::task::{Task, TaskId, TaskStatus};

/// One board column: the tasks of a single status, in board order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            tasks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn last_order(&self) -> Option<f64> {
        self.tasks.last().map(|t| t.order)
    }

    pub(crate) fn sort(&mut self) {
        ChainedSorter::board_position().sort_by(&mut self.tasks);
    }
}
