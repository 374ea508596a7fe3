use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::filter::TaskQuery;
use crate::sort::rank_between;
use crate::sprint::SprintId;
use crate::task::{Task, TaskId, TaskStatus};

/// Which task set a board shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sprint_id", rename_all = "snake_case")]
pub enum BoardScope {
    /// Every task the store returns, regardless of sprint.
    #[default]
    Unscoped,
    Sprint(SprintId),
}

impl BoardScope {
    pub fn sprint_id(&self) -> Option<SprintId> {
        match self {
            Self::Unscoped => None,
            Self::Sprint(id) => Some(*id),
        }
    }

    /// Store query that fetches the tasks of this scope.
    pub fn query(&self) -> TaskQuery {
        TaskQuery {
            sprint_id: self.sprint_id(),
            ..Default::default()
        }
    }
}

/// Where a task sat before it was taken off the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub status: TaskStatus,
    pub index: usize,
}

/// A task whose rank changed to make room for an insert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rerank {
    pub id: TaskId,
    pub previous: f64,
    pub order: f64,
}

/// Outcome of [`Board::insert_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// Index the task ended up at.
    pub index: usize,
    /// Other tasks of the column that were renumbered.
    pub reranked: Vec<Rerank>,
}

/// Columned, ordered view of one scope's tasks.
///
/// A task's `status` always names the column that holds it; every mutating
/// method keeps that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    scope: BoardScope,
    columns: Vec<Column>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardScope::Unscoped)
    }
}

impl Board {
    pub fn new(scope: BoardScope) -> Self {
        Self {
            scope,
            columns: TaskStatus::ALL.iter().map(|s| Column::new(*s)).collect(),
        }
    }

    /// Group tasks into their status columns and sort each column.
    pub fn from_tasks(scope: BoardScope, tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = Self::new(scope);
        for task in tasks {
            board.columns[task.status.index()].tasks.push(task);
        }
        for column in &mut board.columns {
            column.sort();
        }
        board
    }

    pub fn scope(&self) -> BoardScope {
        self.scope
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> &Column {
        &self.columns[status.index()]
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Column::is_empty)
    }

    /// All tasks, column by column in board order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flat_map(|c| c.tasks.iter())
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.placement(id).is_some()
    }

    pub fn placement(&self, id: TaskId) -> Option<Placement> {
        self.columns.iter().find_map(|column| {
            column.position(id).map(|index| Placement {
                status: column.status,
                index,
            })
        })
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.placement(id)
            .map(|p| &self.columns[p.status.index()].tasks[p.index])
    }

    /// Take a task off the board, reporting where it was.
    pub fn remove(&mut self, id: TaskId) -> Option<(Placement, Task)> {
        let placement = self.placement(id)?;
        let task = self.columns[placement.status.index()]
            .tasks
            .remove(placement.index);
        Some((placement, task))
    }

    /// Insert `task` into `status` at `index` (clamped), ranking it between its
    /// new neighbours.
    ///
    /// When the neighbours share a rank there is nothing in between, so the
    /// column is renumbered `0, 1, 2, ..` in its new order and every other task
    /// whose rank changed is reported in [`Insertion::reranked`].
    pub fn insert_at(&mut self, status: TaskStatus, index: usize, mut task: Task) -> Insertion {
        let column = &mut self.columns[status.index()];
        let index = index.min(column.len());
        let prev = index
            .checked_sub(1)
            .and_then(|i| column.tasks.get(i))
            .map(|t| t.order);
        let next = column.tasks.get(index).map(|t| t.order);

        let rank = rank_between(prev, next);
        let fits = prev.map_or(true, |p| p < rank) && next.map_or(true, |n| rank < n);

        task.status = status;
        task.order = rank;
        let id = task.id;
        column.tasks.insert(index, task);

        let mut reranked = Vec::new();
        if !fits {
            for (position, t) in column.tasks.iter_mut().enumerate() {
                let order = position as f64;
                if t.id != id && t.order != order {
                    reranked.push(Rerank {
                        id: t.id,
                        previous: t.order,
                        order,
                    });
                }
                t.order = order;
            }
        }
        column.sort();
        Insertion {
            index: column.position(id).unwrap_or(index),
            reranked,
        }
    }

    /// Undo sibling re-ranks from an earlier [`Board::insert_at`]. A task whose
    /// rank has changed again since is left alone.
    pub fn revert_reranks(&mut self, reranked: &[Rerank]) {
        for rerank in reranked.iter().rev() {
            let Some(p) = self.placement(rerank.id) else {
                continue;
            };
            let task = &mut self.columns[p.status.index()].tasks[p.index];
            if task.order == rerank.order {
                task.order = rerank.previous;
            }
        }
        for column in &mut self.columns {
            column.sort();
        }
    }

    /// Append `task` to the end of `status`, ranking it after the current last task.
    pub fn push_back(&mut self, status: TaskStatus, mut task: Task) -> usize {
        let column = &mut self.columns[status.index()];
        task.status = status;
        task.order = rank_between(column.last_order(), None);
        column.tasks.push(task);
        column.len() - 1
    }

    /// Put a task back using its own status and rank, e.g. after a rollback or a
    /// store confirmation.
    pub fn insert_ranked(&mut self, task: Task) -> usize {
        let column = &mut self.columns[task.status.index()];
        let id = task.id;
        column.tasks.push(task);
        column.sort();
        column.position(id).unwrap_or(column.len() - 1)
    }

    /// Swap the task stored under `id` for `task`, which may carry a new id,
    /// status or rank. Returns false when `id` is not on the board.
    pub fn replace(&mut self, id: TaskId, task: Task) -> bool {
        match self.placement(id) {
            Some(p) if p.status == task.status => {
                let column = &mut self.columns[p.status.index()];
                column.tasks[p.index] = task;
                column.sort();
                true
            }
            Some(_) => {
                self.remove(id);
                self.insert_ranked(task);
                true
            }
            None => false,
        }
    }

    /// True when every task sits in the column named by its status.
    pub fn is_consistent(&self) -> bool {
        self.columns
            .iter()
            .all(|c| c.tasks.iter().all(|t| t.status == c.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskDraft;
    use uuid::Uuid;

    fn task(title: &str, status: TaskStatus, order: f64) -> Task {
        let mut task = Task::from_draft(Uuid::new_v4(), TaskDraft::new(title), order);
        task.status = status;
        task
    }

    fn titles(board: &Board, status: TaskStatus) -> Vec<String> {
        board
            .column(status)
            .tasks
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }

    #[test]
    fn test_from_tasks_groups_and_sorts() {
        let board = Board::from_tasks(
            BoardScope::Unscoped,
            vec![
                task("b", TaskStatus::Todo, 2.0),
                task("done", TaskStatus::Done, 0.0),
                task("a", TaskStatus::Todo, 1.0),
                task("wip", TaskStatus::InProgress, 5.0),
            ],
        );

        assert_eq!(board.len(), 4);
        assert_eq!(titles(&board, TaskStatus::Todo), ["a", "b"]);
        assert_eq!(titles(&board, TaskStatus::InProgress), ["wip"]);
        assert_eq!(titles(&board, TaskStatus::Done), ["done"]);
        assert!(board.is_consistent());
    }

    #[test]
    fn test_insert_at_ranks_between_neighbours() {
        let mut board = Board::from_tasks(
            BoardScope::Unscoped,
            vec![
                task("a", TaskStatus::Done, 1.0),
                task("c", TaskStatus::Done, 2.0),
            ],
        );
        let b = task("b", TaskStatus::Todo, 99.0);

        let insertion = board.insert_at(TaskStatus::Done, 1, b);
        assert_eq!(insertion.index, 1);
        assert!(insertion.reranked.is_empty());
        assert_eq!(titles(&board, TaskStatus::Done), ["a", "b", "c"]);
        assert_eq!(board.column(TaskStatus::Done).tasks[1].order, 1.5);
        assert!(board.is_consistent());
    }

    #[test]
    fn test_insert_at_clamps_index() {
        let mut board = Board::new(BoardScope::Unscoped);
        let insertion =
            board.insert_at(TaskStatus::InProgress, 10, task("x", TaskStatus::Todo, 0.0));
        assert_eq!(insertion.index, 0);
        assert_eq!(board.column(TaskStatus::InProgress).len(), 1);
    }

    #[test]
    fn test_insert_between_equal_ranks_renumbers_column() {
        let a = task("a", TaskStatus::Todo, 1.0);
        let b = task("b", TaskStatus::Todo, 1.0);
        let mut board = Board::from_tasks(BoardScope::Unscoped, vec![a, b]);
        let (first, second) = {
            let todo = &board.column(TaskStatus::Todo).tasks;
            (todo[0].clone(), todo[1].clone())
        };

        let x = task("x", TaskStatus::Done, 1.0);
        let insertion = board.insert_at(TaskStatus::Todo, 1, x.clone());

        assert_eq!(insertion.index, 1);
        let todo = &board.column(TaskStatus::Todo).tasks;
        assert_eq!(todo[0].id, first.id);
        assert_eq!(todo[1].id, x.id);
        assert_eq!(todo[2].id, second.id);
        let orders: Vec<f64> = todo.iter().map(|t| t.order).collect();
        assert_eq!(orders, [0.0, 1.0, 2.0]);
        assert_eq!(
            insertion.reranked,
            [
                Rerank { id: first.id, previous: 1.0, order: 0.0 },
                Rerank { id: second.id, previous: 1.0, order: 2.0 },
            ]
        );

        board.remove(x.id);
        board.revert_reranks(&insertion.reranked);
        let orders: Vec<f64> = board
            .column(TaskStatus::Todo)
            .tasks
            .iter()
            .map(|t| t.order)
            .collect();
        assert_eq!(orders, [1.0, 1.0]);
    }

    #[test]
    fn test_remove_then_insert_ranked_restores_position() {
        let a = task("a", TaskStatus::Todo, 1.0);
        let b = task("b", TaskStatus::Todo, 2.0);
        let c = task("c", TaskStatus::Todo, 3.0);
        let mut board = Board::from_tasks(BoardScope::Unscoped, vec![a, b.clone(), c]);

        let (placement, removed) = board.remove(b.id).unwrap();
        assert_eq!(placement.index, 1);
        assert_eq!(board.len(), 2);

        let index = board.insert_ranked(removed);
        assert_eq!(index, 1);
        assert_eq!(titles(&board, TaskStatus::Todo), ["a", "b", "c"]);
    }

    #[test]
    fn test_replace_relocates_on_status_change() {
        let a = task("a", TaskStatus::Todo, 1.0);
        let mut board = Board::from_tasks(BoardScope::Unscoped, vec![a.clone()]);

        let mut moved = a.clone();
        moved.id = Uuid::new_v4();
        moved.status = TaskStatus::Done;
        assert!(board.replace(a.id, moved.clone()));

        assert!(!board.contains(a.id));
        assert_eq!(board.placement(moved.id).unwrap().status, TaskStatus::Done);
        assert!(!board.replace(Uuid::new_v4(), moved));
    }

    #[test]
    fn test_push_back_appends_after_last() {
        let mut board = Board::from_tasks(
            BoardScope::Unscoped,
            vec![task("a", TaskStatus::Todo, 7.0)],
        );
        let index = board.push_back(TaskStatus::Todo, task("b", TaskStatus::Done, 0.0));
        assert_eq!(index, 1);
        let last = &board.column(TaskStatus::Todo).tasks[1];
        assert_eq!(last.order, 8.0);
        assert_eq!(last.status, TaskStatus::Todo);
    }

    #[test]
    fn test_scope_query() {
        let sprint = Uuid::new_v4();
        assert_eq!(BoardScope::Sprint(sprint).query().sprint_id, Some(sprint));
        assert_eq!(BoardScope::Unscoped.query(), TaskQuery::default());
    }
}
