//! Task ordering within a column.
//!
//! Columns are ordered by `order`, then by creation time, then by id. The same
//! chain is used when a board is loaded and after every reorder, so two
//! sessions looking at the same tasks always agree on positions.

use crate::Task;
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Enum dispatch for comparing tasks by a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Order,
    CreatedAt,
    Id,
}

impl SortBy {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Order => a.order.total_cmp(&b.order),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::Id => a.id.cmp(&b.id),
        }
    }
}

/// Compares by each key in turn until one of them breaks the tie.
#[derive(Debug, Clone)]
pub struct ChainedSorter {
    keys: Vec<SortBy>,
}

impl ChainedSorter {
    pub fn new(first: SortBy) -> Self {
        Self { keys: vec![first] }
    }

    pub fn then(mut self, key: SortBy) -> Self {
        self.keys.push(key);
        self
    }

    /// The column ordering: `order`, then `created_at`, then `id`.
    pub fn board_position() -> Self {
        Self::new(SortBy::Order)
            .then(SortBy::CreatedAt)
            .then(SortBy::Id)
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Sort a slice in place. Works with both `&Task` and `Task` elements.
    pub fn sort_by<T: Borrow<Task>>(&self, tasks: &mut [T]) {
        tasks.sort_by(|a, b| self.compare(a.borrow(), b.borrow()));
    }
}

/// Compare two tasks by their position in a column.
pub fn compare_board_position(a: &Task, b: &Task) -> Ordering {
    ChainedSorter::board_position().compare(a, b)
}

/// Rank for a task placed between `prev` and `next`.
///
/// An empty column starts at `0.0`; the ends step by one. When the neighbours
/// leave no room (equal or inverted ranks) the previous rank is returned; callers
/// that need an exact position renumber the column, see `Board::insert_at`.
pub fn rank_between(prev: Option<f64>, next: Option<f64>) -> f64 {
    match (prev, next) {
        (None, None) => 0.0,
        (Some(p), None) => p + 1.0,
        (None, Some(n)) => n - 1.0,
        (Some(p), Some(n)) => {
            let mid = p + (n - p) / 2.0;
            if p < mid && mid < n {
                mid
            } else {
                p
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskDraft;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn task(title: &str, order: f64) -> Task {
        Task::from_draft(Uuid::new_v4(), TaskDraft::new(title), order)
    }

    #[test]
    fn test_orders_by_rank() {
        let a = task("A", 2.0);
        let b = task("B", 1.0);
        let c = task("C", 1.5);

        let mut tasks = vec![&a, &b, &c];
        ChainedSorter::board_position().sort_by(&mut tasks);

        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["B", "C", "A"]);
    }

    #[test]
    fn test_equal_rank_falls_back_to_creation_time() {
        let mut older = task("Older", 1.0);
        let newer = task("Newer", 1.0);
        older.created_at = newer.created_at - Duration::seconds(5);

        assert_eq!(compare_board_position(&older, &newer), Ordering::Less);
        assert_eq!(compare_board_position(&newer, &older), Ordering::Greater);
    }

    #[test]
    fn test_equal_rank_and_time_falls_back_to_id() {
        let now = Utc::now();
        let mut a = task("A", 1.0);
        let mut b = task("B", 1.0);
        a.created_at = now;
        b.created_at = now;
        a.id = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        b.id = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();

        let mut tasks = vec![b.clone(), a.clone()];
        ChainedSorter::board_position().sort_by(&mut tasks);
        assert_eq!(tasks[0].id, a.id);
        assert_eq!(tasks[1].id, b.id);
    }

    #[test]
    fn test_rank_between() {
        assert_eq!(rank_between(None, None), 0.0);
        assert_eq!(rank_between(Some(3.0), None), 4.0);
        assert_eq!(rank_between(None, Some(3.0)), 2.0);
        assert_eq!(rank_between(Some(1.0), Some(2.0)), 1.5);
        assert_eq!(rank_between(Some(2.0), Some(2.0)), 2.0);
    }
}
