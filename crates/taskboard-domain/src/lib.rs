pub mod analytics;
pub mod board;
pub mod column;
pub mod field_update;
pub mod filter;
pub mod query;
pub mod recurrence;
pub mod search;
pub mod sort;
pub mod sprint;
pub mod task;

pub use analytics::{
    due_date_heatmap, sprint_progress, status_distribution, week_start_of, HeatmapDay,
    SprintProgress, StatusShare,
};
pub use board::{Board, BoardScope, Insertion, Placement, Rerank};
pub use column::Column;
pub use field_update::FieldUpdate;
pub use filter::{TaskFilter, TaskQuery};
pub use query::{resolve_active_sprint, sprint_tasks};
pub use recurrence::{plan_occurrences, PlannedOccurrence, RecurrencePlan};
pub use search::{search_board, CompositeSearcher, TaskSearcher};
pub use sort::{compare_board_position, rank_between, ChainedSorter, SortBy};
pub use sprint::{ProjectId, Sprint, SprintId, SprintPhase};
pub use task::{parse_due_date, Recurrence, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
