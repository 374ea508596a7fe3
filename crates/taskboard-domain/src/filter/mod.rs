//! Task filtering.
//!
//! [`TaskQuery`] is the serializable filter the store contract accepts;
//! [`TaskFilter`] implementations do the actual matching.

pub mod task_filter;

pub use task_filter::{
    AssigneeFilter, CompositeFilter, ProjectFilter, SprintFilter, TaskFilter, TaskQuery,
};
