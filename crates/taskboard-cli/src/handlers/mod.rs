pub mod scheduler;
pub mod sprint;
pub mod stats;
pub mod task;
