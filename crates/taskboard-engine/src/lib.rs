pub mod board_manager;
pub mod mutation_queue;
pub mod pending;
pub mod scheduler;

pub use board_manager::BoardManager;
pub use mutation_queue::{MutationPermit, MutationQueue};
pub use pending::PendingWrite;
pub use scheduler::{RecurrenceScheduler, SchedulerHandle, SweepReport};
