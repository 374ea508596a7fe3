use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskboard_domain::{parse_due_date, Recurrence, TaskStatus};
use uuid::Uuid;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ")"
);

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Task board with sprint windows and recurring tasks", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Path to the task store (or set TASKBOARD_FILE, or `store_path` in config)
    #[arg(long, global = true, value_name = "FILE", env = "TASKBOARD_FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Task operations
    Task(TaskCommand),
    /// Sprint operations
    Sprint(SprintCommand),
    /// Board analytics
    Stats(StatsCommand),
    /// Recurring task generation
    Scheduler(SchedulerCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_due_date(s).map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    s.parse().map_err(|e: taskboard_core::TaskboardError| e.to_string())
}

fn parse_recurrence(s: &str) -> Result<Recurrence, String> {
    s.parse().map_err(|e: taskboard_core::TaskboardError| e.to_string())
}

// Task commands
#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task at the end of the todo column
    Create(TaskCreateArgs),
    /// Show the board grouped by column
    List {
        #[arg(long)]
        sprint_id: Option<Uuid>,
    },
    /// Move a task to another column or position
    Move {
        #[arg(long)]
        id: Uuid,
        #[arg(long, value_parser = parse_status)]
        to: TaskStatus,
        /// Position in the target column (defaults to the end)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Update a task
    Update(TaskUpdateArgs),
    /// Delete a task
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Search titles, content and tags
    Search {
        #[arg(long)]
        term: String,
        #[arg(long)]
        sprint_id: Option<Uuid>,
    },
}

#[derive(Args)]
pub struct TaskCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub content: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long, value_parser = parse_recurrence)]
    pub recurrence: Option<Recurrence>,
    #[arg(long)]
    pub assigned_to: Option<String>,
    #[arg(long)]
    pub created_by: Option<String>,
    #[arg(long)]
    pub sprint_id: Option<Uuid>,
    #[arg(long)]
    pub project_id: Option<Uuid>,
}

#[derive(Args)]
pub struct TaskUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub clear_content: bool,
    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long, value_parser = parse_recurrence)]
    pub recurrence: Option<Recurrence>,
    #[arg(long)]
    pub clear_recurrence: bool,
    #[arg(long)]
    pub assigned_to: Option<String>,
    #[arg(long)]
    pub clear_assigned_to: bool,
    /// Replace the task's tags
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

// Sprint commands
#[derive(Args)]
pub struct SprintCommand {
    #[command(subcommand)]
    pub action: SprintAction,
}

#[derive(Subcommand)]
pub enum SprintAction {
    /// Create a sprint window
    Create {
        #[arg(long)]
        project_id: Option<Uuid>,
        #[arg(long)]
        name: String,
        /// First day (YYYY-MM-DD, inclusive)
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD, inclusive)
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
    },
    /// List a project's sprints with their phase today
    List {
        #[arg(long)]
        project_id: Option<Uuid>,
    },
    /// Show the sprint that is active on a date
    Active {
        #[arg(long)]
        project_id: Option<Uuid>,
        /// Reference date (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

// Stats commands
#[derive(Args)]
pub struct StatsCommand {
    #[command(subcommand)]
    pub action: StatsAction,
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Share of tasks per column
    Distribution {
        #[arg(long)]
        sprint_id: Option<Uuid>,
    },
    /// Tasks due on each day of a week
    Heatmap {
        /// Any day of the week to show (defaults to this week)
        #[arg(long, value_parser = parse_date)]
        week_start: Option<NaiveDate>,
        #[arg(long)]
        sprint_id: Option<Uuid>,
    },
    /// Completion of the active sprint
    Progress {
        #[arg(long)]
        project_id: Option<Uuid>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

// Scheduler commands
#[derive(Args)]
pub struct SchedulerCommand {
    #[command(subcommand)]
    pub action: SchedulerAction,
}

#[derive(Subcommand)]
pub enum SchedulerAction {
    /// Generate due occurrences, then keep sweeping until interrupted
    Run(SchedulerRunArgs),
}

#[derive(Args)]
pub struct SchedulerRunArgs {
    /// Run a single sweep and print its report
    #[arg(long)]
    pub once: bool,
    /// Sweep as if today were this date
    #[arg(long, value_parser = parse_date, requires = "once")]
    pub date: Option<NaiveDate>,
    /// Seconds between sweeps (overrides config)
    #[arg(long)]
    pub interval_secs: Option<u64>,
    #[arg(long)]
    pub sprint_id: Option<Uuid>,
}
