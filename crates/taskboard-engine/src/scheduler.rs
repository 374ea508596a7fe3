//! Timer-driven generation of recurring task occurrences.
//!
//! Each tick reloads the board (falling back to the last good copy), plans
//! the occurrences due today with [`plan_occurrences`], drops the ones the
//! store already holds outside the board's scope and creates the rest
//! through the [`BoardManager`], so they show up optimistically like any other
//! new task. Store failures are logged and retried on the next tick.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::time::Duration;
use taskboard_domain::plan_occurrences;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::board_manager::BoardManager;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Tasks on the board when the sweep ran.
    pub scanned: usize,
    /// Occurrences the store confirmed.
    pub generated: usize,
    /// Occurrences skipped because they already exist.
    pub skipped_existing: usize,
    /// Occurrences that failed and will be retried next tick.
    pub failed: usize,
}

pub struct RecurrenceScheduler {
    board: BoardManager,
    interval: Duration,
    refresh: bool,
}

impl RecurrenceScheduler {
    pub fn new(board: BoardManager) -> Self {
        Self {
            board,
            interval: DEFAULT_INTERVAL,
            refresh: true,
        }
    }

    /// Zero falls back to the default interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Whether each tick reloads the board before scanning it. On by default
    /// so sessions sharing a store see each other's occurrences.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn board(&self) -> &BoardManager {
        &self.board
    }

    pub async fn tick(&self) -> SweepReport {
        self.tick_at(Local::now().date_naive()).await
    }

    /// Run one sweep as if today were `today`.
    pub async fn tick_at(&self, today: NaiveDate) -> SweepReport {
        if self.refresh {
            if let Err(e) = self.board.refresh().await {
                tracing::warn!("Recurrence sweep using last loaded board: {}", e);
            }
        }

        let tasks = self.board.tasks();
        let mut plan = plan_occurrences(&tasks, today);
        if !plan.occurrences.is_empty() {
            match self.board.fetch_all().await {
                Ok(stored) => plan = plan.without_existing(&stored),
                Err(e) => tracing::warn!("Checking occurrences against the board only: {}", e),
            }
        }
        let mut report = SweepReport {
            scanned: tasks.len(),
            skipped_existing: plan.skipped_existing,
            ..Default::default()
        };

        let mut pending = Vec::with_capacity(plan.occurrences.len());
        for occurrence in plan.occurrences {
            match self.board.create(occurrence.draft) {
                Ok(write) => pending.push((occurrence.source, write)),
                Err(e) => {
                    tracing::warn!("Could not plan next occurrence of {}: {}", occurrence.source, e);
                    report.failed += 1;
                }
            }
        }

        for (source, write) in pending {
            match write.wait().await {
                Ok(task) => {
                    tracing::info!(
                        "Generated occurrence {} of {} due {:?}",
                        task.id,
                        source,
                        task.due
                    );
                    report.generated += 1;
                }
                Err(e) => {
                    tracing::warn!("Next occurrence of {} not created: {}", source, e);
                    report.failed += 1;
                }
            }
        }

        tracing::debug!("Recurrence sweep for {}: {:?}", today, report);
        report
    }

    /// Sweep on every interval tick, starting immediately, until `shutdown`
    /// receives a message or its sender is dropped.
    pub async fn run(&self, mut shutdown: mpsc::UnboundedReceiver<()>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Recurrence scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Run the loop on a background task.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move { self.run(shutdown_rx).await });
        SchedulerHandle {
            shutdown_tx,
            handle,
        }
    }
}

pub struct SchedulerHandle {
    shutdown_tx: mpsc::UnboundedSender<()>,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Stop the loop and wait for the sweep in progress, if any, to finish.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            tracing::warn!("Recurrence scheduler task ended abnormally: {}", e);
        }
    }
}
