use crate::cli::{SchedulerAction, SchedulerRunArgs};
use crate::context::CliContext;
use crate::output;
use std::time::Duration;
use taskboard_engine::{BoardManager, RecurrenceScheduler};
use taskboard_persistence::{ChangeDetector, FileWatcher};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub async fn handle(ctx: &CliContext, action: SchedulerAction) -> anyhow::Result<()> {
    match action {
        SchedulerAction::Run(args) => run(ctx, args).await,
    }
}

async fn run(ctx: &CliContext, args: SchedulerRunArgs) -> anyhow::Result<()> {
    ctx.load_board(args.sprint_id).await?;
    let interval_secs = args
        .interval_secs
        .unwrap_or_else(|| ctx.config().effective_recurrence_interval_secs());
    let scheduler = RecurrenceScheduler::new(ctx.board.clone())
        .with_interval(Duration::from_secs(interval_secs));

    if args.once {
        let today = args.date.unwrap_or_else(CliContext::today);
        let report = scheduler.tick_at(today).await;
        output::output_success(&report);
        return Ok(());
    }

    let watcher = FileWatcher::new();
    if let Err(e) = watcher.start_watching(ctx.store_path().to_path_buf()).await {
        tracing::warn!(
            "Not watching {} for external changes: {}",
            ctx.store_path().display(),
            e
        );
    }
    let reloader = spawn_reloader(ctx.board.clone(), watcher.subscribe());

    let interval = scheduler.interval();
    let handle = scheduler.spawn();
    tracing::info!("Recurrence scheduler running every {:?}", interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, stopping recurrence scheduler");
    handle.shutdown().await;
    watcher.stop_watching().await?;
    reloader.abort();

    output::output_success(serde_json::json!({
        "stopped": true,
        "interval_secs": interval.as_secs(),
    }));
    Ok(())
}

/// Reload the board whenever another process rewrites the store.
fn spawn_reloader(
    board: BoardManager,
    mut changes: broadcast::Receiver<taskboard_persistence::ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(event) => {
                    tracing::debug!("Store changed at {}", event.detected_at);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} store change events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            if let Err(e) = board.refresh().await {
                tracing::warn!("Failed to reload board after store change: {}", e);
            }
        }
    })
}
