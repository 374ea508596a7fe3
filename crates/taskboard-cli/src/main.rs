mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use taskboard_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("TASKBOARD_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "taskboard", &mut std::io::stdout());
        return Ok(());
    }

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        output::output_error(&format!("{:#}", e));
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = CliContext::open(cli.file, AppConfig::load())?;

    match cli.command {
        Commands::Task(task_cmd) => handlers::task::handle(&ctx, task_cmd.action).await,
        Commands::Sprint(sprint_cmd) => handlers::sprint::handle(&ctx, sprint_cmd.action).await,
        Commands::Stats(stats_cmd) => handlers::stats::handle(&ctx, stats_cmd.action).await,
        Commands::Scheduler(scheduler_cmd) => {
            handlers::scheduler::handle(&ctx, scheduler_cmd.action).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}
