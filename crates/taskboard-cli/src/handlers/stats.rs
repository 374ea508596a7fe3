use crate::cli::StatsAction;
use crate::context::CliContext;
use crate::output;
use taskboard_domain::{sprint_progress, week_start_of};

pub async fn handle(ctx: &CliContext, action: StatsAction) -> anyhow::Result<()> {
    match action {
        StatsAction::Distribution { sprint_id } => {
            ctx.load_board(sprint_id).await?;
            output::output_list(ctx.board.status_distribution());
        }
        StatsAction::Heatmap {
            week_start,
            sprint_id,
        } => {
            ctx.load_board(sprint_id).await?;
            let week_start = week_start_of(week_start.unwrap_or_else(CliContext::today));
            output::output_success(serde_json::json!({
                "week_start": week_start,
                "days": ctx.board.due_date_heatmap(week_start),
            }));
        }
        StatsAction::Progress { project_id, date } => {
            let project_id = ctx.project_id(project_id)?;
            let reference = date.unwrap_or_else(CliContext::today);
            let Some(sprint) = ctx.board.load_active_sprint(project_id, reference).await? else {
                anyhow::bail!("Project {} has no sprints", project_id);
            };
            let tasks = ctx.board.tasks();
            output::output_success(serde_json::json!({
                "sprint": sprint,
                "progress": sprint_progress(&sprint, &tasks, reference),
            }));
        }
    }
    Ok(())
}
