use crate::cli::SprintAction;
use crate::context::CliContext;
use crate::output;
use serde::Serialize;
use taskboard_domain::{resolve_active_sprint, Sprint, SprintPhase};

#[derive(Serialize)]
struct SprintView {
    #[serde(flatten)]
    sprint: Sprint,
    phase: SprintPhase,
    duration_days: i64,
    days_remaining: i64,
}

impl SprintView {
    fn new(sprint: Sprint, reference: chrono::NaiveDate) -> Self {
        Self {
            phase: sprint.phase(reference),
            duration_days: sprint.duration_days(),
            days_remaining: sprint.days_remaining(reference),
            sprint,
        }
    }
}

pub async fn handle(ctx: &CliContext, action: SprintAction) -> anyhow::Result<()> {
    match action {
        SprintAction::Create {
            project_id,
            name,
            start,
            end,
        } => {
            let project_id = ctx.project_id(project_id)?;
            let sprint = ctx
                .create_sprint(Sprint::new(project_id, name, start, end))
                .await?;
            output::output_success(SprintView::new(sprint, CliContext::today()));
        }
        SprintAction::List { project_id } => {
            let project_id = ctx.project_id(project_id)?;
            let today = CliContext::today();
            let sprints = ctx.list_sprints(project_id).await?;
            output::output_list(
                sprints
                    .into_iter()
                    .map(|s| SprintView::new(s, today))
                    .collect(),
            );
        }
        SprintAction::Active { project_id, date } => {
            let project_id = ctx.project_id(project_id)?;
            let reference = date.unwrap_or_else(CliContext::today);
            let sprints = ctx.list_sprints(project_id).await?;
            let Some(sprint) = resolve_active_sprint(&sprints, reference) else {
                anyhow::bail!("Project {} has no sprints", project_id);
            };
            output::output_success(SprintView::new(sprint.clone(), reference));
        }
    }
    Ok(())
}
