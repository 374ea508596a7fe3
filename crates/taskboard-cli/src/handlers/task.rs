use crate::cli::{TaskAction, TaskCreateArgs, TaskUpdateArgs};
use crate::context::CliContext;
use crate::output;
use taskboard_domain::{FieldUpdate, TaskDraft, TaskPatch};

pub async fn handle(ctx: &CliContext, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Create(args) => {
            let sprint_id = args.sprint_id;
            ctx.load_board(sprint_id).await?;
            let task = ctx.board.create(build_draft(args))?.wait().await?;
            output::output_success(&task);
        }
        TaskAction::List { sprint_id } => {
            ctx.load_board(sprint_id).await?;
            output::output_success(ctx.board.snapshot());
        }
        TaskAction::Move { id, to, index } => {
            ctx.load_board(None).await?;
            let from = ctx.task(id)?.status;
            let index = index.unwrap_or(usize::MAX);
            let task = ctx.board.move_task(id, from, to, index)?.wait().await?;
            output::output_success(&task);
        }
        TaskAction::Update(args) => {
            ctx.load_board(None).await?;
            let id = args.id;
            let patch = build_patch(args);
            if patch.is_empty() {
                anyhow::bail!("No fields to update");
            }
            let task = ctx.board.update(id, patch)?.wait().await?;
            output::output_success(&task);
        }
        TaskAction::Delete { id } => {
            ctx.load_board(None).await?;
            let removed = ctx.board.delete(id)?.wait().await?;
            output::output_success(serde_json::json!({"deleted": removed.id.to_string()}));
        }
        TaskAction::Search { term, sprint_id } => {
            ctx.load_board(sprint_id).await?;
            output::output_list(ctx.board.search(&term));
        }
    }
    Ok(())
}

fn build_draft(args: TaskCreateArgs) -> TaskDraft {
    let mut draft = TaskDraft::new(args.title);
    draft.content = args.content;
    draft.due = args.due;
    draft.tags = args.tags.into_iter().collect();
    draft.recurrence = args.recurrence;
    draft.assigned_to = args.assigned_to;
    draft.created_by = args.created_by;
    draft.sprint_id = args.sprint_id;
    draft.project_id = args.project_id;
    draft
}

fn build_patch(args: TaskUpdateArgs) -> TaskPatch {
    TaskPatch {
        title: args.title,
        content: FieldUpdate::from_flags(args.content, args.clear_content),
        due: FieldUpdate::from_flags(args.due, args.clear_due),
        recurrence: FieldUpdate::from_flags(args.recurrence, args.clear_recurrence),
        assigned_to: FieldUpdate::from_flags(args.assigned_to, args.clear_assigned_to),
        tags: (!args.tags.is_empty()).then(|| args.tags.into_iter().collect()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskboard_domain::Recurrence;
    use uuid::Uuid;

    fn update_args(id: Uuid) -> TaskUpdateArgs {
        TaskUpdateArgs {
            id,
            title: None,
            content: None,
            clear_content: false,
            due: None,
            clear_due: false,
            recurrence: None,
            clear_recurrence: false,
            assigned_to: None,
            clear_assigned_to: false,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_untouched_flags_build_an_empty_patch() {
        assert!(build_patch(update_args(Uuid::new_v4())).is_empty());
    }

    #[test]
    fn test_clear_flags_win_over_values() {
        let mut args = update_args(Uuid::new_v4());
        args.due = NaiveDate::from_ymd_opt(2024, 1, 1);
        args.clear_due = true;
        args.recurrence = Some(Recurrence::Daily);

        let patch = build_patch(args);
        assert_eq!(patch.due, FieldUpdate::Clear);
        assert_eq!(patch.recurrence, FieldUpdate::Set(Recurrence::Daily));
        assert_eq!(patch.content, FieldUpdate::NoChange);
        assert!(patch.tags.is_none());
    }

    #[test]
    fn test_draft_collects_repeated_tags() {
        let draft = build_draft(TaskCreateArgs {
            title: "Release".into(),
            content: None,
            due: None,
            tags: vec!["ops".into(), "ops".into(), "web".into()],
            recurrence: Some(Recurrence::Weekly),
            assigned_to: Some("kim".into()),
            created_by: None,
            sprint_id: None,
            project_id: None,
        });
        assert_eq!(draft.tags.len(), 2);
        assert_eq!(draft.recurrence, Some(Recurrence::Weekly));
        assert_eq!(draft.assigned_to.as_deref(), Some("kim"));
    }
}
