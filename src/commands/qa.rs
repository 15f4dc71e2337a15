use tracing::info;

use super::{index, ready_workspace, reply};
use crate::state::Context;
use crate::views::qas::FormMode;
use crate::views::render;
use crate::workspace::{self, Workspace, WorkspaceError};

/// Manage the QA entries of the selected disease
#[poise::command(
    slash_command,
    subcommands(
        "list",
        "select",
        "show",
        "new",
        "edit",
        "delete",
        "confirm_delete",
        "cancel_delete"
    )
)]
pub async fn qa(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// List and selected entry, as shown on the QA tab.
pub(super) fn list_view(w: &Workspace) -> Result<String, WorkspaceError> {
    let list = w.qa_list()?;
    let mut text = render::qa_list(list);
    if let Some(qa) = list.selected() {
        text.push_str("\n\n");
        text.push_str(&render::selected_qa(qa));
    }
    Ok(text)
}

/// Refetch and list the QA entries
#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::refetch_qas(&ws).await {
        return reply(&ctx, Err(e)).await;
    }
    let result = list_view(&*ws.lock().await);
    reply(&ctx, result).await
}

/// Select a QA entry
#[poise::command(slash_command)]
pub async fn select(
    ctx: Context<'_>,
    #[description = "Entry number"]
    #[min = 1]
    number: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let mut w = ws.lock().await;
    let result = w.qa_list_mut().map(|list| list.select(index(number))).and_then(|_| list_view(&w));
    drop(w);
    reply(&ctx, result).await
}

/// Show the selected QA entry
#[poise::command(slash_command)]
pub async fn show(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let w = ws.lock().await;
    let result = w
        .qa_list()
        .and_then(|list| list.selected().ok_or(WorkspaceError::NoQaSelected))
        .map(render::selected_qa);
    drop(w);
    reply(&ctx, result).await
}

/// Start a new QA entry
#[poise::command(slash_command)]
pub async fn new(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    open_form(ctx, FormMode::Add).await
}

/// Edit the selected QA entry
#[poise::command(slash_command)]
pub async fn edit(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    open_form(ctx, FormMode::Edit).await
}

async fn open_form(ctx: Context<'_>, mode: FormMode) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let mut w = ws.lock().await;
    let result = w.open_form(mode).map(render::draft);
    drop(w);
    reply(&ctx, result).await
}

/// Delete the selected QA entry (asks for confirmation)
#[poise::command(slash_command)]
pub async fn delete(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = ws.lock().await.request_delete().map(|qa_id| {
        format!(
            "Are you sure you want to delete QA entry `{}`?\n`/qa confirm-delete` to delete, `/qa cancel-delete` to keep it.",
            qa_id
        )
    });
    reply(&ctx, result).await
}

/// Confirm the pending delete
#[poise::command(slash_command, rename = "confirm-delete")]
pub async fn confirm_delete(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    match workspace::confirm_delete(&ws).await {
        Ok(qa_id) => {
            info!(user = %ctx.author().name, qa_id = %qa_id, "qa deleted");
            let result = list_view(&*ws.lock().await)
                .map(|view| format!("Deleted `{}`.\n\n{}", qa_id, view));
            reply(&ctx, result).await
        }
        Err(e) => reply(&ctx, Err(e)).await,
    }
}

/// Keep the entry and close the delete confirmation
#[poise::command(slash_command, rename = "cancel-delete")]
pub async fn cancel_delete(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = ws.lock().await.qa_list_mut().map(|list| {
        if list.delete_dialog.cancel() {
            "Delete cancelled.".to_string()
        } else if list.delete_dialog.is_deleting() {
            "The delete is already running.".to_string()
        } else {
            "No delete is awaiting confirmation.".to_string()
        }
    });
    reply(&ctx, result).await
}
