use super::{ready_workspace, reply};
use crate::state::Context;
use crate::views::diseases::DiseaseTab;
use crate::views::render;
use crate::workspace::{self, WorkspaceError};

/// Browse diseases
#[poise::command(
    slash_command,
    subcommands("search", "select", "pick", "info", "qas")
)]
pub async fn disease(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Search disease ids by prefix (case-sensitive)
#[poise::command(slash_command)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Id prefix; empty lists everything"] term: Option<String>,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::load_diseases(&ws, false).await {
        return reply(&ctx, Err(e)).await;
    }

    let mut w = ws.lock().await;
    w.browser.set_search(term.as_deref().unwrap_or(""));
    let text = render::disease_search(&w.browser);
    drop(w);
    reply(&ctx, Ok(text)).await
}

/// Select a disease by id
#[poise::command(slash_command)]
pub async fn select(
    ctx: Context<'_>,
    #[description = "Disease id"]
    #[autocomplete = "autocomplete_disease"]
    id: String,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::load_diseases(&ws, false).await {
        return reply(&ctx, Err(e)).await;
    }

    let mut w = ws.lock().await;
    let result = w.select_disease(&id).and_then(|()| selected_info(&w));
    drop(w);
    reply(&ctx, result).await
}

/// Select a disease by its position in the full id listing
#[poise::command(slash_command)]
pub async fn pick(
    ctx: Context<'_>,
    #[description = "Position shown as #n in search results"] position: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::load_diseases(&ws, false).await {
        return reply(&ctx, Err(e)).await;
    }

    let mut w = ws.lock().await;
    let result = w
        .select_disease_at(position as usize)
        .and_then(|_| selected_info(&w));
    drop(w);
    reply(&ctx, result).await
}

/// Show the selected disease
#[poise::command(slash_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::load_diseases(&ws, false).await {
        return reply(&ctx, Err(e)).await;
    }

    let mut w = ws.lock().await;
    w.browser.set_tab(DiseaseTab::Info);
    let result = selected_info(&w);
    drop(w);
    reply(&ctx, result).await
}

/// Show the QA entries of the selected disease
#[poise::command(slash_command)]
pub async fn qas(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    if let Err(e) = workspace::load_diseases(&ws, false).await {
        return reply(&ctx, Err(e)).await;
    }

    let opened = ws.lock().await.open_qa_tab();
    if let Err(e) = opened {
        return reply(&ctx, Err(e)).await;
    }
    if let Err(e) = workspace::load_qas(&ws).await {
        return reply(&ctx, Err(e)).await;
    }

    let w = ws.lock().await;
    let result = super::qa::list_view(&w);
    drop(w);
    reply(&ctx, result).await
}

fn selected_info(w: &workspace::Workspace) -> Result<String, WorkspaceError> {
    if let crate::views::Fetch::Failed(reason) = w.browser.details() {
        return Ok(format!("Failed to load diseases: {}", reason));
    }
    w.browser
        .selected_disease()
        .map(render::disease_info)
        .ok_or(WorkspaceError::NoDisease)
}

/// Autocomplete disease ids from the caller's loaded id listing.
async fn autocomplete_disease(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let Some(ws) = ctx.data().existing_workspace(ctx.author().id.get()).await else {
        return Vec::new();
    };
    let w = ws.lock().await;
    crate::views::diseases::filter_by_prefix(
        w.browser.ids().loaded().map(Vec::as_slice).unwrap_or(&[]),
        partial,
    )
    .into_iter()
    .take(25)
    .map(|found| found.id.to_string())
    .collect()
}
