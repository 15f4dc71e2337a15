use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::{index, ready_workspace, reply};
use crate::state::Context;
use crate::views::form::{QaForm, TextSelection};
use crate::views::render;
use crate::workspace::{self, Workspace, WorkspaceError};

/// Edit the open QA draft
#[poise::command(
    slash_command,
    subcommands(
        "show",
        "article",
        "add_question",
        "question",
        "remove_question",
        "arm",
        "disarm",
        "select",
        "select_text",
        "remove_answer",
        "submit",
        "close"
    )
)]
pub async fn draft(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Apply a local edit to the draft and render the result.
async fn edit_draft<F>(ws: &Arc<Mutex<Workspace>>, edit: F) -> Result<String, WorkspaceError>
where
    F: FnOnce(&mut QaForm) -> Result<(), WorkspaceError>,
{
    let mut w = ws.lock().await;
    let form = w.form_mut()?;
    edit(form)?;
    Ok(render::draft(form))
}

/// Show the draft
#[poise::command(slash_command)]
pub async fn show(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |_| Ok(())).await;
    reply(&ctx, result).await
}

/// Set the article the answers are marked in (new entries only)
#[poise::command(slash_command)]
pub async fn article(
    ctx: Context<'_>,
    #[description = "Article id"] id: String,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let set = edit_draft(&ws, |form| Ok(form.set_article_id(&id)?)).await;
    if let Err(e) = set {
        return reply(&ctx, Err(e)).await;
    }
    if let Err(e) = workspace::load_article(&ws).await {
        return reply(&ctx, Err(e)).await;
    }
    let result = edit_draft(&ws, |_| Ok(())).await;
    reply(&ctx, result).await
}

/// Append a question
#[poise::command(slash_command, rename = "add-question")]
pub async fn add_question(
    ctx: Context<'_>,
    #[description = "Question text"] text: Option<String>,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| {
        let i = form.add_question();
        if let Some(text) = &text {
            form.set_question_text(i, text)?;
        }
        Ok(())
    })
    .await;
    reply(&ctx, result).await
}

/// Replace a question's text
#[poise::command(slash_command)]
pub async fn question(
    ctx: Context<'_>,
    #[description = "Question number"]
    #[min = 1]
    number: u32,
    #[description = "New text"] text: String,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| Ok(form.set_question_text(index(number), &text)?)).await;
    reply(&ctx, result).await
}

/// Remove a question
#[poise::command(slash_command, rename = "remove-question")]
pub async fn remove_question(
    ctx: Context<'_>,
    #[description = "Question number"]
    #[min = 1]
    number: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| {
        form.remove_question(index(number))?;
        Ok(())
    })
    .await;
    reply(&ctx, result).await
}

/// Mark the next selection as an answer to this question
#[poise::command(slash_command)]
pub async fn arm(
    ctx: Context<'_>,
    #[description = "Question number"]
    #[min = 1]
    number: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| Ok(form.arm(index(number))?)).await;
    reply(&ctx, result).await
}

/// Stop waiting for an answer selection
#[poise::command(slash_command)]
pub async fn disarm(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| {
        form.disarm();
        Ok(())
    })
    .await;
    reply(&ctx, result).await
}

/// Select article characters [start, end) as an answer
#[poise::command(slash_command)]
pub async fn select(
    ctx: Context<'_>,
    #[description = "First character offset"] start: u32,
    #[description = "Offset just past the last character"] end: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = capture(&ws, |text| {
        Some(TextSelection::from_char_range(text, start as usize, end as usize))
    })
    .await;
    reply(&ctx, result).await
}

/// Select a phrase of the article as an answer
#[poise::command(slash_command, rename = "select-text")]
pub async fn select_text(
    ctx: Context<'_>,
    #[description = "Exact text to select"] phrase: String,
    #[description = "Which occurrence (default 1)"]
    #[min = 1]
    occurrence: Option<u32>,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let occurrence = occurrence.unwrap_or(1) as usize;
    let result = capture(&ws, |text| TextSelection::find(text, &phrase, occurrence)).await;
    reply(&ctx, result).await
}

/// Turn a selection over the article text into an answer of the armed
/// question. Selecting without an armed question changes nothing.
async fn capture<F>(ws: &Arc<Mutex<Workspace>>, select: F) -> Result<String, WorkspaceError>
where
    F: FnOnce(&str) -> Option<TextSelection>,
{
    let mut w = ws.lock().await;
    let form = w.form_mut()?;
    let Some(text) = form.article_text() else {
        return Ok("Article text will appear here once `/draft article` finds it.".to_string());
    };
    let Some(selection) = select(text) else {
        return Ok("That text does not appear in the article.".to_string());
    };
    if form.armed().is_none() {
        return Ok("Arm a question first with `/draft arm`.".to_string());
    }
    form.capture_selection(&selection);
    Ok(render::draft(form))
}

/// Remove an answer
#[poise::command(slash_command, rename = "remove-answer")]
pub async fn remove_answer(
    ctx: Context<'_>,
    #[description = "Question number"]
    #[min = 1]
    question: u32,
    #[description = "Answer number"]
    #[min = 1]
    answer: u32,
) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = edit_draft(&ws, |form| {
        form.remove_answer(index(question), index(answer))?;
        Ok(())
    })
    .await;
    reply(&ctx, result).await
}

/// Validate and save the draft
#[poise::command(slash_command)]
pub async fn submit(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    match workspace::submit_form(&ws).await {
        Ok(qa_id) => {
            info!(user = %ctx.author().name, qa_id = ?qa_id, "qa saved");
            let result = super::qa::list_view(&*ws.lock().await)
                .map(|view| format!("Saved.\n\n{}", view));
            reply(&ctx, result).await
        }
        Err(e) => reply(&ctx, Err(e)).await,
    }
}

/// Discard the draft
#[poise::command(slash_command)]
pub async fn close(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    let result = {
        let mut w = ws.lock().await;
        w.close_form();
        super::qa::list_view(&w)
    };
    reply(&ctx, result).await
}
