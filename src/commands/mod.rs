mod curator;
mod disease;
mod draft;
mod qa;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::state::{AppState, Context};
use crate::util::chunk_message;
use crate::workspace::{self, Workspace, WorkspaceError};

pub fn all() -> Vec<poise::Command<AppState, anyhow::Error>> {
    vec![
        curator::curator(),
        disease::disease(),
        qa::qa(),
        draft::draft(),
    ]
}

/// The caller's workspace, brought to the ready state. When the session is
/// not ready the caller gets the session status and `None` comes back.
///
/// Defers the interaction first: a silent token refresh and the reads that
/// follow can outlast Discord's acknowledgement window.
async fn ready_workspace(ctx: &Context<'_>) -> Result<Option<Arc<Mutex<Workspace>>>, anyhow::Error> {
    ctx.defer().await?;
    let data = ctx.data();
    let ws = data.workspace(ctx.author().id.get()).await;
    match workspace::ensure_ready(&ws, data.identity.as_ref(), &data.connector).await {
        Ok(()) => Ok(Some(ws)),
        Err(e) => {
            ctx.say(e.to_string()).await?;
            Ok(None)
        }
    }
}

/// Send a reply in Discord-safe chunks.
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in chunk_message(text) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Show a rendered view, or the workspace error as a transient notice.
async fn reply(ctx: &Context<'_>, result: Result<String, WorkspaceError>) -> Result<(), anyhow::Error> {
    match result {
        Ok(text) => send_chunked(ctx, &text).await,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            Ok(())
        }
    }
}

/// 1-based position from a command option to an index.
fn index(position: u32) -> usize {
    position.saturating_sub(1) as usize
}
