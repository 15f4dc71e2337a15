use tracing::info;

use super::{ready_workspace, send_chunked};
use crate::state::Context;
use crate::views::render;
use crate::workspace;

/// Disease QA curator: session and dataset
#[poise::command(
    slash_command,
    subcommands("login", "logout", "status", "refresh")
)]
pub async fn curator(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Log in through the identity provider
#[poise::command(slash_command)]
pub async fn login(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let data = ctx.data();
    let ws = data.workspace(ctx.author().id.get()).await;

    let (login, ticket) = match workspace::begin_login(&ws, data.identity.as_ref()).await {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            ctx.say("You are already logged in.").await?;
            return Ok(());
        }
        Err(e) => {
            ctx.say(format!("Login failed: {}", e)).await?;
            return Ok(());
        }
    };

    info!(user = %ctx.author().name, "device login started");
    ctx.say(format!(
        "Open {} and confirm the code **{}**. I'll let you know once you're in.",
        login.verification_uri, login.user_code
    ))
    .await?;

    match workspace::await_login(&ws, data.identity.as_ref(), &login, ticket).await {
        Ok(true) => {}
        Ok(false) => {
            ctx.say("Login was not completed. Run `/curator login` to try again.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            ctx.say(format!("Login failed: {}", e)).await?;
            return Ok(());
        }
    }

    let text = match workspace::ensure_ready(&ws, data.identity.as_ref(), &data.connector).await {
        Ok(()) => render::session(&ws.lock().await.session),
        Err(e) => format!("Login failed: {}", e),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Log out and get the identity provider's logout link
#[poise::command(slash_command)]
pub async fn logout(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let data = ctx.data();
    let ws = data.workspace(ctx.author().id.get()).await;
    match workspace::logout(&ws, data.identity.as_ref(), &data.config.app_url).await {
        Ok(url) => {
            info!(user = %ctx.author().name, "curator logged out");
            ctx.say(format!("Logged out. Finish signing out at {}", url))
                .await?;
        }
        Err(e) => {
            ctx.say(format!("Logged out locally ({}).", e)).await?;
        }
    }
    Ok(())
}

/// Show your session status
#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let ws = ctx.data().workspace(ctx.author().id.get()).await;
    let text = render::session(&ws.lock().await.session);
    ctx.say(text).await?;
    Ok(())
}

/// Ask the server to fetch the disease dataset again
#[poise::command(slash_command)]
pub async fn refresh(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some(ws) = ready_workspace(&ctx).await? else {
        return Ok(());
    };
    info!(user = %ctx.author().name, "dataset refresh");
    let text = match workspace::refresh_dataset(&ws).await {
        Ok(true) => "Success".to_string(),
        Ok(false) => "Failure".to_string(),
        Err(e) => format!("Failure: {}", e),
    };
    send_chunked(&ctx, &text).await
}
