use std::sync::Arc;

use crate::{cli::Context, spotify};

pub async fn auth(ctx: &Context) {
    if let Err(e) = spotify::auth::auth(Arc::clone(&ctx.authorizer)).await {
        super::fail(e);
    }

    // the login may have picked a different Spotify account than expected
    match ctx.client.current_user().await {
        Ok(user) => crate::info!(
            "Songs will be added with the Spotify account {}.",
            user.display_name.unwrap_or(user.id)
        ),
        Err(e) => crate::warning!("Connected, but reading the Spotify account failed: {}", e),
    }
}

pub async fn disconnect(ctx: &Context) {
    match ctx.authorizer.disconnect().await {
        Ok(Some(record)) => crate::success!(
            "Spotify disconnected. It was connected by {} on {}.",
            record.authenticated_by,
            record.authenticated_at.format("%Y-%m-%d %H:%M")
        ),
        Ok(None) => crate::info!("Spotify was never connected."),
        Err(e) => super::fail(e),
    }
}
