use chrono::Utc;

use crate::{cli::Context, info, management::current_status, success, warning};

pub async fn status(ctx: &Context) {
    let status = match current_status(ctx.shared.as_ref()).await {
        Ok(s) => s,
        Err(e) => super::fail(e),
    };

    match (&status.authenticated_by, status.authenticated_at) {
        (Some(by), Some(at)) if status.available => {
            success!("Spotify connected by {} since {}.", by, at.format("%Y-%m-%d %H:%M"))
        }
        (Some(by), Some(at)) => warning!(
            "Spotify not available. Last connected by {} on {}.",
            by,
            at.format("%Y-%m-%d %H:%M")
        ),
        _ => warning!("Spotify not connected. Run `partylist auth`."),
    }

    match ctx.authorizer.session().token().await {
        Ok(Some(token)) if !token.is_expired_at(Utc::now()) => {
            info!("Local admin session valid until {}.", token.expires_at().format("%H:%M"))
        }
        Ok(Some(_)) => info!("Local admin session expired."),
        Ok(None) => {}
        Err(e) => warning!("Cannot read local session: {}", e),
    }

    match ctx.selector.current().await {
        Ok(Some(p)) => info!(
            "Target playlist: {} ({}), {} tracks when selected{}.",
            p.name,
            p.id,
            p.track_count,
            if p.is_locked { ", locked" } else { "" }
        ),
        Ok(None) => info!("No target playlist selected."),
        Err(e) => warning!("Cannot read playlist selection: {}", e),
    }
}
