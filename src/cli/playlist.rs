use std::io::Write;

use tabled::Table;

use crate::{
    cli::{Context, spinner},
    error, info, success,
    types::{PlaylistSummary, PlaylistTableRow},
    warning,
};

pub(crate) fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn list_playlists(ctx: &Context) {
    let pb = spinner("Fetching playlists...");
    let playlists = ctx.client.user_playlists().await;
    pb.finish_and_clear();

    let playlists = match playlists {
        Ok(p) => p,
        Err(e) => super::fail(e),
    };

    let selected_id = match ctx.selector.current().await {
        Ok(s) => s.map(|s| s.id),
        Err(e) => {
            warning!("Cannot read playlist selection: {}", e);
            None
        }
    };

    let rows: Vec<PlaylistTableRow> = playlists
        .into_iter()
        .map(|p| PlaylistTableRow {
            selected: if selected_id.as_deref() == Some(p.id.as_str()) {
                "locked".to_string()
            } else {
                String::new()
            },
            id: p.id,
            name: p.name,
            tracks: p.track_count,
        })
        .collect();

    println!("{}", Table::new(rows));
}

pub async fn select(ctx: &Context, playlist_id: &str, yes: bool) {
    if let Ok(Some(current)) = ctx.selector.current().await {
        if current.is_locked {
            warning!(
                "Playlist '{}' is already locked in for the event.",
                current.name
            );
            return;
        }
    }

    let playlist: PlaylistSummary = match ctx.client.playlist(playlist_id).await {
        Ok(p) => p,
        Err(e) => super::fail(e),
    };

    info!(
        "Selecting '{}' ({} tracks). This cannot be changed during the event.",
        playlist.name, playlist.track_count
    );
    if !yes && !confirm("Lock in this playlist?") {
        info!("Nothing changed.");
        return;
    }

    match ctx.selector.choose_playlist(&playlist).await {
        Ok(selected) => success!("Playlist '{}' locked in.", selected.name),
        Err(e) => super::fail(e),
    }
}

/// Requires the admin to retype the playlist name, on top of the flag.
pub async fn unlock(ctx: &Context, confirm_name: &str) {
    let current = match ctx.selector.current().await {
        Ok(Some(c)) => c,
        Ok(None) => {
            info!("No playlist selected, nothing to unlock.");
            return;
        }
        Err(e) => super::fail(e),
    };

    if current.name != confirm_name {
        error!(
            "Confirmation does not match. Pass --confirm \"{}\" to remove the selection.",
            current.name
        );
    }

    match ctx.selector.emergency_unlock().await {
        Ok(_) => warning!(
            "Selection of '{}' removed. Choose a playlist again before syncing.",
            current.name
        ),
        Err(e) => super::fail(e),
    }
}
