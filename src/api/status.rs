use axum::{extract::State, http::StatusCode, response::Json};

use crate::{management::current_status, server::AppState, types::SpotifyStatus};

/// Whether guests can currently send songs to Spotify.
pub async fn status(
    State(app): State<AppState>,
) -> Result<Json<SpotifyStatus>, (StatusCode, String)> {
    current_status(app.shared.as_ref())
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
