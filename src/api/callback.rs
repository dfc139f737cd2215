use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::{error::Error, server::AppState, warning};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Redirect target registered with Spotify. Completes the PKCE flow.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    State(app): State<AppState>,
) -> Html<String> {
    if let Some(error) = params.error {
        warning!("Spotify denied the authorization: {}", error);
        return Html(format!("<h4>Spotify denied access: {}.</h4>", error));
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        return Html("<h4>Missing authorization code or state.</h4>".to_string());
    };

    match app.authorizer.complete_authorization(&code, &state).await {
        Ok(record) => Html(format!(
            "<h2>Spotify connected.</h2><p>Connected by {}. You can close this window.</p>",
            record.authenticated_by
        )),
        Err(Error::StateMismatch) => {
            warning!("Authorization state mismatch, ignoring callback.");
            Html("<h4>Login failed: state mismatch. Start again.</h4>".to_string())
        }
        Err(Error::MissingVerifier) => {
            Html("<h4>Login failed: no login was started on this machine.</h4>".to_string())
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>".to_string())
        }
    }
}
