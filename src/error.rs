//! Error taxonomy for the Spotify integration.
//!
//! Network and provider failures are translated into these variants at the
//! service boundary, so CLI and HTTP surfaces only ever deal with one type.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The `state` returned by the provider is not the one we sent.
    #[error("authorization state mismatch")]
    StateMismatch,

    /// No PKCE verifier is stored here (flow started elsewhere or already finished).
    #[error("no pending authorization found on this machine")]
    MissingVerifier,

    /// Neither the local session nor the shared record yields a usable token.
    #[error("no usable Spotify token")]
    Unauthenticated,

    /// A playlist is already locked in.
    #[error("playlist '{name}' ({id}) is already locked in")]
    AlreadyLocked { id: String, name: String },

    /// Sync requested before any playlist was chosen.
    #[error("no playlist selected")]
    NoPlaylistSelected,

    /// HTTP 429 that we did not (or could no longer) wait out.
    #[error("rate limited by Spotify{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Any other non-success answer from Spotify.
    #[error("Spotify answered {status}: {message}")]
    Provider { status: u16, message: String },

    /// The browser login did not come back in time.
    #[error("timed out waiting for the Spotify login")]
    AuthTimeout,

    /// The local callback server could not start or stopped early.
    #[error("callback server failed: {0}")]
    CallbackServer(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("file watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl Error {
    /// Short hint shown to the user next to the error message.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Error::StateMismatch | Error::MissingVerifier => {
                Some("Restart the Spotify connection with `partylist auth`.")
            }
            Error::Unauthenticated => Some("Spotify is not connected. Run `partylist auth`."),
            Error::AlreadyLocked { .. } => {
                Some("The playlist is locked for the event. Use `partylist unlock` only in an emergency.")
            }
            Error::NoPlaylistSelected => Some("Pick a playlist first with `partylist select <id>`."),
            Error::RateLimited { .. } => Some("Spotify is rate limiting us. Retry in a moment."),
            Error::Provider { status, .. } if *status == 401 || *status == 403 => {
                Some("Spotify rejected the credentials. Reconnect with `partylist auth`.")
            }
            Error::Provider { status, .. } if *status == 413 => Some("Choose fewer items and retry."),
            Error::Provider { .. } | Error::Http(_) => Some("Retry later."),
            Error::AuthTimeout => Some("Finish the login in the browser within two minutes."),
            Error::CallbackServer(_) => Some(
                "Is `partylist serve` already running on SERVER_ADDRESS? Stop it or change the address.",
            ),
            Error::Config(_) => Some("Check your partylist .env file."),
            Error::Io(_) | Error::Serde(_) | Error::Watch(_) => None,
        }
    }

    /// True when Spotify refused the request itself (4xx), as opposed to a
    /// transport failure or a server-side hiccup that may pass.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Provider { status, .. } if (400..500).contains(status))
    }
}
