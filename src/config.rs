//! Configuration management for partylist.
//!
//! Values come from environment variables, optionally seeded from a `.env` file in
//! the local data directory. Environment variables always win over the file.
//!
//! Only the Spotify client id and the redirect URI are mandatory. The redirect URI
//! is sent verbatim in both the authorize and token requests, so it must match the
//! one registered with the Spotify app character for character; Spotify answers a
//! mismatch with an opaque `invalid_grant`.

use std::{env, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SCOPE: &str =
    "playlist-read-private playlist-modify-public playlist-modify-private user-read-private";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Loads environment variables from `<data_local_dir>/partylist/.env`.
///
/// The directory is created when missing. A missing `.env` file is not an error;
/// the process environment alone may carry the configuration.
pub async fn load_env() -> std::result::Result<(), String> {
    let mut path = data_dir_default();
    path.push(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("cannot read {}: {}", path.display(), e)),
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub server_addr: String,
    /// Recorded as `authenticated_by` on the shared token record.
    pub admin_name: String,
    /// Local, per-machine state: PKCE verifier, admin session token, selected playlist.
    pub data_dir: PathBuf,
    /// Where the shared token record lives.
    pub shared_dir: PathBuf,
    /// Refresh the shared token when it expires within this many seconds.
    pub refresh_window_secs: i64,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Config {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("PARTYLIST_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir_default());
        let shared_dir = env::var("PARTYLIST_SHARED_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("shared"));

        Ok(Self {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            redirect_uri: required("SPOTIFY_API_REDIRECT_URI")?,
            scope: optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            auth_url: optional("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: optional("SPOTIFY_API_URL", DEFAULT_API_URL),
            server_addr: optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            admin_name: optional("PARTYLIST_ADMIN_NAME", "admin"),
            data_dir: data_dir.join("local"),
            shared_dir,
            refresh_window_secs: parsed("PARTYLIST_REFRESH_WINDOW_SECS", 300)?,
            max_retries: parsed("PARTYLIST_MAX_RETRIES", 3)?,
            retry_delay: Duration::from_millis(parsed("PARTYLIST_RETRY_DELAY_MS", 2000)?),
        })
    }

    /// Configuration pointing every endpoint at `base` (a fake Spotify in tests).
    pub fn for_base_url(base: &str, data_dir: PathBuf) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            client_id: "partylist-test".to_string(),
            redirect_uri: format!("{}/callback", base),
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: format!("{}/authorize", base),
            token_url: format!("{}/api/token", base),
            api_url: format!("{}/v1", base),
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
            admin_name: "admin".to_string(),
            shared_dir: data_dir.join("shared"),
            data_dir: data_dir.join("local"),
            refresh_window_secs: 300,
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        }
    }
}

fn data_dir_default() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("partylist");
    path
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{} must be set", key))),
    }
}

fn optional(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {}", key, v))),
        _ => Ok(default),
    }
}
