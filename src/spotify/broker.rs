use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    management::LocalSession,
    spotify::auth::Authorizer,
    warning,
};

/// One place a bearer token may come from.
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// A usable access token, or `None` if this source has nothing to offer.
    async fn try_get(&self) -> Option<String>;
}

/// The admin's own session token on this machine.
pub struct LocalTokenSource {
    session: LocalSession,
}

impl LocalTokenSource {
    pub fn new(session: LocalSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TokenSource for LocalTokenSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn try_get(&self) -> Option<String> {
        match self.session.valid_token().await {
            Ok(token) => token.map(|t| t.access_token),
            Err(e) => {
                warning!("Cannot read local Spotify session: {}", e);
                None
            }
        }
    }
}

/// The shared token record, refreshed ahead of expiry.
pub struct SharedTokenSource {
    authorizer: Arc<Authorizer>,
    window: Duration,
    refresh_lock: Mutex<()>,
}

impl SharedTokenSource {
    pub fn new(authorizer: Arc<Authorizer>, window: Duration) -> Self {
        Self {
            authorizer,
            window,
            refresh_lock: Mutex::new(()),
        }
    }

    async fn resolve(&self) -> Result<Option<String>> {
        let tokens = self.authorizer.tokens();
        let Some(record) = tokens.load().await?.filter(|r| r.is_active) else {
            return Ok(None);
        };
        if !record.needs_refresh_at(Utc::now(), self.window) {
            return Ok(Some(record.access_token));
        }

        // one refresh at a time; whoever waited re-reads what the winner wrote
        let _guard = self.refresh_lock.lock().await;
        let Some(record) = tokens.load().await?.filter(|r| r.is_active) else {
            return Ok(None);
        };
        if !record.needs_refresh_at(Utc::now(), self.window) {
            return Ok(Some(record.access_token));
        }

        match self.authorizer.refresh(&record).await {
            Ok(refreshed) => Ok(Some(refreshed.access_token)),
            // a hiccup while refreshing early must not hide a token that still works
            Err(e) if !e.is_rejection() && record.is_usable_at(Utc::now()) => {
                warning!(
                    "Refreshing the shared Spotify token failed, using the current one: {}",
                    e
                );
                Ok(Some(record.access_token))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl TokenSource for SharedTokenSource {
    fn name(&self) -> &'static str {
        "shared"
    }

    async fn try_get(&self) -> Option<String> {
        match self.resolve().await {
            Ok(token) => token,
            Err(e) => {
                warning!("Shared Spotify token unavailable: {}", e);
                None
            }
        }
    }
}

/// Hands out one valid access token, trying each source in order.
pub struct TokenBroker {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenBroker {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Local session first, then the shared record.
    pub fn standard(authorizer: Arc<Authorizer>) -> Self {
        let window = Duration::seconds(authorizer.config().refresh_window_secs);
        let session = authorizer.session().clone();
        Self::new(vec![
            Box::new(LocalTokenSource::new(session)),
            Box::new(SharedTokenSource::new(authorizer, window)),
        ])
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// `Unauthenticated` means "feature unavailable", not "try again".
    pub async fn get_valid_token(&self) -> Result<String> {
        for source in &self.sources {
            if let Some(token) = source.try_get().await {
                return Ok(token);
            }
        }
        Err(Error::Unauthenticated)
    }
}
