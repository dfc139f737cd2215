use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::Result,
    management::store::{self, KvStore},
    types::{PkceState, Token, TokenRecord},
};

/// Shared store key of the one token record.
pub const TOKEN_RECORD_KEY: &str = "spotify_token_record";
/// Local store keys.
pub const LOCAL_TOKEN_KEY: &str = "spotify_token";
pub const PKCE_STATE_KEY: &str = "spotify_pkce";

/// Typed access to the shared [`TokenRecord`].
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KvStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        TokenStore { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub async fn load(&self) -> Result<Option<TokenRecord>> {
        store::load(self.store.as_ref(), TOKEN_RECORD_KEY).await
    }

    /// Overwrites the record as a whole.
    pub async fn save(&self, record: &TokenRecord) -> Result<()> {
        store::save(self.store.as_ref(), TOKEN_RECORD_KEY, record).await
    }

    /// Flips `is_active` off, keeping provenance. Returns the deactivated record.
    pub async fn deactivate(&self) -> Result<Option<TokenRecord>> {
        let Some(mut record) = self.load().await? else {
            return Ok(None);
        };
        if record.is_active {
            record.is_active = false;
            self.save(&record).await?;
        }
        Ok(Some(record))
    }

    /// Deactivates only if the stored record still carries `refresh_token`, so a
    /// rejection of a stale token does not kill a record someone else refreshed.
    ///
    /// # Returns
    ///
    /// `true` when the record was deactivated by this call.
    pub async fn deactivate_if_current(&self, refresh_token: &str) -> Result<bool> {
        match self.load().await? {
            Some(record) if record.refresh_token == refresh_token && record.is_active => {
                self.deactivate().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Per-machine session data: pending PKCE state and the admin's own token.
#[derive(Clone)]
pub struct LocalSession {
    store: Arc<dyn KvStore>,
}

impl LocalSession {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        LocalSession { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub async fn pending(&self) -> Result<Option<PkceState>> {
        store::load(self.store.as_ref(), PKCE_STATE_KEY).await
    }

    pub async fn set_pending(&self, state: &PkceState) -> Result<()> {
        store::save(self.store.as_ref(), PKCE_STATE_KEY, state).await
    }

    pub async fn clear_pending(&self) -> Result<()> {
        self.store.delete(PKCE_STATE_KEY).await
    }

    pub async fn token(&self) -> Result<Option<Token>> {
        store::load(self.store.as_ref(), LOCAL_TOKEN_KEY).await
    }

    /// The cached token if it has not expired yet.
    pub async fn valid_token(&self) -> Result<Option<Token>> {
        let now = Utc::now();
        Ok(self.token().await?.filter(|t| !t.is_expired_at(now)))
    }

    pub async fn set_token(&self, token: &Token) -> Result<()> {
        store::save(self.store.as_ref(), LOCAL_TOKEN_KEY, token).await
    }

    pub async fn forget_token(&self) -> Result<()> {
        self.store.delete(LOCAL_TOKEN_KEY).await
    }
}
