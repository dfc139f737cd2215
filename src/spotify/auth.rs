use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    error::{Error, Result},
    info,
    management::{LocalSession, TokenStore, watch_status},
    server::{self, AppState},
    spotify::http::{self, RetryPolicy},
    success,
    types::{PkceState, Token, TokenRecord, TokenResponse},
    utils, warning,
};

/// How long `partylist auth` waits for the browser to come back.
const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// PKCE authorization code flow against the Spotify accounts service.
///
/// Every successful exchange or refresh rewrites the shared [`TokenRecord`] as a
/// whole, so every reader sees the same credentials. There is no client secret
/// anywhere in this flow.
pub struct Authorizer {
    config: Arc<Config>,
    client: Client,
    session: LocalSession,
    tokens: TokenStore,
}

impl Authorizer {
    pub fn new(config: Arc<Config>, session: LocalSession, tokens: TokenStore) -> Self {
        Self {
            config,
            client: Client::new(),
            session,
            tokens,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &LocalSession {
        &self.session
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.max_retries,
            delay: self.config.retry_delay,
        }
    }

    /// Generates verifier, challenge and state, remembers them on this machine
    /// and returns the URL the admin has to open.
    pub async fn begin_authorization(&self) -> Result<Url> {
        let code_verifier = utils::generate_code_verifier();
        let code_challenge = utils::generate_code_challenge(&code_verifier);
        let state = utils::generate_state();

        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("state", state.as_str()),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid auth url {}: {}", self.config.auth_url, e)))?;

        self.session
            .set_pending(&PkceState {
                code_verifier,
                state,
                created_at: Utc::now(),
            })
            .await?;

        Ok(url)
    }

    /// Finishes the flow started by [`begin_authorization`] on this machine.
    ///
    /// [`begin_authorization`]: Authorizer::begin_authorization
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<TokenRecord> {
        let Some(pending) = self.session.pending().await? else {
            return Err(Error::MissingVerifier);
        };
        if pending.state != state {
            return Err(Error::StateMismatch);
        }
        if pending.code_verifier.is_empty() {
            return Err(Error::MissingVerifier);
        }

        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("code_verifier", pending.code_verifier.as_str()),
            ])
            .await?;

        let Some(refresh_token) = response.refresh_token.clone() else {
            return Err(Error::Provider {
                status: 200,
                message: "token response carried no refresh token".to_string(),
            });
        };

        let now = Utc::now();
        let record = TokenRecord {
            access_token: response.access_token.clone(),
            refresh_token: refresh_token.clone(),
            expires_at: now + chrono::Duration::seconds(response.expires_in as i64),
            authenticated_by: self.config.admin_name.clone(),
            authenticated_at: now,
            is_active: true,
        };
        self.tokens.save(&record).await?;

        self.session
            .set_token(&Token {
                access_token: response.access_token,
                refresh_token,
                scope: response.scope,
                expires_in: response.expires_in,
                obtained_at: now.timestamp(),
            })
            .await?;
        self.session.clear_pending().await?;

        Ok(record)
    }

    /// Trades the record's refresh token for a new access token.
    ///
    /// A rejection by Spotify deactivates the record: refresh tokens do not come
    /// back to life, so retrying would only repeat the failure.
    pub async fn refresh(&self, record: &TokenRecord) -> Result<TokenRecord> {
        if !record.is_active {
            return Err(Error::Unauthenticated);
        }

        let response = match self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", record.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_rejection() => {
                if self.tokens.deactivate_if_current(&record.refresh_token).await? {
                    warning!("Spotify rejected the refresh token, shared login disabled.");
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        let refreshed = TokenRecord {
            access_token: response.access_token,
            // Spotify does not always rotate the refresh token
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| record.refresh_token.clone()),
            expires_at: now + chrono::Duration::seconds(response.expires_in as i64),
            authenticated_by: record.authenticated_by.clone(),
            authenticated_at: record.authenticated_at,
            is_active: true,
        };
        self.tokens.save(&refreshed).await?;
        Ok(refreshed)
    }

    /// Soft-deletes the shared record and forgets the local session token.
    pub async fn disconnect(&self) -> Result<Option<TokenRecord>> {
        let record = self.tokens.deactivate().await?;
        self.session.forget_token().await?;
        Ok(record)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = http::send_with_retry(
            || self.client.post(&self.config.token_url).form(form),
            self.retry_policy(),
        )
        .await?;
        Ok(response.json::<TokenResponse>().await?)
    }
}

/// Runs the interactive PKCE flow: starts the callback server, opens the browser
/// and waits until the shared record turns active.
///
/// # Arguments
///
/// * `authorizer` - Authorizer whose stores receive the new credentials
///
/// # Returns
///
/// The freshly written [`TokenRecord`]. Fails with [`Error::CallbackServer`]
/// when the callback address cannot be bound (checked before the browser
/// opens) or the server dies while waiting, and with [`Error::AuthTimeout`]
/// when the login does not come back within two minutes.
pub async fn auth(authorizer: Arc<Authorizer>) -> Result<TokenRecord> {
    auth_with_timeout(authorizer, AUTH_TIMEOUT).await
}

async fn auth_with_timeout(
    authorizer: Arc<Authorizer>,
    timeout: Duration,
) -> Result<TokenRecord> {
    let listener = server::bind(&authorizer.config().server_addr)
        .await
        .map_err(|e| {
            Error::CallbackServer(format!(
                "cannot listen on {}: {}",
                authorizer.config().server_addr,
                e
            ))
        })?;

    let url = authorizer.begin_authorization().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = watch_status(authorizer.tokens().store().as_ref(), move |status| {
        if status.available {
            let _ = tx.send(status);
        }
    });

    let state = AppState {
        authorizer: Arc::clone(&authorizer),
        shared: Arc::clone(authorizer.tokens().store()),
    };
    let mut server = tokio::spawn(server::serve(listener, state));

    info!("Opening Spotify login in your browser...");
    if webbrowser::open(url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        )
    }

    let outcome = tokio::select! {
        connected = rx.recv() => match connected {
            Some(_) => Ok(()),
            None => Err(Error::CallbackServer("status watcher closed".to_string())),
        },
        stopped = &mut server => Err(Error::CallbackServer(match stopped {
            Ok(Err(e)) => e.to_string(),
            Ok(Ok(())) => "server stopped unexpectedly".to_string(),
            Err(e) => e.to_string(),
        })),
        _ = tokio::time::sleep(timeout) => Err(Error::AuthTimeout),
    };
    subscription.unsubscribe();
    server.abort();
    outcome?;

    let record = authorizer
        .tokens()
        .load()
        .await?
        .ok_or(Error::Unauthenticated)?;
    success!("Spotify connected as {}.", record.authenticated_by);
    Ok(record)
}
