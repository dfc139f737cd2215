use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;

use crate::{
    api,
    error::{Error, Result},
    management::KvStore,
    spotify::Authorizer,
};

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub shared: Arc<dyn KvStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .route("/callback", get(api::callback))
        .with_state(state)
}

/// Binds the callback/status server without serving yet, so callers learn
/// about an occupied port before anything else happens.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| Error::Config(format!("invalid server address {}: {}", addr, e)))?;
    Ok(TcpListener::bind(&addr).await?)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn start_api_server(state: AppState, addr: &str) -> Result<()> {
    serve(bind(addr).await?, state).await
}
