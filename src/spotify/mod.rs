//! # Spotify Integration Module
//!
//! Everything that talks to Spotify lives here: the PKCE login, the token broker
//! that decides which bearer token a request uses, a thin Web API client and the
//! playlist synchronizer built on top of it.
//!
//! ## Architecture
//!
//! ```text
//! CLI / HTTP callback server
//!          ↓
//! PlaylistSynchronizer ── add_approved / remove_tracks
//!          ↓
//! SpotifyClient ── paginated reads (retried), single-shot mutations
//!          ↓
//! TokenBroker ── LocalTokenSource → SharedTokenSource
//!          ↓
//! Authorizer ── PKCE exchange / refresh → shared TokenRecord
//! ```
//!
//! ## Authentication Strategy
//!
//! One admin connects once. The resulting credentials are written to the shared
//! token record, so every other session acts through the same account without
//! logging in. The broker refreshes that record ahead of its expiry (configurable
//! window) instead of waiting for a 401 halfway through a sync. A refresh token
//! Spotify rejects disables the record for good; the admin has to reconnect.
//!
//! ## Error Handling
//!
//! - Reads retry 429 (honouring `Retry-After` up to two minutes) and 502/503/504 a
//!   bounded number of times.
//! - Mutations are sent exactly once. Re-running a sync is safe because the
//!   synchronizer re-reads the playlist first.
//! - Every failure is mapped to [`crate::error::Error`] before it leaves this
//!   module.
//!
//! ## API Coverage
//!
//! - `GET /authorize`, `POST /api/token` (authorization_code, refresh_token)
//! - `GET /me`, `GET /me/playlists`
//! - `GET /playlists/{id}`, `GET /playlists/{id}/tracks?offset&limit`
//! - `POST /playlists/{id}/tracks`, `DELETE /playlists/{id}/tracks`

pub mod auth;
pub mod broker;
pub mod client;
mod http;
pub mod sync;

pub use auth::Authorizer;
pub use broker::{LocalTokenSource, SharedTokenSource, TokenBroker, TokenSource};
pub use client::SpotifyClient;
pub use http::RetryPolicy;
pub use sync::PlaylistSynchronizer;
