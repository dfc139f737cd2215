//! # API Module
//!
//! HTTP endpoints served by `partylist serve` and by the temporary server that
//! `partylist auth` starts:
//!
//! - [`callback`] - OAuth redirect target, finishes the PKCE exchange
//! - [`status`] - JSON view of the shared Spotify connection
//! - [`health`] - liveness and version
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use partylist::api::{callback, health, status};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/status", get(status))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;
mod status;

pub use callback::callback;
pub use health::health;
pub use status::status;
