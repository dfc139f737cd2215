mod auth;
mod playlist;
mod status;
pub mod store;

pub use auth::LOCAL_TOKEN_KEY;
pub use auth::LocalSession;
pub use auth::PKCE_STATE_KEY;
pub use auth::TOKEN_RECORD_KEY;
pub use auth::TokenStore;
pub use playlist::PlaylistSelector;
pub use playlist::SELECTED_PLAYLIST_KEY;
pub use status::current_status;
pub use status::status_of;
pub use status::watch_status;
pub use store::FileStore;
pub use store::KvStore;
pub use store::MemoryStore;
pub use store::Subscription;
