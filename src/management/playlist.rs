use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{Error, Result},
    management::store::{self, KvStore},
    types::{PlaylistSummary, SelectedPlaylist},
};

pub const SELECTED_PLAYLIST_KEY: &str = "selected_playlist";

/// Binds this machine to exactly one target playlist.
///
/// Once locked the choice can only be undone through [`emergency_unlock`],
/// which keeps songs from being split across two playlists mid-event. The lock
/// is advisory: it is enforced here and nowhere else.
///
/// [`emergency_unlock`]: PlaylistSelector::emergency_unlock
#[derive(Clone)]
pub struct PlaylistSelector {
    store: Arc<dyn KvStore>,
}

impl PlaylistSelector {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn current(&self) -> Result<Option<SelectedPlaylist>> {
        store::load(self.store.as_ref(), SELECTED_PLAYLIST_KEY).await
    }

    /// Selects `playlist` and locks it in.
    ///
    /// # Arguments
    ///
    /// * `playlist` - The playlist picked from the admin's Spotify account
    ///
    /// # Returns
    ///
    /// The stored selection, or `Error::AlreadyLocked` naming the playlist that
    /// is already locked. Nothing is written in that case.
    pub async fn choose_playlist(&self, playlist: &PlaylistSummary) -> Result<SelectedPlaylist> {
        if let Some(existing) = self.current().await? {
            if existing.is_locked {
                return Err(Error::AlreadyLocked {
                    id: existing.id,
                    name: existing.name,
                });
            }
        }

        let selected = SelectedPlaylist {
            id: playlist.id.clone(),
            name: playlist.name.clone(),
            track_count: playlist.track_count,
            selected_at: Utc::now(),
            is_locked: true,
        };
        store::save(self.store.as_ref(), SELECTED_PLAYLIST_KEY, &selected).await?;
        Ok(selected)
    }

    /// Deletes the selection outright. Returns what was removed.
    pub async fn emergency_unlock(&self) -> Result<Option<SelectedPlaylist>> {
        let current = self.current().await?;
        if current.is_some() {
            self.store.delete(SELECTED_PLAYLIST_KEY).await?;
        }
        Ok(current)
    }
}
