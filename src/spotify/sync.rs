use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{Error, Result},
    management::PlaylistSelector,
    spotify::client::SpotifyClient,
    types::{SyncResult, TrackRequest},
    utils::{self, SPOTIFY_BATCH_LIMIT},
};

/// Converges the selected playlist toward the approved requests without
/// duplicating them and without touching tracks added by hand in Spotify.
///
/// Partial failures end up in [`SyncResult::errors`]; only a missing token is
/// returned as `Err`, because then nothing can be attempted at all.
pub struct PlaylistSynchronizer {
    client: Arc<SpotifyClient>,
    playlist_id: String,
}

impl PlaylistSynchronizer {
    pub fn new(client: Arc<SpotifyClient>, playlist_id: impl Into<String>) -> Self {
        Self {
            client,
            playlist_id: playlist_id.into(),
        }
    }

    /// Synchronizer for the playlist locked in on this machine.
    pub async fn for_selected(
        client: Arc<SpotifyClient>,
        selector: &PlaylistSelector,
    ) -> Result<Self> {
        let selected = selector.current().await?.ok_or(Error::NoPlaylistSelected)?;
        Ok(Self::new(client, selected.id))
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    /// Track ids per playlist position.
    async fn snapshot(&self) -> Result<Vec<Option<String>>> {
        let tracks = self.client.playlist_tracks(&self.playlist_id).await?;
        Ok(tracks
            .into_iter()
            .map(|t| t.and_then(|t| t.id))
            .collect())
    }

    /// Appends every approved request that is not in the playlist yet.
    ///
    /// Requests are deduplicated against the current playlist and against each
    /// other, then sent in batches of 100. A failed batch is recorded and the
    /// following batches are still sent.
    ///
    /// # Arguments
    ///
    /// * `requests` - Approved requests in the order they should be appended
    ///
    /// # Returns
    ///
    /// The number of tracks added, with a note per skipped request and an
    /// error per failed batch. `Err(Error::Unauthenticated)` only when no
    /// token was available before anything could be attempted.
    pub async fn add_approved(&self, requests: &[TrackRequest]) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        let existing: HashSet<String> = match self.snapshot().await {
            Ok(snapshot) => snapshot.into_iter().flatten().collect(),
            Err(Error::Unauthenticated) => return Err(Error::Unauthenticated),
            Err(e) => {
                // adding blind could duplicate, so add nothing
                result
                    .errors
                    .push(format!("Could not read the playlist: {}", e));
                return Ok(result);
            }
        };

        let plan = utils::plan_additions(&existing, requests);
        result.notes = plan.notes;

        let batches = plan.to_add.chunks(SPOTIFY_BATCH_LIMIT);
        let batch_count = batches.len();
        for (index, batch) in batches.enumerate() {
            let uris: Vec<String> = batch.iter().map(|id| utils::track_uri(id)).collect();
            match self.client.add_tracks(&self.playlist_id, &uris).await {
                Ok(_) => result.added_count += batch.len(),
                Err(Error::Unauthenticated) if result.added_count == 0 && result.is_clean() => {
                    return Err(Error::Unauthenticated);
                }
                Err(e) => {
                    let fatal = matches!(e, Error::Unauthenticated);
                    result.errors.push(format!(
                        "Batch {}/{} ({} tracks) failed: {}",
                        index + 1,
                        batch_count,
                        batch.len(),
                        e
                    ));
                    // without a token the remaining batches cannot succeed either
                    if fatal {
                        break;
                    }
                }
            }
        }

        Ok(result)
    }

    /// Removes every occurrence of the given tracks.
    ///
    /// Each occurrence is deleted by its exact position, highest position
    /// first, so tracks the admin added by hand at other positions stay.
    ///
    /// # Arguments
    ///
    /// * `track_ids` - Bare ids, `spotify:track:` URIs or open.spotify.com links
    ///
    /// # Returns
    ///
    /// The number of entries removed, a note per id that was not found and an
    /// error per position Spotify refused.
    pub async fn remove_tracks(&self, track_ids: &[String]) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        let targets: Vec<String> = track_ids
            .iter()
            .filter_map(|id| utils::normalize_track_id(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(Error::Unauthenticated) => return Err(Error::Unauthenticated),
            Err(e) => {
                result
                    .errors
                    .push(format!("Could not read the playlist: {}", e));
                return Ok(result);
            }
        };

        let counts = utils::count_occurrences(&snapshot);
        let mut missing: Vec<&String> = targets
            .iter()
            .filter(|id| !counts.contains_key(id.as_str()))
            .collect();
        missing.sort();
        for id in missing {
            result
                .notes
                .push(format!("{} is not in the playlist, nothing to remove", id));
        }

        for (id, position) in utils::plan_removals(&snapshot, &targets) {
            let uri = utils::track_uri(&id);
            match self
                .client
                .remove_track_positions(&self.playlist_id, &uri, &[position])
                .await
            {
                Ok(_) => result.removed_count += 1,
                Err(e) => result.errors.push(format!(
                    "Removing {} at position {} failed: {}",
                    id, position, e
                )),
            }
        }

        Ok(result)
    }
}
