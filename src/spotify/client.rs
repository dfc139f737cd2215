use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::Result,
    spotify::{
        broker::TokenBroker,
        http::{self, RetryPolicy},
    },
    types::{
        AddTrackToPlaylistRequest, GetUserPlaylistsResponse, Playlist, PlaylistSummary,
        PlaylistTracksPage, RemoveTracksFromPlaylistRequest, SnapshotResponse, Track,
        TrackPositions, UserProfile,
    },
    utils::SPOTIFY_BATCH_LIMIT,
};

/// Thin Web API client. Every call asks the broker for a token first, so an
/// expiring shared token is refreshed before it can surface as a 401 here.
pub struct SpotifyClient {
    client: Client,
    api_url: String,
    policy: RetryPolicy,
    broker: Arc<TokenBroker>,
}

impl SpotifyClient {
    pub fn new(config: &Config, broker: Arc<TokenBroker>) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy {
                max_attempts: config.max_retries,
                delay: config.retry_delay,
            },
            broker,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.broker.get_valid_token().await?;
        let response = http::send_with_retry(
            || self.client.get(url).bearer_auth(&token),
            self.policy,
        )
        .await?;
        Ok(response.json::<T>().await?)
    }

    /// Profile of the account the shared token belongs to.
    pub async fn current_user(&self) -> Result<UserProfile> {
        self.get_json(&format!("{}/me", self.api_url)).await
    }

    /// All playlists of the connected account, following `next` links.
    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let mut playlists = Vec::new();
        let mut next = Some(format!("{}/me/playlists?limit=50", self.api_url));

        while let Some(url) = next {
            let page: GetUserPlaylistsResponse = self.get_json(&url).await?;
            playlists.extend(page.items.into_iter().map(PlaylistSummary::from));
            next = page.next;
        }

        Ok(playlists)
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<PlaylistSummary> {
        let playlist: Playlist = self
            .get_json(&format!(
                "{}/playlists/{}?fields=id,name,tracks.total",
                self.api_url, playlist_id
            ))
            .await?;
        Ok(playlist.into())
    }

    /// Every entry of the playlist in position order. Entries without a track
    /// (removed from the catalog) are kept as `None` so positions stay aligned.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Option<Track>>> {
        let mut tracks = Vec::new();
        let mut offset = 0usize;

        loop {
            let page: PlaylistTracksPage = self
                .get_json(&format!(
                    "{}/playlists/{}/tracks?offset={}&limit={}",
                    self.api_url, playlist_id, offset, SPOTIFY_BATCH_LIMIT
                ))
                .await?;

            let fetched = page.items.len();
            tracks.extend(page.items.into_iter().map(|item| item.track));
            offset += fetched;

            if fetched == 0 || page.next.is_none() || offset >= page.total as usize {
                break;
            }
        }

        Ok(tracks)
    }

    /// Appends up to 100 URIs. Sent once, never retried.
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<String> {
        let token = self.broker.get_valid_token().await?;
        let response = http::send_once(
            self.client
                .post(format!("{}/playlists/{}/tracks", self.api_url, playlist_id))
                .bearer_auth(&token)
                .json(&AddTrackToPlaylistRequest {
                    uris: uris.to_vec(),
                }),
        )
        .await?;
        Ok(response.json::<SnapshotResponse>().await?.snapshot_id)
    }

    /// Removes the entries of `uri` at exactly `positions`.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - Playlist to remove from
    /// * `uri` - Full `spotify:track:` URI of the entries
    /// * `positions` - Zero-based positions in the current playlist
    ///
    /// # Returns
    ///
    /// The new `snapshot_id`. Sent once, never retried.
    pub async fn remove_track_positions(
        &self,
        playlist_id: &str,
        uri: &str,
        positions: &[usize],
    ) -> Result<String> {
        let token = self.broker.get_valid_token().await?;
        let response = http::send_once(
            self.client
                .delete(format!("{}/playlists/{}/tracks", self.api_url, playlist_id))
                .bearer_auth(&token)
                .json(&RemoveTracksFromPlaylistRequest {
                    tracks: vec![TrackPositions {
                        uri: uri.to_string(),
                        positions: positions.to_vec(),
                    }],
                }),
        )
        .await?;
        Ok(response.json::<SnapshotResponse>().await?.snapshot_id)
    }
}
