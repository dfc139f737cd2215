use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Admin session token as cached on the machine that ran the OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: i64,
}

impl Token {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.obtained_at, 0).unwrap_or_default()
            + Duration::seconds(self.expires_in as i64)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// The single shared credential set every guest session acts through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub authenticated_by: String,
    pub authenticated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TokenRecord {
    /// Active and not past its expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    /// Active but expiring within `window` (or already expired).
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at - window <= now
    }
}

/// Pending authorization, kept on the machine that started it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkceState {
    pub code_verifier: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

/// Token endpoint answer for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// What any UI surface needs to know about the integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyStatus {
    pub available: bool,
    pub authenticated_by: Option<String>,
    pub authenticated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedPlaylist {
    pub id: String,
    pub name: String,
    pub track_count: u32,
    pub selected_at: DateTime<Utc>,
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub track_count: u32,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub tracks: u32,
    pub selected: String,
}

/// Song request handed over by the music-request feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub spotify_track_id: Option<String>,
    #[serde(default)]
    pub vote_count: u32,
}

impl TrackRequest {
    pub fn label(&self) -> String {
        format!("'{}' by {}", self.title, self.artist)
    }
}

/// Outcome of one synchronizer call. Partial success is normal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub added_count: usize,
    pub removed_count: usize,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
}

impl SyncResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub tracks: PlaylistTracksRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u32,
}

impl From<Playlist> for PlaylistSummary {
    fn from(p: Playlist) -> Self {
        PlaylistSummary {
            id: p.id,
            name: p.name,
            track_count: p.tracks.total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    pub items: Vec<Playlist>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksPage {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// `null` for tracks that were removed from the catalog.
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Local files carry no id.
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveTracksFromPlaylistRequest {
    pub tracks: Vec<TrackPositions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPositions {
    pub uri: String,
    pub positions: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}
