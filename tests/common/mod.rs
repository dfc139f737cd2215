#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use partylist::{
    config::Config,
    management::{KvStore, LocalSession, MemoryStore, PlaylistSelector, TokenStore},
    spotify::{Authorizer, PlaylistSynchronizer, SpotifyClient, TokenBroker},
    types::{TokenRecord, TrackRequest},
};

pub const PLAYLIST_ID: &str = "party";
pub const GOOD_CODE: &str = "good-code";
pub const REVOKED_REFRESH: &str = "revoked-refresh";

/// Mutable state of the fake Spotify service.
#[derive(Default)]
pub struct FakeSpotify {
    /// Track ids of the party playlist, in position order.
    pub tracks: Vec<String>,
    /// Largest page the fake hands out, whatever `limit` asks for.
    pub page_cap: usize,
    /// Number of upcoming add requests that fail with 500.
    pub failing_adds: usize,
    /// Positions whose removal fails with 500.
    pub failing_positions: HashSet<usize>,
    /// Number of upcoming token requests answered with 503.
    pub failing_tokens: usize,
    /// Deactivated when the next failing add is answered.
    pub revoke_on_failed_add: Option<TokenStore>,
    /// Number of upcoming playlist reads answered with 429.
    pub rate_limited_reads: usize,
    pub add_batches: Vec<usize>,
    pub delete_calls: Vec<(String, Vec<usize>)>,
    pub token_requests: Vec<HashMap<String, String>>,
    pub bearer_tokens: Vec<String>,
    pub issued: usize,
}

pub type Shared = Arc<Mutex<FakeSpotify>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "No token provided"}})),
    )
        .into_response()
}

async fn token(State(s): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut s = s.lock().unwrap();
    s.token_requests.push(form.clone());
    if s.failing_tokens > 0 {
        s.failing_tokens -= 1;
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "temporarily_unavailable"})),
        )
            .into_response();
    }
    s.issued += 1;
    let n = s.issued;

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let verifier_ok = form
                .get("code_verifier")
                .is_some_and(|v| !v.is_empty());
            if form.get("code").map(String::as_str) != Some(GOOD_CODE) || !verifier_ok {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Invalid authorization code"})),
                )
                    .into_response();
            }
            Json(json!({
                "access_token": format!("access-{}", n),
                "refresh_token": "refresh-1",
                "scope": "playlist-modify-public",
                "expires_in": 3600,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        Some("refresh_token") => {
            if form.get("refresh_token").map(String::as_str) == Some(REVOKED_REFRESH) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Refresh token revoked"})),
                )
                    .into_response();
            }
            Json(json!({
                "access_token": format!("refreshed-{}", n),
                "expires_in": 3600,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        )
            .into_response(),
    }
}

async fn me(headers: HeaderMap) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({"id": "admin", "display_name": "Admin"})).into_response()
}

fn playlist_json(s: &FakeSpotify) -> Value {
    json!({"id": PLAYLIST_ID, "name": "Wedding Party", "tracks": {"total": s.tracks.len()}})
}

async fn my_playlists(State(s): State<Shared>, headers: HeaderMap) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let s = s.lock().unwrap();
    Json(json!({
        "items": [
            playlist_json(&s),
            {"id": "chill", "name": "Chill Dinner", "tracks": {"total": 12}}
        ],
        "next": null
    }))
    .into_response()
}

async fn playlist(
    State(s): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let s = s.lock().unwrap();
    if id != PLAYLIST_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"status": 404, "message": "Not found."}})),
        )
            .into_response();
    }
    Json(playlist_json(&s)).into_response()
}

#[derive(Deserialize)]
struct Page {
    offset: Option<usize>,
    limit: Option<usize>,
}

async fn playlist_tracks(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Query(page): Query<Page>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    let mut s = s.lock().unwrap();
    s.bearer_tokens.push(token);
    if id != PLAYLIST_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"status": 404, "message": "Not found."}})),
        )
            .into_response();
    }

    if s.rate_limited_reads > 0 {
        s.rate_limited_reads -= 1;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", "0")],
            Json(json!({"error": {"status": 429, "message": "API rate limit exceeded"}})),
        )
            .into_response();
    }

    let offset = page.offset.unwrap_or(0);
    let mut limit = page.limit.unwrap_or(100);
    if s.page_cap > 0 {
        limit = limit.min(s.page_cap);
    }
    let total = s.tracks.len();
    let end = (offset + limit).min(total);
    let items: Vec<Value> = s.tracks[offset.min(total)..end]
        .iter()
        .map(|id| {
            json!({"track": {"id": id, "name": format!("Song {}", id), "uri": format!("spotify:track:{}", id)}})
        })
        .collect();
    let next = if end < total {
        Value::String(format!("/v1/playlists/{}/tracks?offset={}&limit={}", PLAYLIST_ID, end, limit))
    } else {
        Value::Null
    };

    Json(json!({"items": items, "next": next, "total": total})).into_response()
}

#[derive(Deserialize)]
struct AddBody {
    uris: Vec<String>,
}

async fn add_tracks(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let revoke = {
        let mut s = s.lock().unwrap();
        if body.uris.len() > 100 {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"status": 400, "message": "Too many ids requested"}})),
            )
                .into_response();
        }
        if s.failing_adds == 0 {
            s.add_batches.push(body.uris.len());
            for uri in body.uris {
                let id = uri.trim_start_matches("spotify:track:").to_string();
                s.tracks.push(id);
            }
            return Json(json!({"snapshot_id": format!("snap-{}", s.tracks.len())}))
                .into_response();
        }
        s.failing_adds -= 1;
        s.revoke_on_failed_add.take()
    };

    if let Some(tokens) = revoke {
        tokens.deactivate().await.unwrap();
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": {"status": 500, "message": "Server error"}})),
    )
        .into_response()
}

#[derive(Deserialize)]
struct RemoveBody {
    tracks: Vec<RemoveItem>,
}

#[derive(Deserialize)]
struct RemoveItem {
    uri: String,
    positions: Vec<usize>,
}

async fn remove_tracks(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<RemoveBody>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut s = s.lock().unwrap();
    for item in body.tracks {
        s.delete_calls.push((item.uri.clone(), item.positions.clone()));
        let id = item.uri.trim_start_matches("spotify:track:").to_string();
        let mut positions = item.positions.clone();
        positions.sort_by(|a, b| b.cmp(a));
        for pos in positions {
            if s.failing_positions.contains(&pos) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {"status": 500, "message": "Server error"}})),
                )
                    .into_response();
            }
            if s.tracks.get(pos) != Some(&id) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"status": 400, "message": "Could not remove tracks, please check parameters."}})),
                )
                    .into_response();
            }
            s.tracks.remove(pos);
        }
    }
    Json(json!({"snapshot_id": format!("snap-{}", s.tracks.len())})).into_response()
}

pub fn fake_router(state: Shared) -> Router {
    Router::new()
        .route("/api/token", post(token))
        .route("/v1/me", get(me))
        .route("/v1/me/playlists", get(my_playlists))
        .route("/v1/playlists/{id}", get(playlist))
        .route(
            "/v1/playlists/{id}/tracks",
            get(playlist_tracks).post(add_tracks).delete(remove_tracks),
        )
        .with_state(state)
}

/// Fake Spotify plus a fully wired integration using in-memory stores.
pub struct Harness {
    pub base: String,
    pub fake: Shared,
    pub config: Arc<Config>,
    pub local: Arc<MemoryStore>,
    pub shared: Arc<MemoryStore>,
    pub authorizer: Arc<Authorizer>,
    pub client: Arc<SpotifyClient>,
    pub selector: PlaylistSelector,
    _dir: tempfile::TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let fake: Shared = Arc::new(Mutex::new(FakeSpotify::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = fake_router(Arc::clone(&fake));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let base = format!("http://{}", addr);
        let config = Arc::new(Config::for_base_url(&base, dir.path().to_path_buf()));

        let local = Arc::new(MemoryStore::new());
        let shared = Arc::new(MemoryStore::new());
        let local_dyn: Arc<dyn KvStore> = local.clone();
        let shared_dyn: Arc<dyn KvStore> = shared.clone();

        let authorizer = Arc::new(Authorizer::new(
            Arc::clone(&config),
            LocalSession::new(Arc::clone(&local_dyn)),
            TokenStore::new(shared_dyn),
        ));
        let broker = Arc::new(TokenBroker::standard(Arc::clone(&authorizer)));
        let client = Arc::new(SpotifyClient::new(&config, broker));

        Self {
            base,
            fake,
            config,
            local,
            shared,
            authorizer,
            client,
            selector: PlaylistSelector::new(local_dyn),
            _dir: dir,
        }
    }

    pub fn synchronizer(&self) -> PlaylistSynchronizer {
        PlaylistSynchronizer::new(Arc::clone(&self.client), PLAYLIST_ID)
    }

    pub fn set_tracks(&self, ids: &[&str]) {
        self.fake.lock().unwrap().tracks = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn tracks(&self) -> Vec<String> {
        self.fake.lock().unwrap().tracks.clone()
    }

    pub fn token_store(&self) -> TokenStore {
        self.authorizer.tokens().clone()
    }

    /// Puts an active shared record expiring in `expires_in_secs`.
    pub async fn connect_shared(&self, expires_in_secs: i64) -> TokenRecord {
        let now = Utc::now();
        let record = TokenRecord {
            access_token: "shared-access".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: now + Duration::seconds(expires_in_secs),
            authenticated_by: "admin".to_string(),
            authenticated_at: now,
            is_active: true,
        };
        self.token_store().save(&record).await.unwrap();
        record
    }
}

pub fn request(title: &str, id: Option<&str>) -> TrackRequest {
    TrackRequest {
        title: title.to_string(),
        artist: "Band".to_string(),
        spotify_track_id: id.map(str::to_string),
        vote_count: 1,
    }
}
