use std::collections::{HashMap, HashSet};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::TrackRequest;

/// Spotify caps both page size and mutation batch size at 100.
pub const SPOTIFY_BATCH_LIMIT: usize = 100;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Anti-CSRF value for the authorize round trip.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

/// Accepts a bare id, a `spotify:track:` URI or an `open.spotify.com` link.
pub fn normalize_track_id(input: &str) -> Option<String> {
    let input = input.trim();
    let id = if let Some(rest) = input.strip_prefix("spotify:track:") {
        rest
    } else if let Some(idx) = input.find("/track/") {
        let rest = &input[idx + "/track/".len()..];
        rest.split(['?', '#', '/']).next().unwrap_or_default()
    } else {
        input
    };

    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Result of matching requests against what the playlist already holds.
#[derive(Debug, Default, PartialEq)]
pub struct AdditionPlan {
    /// Track ids to insert, in request order, each at most once.
    pub to_add: Vec<String>,
    pub notes: Vec<String>,
}

pub fn plan_additions(existing: &HashSet<String>, requests: &[TrackRequest]) -> AdditionPlan {
    let mut plan = AdditionPlan::default();
    let mut queued = HashSet::new();
    let mut already_present = 0usize;

    for request in requests {
        let Some(id) = request
            .spotify_track_id
            .as_deref()
            .and_then(normalize_track_id)
        else {
            plan.notes.push(format!(
                "{} has no Spotify track id and cannot be synced",
                request.label()
            ));
            continue;
        };

        if existing.contains(&id) {
            already_present += 1;
            plan.notes
                .push(format!("{} ({}) is already in the playlist", request.label(), id));
            continue;
        }

        if !queued.insert(id.clone()) {
            plan.notes
                .push(format!("{} ({}) was requested more than once", request.label(), id));
            continue;
        }

        plan.to_add.push(id);
    }

    if plan.to_add.is_empty() && already_present > 0 {
        plan.notes
            .push("All requested tracks are already in the playlist".to_string());
    }

    plan
}

/// Every `(track_id, position)` pair to delete, highest position first.
///
/// Deleting in descending position order keeps every not-yet-processed position
/// valid, across all ids and not only within one.
pub fn plan_removals(snapshot: &[Option<String>], targets: &[String]) -> Vec<(String, usize)> {
    let wanted: HashSet<&str> = targets.iter().map(String::as_str).collect();

    let mut removals: Vec<(String, usize)> = snapshot
        .iter()
        .enumerate()
        .filter_map(|(pos, id)| match id {
            Some(id) if wanted.contains(id.as_str()) => Some((id.clone(), pos)),
            _ => None,
        })
        .collect();

    removals.sort_by(|a, b| b.1.cmp(&a.1));
    removals
}

/// Counts occurrences of each id in a playlist snapshot.
pub fn count_occurrences(snapshot: &[Option<String>]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for id in snapshot.iter().flatten() {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }
    counts
}
