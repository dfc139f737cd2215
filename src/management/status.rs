use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    management::{
        auth::TOKEN_RECORD_KEY,
        store::{self, KvStore, Subscription},
    },
    types::{SpotifyStatus, TokenRecord},
};

pub fn status_of(record: Option<&TokenRecord>, now: DateTime<Utc>) -> SpotifyStatus {
    match record {
        Some(r) => SpotifyStatus {
            available: r.is_usable_at(now),
            authenticated_by: Some(r.authenticated_by.clone()),
            authenticated_at: Some(r.authenticated_at),
        },
        None => SpotifyStatus {
            available: false,
            authenticated_by: None,
            authenticated_at: None,
        },
    }
}

pub async fn current_status(store: &dyn KvStore) -> Result<SpotifyStatus> {
    let record: Option<TokenRecord> = store::load(store, TOKEN_RECORD_KEY).await?;
    Ok(status_of(record.as_ref(), Utc::now()))
}

/// Calls `callback` with a freshly computed status whenever the shared token
/// record changes. Never fires during registration; drop or `unsubscribe` the
/// returned handle to stop.
pub fn watch_status<F>(store: &dyn KvStore, callback: F) -> Subscription
where
    F: Fn(SpotifyStatus) + Send + Sync + 'static,
{
    store.subscribe(
        TOKEN_RECORD_KEY,
        store::listener(move |value| {
            // an unreadable record counts as no record
            let record: Option<TokenRecord> =
                value.and_then(|v| serde_json::from_value(v.clone()).ok());
            callback(status_of(record.as_ref(), Utc::now()));
        }),
    )
}
