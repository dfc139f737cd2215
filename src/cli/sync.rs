use std::path::Path;

use crate::{
    cli::{Context, spinner},
    info, success,
    types::{SyncResult, TrackRequest},
    warning,
};

async fn load_requests(path: &Path) -> Result<Vec<TrackRequest>, String> {
    let content = async_fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("cannot parse {}: {}", path.display(), e))
}

fn report(result: &SyncResult) {
    for note in &result.notes {
        info!("{}", note);
    }
    for err in &result.errors {
        warning!("{}", err);
    }
    if result.is_clean() {
        success!(
            "Done: {} added, {} removed.",
            result.added_count,
            result.removed_count
        );
    } else {
        warning!(
            "Finished with {} error(s): {} added, {} removed.",
            result.errors.len(),
            result.added_count,
            result.removed_count
        );
    }
}

pub async fn sync(ctx: &Context, requests_file: &Path) {
    let mut requests = match load_requests(requests_file).await {
        Ok(r) => r,
        Err(e) => crate::error!("{}", e),
    };
    // most wanted first
    requests.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

    let synchronizer = match ctx.synchronizer().await {
        Ok(s) => s,
        Err(e) => super::fail(e),
    };

    let pb = spinner("Adding approved requests...");
    let result = synchronizer.add_approved(&requests).await;
    pb.finish_and_clear();

    match result {
        Ok(r) => report(&r),
        Err(e) => super::fail(e),
    }
}

pub async fn remove(ctx: &Context, track_ids: &[String]) {
    let synchronizer = match ctx.synchronizer().await {
        Ok(s) => s,
        Err(e) => super::fail(e),
    };

    let pb = spinner("Removing tracks...");
    let result = synchronizer.remove_tracks(track_ids).await;
    pb.finish_and_clear();

    match result {
        Ok(r) => report(&r),
        Err(e) => super::fail(e),
    }
}
