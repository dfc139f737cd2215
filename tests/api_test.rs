mod common;

use std::sync::Arc;

use serde_json::Value;

use partylist::{
    management::KvStore,
    server::{self, AppState},
};

use common::{GOOD_CODE, Harness};

/// Serves the app router for `h` on an ephemeral port.
async fn serve(h: &Harness) -> String {
    let shared: Arc<dyn KvStore> = h.shared.clone();
    let state = AppState {
        authorizer: Arc::clone(&h.authorizer),
        shared,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn get_text(url: &str) -> String {
    reqwest::get(url).await.unwrap().text().await.unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let h = Harness::start().await;
    let app = serve(&h).await;

    let body: Value = reqwest::get(format!("{}/health", app))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn status_follows_the_shared_record() {
    let h = Harness::start().await;
    let app = serve(&h).await;

    let body: Value = reqwest::get(format!("{}/status", app))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["available"], false);
    assert!(body["authenticated_by"].is_null());

    h.connect_shared(3600).await;
    let body: Value = reqwest::get(format!("{}/status", app))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["available"], true);
    assert_eq!(body["authenticated_by"], "admin");
}

#[tokio::test]
async fn callback_with_forged_state_stores_nothing() {
    let h = Harness::start().await;
    let app = serve(&h).await;
    h.authorizer.begin_authorization().await.unwrap();

    let page = get_text(&format!("{}/callback?code={}&state=forged", app, GOOD_CODE)).await;

    assert!(page.contains("state mismatch"));
    assert!(h.token_store().load().await.unwrap().is_none());
    // still pending, so the real redirect can finish
    assert!(h.authorizer.session().pending().await.unwrap().is_some());
}

#[tokio::test]
async fn callback_completes_the_login() {
    let h = Harness::start().await;
    let app = serve(&h).await;
    let url = h.authorizer.begin_authorization().await.unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let page = get_text(&format!("{}/callback?code={}&state={}", app, GOOD_CODE, state)).await;

    assert!(page.contains("Spotify connected"));
    let record = h.token_store().load().await.unwrap().unwrap();
    assert!(record.is_active);
    assert_eq!(record.authenticated_by, "admin");
}

#[tokio::test]
async fn callback_reports_denied_access() {
    let h = Harness::start().await;
    let app = serve(&h).await;

    let page = get_text(&format!("{}/callback?error=access_denied", app)).await;

    assert!(page.contains("access_denied"));
    assert!(h.token_store().load().await.unwrap().is_none());
}
