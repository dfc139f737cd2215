use std::sync::Arc;

use crate::{
    cli::Context,
    info,
    management::{current_status, watch_status},
    server::{self, AppState},
    success, warning,
};

/// Runs the callback/status server until interrupted, logging every change of
/// the shared connection.
pub async fn serve(ctx: &Context) {
    let _subscription = watch_status(ctx.shared.as_ref(), |status| {
        if status.available {
            success!(
                "Spotify connected by {}.",
                status.authenticated_by.unwrap_or_default()
            );
        } else {
            warning!("Spotify connection is no longer available.");
        }
    });

    if let Ok(status) = current_status(ctx.shared.as_ref()).await {
        info!(
            "Spotify currently {}.",
            if status.available { "available" } else { "unavailable" }
        );
    }

    let state = AppState {
        authorizer: Arc::clone(&ctx.authorizer),
        shared: Arc::clone(&ctx.shared),
    };
    info!("Listening on http://{}", ctx.config.server_addr);

    tokio::select! {
        res = server::start_api_server(state, &ctx.config.server_addr) => {
            if let Err(e) = res {
                super::fail(e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutting down."),
    }
}
