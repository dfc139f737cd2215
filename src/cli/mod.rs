//! Command implementations. Each prints its own progress and exits the process
//! on unrecoverable errors.

mod auth;
mod context;
mod playlist;
mod serve;
mod status;
mod sync;

pub use auth::auth;
pub use auth::disconnect;
pub use context::Context;
pub use playlist::list_playlists;
pub use playlist::select;
pub use playlist::unlock;
pub use serve::serve;
pub use status::status;
pub use sync::remove;
pub use sync::sync;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Error;

pub(crate) fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

/// Prints the error with its remediation hint and exits.
pub(crate) fn fail(e: Error) -> ! {
    match e.remediation() {
        Some(hint) => crate::error!("{}\n    {}", e, hint),
        None => crate::error!("{}", e),
    }
}
