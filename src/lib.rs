//! Shared Spotify playlist for a wedding party.
//!
//! One admin connects a Spotify account once; the credentials land in a shared
//! token record so every guest-facing surface can add approved song requests to
//! the one playlist the admin locked in. This crate holds that integration: the
//! PKCE login, the token broker, the playlist selector and the synchronizer.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints (OAuth callback, status, health)
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration from environment variables and `.env`
//! - `error` - Error taxonomy shared by all modules
//! - `management` - Key-value stores and the singletons kept in them
//! - `server` - Local HTTP server
//! - `spotify` - Spotify Web API integration
//! - `types` - Data structures
//! - `utils` - PKCE helpers and sync planning

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for the CLI layer; library code returns errors instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
