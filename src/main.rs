use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use partylist::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Connect the shared Spotify account
    Auth,

    /// Show whether Spotify is connected and which playlist is targeted
    Status,

    /// Disable the shared Spotify connection
    Disconnect,

    /// List the connected account's playlists
    Playlists,

    /// Lock in the target playlist for the event
    Select(SelectOptions),

    /// Emergency: remove the locked playlist selection
    Unlock(UnlockOptions),

    /// Add approved song requests to the target playlist
    Sync(SyncOptions),

    /// Remove tracks from the target playlist
    Remove(RemoveOptions),

    /// Run the callback and status server
    Serve,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SelectOptions {
    /// Spotify playlist id
    pub playlist_id: String,

    /// Skip the confirmation prompt
    #[clap(long)]
    pub yes: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct UnlockOptions {
    /// Exact name of the locked playlist
    #[clap(long)]
    pub confirm: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SyncOptions {
    /// JSON file with approved requests (title, artist, spotifyTrackId, voteCount)
    #[clap(long)]
    pub requests: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct RemoveOptions {
    /// Track ids, URIs or open.spotify.com links
    #[clap(required = true)]
    pub track_ids: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let ctx = match cli::Context::load() {
        Ok(ctx) => ctx,
        Err(e) => error!("{}", e),
    };

    match cli.command {
        Command::Auth => cli::auth(&ctx).await,
        Command::Status => cli::status(&ctx).await,
        Command::Disconnect => cli::disconnect(&ctx).await,
        Command::Playlists => cli::list_playlists(&ctx).await,
        Command::Select(opt) => cli::select(&ctx, &opt.playlist_id, opt.yes).await,
        Command::Unlock(opt) => cli::unlock(&ctx, &opt.confirm).await,
        Command::Sync(opt) => cli::sync(&ctx, &opt.requests).await,
        Command::Remove(opt) => cli::remove(&ctx, &opt.track_ids).await,
        Command::Serve => cli::serve(&ctx).await,
        Command::Completions(_) => {}
    }
}
