use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    management::{FileStore, KvStore, LocalSession, PlaylistSelector, TokenStore},
    spotify::{Authorizer, PlaylistSynchronizer, SpotifyClient, TokenBroker},
};

/// Everything a command needs, wired from the configuration.
pub struct Context {
    pub config: Arc<Config>,
    pub shared: Arc<dyn KvStore>,
    pub authorizer: Arc<Authorizer>,
    pub client: Arc<SpotifyClient>,
    pub selector: PlaylistSelector,
}

impl Context {
    pub fn from_config(config: Config) -> Self {
        let config = Arc::new(config);
        let local: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.data_dir));
        let shared: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.shared_dir));

        let authorizer = Arc::new(Authorizer::new(
            Arc::clone(&config),
            LocalSession::new(Arc::clone(&local)),
            TokenStore::new(Arc::clone(&shared)),
        ));
        let broker = Arc::new(TokenBroker::standard(Arc::clone(&authorizer)));
        let client = Arc::new(SpotifyClient::new(&config, broker));

        Self {
            config,
            shared,
            authorizer,
            client,
            selector: PlaylistSelector::new(local),
        }
    }

    pub fn load() -> Result<Self> {
        Ok(Self::from_config(Config::from_env()?))
    }

    pub async fn synchronizer(&self) -> Result<PlaylistSynchronizer> {
        PlaylistSynchronizer::for_selected(Arc::clone(&self.client), &self.selector).await
    }
}
