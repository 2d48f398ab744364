//! Command execution context
//!
//! Loads the config, opens the token store and builds the API client so
//! handlers don't repeat that boilerplate.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::LetterOnClient;
use crate::config::Config;
use crate::error::Result;
use crate::store::{MemoryStorage, SqliteStorage, TokenStore};
use crate::token::SystemClock;

pub struct CommandContext {
    pub config: Config,
    pub store: Arc<TokenStore>,
    pub client: LetterOnClient,
    pub format: OutputFormat,
    /// Directory holding the persistent tier
    pub data_dir: PathBuf,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// Recovers a remembered session from the data directory and registers
    /// the listener that reports a server-side rejection.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;

        let data_dir = match opts.data_dir_ref() {
            Some(dir) => PathBuf::from(dir),
            None => SqliteStorage::default_dir()?,
        };
        let persistent = SqliteStorage::open_at(&data_dir)?;
        log::debug!("Session storage at {}", persistent.path().display());

        let store = Arc::new(TokenStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(persistent),
            Arc::new(SystemClock),
        ));
        store.recover();
        store.subscribe(|| {
            eprintln!(
                "{} Session expired or revoked. Run {} to sign in again.",
                "⚠".yellow(),
                "letteron login".cyan()
            );
        });

        let client = LetterOnClient::new(&config.api_base_url(opts.api_host_ref()), store.clone())?;

        Ok(Self {
            config,
            store,
            client,
            format: opts.format,
            data_dir,
        })
    }

    /// Save an explicit API host override so later commands reach the same server
    pub fn remember_api_host(&mut self, opts: &GlobalOptions) -> Result<()> {
        let Some(host) = opts.api_host_ref() else {
            return Ok(());
        };
        if self.config.api_host.as_deref() == Some(host) {
            return Ok(());
        }

        self.config.api_host = Some(host.to_string());
        self.config.save_at(opts.config_ref())?;
        log::debug!("Saved API host {}", host);
        Ok(())
    }

    /// Remember-me preference, unless the command opted out
    pub fn remember_me(&self, no_remember: bool) -> bool {
        self.config.preferences.remember_me && !no_remember
    }
}
