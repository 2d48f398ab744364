//! Client-side token store
//!
//! Holds the most recently issued credential and expires it on its own.
//! Two tiers back the store: a session tier that lives as long as the
//! process and a persistent tier that survives restarts. Each read goes
//! straight to the backing storage and re-checks expiry, so a stale or
//! removed credential is never returned.

pub mod storage;
pub mod watch;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::token::Clock;

pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use watch::{ExpiryStatus, ExpiryWatch};

/// Well-known key the record is stored under
pub const STORAGE_KEY: &str = "letteron_auth";

/// Persisted record: `{ "token": "...", "expiresAt": <epoch millis> }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    pub token: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Which storage tier holds the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Session,
    Persistent,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Session => f.write_str("session"),
            Tier::Persistent => f.write_str("persistent"),
        }
    }
}

/// Observable store state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Empty,
    Held {
        tier: Tier,
        expires_at: DateTime<Utc>,
    },
}

/// Receives a notification after the server rejected the held credential
pub trait UnauthorizedListener: Send + Sync {
    fn on_unauthorized(&self);
}

impl<F> UnauthorizedListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_unauthorized(&self) {
        self()
    }
}

/// Token store with self-expiry and a single unauthorized-listener slot
pub struct TokenStore {
    session: Arc<dyn Storage>,
    persistent: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    listener: Mutex<Option<Arc<dyn UnauthorizedListener>>>,
}

impl TokenStore {
    pub fn new(
        session: Arc<dyn Storage>,
        persistent: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            persistent,
            clock,
            listener: Mutex::new(None),
        }
    }

    /// Hold a new credential until `expires_at`.
    ///
    /// `expires_at` is the expiry the server reported when it issued the
    /// credential. `remember_me` selects the persistent tier.
    pub fn set_token(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        remember_me: bool,
    ) -> Result<StoredToken, StoreError> {
        let record = StoredToken {
            token: token.to_string(),
            expires_at,
        };
        let blob = serde_json::to_string(&record)
            .map_err(|e| StoreError::Io(format!("Failed to serialize token record: {}", e)))?;

        let (target, other) = if remember_me {
            (&self.persistent, &self.session)
        } else {
            (&self.session, &self.persistent)
        };
        other.remove(STORAGE_KEY)?;
        target.set(STORAGE_KEY, &blob)?;

        log::debug!(
            "Stored token in {} tier (expires {})",
            if remember_me { Tier::Persistent } else { Tier::Session },
            record.expires_at.to_rfc3339()
        );
        Ok(record)
    }

    /// Current credential, or `None` if nothing unexpired is held.
    ///
    /// Expired and corrupt records are purged on the way.
    pub fn get_token(&self) -> Option<String> {
        self.current().map(|(_, record)| record.token)
    }

    /// Current state after purging anything stale
    pub fn state(&self) -> TokenState {
        match self.current() {
            Some((tier, record)) => TokenState::Held {
                tier,
                expires_at: record.expires_at,
            },
            None => TokenState::Empty,
        }
    }

    pub fn has_token(&self) -> bool {
        self.current().is_some()
    }

    /// Startup recovery: adopt a persisted, unexpired credential if present
    pub fn recover(&self) -> TokenState {
        let state = self.state();
        match &state {
            TokenState::Held { tier, expires_at } => log::info!(
                "Recovered {} token (expires {})",
                tier,
                expires_at.to_rfc3339()
            ),
            TokenState::Empty => log::debug!("No stored token to recover"),
        }
        state
    }

    /// Drop the credential from both tiers. No-op on an empty store.
    ///
    /// Both tiers are always attempted; the first failure is returned.
    pub fn remove_token(&self) -> Result<(), StoreError> {
        let session = self.session.remove(STORAGE_KEY);
        let persistent = self.persistent.remove(STORAGE_KEY);
        session.and(persistent)
    }

    /// Remaining lifetime of the held record without purging anything.
    ///
    /// May be zero or negative when the record is past its expiry but has
    /// not been read since.
    pub fn time_remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        [Tier::Session, Tier::Persistent]
            .into_iter()
            .find_map(|tier| self.peek(tier))
            .map(|record| record.expires_at - now)
    }

    /// Register the unauthorized listener, replacing any previous one
    pub fn subscribe<L>(&self, listener: L) -> Option<Arc<dyn UnauthorizedListener>>
    where
        L: UnauthorizedListener + 'static,
    {
        let listener: Arc<dyn UnauthorizedListener> = Arc::new(listener);
        self.listener.lock().replace(listener)
    }

    /// Clear the listener slot
    #[allow(dead_code)]
    pub fn unsubscribe(&self) -> Option<Arc<dyn UnauthorizedListener>> {
        self.listener.lock().take()
    }

    /// Handle a rejected request: clear the store, then notify the listener
    pub fn notify_unauthorized(&self) {
        if let Err(e) = self.remove_token() {
            log::warn!("Failed to clear token after unauthorized response: {}", e);
        }

        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_unauthorized();
        }
    }

    fn tier(&self, tier: Tier) -> &Arc<dyn Storage> {
        match tier {
            Tier::Session => &self.session,
            Tier::Persistent => &self.persistent,
        }
    }

    fn current(&self) -> Option<(Tier, StoredToken)> {
        [Tier::Session, Tier::Persistent]
            .into_iter()
            .find_map(|tier| self.read(tier).map(|record| (tier, record)))
    }

    /// Read a tier, purging expired or unparseable records
    fn read(&self, tier: Tier) -> Option<StoredToken> {
        let storage = self.tier(tier);
        let blob = match storage.get(STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read {} token storage: {}", tier, e);
                return None;
            }
        };

        let record = match serde_json::from_str::<StoredToken>(&blob) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Purging corrupt {} token record: {}", tier, e);
                self.purge(tier);
                return None;
            }
        };

        if self.clock.now() >= record.expires_at {
            log::debug!("Purging expired {} token", tier);
            self.purge(tier);
            return None;
        }

        Some(record)
    }

    fn peek(&self, tier: Tier) -> Option<StoredToken> {
        let blob = self.tier(tier).get(STORAGE_KEY).ok().flatten()?;
        serde_json::from_str(&blob).ok()
    }

    fn purge(&self, tier: Tier) {
        if let Err(e) = self.tier(tier).remove(STORAGE_KEY) {
            log::warn!("Failed to purge {} token storage: {}", tier, e);
        }
    }
}
