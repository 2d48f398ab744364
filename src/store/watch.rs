//! Periodic expiry watch
//!
//! Reports how long the held credential has left and flags it when expiry
//! is near. The watch only peeks at the store; removal still happens on the
//! next real `get_token()`.

use std::sync::Arc;

use chrono::Duration;
use tokio::task::JoinHandle;

use super::TokenStore;

/// Default polling interval
pub const DEFAULT_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Result of one expiry check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// No credential is stored
    Empty,
    /// A record is stored but its expiry has passed
    Expired,
    /// Expires within the warning window
    ExpiringSoon { remaining: Duration },
    Valid { remaining: Duration },
}

impl ExpiryStatus {
    /// Whether the watch has nothing left to report
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpiryStatus::Empty | ExpiryStatus::Expired)
    }
}

pub struct ExpiryWatch {
    store: Arc<TokenStore>,
    interval: std::time::Duration,
    warn_within: Duration,
}

impl ExpiryWatch {
    pub fn new(store: Arc<TokenStore>, warn_within: Duration) -> Self {
        Self {
            store,
            interval: DEFAULT_CHECK_INTERVAL,
            warn_within,
        }
    }

    pub fn with_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Classify the held credential without mutating the store
    pub fn check(&self) -> ExpiryStatus {
        match self.store.time_remaining() {
            None => ExpiryStatus::Empty,
            Some(remaining) if remaining <= Duration::zero() => ExpiryStatus::Expired,
            Some(remaining) if remaining <= self.warn_within => {
                ExpiryStatus::ExpiringSoon { remaining }
            }
            Some(remaining) => ExpiryStatus::Valid { remaining },
        }
    }

    /// Tick until the credential is gone or expired, reporting every check
    pub async fn run<F>(self, mut on_tick: F)
    where
        F: FnMut(ExpiryStatus),
    {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let status = self.check();
            if let ExpiryStatus::ExpiringSoon { remaining } = status {
                log::warn!("Session expires in {} minutes", remaining.num_minutes());
            }
            on_tick(status);
            if status.is_terminal() {
                break;
            }
        }
    }

    /// Run the watch on a background task
    pub fn spawn<F>(self, on_tick: F) -> JoinHandle<()>
    where
        F: FnMut(ExpiryStatus) + Send + 'static,
    {
        tokio::spawn(self.run(on_tick))
    }
}
