//! Credential issuance

use std::sync::Arc;

use chrono::{Duration, SubsecRound};

use super::{Claims, Clock, Credential, Identity, SigningSecret, encode};

/// Mints signed, time-bounded credentials for authenticated identities
pub struct TokenIssuer {
    secret: Arc<SigningSecret>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: Arc<SigningSecret>, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            lifetime,
            clock,
        }
    }

    /// Configured credential lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a credential for an identity that has already passed the password check.
    ///
    /// `issued_at` is truncated to whole seconds so the expiry encoded on the
    /// wire is exactly `issued_at + lifetime`.
    pub fn issue(&self, identity: &Identity) -> Credential {
        let issued_at = self.clock.now().trunc_subsecs(0);
        let claims = Claims {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            iat: issued_at,
            exp: issued_at + self.lifetime,
        };

        let token = encode(&claims, &self.secret);
        log::debug!(
            "Issued token for user {} (expires {})",
            claims.user_id,
            claims.exp.to_rfc3339()
        );

        Credential { token, claims }
    }
}
