//! Credential verification

use std::sync::Arc;

use super::{Claims, Clock, Decoded, Identity, SigningSecret, decode};
use crate::error::AuthError;

/// Why a credential was rejected. Logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    BadSignature,
    Expired,
}

/// Checks presented credentials and recovers the identity they carry.
///
/// Holds no mutable state; one verifier can serve any number of
/// concurrent requests.
pub struct TokenVerifier {
    secret: Arc<SigningSecret>,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(secret: Arc<SigningSecret>, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Verify a credential and return its identity.
    ///
    /// Checks structure, then signature, then expiry. A credential is
    /// valid while `now < expires_at`.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_claims(token).map(|claims| claims.identity())
    }

    /// Like [`verify`](Self::verify) but returns the full claims
    pub fn verify_claims(&self, token: &str) -> Result<Claims, AuthError> {
        self.check(token).map_err(|reason| {
            log::debug!("Rejected token: {:?}", reason);
            AuthError::Unauthorized
        })
    }

    fn check(&self, token: &str) -> Result<Claims, Rejection> {
        let parsed = match decode(token) {
            Decoded::Valid(parsed) => parsed,
            Decoded::Malformed => return Err(Rejection::Malformed),
        };

        if !parsed.is_signed_by(&self.secret) {
            return Err(Rejection::BadSignature);
        }

        if self.clock.now() >= parsed.claims.exp {
            return Err(Rejection::Expired);
        }

        Ok(parsed.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{ManualClock, TokenIssuer};
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const SECRET: &str = "verifier-test-secret-with-enough-bytes";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()
    }

    fn setup(secret: &str) -> (Arc<ManualClock>, TokenIssuer, TokenVerifier) {
        let clock = Arc::new(ManualClock::new(start()));
        let secret = Arc::new(SigningSecret::new(secret).unwrap());
        let issuer = TokenIssuer::new(secret.clone(), Duration::hours(24), clock.clone());
        let verifier = TokenVerifier::new(secret, clock.clone());
        (clock, issuer, verifier)
    }

    #[test]
    fn test_round_trip_returns_identity() {
        let (clock, issuer, verifier) = setup(SECRET);
        let identity = Identity::new("123").with_email("test@example.com");
        let credential = issuer.issue(&identity);

        assert_eq!(verifier.verify(credential.as_str()), Ok(identity.clone()));

        clock.advance(Duration::hours(23));
        assert_eq!(verifier.verify(credential.as_str()), Ok(identity));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let (clock, issuer, verifier) = setup(SECRET);
        let credential = issuer.issue(&Identity::new("123"));
        let expires_at = credential.expires_at();

        clock.set(expires_at - Duration::milliseconds(1));
        assert!(verifier.verify(credential.as_str()).is_ok());

        clock.set(expires_at);
        assert_eq!(
            verifier.verify(credential.as_str()),
            Err(AuthError::Unauthorized)
        );

        clock.set(expires_at + Duration::days(30));
        assert_eq!(
            verifier.verify(credential.as_str()),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_any_signature_bit_flip_is_rejected() {
        let (_clock, issuer, verifier) = setup(SECRET);
        let credential = issuer.issue(&Identity::new("123"));
        let (signing_input, signature_b64) = credential.as_str().rsplit_once('.').unwrap();
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).unwrap();

        for bit in 0..signature.len() * 8 {
            let mut tampered = signature.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let forged = format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(&tampered));

            assert_eq!(
                verifier.verify(&forged),
                Err(AuthError::Unauthorized),
                "bit {} flip was accepted",
                bit
            );
        }
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let (_clock, issuer, verifier) = setup(SECRET);
        let credential = issuer.issue(&Identity::new("123"));
        let mut segments: Vec<&str> = credential.as_str().split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"user_id":"admin","iat":{},"exp":{}}}"#,
            credential.issued_at().timestamp(),
            credential.expires_at().timestamp()
        ));
        segments[1] = &forged_claims;

        assert_eq!(
            verifier.verify(&segments.join(".")),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let (_clock, issuer, _verifier) = setup(SECRET);
        let (_clock2, _issuer2, other_verifier) = setup("a-completely-different-signing-secret");
        let credential = issuer.issue(&Identity::new("123"));

        assert_eq!(
            other_verifier.verify(credential.as_str()),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_malformed_and_expired_are_indistinguishable() {
        let (clock, issuer, verifier) = setup(SECRET);
        let credential = issuer.issue(&Identity::new("123"));
        clock.advance(Duration::hours(25));

        let expired = verifier.verify(credential.as_str()).unwrap_err();
        let malformed = verifier.verify("invalid.token.string").unwrap_err();

        assert_eq!(expired, malformed);
        assert_eq!(expired.to_string(), malformed.to_string());
    }

    #[tokio::test]
    async fn test_concurrent_verification() {
        let (_clock, issuer, verifier) = setup(SECRET);
        let identity = Identity::new("user-concurrent").with_email("c@example.com");
        let token = Arc::new(issuer.issue(&identity).into_string());
        let verifier = Arc::new(verifier);

        let handles: Vec<_> = (0..1000)
            .map(|_| {
                let verifier = verifier.clone();
                let token = token.clone();
                tokio::spawn(async move { verifier.verify(&token) })
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        assert_eq!(results.len(), 1000);
        for result in results {
            assert_eq!(result.unwrap(), Ok(identity.clone()));
        }
    }
}
