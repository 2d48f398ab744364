//! Signed session credentials
//!
//! A credential is a compact HS256 JWS string:
//! `base64url(header).base64url(claims).base64url(signature)`, unpadded.
//! The claims bind the subject (`user_id`, optional `email`) to an issue
//! time and an absolute expiry, both in whole epoch seconds.
//!
//! - [`TokenIssuer`] mints credentials after a successful password check.
//! - [`TokenVerifier`] checks structure, signature and expiry per request.

pub mod clock;
pub mod issuer;
pub mod verifier;

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ConfigError;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use issuer::TokenIssuer;
pub use verifier::TokenVerifier;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

const ALGORITHM: &str = "HS256";

/// Pre-encoded form of `{"alg":"HS256","typ":"JWT"}`
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Shared HMAC secret used to sign and verify credentials.
///
/// Constructed once at startup and handed to the issuer and verifier.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Validate and wrap a secret. Empty or short secrets are rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(Self(secret.into_bytes()))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.0).expect("HMAC can accept any key length")
    }

    fn sign(&self, signing_input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(signing_input);
        mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time signature check
    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(signing_input);
        mac.verify_slice(signature).is_ok()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// The authenticated principal a credential speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Claims carried in the credential payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issue time (epoch seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Absolute expiry (epoch seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

/// A freshly issued credential together with the claims it encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    claims: Claims,
}

impl Credential {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.exp
    }

    pub fn into_string(self) -> String {
        self.token
    }
}

#[allow(dead_code)]
impl Credential {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.claims.iat
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// A structurally valid credential whose signature has not been checked yet
#[derive(Debug)]
pub struct ParsedCredential<'a> {
    pub claims: Claims,
    signing_input: &'a str,
    signature: Vec<u8>,
}

impl ParsedCredential<'_> {
    fn is_signed_by(&self, secret: &SigningSecret) -> bool {
        secret.verify(self.signing_input.as_bytes(), &self.signature)
    }
}

/// Outcome of parsing a presented credential string
#[derive(Debug)]
pub enum Decoded<'a> {
    Valid(ParsedCredential<'a>),
    Malformed,
}

/// Parse a credential string into typed claims without trusting it.
pub fn decode(token: &str) -> Decoded<'_> {
    let mut segments = token.split('.');
    let (Some(header), Some(claims), Some(signature_segment), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Decoded::Malformed;
    };

    let Some(header) = decode_segment::<Header>(header) else {
        return Decoded::Malformed;
    };
    if header.alg != ALGORITHM {
        return Decoded::Malformed;
    }

    let Some(claims) = decode_segment::<Claims>(claims) else {
        return Decoded::Malformed;
    };
    if claims.user_id.is_empty() {
        return Decoded::Malformed;
    }

    let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_segment) else {
        return Decoded::Malformed;
    };

    let signing_input = &token[..token.len() - signature_segment.len() - 1];

    Decoded::Valid(ParsedCredential {
        claims,
        signing_input,
        signature,
    })
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Serialize and sign claims into a compact credential string
fn encode(claims: &Claims, secret: &SigningSecret) -> String {
    let mut payload = serde_json::json!({
        "user_id": claims.user_id,
        "iat": claims.iat.timestamp(),
        "exp": claims.exp.timestamp(),
    });
    if let Some(email) = &claims.email {
        payload["email"] = serde_json::Value::from(email.as_str());
    }

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER_JSON),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    );
    let signature = URL_SAFE_NO_PAD.encode(secret.sign(signing_input.as_bytes()));

    format!("{}.{}", signing_input, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "an-isolated-test-secret-of-32-bytes!";

    fn claims() -> Claims {
        Claims {
            user_id: "user-123".to_string(),
            email: Some("user@example.com".to_string()),
            iat: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            exp: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_secret_rejects_empty() {
        assert!(matches!(
            SigningSecret::new(""),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_secret_rejects_short() {
        match SigningSecret::new("too-short") {
            Err(ConfigError::WeakSecret { min, actual }) => {
                assert_eq!(min, MIN_SECRET_LEN);
                assert_eq!(actual, 9);
            }
            other => panic!("Expected WeakSecret, got {:?}", other),
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SigningSecret::new(SECRET).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("isolated"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_encoded_token_decodes_to_same_claims() {
        let secret = SigningSecret::new(SECRET).unwrap();
        let token = encode(&claims(), &secret);

        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));

        match decode(&token) {
            Decoded::Valid(parsed) => {
                assert_eq!(parsed.claims, claims());
                assert!(parsed.is_signed_by(&secret));
            }
            Decoded::Malformed => panic!("Expected a valid credential"),
        }
    }

    #[test]
    fn test_claims_use_epoch_seconds_on_the_wire() {
        let secret = SigningSecret::new(SECRET).unwrap();
        let token = encode(&claims(), &secret);
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(json["user_id"], "user-123");
        assert_eq!(json["email"], "user@example.com");
        assert_eq!(json["iat"], 1_735_689_600);
        assert_eq!(json["exp"], 1_735_776_000);
    }

    #[test]
    fn test_email_is_optional() {
        let secret = SigningSecret::new(SECRET).unwrap();
        let mut claims = claims();
        claims.email = None;
        let token = encode(&claims, &secret);

        match decode(&token) {
            Decoded::Valid(parsed) => assert_eq!(parsed.claims.email, None),
            Decoded::Malformed => panic!("Expected a valid credential"),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(matches!(decode(""), Decoded::Malformed));
        assert!(matches!(decode("abc"), Decoded::Malformed));
        assert!(matches!(decode("abc.def"), Decoded::Malformed));
        assert!(matches!(decode("a.b.c.d"), Decoded::Malformed));
    }

    #[test]
    fn test_decode_rejects_garbage_segments() {
        assert!(matches!(decode("invalid.token.string"), Decoded::Malformed));
        assert!(matches!(decode("abc.def.sig"), Decoded::Malformed));
    }

    #[test]
    fn test_decode_rejects_other_algorithms() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"user_id":"u","iat":1,"exp":2}"#);
        let token = format!("{}.{}.", header, payload);

        assert!(matches!(decode(&token), Decoded::Malformed));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"user_id":"u","iat":1}"#);
        let signature = URL_SAFE_NO_PAD.encode(b"sig");
        let token = format!("{}.{}.{}", header, payload, signature);

        assert!(matches!(decode(&token), Decoded::Malformed));
    }

    #[test]
    fn test_decode_rejects_empty_subject() {
        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"user_id":"","iat":1,"exp":2}"#);
        let signature = URL_SAFE_NO_PAD.encode(b"sig");
        let token = format!("{}.{}.{}", header, payload, signature);

        assert!(matches!(decode(&token), Decoded::Malformed));
    }
}
