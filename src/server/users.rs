//! In-memory user directory
//!
//! Accounts are keyed by normalized email and hold Argon2 password hashes.

use std::collections::HashMap;
use std::sync::LazyLock;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use parking_lot::RwLock;
use regex::Regex;

use super::error::ServerError;
use crate::client::UserResponse;

pub const NAME_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 100;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is valid")
});

/// Stored account
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    password_hash: String,
}

impl UserRecord {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

pub struct UserDirectory {
    by_email: RwLock<HashMap<String, UserRecord>>,
    hasher: Argon2<'static>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::with_hasher(Argon2::default())
    }
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hasher(hasher: Argon2<'static>) -> Self {
        Self {
            by_email: RwLock::new(HashMap::new()),
            hasher,
        }
    }

    /// Create an account. Fails if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, ServerError> {
        validate_registration(name, email, password)?;
        let email = normalize_email(email);

        if self.by_email.read().contains_key(&email) {
            return Err(ServerError::EmailTaken);
        }

        let password_hash = self.hash(password).await?;
        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.clone(),
            password_hash,
        };

        let mut users = self.by_email.write();
        // Another registration may have won while hashing
        if users.contains_key(&email) {
            return Err(ServerError::EmailTaken);
        }
        users.insert(email, record.clone());
        log::info!("Registered user {}", record.id);

        Ok(record)
    }

    /// Check an email and password pair.
    ///
    /// Unknown email and wrong password fail the same way.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, ServerError> {
        let record = self
            .by_email
            .read()
            .get(&normalize_email(email))
            .cloned()
            .ok_or(ServerError::InvalidCredentials)?;

        if !self.verify(password, &record.password_hash).await? {
            return Err(ServerError::InvalidCredentials);
        }

        Ok(record)
    }

    pub fn find_by_id(&self, id: &str) -> Option<UserRecord> {
        self.by_email
            .read()
            .values()
            .find(|user| user.id == id)
            .cloned()
    }

    async fn hash(&self, password: &str) -> Result<String, ServerError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| ServerError::Internal(format!("Password hashing failed: {}", e)))
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
    }

    async fn verify(&self, password: &str, stored: &str) -> Result<bool, ServerError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored)
                .map_err(|e| ServerError::Internal(format!("Corrupt password hash: {}", e)))?;
            Ok(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), ServerError> {
    let name_len = name.trim().chars().count();
    if name_len == 0 || name_len > NAME_MAX_CHARS {
        return Err(ServerError::Validation(format!(
            "Name must be between 1 and {} characters",
            NAME_MAX_CHARS
        )));
    }

    if !EMAIL_PATTERN.is_match(email.trim()) {
        return Err(ServerError::Validation("Invalid email format".to_string()));
    }

    let password_len = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password_len) {
        return Err(ServerError::Validation(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS
        )));
    }

    Ok(())
}

/// Cheap hasher so tests don't spend seconds in Argon2
#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2<'static> {
    use argon2::{Algorithm, Params, Version};

    let params = Params::new(Params::MIN_M_COST, 1, 1, None).expect("valid argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}
