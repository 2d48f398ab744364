//! LetterOn API client

use async_trait::async_trait;

use crate::error::Result;

pub mod letteron;
pub mod models;

pub use letteron::LetterOnClient;
pub use models::{
    AuthResponse, ErrorResponse, HealthResponse, LoginRequest, MessageResponse, RegisterRequest,
    UserResponse,
};

/// LetterOn authentication API
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an account and receive a credential for it
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;

    /// Exchange email and password for a credential
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// End the current session on the server
    async fn logout(&self) -> Result<MessageResponse>;

    /// Fetch the account behind the held credential
    async fn me(&self) -> Result<UserResponse>;

    /// Server liveness
    async fn health(&self) -> Result<HealthResponse>;
}
