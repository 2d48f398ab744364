//! LetterOn API client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::{
    AuthApi, AuthResponse, ErrorResponse, HealthResponse, LoginRequest, MessageResponse,
    RegisterRequest, UserResponse,
};
use crate::error::{ApiError, Result};
use crate::store::TokenStore;

/// Liveness checks give up sooner than regular calls
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// LetterOn API client
///
/// Attaches the held credential to protected requests. A 401 on a request
/// that carried one clears the token store and notifies its listener.
pub struct LetterOnClient {
    http: HttpClient,
    base_url: String,
    store: Arc<TokenStore>,
}

impl LetterOnClient {
    /// Create a new client against `base_url`
    pub fn new(base_url: &str, store: Arc<TokenStore>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    /// Log in and hold the issued credential.
    ///
    /// `remember_me` keeps it in the persistent tier.
    pub async fn sign_in(&self, request: &LoginRequest, remember_me: bool) -> Result<UserResponse> {
        let response = self.login(request).await?;
        self.store.set_token(&response.token, response.expires_at, remember_me)?;
        Ok(response.user)
    }

    /// Register and hold the issued credential
    pub async fn sign_up(
        &self,
        request: &RegisterRequest,
        remember_me: bool,
    ) -> Result<UserResponse> {
        let response = self.register(request).await?;
        self.store.set_token(&response.token, response.expires_at, remember_me)?;
        Ok(response.user)
    }

    /// Tell the server, then drop the local credential whatever it answered
    pub async fn sign_out(&self) -> Result<()> {
        if self.store.has_token() {
            if let Err(e) = self.logout().await {
                log::warn!("Server logout failed: {}", e);
            }
        }
        self.store.remove_token()?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request, attaching the held credential to `protected` routes
    fn request(&self, method: Method, path: &str, protected: bool) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        if !protected {
            return builder;
        }
        match self.store.get_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and map the response status.
    ///
    /// A 401 from a protected route means the session is gone, whether or
    /// not a credential was attached.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        protected: bool,
    ) -> Result<T> {
        let response = builder.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let data = response.json::<T>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                Ok(data)
            }
            StatusCode::UNAUTHORIZED if protected => {
                log::debug!("Session rejected by server, clearing token store");
                self.store.notify_unauthorized();
                Err(ApiError::Unauthorized.into())
            }
            StatusCode::UNAUTHORIZED => {
                let message = error_message(response, "Invalid email or password").await;
                Err(ApiError::InvalidCredentials(message).into())
            }
            StatusCode::NOT_FOUND => {
                let message = error_message(response, "Resource not found").await;
                Err(ApiError::NotFound(message).into())
            }
            StatusCode::BAD_REQUEST => {
                let message = error_message(response, "Bad request").await;
                Err(ApiError::BadRequest(message).into())
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let message = error_message(response, "Validation failed").await;
                Err(ApiError::Validation(message).into())
            }
            status if status.is_server_error() => {
                let message = error_message(response, &format!("Server error: {}", status)).await;
                Err(ApiError::ServerError(message).into())
            }
            _ => {
                let error_msg = format!("Unexpected status code: {}", status);
                Err(ApiError::InvalidResponse(error_msg).into())
            }
        }
    }
}

/// Pull the message out of an error body, falling back to the raw text
async fn error_message(response: reqwest::Response, fallback: &str) -> String {
    let text = match response.text().await {
        Ok(text) if !text.trim().is_empty() => text,
        _ => return fallback.to_string(),
    };
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => body.message,
        Err(_) => text,
    }
}

#[async_trait]
impl AuthApi for LetterOnClient {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let builder = self.request(Method::POST, "/auth/register", false);
        self.send(builder.json(request), false).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let builder = self.request(Method::POST, "/auth/login", false);
        self.send(builder.json(request), false).await
    }

    async fn logout(&self) -> Result<MessageResponse> {
        let builder = self.request(Method::POST, "/auth/logout", true);
        self.send(builder, true).await
    }

    async fn me(&self) -> Result<UserResponse> {
        let builder = self.request(Method::GET, "/auth/me", true);
        self.send(builder, true).await
    }

    async fn health(&self) -> Result<HealthResponse> {
        let builder = self
            .request(Method::GET, "/health", false)
            .timeout(HEALTH_TIMEOUT);
        self.send(builder, false).await
    }
}
