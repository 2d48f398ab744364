//! Route handlers

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::AppState;
use super::error::ServerError;
use crate::client::{
    AuthResponse, HealthResponse, LoginRequest, MessageResponse, RegisterRequest, UserResponse,
};
use crate::config::server::SERVICE_NAME;
use crate::token::Identity;

use super::users::UserRecord;

fn issue_for(state: &AppState, user: &UserRecord) -> AuthResponse {
    let credential = state
        .issuer
        .issue(&Identity::new(&user.id).with_email(&user.email));

    AuthResponse {
        expires_at: credential.expires_at(),
        token: credential.into_string(),
        user: user.to_response(),
    }
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let Json(request) = payload?;
    let user = state
        .users
        .register(&request.name, &request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(issue_for(&state, &user))))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ServerError> {
    let Json(request) = payload?;
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    log::info!("User {} logged in", user.id);
    Ok(Json(issue_for(&state, &user)))
}

/// Stateless: nothing to revoke, the client drops its copy
pub async fn logout(Extension(identity): Extension<Identity>) -> Json<MessageResponse> {
    log::info!("User {} logged out", identity.user_id);
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserResponse>, ServerError> {
    let user = state
        .users
        .find_by_id(&identity.user_id)
        .ok_or(ServerError::UserNotFound)?;

    Ok(Json(user.to_response()))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        environment: state.environment.to_string(),
    })
}
