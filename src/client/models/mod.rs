//! LetterOn API data models
//!
//! Request and response bodies shared by the HTTP client and the server.

mod auth;
mod user;

pub use auth::{AuthResponse, ErrorResponse, LoginRequest, MessageResponse, RegisterRequest};
pub use user::{HealthResponse, UserResponse};
