//! LetterOn HTTP server
//!
//! Issues credentials on register/login and guards the protected routes
//! with the bearer middleware in [`auth`].

pub mod auth;
pub mod error;
pub mod routes;
pub mod users;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::token::{Clock, SystemClock, TokenIssuer, TokenVerifier};

pub use users::UserDirectory;

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<TokenVerifier>,
    pub users: Arc<UserDirectory>,
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(config: &ServerConfig, users: UserDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: Arc::new(TokenIssuer::new(
                config.secret.clone(),
                config.token_lifetime,
                clock.clone(),
            )),
            verifier: Arc::new(TokenVerifier::new(config.secret.clone(), clock)),
            users: Arc::new(users),
            environment: Arc::from(config.environment.as_str()),
        }
    }
}

/// Build the application router
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(routes::logout))
        .route("/auth/me", get(routes::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/auth/register", post(routes::register))
        .route("/auth/login", post(routes::login))
        .route("/health", get(routes::health))
        .merge(protected)
        .layer(middleware::from_fn(log_request))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

/// Log method, path, status and latency. Headers are never logged.
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Run the server until Ctrl+C or SIGTERM
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config, UserDirectory::new(), Arc::new(SystemClock));

    log::info!(
        "Starting LetterOn server ({} environment, token lifetime {}h)",
        config.environment,
        state.issuer.lifetime().num_hours()
    );
    let app = router(state, &config.cors_origins);

    let listener = TcpListener::bind(config.bind).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
