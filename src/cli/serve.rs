//! Serve command implementation

use crate::cli::ServeArgs;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::server;

/// Validate settings up front, then run the server until shutdown
pub async fn run(args: &ServeArgs) -> Result<()> {
    let config = ServerConfig::new(
        &args.bind,
        args.secret_key.as_deref(),
        args.token_lifetime_hours,
        &args.cors_origins,
        &args.environment,
    )?;

    server::serve(config).await
}
