//! Whoami command implementation

use colored::Colorize;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::AuthApi;
use crate::error::{ApiError, Result};

/// Show the account behind the stored session.
///
/// A rejected session is cleared by the client before the error surfaces.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    if !ctx.store.has_token() {
        return Err(ApiError::Unauthorized.into());
    }

    let user = ctx.client.me().await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Pretty => {
            println!("{}", user.name.bold());
            println!("  Email: {}", user.email);
            println!("  ID:    {}", user.id.dimmed());
        }
    }
    Ok(())
}
