//! Status command implementation

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use colored::Colorize;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat, StatusArgs};
use crate::client::{AuthApi, HealthResponse};
use crate::config::Config;
use crate::error::Result;
use crate::store::{ExpiryStatus, ExpiryWatch, TokenState};

fn format_remaining(remaining: Duration) -> String {
    let hours = remaining.num_hours();
    let mins = remaining.num_minutes() % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", remaining.num_minutes().max(0))
    }
}

/// Run the status command
pub async fn run(opts: &GlobalOptions, args: &StatusArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let health = ctx.client.health().await;
    if let Err(e) = &health {
        log::debug!("Health check failed: {}", e);
    }

    match ctx.format {
        OutputFormat::Json => print_json(&ctx, health.as_ref().ok())?,
        OutputFormat::Pretty => print_pretty(&ctx, opts, health.as_ref().ok())?,
    }

    if args.watch {
        watch(&ctx, StdDuration::from_secs(args.interval.max(1))).await;
    }
    Ok(())
}

fn print_json(ctx: &CommandContext, health: Option<&HealthResponse>) -> Result<()> {
    let mut value = match ctx.store.state() {
        TokenState::Held { tier, expires_at } => serde_json::json!({
            "signed_in": true,
            "tier": tier.to_string(),
            "expires_at": expires_at.to_rfc3339(),
            "remaining_seconds": (expires_at - Utc::now()).num_seconds(),
        }),
        TokenState::Empty => serde_json::json!({ "signed_in": false }),
    };
    value["server"] = match health {
        Some(health) => serde_json::json!({
            "reachable": true,
            "status": health.status,
            "environment": health.environment,
        }),
        None => serde_json::json!({ "reachable": false }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_pretty(
    ctx: &CommandContext,
    opts: &GlobalOptions,
    health: Option<&HealthResponse>,
) -> Result<()> {
    println!("{}\n", "LetterOn Session Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!("Config file: {}", config_path.display().to_string().cyan());
    println!("Data directory: {}", ctx.data_dir.display().to_string().cyan());
    println!(
        "API host: {}",
        ctx.config.api_base_url(opts.api_host_ref()).cyan()
    );
    match health {
        Some(health) => println!(
            "{} Server {} ({})",
            "✓".green(),
            health.status,
            health.environment
        ),
        None => println!("{} Server unreachable", "✗".red()),
    }
    println!();

    match ctx.store.state() {
        TokenState::Held { tier, expires_at } => {
            let remaining = expires_at - Utc::now();
            if remaining <= ctx.config.warn_before_expiry() {
                println!(
                    "{} Signed in ({} session, expires in {})",
                    "⚠".yellow(),
                    tier,
                    format_remaining(remaining)
                );
            } else {
                println!(
                    "{} Signed in ({} session, expires in {})",
                    "✓".green(),
                    tier,
                    format_remaining(remaining)
                );
            }
        }
        TokenState::Empty => {
            println!("{} Not signed in", "○".dimmed());
            println!("  → Run 'letteron login' to sign in");
        }
    }

    println!();
    Ok(())
}

/// Watch the stored session until it expires, is removed, or Ctrl+C
async fn watch(ctx: &CommandContext, interval: StdDuration) {
    let watch = ExpiryWatch::new(ctx.store.clone(), ctx.config.warn_before_expiry())
        .with_interval(interval);

    let handle = watch.spawn(|status| match status {
        ExpiryStatus::Valid { remaining } => {
            println!("{} {} remaining", "✓".green(), format_remaining(remaining))
        }
        ExpiryStatus::ExpiringSoon { remaining } => println!(
            "{} Session expires in {}",
            "⚠".yellow(),
            format_remaining(remaining)
        ),
        ExpiryStatus::Expired => println!("{} Session expired", "✗".red()),
        ExpiryStatus::Empty => println!("{} No session", "○".dimmed()),
    });

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                log::warn!("Expiry watch stopped unexpectedly: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    // Reading purges an expired record now rather than on the next command
    if ctx.store.state() == TokenState::Empty {
        log::debug!("No stored session left");
    }
}
