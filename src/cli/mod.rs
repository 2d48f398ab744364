//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand};

pub mod args;
pub mod auth;
pub mod context;
pub mod serve;
pub mod status;
pub mod whoami;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// LetterOn - session credentials for the LetterOn API
#[derive(Parser, Debug)]
#[command(name = "letteron")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, json)
    #[arg(
        long,
        global = true,
        env = "LETTERON_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "LETTERON_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the directory holding the remembered session
    #[arg(long, global = true, env = "LETTERON_DATA_DIR", hide_env = true)]
    pub data_dir: Option<String>,

    /// Override the LetterOn API base URL
    #[arg(long, global = true, env = "LETTERON_API_HOST", hide_env = true)]
    pub api_host: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "LETTERON_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the LetterOn API server
    Serve(ServeArgs),

    /// Create an account and sign in
    Register(RegisterArgs),

    /// Sign in with email and password
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Show the stored session and its remaining lifetime
    Status(StatusArgs),

    /// Display version information
    Version,
}

/// Server settings
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "LETTERON_BIND", default_value = crate::config::server::DEFAULT_BIND)]
    pub bind: String,

    /// HMAC signing secret (at least 32 bytes)
    #[arg(long, env = "LETTERON_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Credential lifetime in hours
    #[arg(
        long,
        env = "LETTERON_TOKEN_LIFETIME_HOURS",
        default_value_t = crate::config::server::DEFAULT_TOKEN_LIFETIME_HOURS
    )]
    pub token_lifetime_hours: i64,

    /// Comma-separated list of allowed CORS origins
    #[arg(
        long,
        env = "LETTERON_CORS_ORIGINS",
        default_value = crate::config::server::DEFAULT_CORS_ORIGINS
    )]
    pub cors_origins: String,

    /// Deployment environment reported by /health
    #[arg(long, env = "LETTERON_ENVIRONMENT", default_value = "development")]
    pub environment: String,
}

/// Credentials shared by login and register
#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Account email (prompted if omitted)
    #[arg(long)]
    pub email: Option<String>,

    /// Account password (prompted if omitted)
    #[arg(long, env = "LETTERON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Keep the session for this process only, ignoring the remember-me preference
    #[arg(long)]
    pub no_remember: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Display name (prompted if omitted)
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Keep watching and warn before the session expires
    #[arg(long)]
    pub watch: bool,

    /// Seconds between checks while watching
    #[arg(long, default_value_t = 60, requires = "watch")]
    pub interval: u64,
}
