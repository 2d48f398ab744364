//! LetterOn - session credential issuance, verification and storage

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod server;
mod store;
mod token;

use cli::{Cli, Commands, GlobalOptions};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --debug, then a per-command default
    let default_level = match (&cli.command, cli.debug) {
        (_, true) => "debug",
        (Commands::Serve(_), false) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let opts = GlobalOptions::from_cli(&cli);

    match &cli.command {
        Commands::Serve(args) => cli::serve::run(args).await,
        Commands::Register(args) => cli::auth::register(&opts, args).await,
        Commands::Login(args) => cli::auth::login(&opts, args).await,
        Commands::Logout => cli::auth::logout(&opts).await,
        Commands::Whoami => cli::whoami::run(&opts).await,
        Commands::Status(args) => cli::status::run(&opts, args).await,
        Commands::Version => {
            println!("letteron version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
