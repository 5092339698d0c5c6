//! SQLite loader CLI application
//!
//! Command-line interface for fetching, caching and querying a versioned
//! SQLite database published behind a JSON manifest.

use std::error::Error as _;
use std::process;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library
use sqlite_loader::cli::{
    handle_clear, handle_load, handle_query, handle_status, Cli, CommandContext, Commands,
};
use sqlite_loader::config::AppConfig;
use sqlite_loader::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  Caused by: {}", cause);
            source = cause.source();
        }
        process::exit(if e.is_aborted() { 130 } else { 1 });
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    cli.global.apply_to(&mut config);

    // Initialize logging based on verbosity and configuration
    init_logging(&cli, &config);

    info!("SQLite Loader v{} starting", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let ctx = CommandContext::new(config, cancel, cli.global.quiet);

    // Execute the appropriate command
    match cli.command {
        Commands::Load(args) => {
            info!("Executing load command");
            handle_load(args, &ctx).await
        }
        Commands::Query(args) => {
            info!("Executing query command");
            handle_query(args, &ctx).await
        }
        Commands::Clear(args) => {
            info!("Executing clear command");
            handle_clear(args, &ctx).await
        }
        Commands::Status(args) => {
            info!("Executing status command");
            handle_status(args, &ctx).await
        }
    }
}

/// Cancel in-flight transfers on the first Ctrl-C, exit on the second
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
            return;
        }
        eprintln!("\n🛑 Ctrl-C received, cancelling download (press again to quit)...");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 Ctrl-C received again, exiting");
            process::exit(130);
        }
    });
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli.log_level(&config.logging.level);

    // RUST_LOG directives first, then ours for this crate
    let mut filter = EnvFilter::from_default_env();
    match format!("sqlite_loader={}", log_level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level '{}': {}", log_level, e),
    }

    // Logs go to stderr so query output stays machine-readable
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
