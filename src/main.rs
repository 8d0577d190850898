mod cli;

use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

/// Load a .env file so IMAGEN_API_KEY and MAX_WORKERS can live there.
/// Existing environment variables win.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Route `log` records to stderr, filtered by RUST_LOG (default: info).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();

    let result = match args.command {
        Command::Run(run_args) => cli::run_batch(run_args),
        Command::Profiles { api_key, config } => cli::list_profiles(api_key, config.as_deref()),
        Command::Config { action } => cli::handle_config_action(action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
