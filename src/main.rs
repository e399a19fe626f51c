use clap::Parser;
use tasknest::cli::commands::Cli;
use tasknest::cli::handlers;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by TASKNEST_LOG (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TASKNEST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
