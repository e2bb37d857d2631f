use clap::Parser;
use tracing_subscriber::EnvFilter;

use hydrotile_cli::Args;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(error) = hydrotile_cli::run(args).await {
        eprintln!("hydrotile: {error}");
        std::process::exit(1);
    }
}
