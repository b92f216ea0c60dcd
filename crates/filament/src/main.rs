use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

/// Log filter variable, e.g. `FILAMENT_LOG=filament_fetch=debug`.
const LOG_ENV: &str = "FILAMENT_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli::App::parse().run().await
}
