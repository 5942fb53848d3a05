use anyhow::Result;
use clap::Parser;
use connector_forms::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing based on RUST_LOG env var; stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
