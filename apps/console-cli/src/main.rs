use anyhow::Result;
use clap::Parser;
use manus_console_cli::ConsoleCli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    manus_console_cli::run(ConsoleCli::parse()).await
}
