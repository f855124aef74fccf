//! The Jury - voice deliberation backend

use the_jury::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up API keys from a local .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Initialize logging (INFO level by default, override with RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    cli::run().await
}
