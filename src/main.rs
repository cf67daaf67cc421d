// Entrypoint for the CLI application.
// - Installs logging on stderr so it does not mix with the prompts.
// - Builds the API client from persisted settings and hands it to the menu.

use meme_generator_cli::{ui::main_menu, ApiClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = ApiClient::from_default_storage()?;

    main_menu(api).await?;
    Ok(())
}
