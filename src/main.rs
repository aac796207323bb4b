use anyhow::Context;

use relay_service::{DiscordSink, RelayService};
use subrelay_core::RelayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("subrelay=info,reddit_client=debug,relay_service=debug")
        .init();

    tracing::info!("Starting subrelay - subreddit relay service");

    let config = RelayConfig::from_env().context("loading configuration")?;
    let sink = DiscordSink::new(config.bot_token.clone()).context("building Discord sink")?;

    let service = RelayService::new(config, sink)?;
    service.start().await.map_err(|error| {
        tracing::error!("Relay subsystem disabled: {}", error);
        error
    })?;

    Ok(())
}
