pub mod digest;
pub mod discord;
pub mod poller;
pub mod render;
pub mod sink;
pub mod source;

pub use digest::{DigestScheduler, SentDigest, DIGEST_AMOUNT, PIN_CAPACITY};
pub use discord::DiscordSink;
pub use poller::{ChangeDetector, NewPostPoller};
pub use sink::MessageSink;
pub use source::PostSource;

use std::sync::Arc;

use tracing::info;

use reddit_client::{RedditAuth, RedditClient};
use subrelay_core::{RelayConfig, RelayError};

/// Owns the three background loops and their startup ordering.
pub struct RelayService<S> {
    auth: Arc<RedditAuth>,
    client: Arc<RedditClient>,
    sink: Arc<S>,
    config: RelayConfig,
}

impl<S> RelayService<S>
where
    S: MessageSink + 'static,
{
    pub fn new(config: RelayConfig, sink: S) -> Result<Self, RelayError> {
        let auth = Arc::new(RedditAuth::new(
            config.client_id.clone(),
            config.client_secret.clone(),
        )?);
        let client = Arc::new(RedditClient::new(Arc::clone(&auth))?);

        Ok(Self {
            auth,
            client,
            sink: Arc::new(sink),
            config,
        })
    }

    /// Bootstrap the token, then run the three loops for process lifetime.
    ///
    /// Token initialization must complete before either polling loop issues
    /// its first request; a bootstrap failure disables the whole subsystem
    /// and no loop is spawned.
    pub async fn start(self) -> Result<(), RelayError> {
        self.auth.initialize().await?;

        let refresh = tokio::spawn(Arc::clone(&self.auth).run_refresh_loop());

        let poller = NewPostPoller::new(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
            self.config.channel_id,
            self.config.subreddits.clone(),
            self.config.request_delay,
        );
        let new_posts = tokio::spawn(poller.run());

        let scheduler = DigestScheduler::new(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
            self.config.channel_id,
            self.config.subreddits.clone(),
            self.config.primary_subreddit.clone(),
        );
        let weekly_digest = tokio::spawn(scheduler.run());

        info!(
            "Relay loops started for {} subreddits",
            self.config.subreddits.len()
        );

        // None of the loops has a terminal state; this runs until shutdown.
        let _ = tokio::join!(refresh, new_posts, weekly_digest);
        Ok(())
    }
}
