use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};
use tokio::time::sleep;
use tracing::{info, warn};

use subrelay_core::{RelayError, SinkError, TimeWindow};

use crate::render;
use crate::sink::MessageSink;
use crate::source::PostSource;

/// At most this many digest messages stay pinned in the channel.
pub const PIN_CAPACITY: usize = 5;

/// Posts per digest message.
pub const DIGEST_AMOUNT: usize = 5;

/// A delivered top-posts summary.
#[derive(Debug, Clone)]
pub struct SentDigest {
    pub message_id: String,
    /// False when the "no posts found" notice went out instead of a digest.
    pub posts_found: bool,
}

/// Weekly loop posting a top-posts summary for every monitored subreddit,
/// with bounded pin rotation for the primary one.
pub struct DigestScheduler<C, S> {
    source: Arc<C>,
    sink: Arc<S>,
    channel_id: u64,
    subreddits: Vec<String>,
    primary_subreddit: String,
}

impl<C, S> DigestScheduler<C, S>
where
    C: PostSource,
    S: MessageSink,
{
    pub fn new(
        source: Arc<C>,
        sink: Arc<S>,
        channel_id: u64,
        subreddits: Vec<String>,
        primary_subreddit: String,
    ) -> Self {
        Self {
            source,
            sink,
            channel_id,
            subreddits,
            primary_subreddit,
        }
    }

    pub async fn run(self) {
        loop {
            let wait = until_next_monday(Utc::now());
            info!("Next weekly digest in {}s", wait.as_secs());
            sleep(wait).await;
            self.digest_cycle().await;
        }
    }

    /// One digest pass over every subreddit; failures are per-topic.
    pub async fn digest_cycle(&self) {
        for subreddit in &self.subreddits {
            if let Err(error) = self.send_weekly_digest(subreddit).await {
                warn!("Weekly digest failed for {}: {}", subreddit, error);
            }
        }
    }

    async fn send_weekly_digest(&self, subreddit: &str) -> Result<(), RelayError> {
        let sent = self
            .send_top_posts(
                subreddit,
                TimeWindow::Week,
                &format!("This week's top {} posts have arrived!", subreddit),
            )
            .await?;

        if sent.posts_found && subreddit.eq_ignore_ascii_case(&self.primary_subreddit) {
            self.rotate_pins(&sent.message_id).await?;
        }

        Ok(())
    }

    /// Fetch and deliver a top-posts summary. Shared by the weekly digest
    /// and the on-demand all-time/daily/weekly commands.
    pub async fn send_top_posts(
        &self,
        subreddit: &str,
        window: TimeWindow,
        announcement: &str,
    ) -> Result<SentDigest, RelayError> {
        let posts = self
            .source
            .top_posts(subreddit, window, DIGEST_AMOUNT)
            .await?;

        let posts_found = !posts.is_empty();
        let content = if posts_found {
            format!("{}\n\n{}", announcement, render::digest(subreddit, &posts))
        } else {
            render::no_posts_notice(subreddit)
        };

        let message_id = self.sink.send_message(self.channel_id, &content).await?;
        Ok(SentDigest {
            message_id,
            posts_found,
        })
    }

    /// Keep at most [`PIN_CAPACITY`] digests pinned, evicting oldest first.
    async fn rotate_pins(&self, message_id: &str) -> Result<(), SinkError> {
        let mut pins = self.sink.pinned_messages(self.channel_id).await?;

        while pins.len() >= PIN_CAPACITY {
            match pins.pop() {
                Some(oldest) => self.sink.unpin_message(self.channel_id, &oldest).await?,
                None => break,
            }
        }

        self.sink.pin_message(self.channel_id, message_id).await
    }
}

/// Duration until the next Monday 00:00:00 UTC. Invoked on a Monday this
/// returns the following Monday, a full week out.
pub fn until_next_monday(now: DateTime<Utc>) -> Duration {
    let days_ahead = 7 - u64::from(now.weekday().num_days_from_monday());
    let monday = (now.date_naive() + Days::new(days_ahead))
        .and_time(NaiveTime::MIN)
        .and_utc();

    (monday - now).to_std().unwrap_or_default()
}
