use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use subrelay_core::{Post, RelayError};

use crate::render;
use crate::sink::MessageSink;
use crate::source::PostSource;

/// Per-subreddit gate deciding whether a full fetch is warranted.
///
/// The probe size is a heuristic: coincidentally equal sizes can mask a real
/// change for a cycle. That trade-off is accepted; the alternative is a full
/// fetch for every subreddit on every cycle.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    prev_lengths: HashMap<String, String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `probe` for `subreddit` and report whether it differs from the
    /// previous cycle's value.
    pub fn update(&mut self, subreddit: &str, probe: &str) -> bool {
        match self.prev_lengths.get(subreddit) {
            Some(previous) if previous == probe => false,
            _ => {
                self.prev_lengths
                    .insert(subreddit.to_string(), probe.to_string());
                true
            }
        }
    }
}

/// Continuous loop relaying posts that appeared since the previous cycle.
pub struct NewPostPoller<C, S> {
    source: Arc<C>,
    sink: Arc<S>,
    channel_id: u64,
    subreddits: Vec<String>,
    cycle_delay: Duration,
    detector: ChangeDetector,
    watermarks: HashMap<String, u64>,
}

impl<C, S> NewPostPoller<C, S>
where
    C: PostSource,
    S: MessageSink,
{
    pub fn new(
        source: Arc<C>,
        sink: Arc<S>,
        channel_id: u64,
        subreddits: Vec<String>,
        cycle_delay: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            channel_id,
            subreddits,
            cycle_delay,
            detector: ChangeDetector::new(),
            watermarks: HashMap::new(),
        }
    }

    /// Last-seen ordinal for a subreddit; `None` until a baseline exists.
    pub fn watermark(&self, subreddit: &str) -> Option<u64> {
        self.watermarks.get(subreddit).copied()
    }

    pub async fn run(mut self) {
        loop {
            sleep(self.cycle_delay).await;
            self.poll_cycle().await;
        }
    }

    /// One pass over every monitored subreddit. Failures are isolated per
    /// subreddit; one bad topic never stalls the rest of the cycle.
    pub async fn poll_cycle(&mut self) {
        let subreddits = self.subreddits.clone();
        for subreddit in &subreddits {
            if let Err(error) = self.poll_subreddit(subreddit).await {
                warn!("Skipping {} this cycle: {}", subreddit, error);
            }
        }
    }

    async fn poll_subreddit(&mut self, subreddit: &str) -> Result<(), RelayError> {
        let probe = match self.source.new_feed_size(subreddit).await? {
            Some(probe) => probe,
            None => return Ok(()),
        };

        // Same size as the previous cycle: assume nothing new.
        if !self.detector.update(subreddit, &probe) {
            return Ok(());
        }

        let posts = self.source.latest_posts(subreddit).await?;
        let newest = match posts.first() {
            Some(post) => post,
            // Nothing returned; nothing to index.
            None => return Ok(()),
        };
        let newest_ordinal = match newest.ordinal() {
            Some(ordinal) => ordinal,
            None => {
                warn!("Undecodable post id {:?} from {}", newest.id, subreddit);
                return Ok(());
            }
        };

        // Posts are only emitted once a baseline exists; the first
        // successful fetch establishes the watermark without replaying
        // history.
        let new_posts = match self.watermarks.get(subreddit) {
            Some(&watermark) => collect_unseen(&posts, watermark),
            None => Vec::new(),
        };

        // Re-synchronize to the newest ordinal even when the walk collected
        // nothing, so ordinal edge cases cannot leave the watermark stale.
        self.watermarks.insert(subreddit.to_string(), newest_ordinal);

        let collected = new_posts.len();
        for post in new_posts.into_iter().rev() {
            let message = render::new_post(&post, subreddit);
            if let Err(error) = self.sink.send_message(self.channel_id, &message).await {
                warn!(
                    "Failed to relay post {} from {}: {}",
                    post.id, subreddit, error
                );
            }
        }

        if collected > 0 {
            debug!(
                "Sent {} new {} posts to channel {}",
                collected, subreddit, self.channel_id
            );
        }

        Ok(())
    }
}

/// Most-recent-first walk that stops at the first already-seen ordinal.
///
/// Listings are contiguous and ordered, so the first known item halts the
/// scan; no gap checks are needed. An undecodable id also halts the scan.
fn collect_unseen(posts: &[Post], watermark: u64) -> Vec<Post> {
    let mut unseen = Vec::new();

    for post in posts {
        match post.ordinal() {
            Some(ordinal) if ordinal > watermark => unseen.push(post.clone()),
            _ => break,
        }
    }

    unseen
}
