use async_trait::async_trait;

use reddit_client::{RedditClient, PAGE_SIZE_CEILING};
use subrelay_core::{Post, RelayError, TimeWindow};

/// Read side of the content platform, as the pollers consume it.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Newest posts for a subreddit, most recent first.
    async fn latest_posts(&self, subreddit: &str) -> Result<Vec<Post>, RelayError>;

    /// Top-ranked posts over a time window.
    async fn top_posts(
        &self,
        subreddit: &str,
        window: TimeWindow,
        amount: usize,
    ) -> Result<Vec<Post>, RelayError>;

    /// Cheap size probe of the subreddit's "new" feed.
    async fn new_feed_size(&self, subreddit: &str) -> Result<Option<String>, RelayError>;
}

#[async_trait]
impl PostSource for RedditClient {
    async fn latest_posts(&self, subreddit: &str) -> Result<Vec<Post>, RelayError> {
        self.fetch_posts(&format!("{}/new", subreddit), PAGE_SIZE_CEILING, &[])
            .await
    }

    async fn top_posts(
        &self,
        subreddit: &str,
        window: TimeWindow,
        amount: usize,
    ) -> Result<Vec<Post>, RelayError> {
        self.fetch_posts(
            &format!("{}/top", subreddit),
            amount,
            &[("t", window.as_param())],
        )
        .await
    }

    async fn new_feed_size(&self, subreddit: &str) -> Result<Option<String>, RelayError> {
        self.probe_new_feed(subreddit).await
    }
}
