use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use subrelay_core::config::USER_AGENT;
use subrelay_core::{ApiError, Post, RelayError};

use crate::auth::RedditAuth;
use crate::retry;

pub const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
pub const PUBLIC_BASE_URL: &str = "https://www.reddit.com";

/// Reddit's JSON listings provide 25 posts at most.
pub const PAGE_SIZE_CEILING: usize = 25;

const MAX_FETCH_RETRIES: u32 = 3;
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingChild {
    pub data: PostData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub permalink: String,
    pub author: String,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub num_comments: u64,
}

impl From<PostData> for Post {
    fn from(data: PostData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            body: data.selftext,
            permalink: data.permalink,
            author: data.author,
            upvotes: data.ups,
            comment_count: data.num_comments,
        }
    }
}

/// Authenticated listing fetches, shared by every poller.
pub struct RedditClient {
    http: reqwest::Client,
    auth: Arc<RedditAuth>,
}

impl RedditClient {
    pub fn new(auth: Arc<RedditAuth>) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, auth })
    }

    /// Fetch up to `amount` posts at `route`, most recent first as the API
    /// delivers them.
    ///
    /// Transient failures degrade to an empty result after bounded retries,
    /// so an empty return means "temporarily unavailable", not "the
    /// subreddit has no posts". Requesting an amount outside (0, 25] is a
    /// programming error and is rejected before any network call.
    pub async fn fetch_posts(
        &self,
        route: &str,
        amount: usize,
        params: &[(&str, &str)],
    ) -> Result<Vec<Post>, RelayError> {
        if amount == 0 || amount > PAGE_SIZE_CEILING {
            return Err(RelayError::InvalidInput {
                message: format!("invalid amount of subreddit posts requested: {}", amount),
            });
        }

        let url = format!("{}/{}", OAUTH_BASE_URL, route);
        let listing = retry::bounded(MAX_FETCH_RETRIES, FETCH_RETRY_DELAY, || {
            self.attempt_listing(&url, params)
        })
        .await;

        match listing {
            Some(listing) => Ok(listing
                .data
                .children
                .into_iter()
                .take(amount)
                .map(|child| child.data.into())
                .collect()),
            None => {
                debug!(
                    "No valid response from {} within {} attempts",
                    url, MAX_FETCH_RETRIES
                );
                Ok(Vec::new())
            }
        }
    }

    async fn attempt_listing(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Listing, ApiError> {
        let token = self.auth.bearer_token().await.ok_or(ApiError::MissingToken)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(params)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ApiError::RequestTimeout
                } else {
                    ApiError::RequestFailed {
                        details: error.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if status != StatusCode::OK || !content_type.starts_with("application/json") {
            return Err(ApiError::UnexpectedResponse {
                route: url.to_string(),
                status: status.as_u16(),
                content_type,
            });
        }

        response
            .json::<Listing>()
            .await
            .map_err(|error| ApiError::InvalidResponse {
                details: error.to_string(),
            })
    }

    /// Metadata-only probe of a subreddit's "new" feed.
    ///
    /// The declared content length stands in for content identity: an
    /// unchanged value lets pollers skip the full fetch for a cycle.
    pub async fn probe_new_feed(&self, subreddit: &str) -> Result<Option<String>, RelayError> {
        let token = self.auth.bearer_token().await.ok_or(ApiError::MissingToken)?;

        let response = self
            .http
            .head(format!("{}/{}/new.rss", OAUTH_BASE_URL, subreddit))
            .bearer_auth(&token)
            .send()
            .await?;

        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_FIXTURE: &str = r#"{
        "kind": "Listing",
        "data": {
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "id": "abc123",
                        "title": "A very real post",
                        "selftext": "Some body text",
                        "permalink": "/r/Python/comments/abc123/a_very_real_post/",
                        "author": "pythonista",
                        "ups": 321,
                        "num_comments": 17
                    }
                },
                {
                    "kind": "t3",
                    "data": {
                        "id": "abc122",
                        "title": "A link post",
                        "selftext": "",
                        "permalink": "/r/Python/comments/abc122/a_link_post/",
                        "author": "lurker",
                        "ups": 4,
                        "num_comments": 0
                    }
                }
            ]
        }
    }"#;

    fn test_client() -> RedditClient {
        let auth =
            RedditAuth::new("client_id".to_string(), "client_secret".to_string()).unwrap();
        RedditClient::new(Arc::new(auth)).unwrap()
    }

    #[test]
    fn listing_fixture_decodes_into_posts() {
        let listing: Listing = serde_json::from_str(LISTING_FIXTURE).unwrap();
        assert_eq!(listing.data.children.len(), 2);

        let post: Post = listing.data.children[0].data.clone().into();
        assert_eq!(post.id, "abc123");
        assert_eq!(post.title, "A very real post");
        assert_eq!(post.body, "Some body text");
        assert_eq!(post.author, "pythonista");
        assert_eq!(post.upvotes, 321);
        assert_eq!(post.comment_count, 17);
        assert!(post.ordinal().is_some());
    }

    #[test]
    fn empty_selftext_is_tolerated() {
        let listing: Listing = serde_json::from_str(LISTING_FIXTURE).unwrap();
        let post: Post = listing.data.children[1].data.clone().into();
        assert_eq!(post.body, "");
    }

    #[tokio::test]
    async fn oversized_amount_is_rejected_before_any_request() {
        let client = test_client();
        let result = client.fetch_posts("r/Python/new", 30, &[]).await;
        assert!(matches!(result, Err(RelayError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_before_any_request() {
        let client = test_client();
        let result = client.fetch_posts("r/Python/new", 0, &[]).await;
        assert!(matches!(result, Err(RelayError::InvalidInput { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn page_size_ceiling_is_the_upper_bound() {
        // 25 itself must pass validation. With no token ever issued, every
        // attempt fails and the fetch degrades to the fail-soft empty result.
        let client = test_client();
        let posts = client
            .fetch_posts("r/Python/new", PAGE_SIZE_CEILING, &[])
            .await
            .unwrap();
        assert!(posts.is_empty());
    }
}
