/// A single subreddit post, snapshotted from a listing response.
///
/// Posts live only for the poll cycle that fetched them; nothing is
/// persisted across cycles except the per-subreddit watermark ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Platform-assigned id, base-36 encoded.
    pub id: String,
    pub title: String,
    /// Self-text body; empty for link posts.
    pub body: String,
    /// Site-relative permalink, e.g. `/r/Python/comments/abc123/...`.
    pub permalink: String,
    pub author: String,
    pub upvotes: i64,
    pub comment_count: u64,
}

impl Post {
    /// Decode the base-36 id into an integer ordinal.
    ///
    /// Ordinals impose a total order consistent with recency, which is what
    /// the new-post watermark compares against.
    pub fn ordinal(&self) -> Option<u64> {
        u64::from_str_radix(&self.id, 36).ok()
    }
}

/// Time window accepted by Reddit's `top` listings (`t` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    All,
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_param(self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}
