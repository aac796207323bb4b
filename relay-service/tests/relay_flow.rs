use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use relay_service::{DigestScheduler, MessageSink, NewPostPoller, PostSource};
use subrelay_core::{Post, RelayError, SinkError, TimeWindow};

const CHANNEL: u64 = 42;

fn post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        title: format!("post {}", id),
        body: "body text".to_string(),
        permalink: format!("/r/test/comments/{}/post/", id),
        author: "tester".to_string(),
        upvotes: 10,
        comment_count: 3,
    }
}

/// Scripted platform: per-subreddit queues of probe values and "new" listing
/// pages, plus fixed top listings.
#[derive(Default)]
struct ScriptedSource {
    probes: Mutex<HashMap<String, VecDeque<String>>>,
    pages: Mutex<HashMap<String, VecDeque<Vec<Post>>>>,
    top: Mutex<HashMap<String, Vec<Post>>>,
    fetch_count: Mutex<HashMap<String, usize>>,
}

impl ScriptedSource {
    fn script_probe(&self, subreddit: &str, probe: &str) {
        self.probes
            .lock()
            .unwrap()
            .entry(subreddit.to_string())
            .or_default()
            .push_back(probe.to_string());
    }

    fn script_page(&self, subreddit: &str, page: Vec<Post>) {
        self.pages
            .lock()
            .unwrap()
            .entry(subreddit.to_string())
            .or_default()
            .push_back(page);
    }

    fn script_top(&self, subreddit: &str, posts: Vec<Post>) {
        self.top
            .lock()
            .unwrap()
            .insert(subreddit.to_string(), posts);
    }

    fn fetches(&self, subreddit: &str) -> usize {
        self.fetch_count
            .lock()
            .unwrap()
            .get(subreddit)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PostSource for ScriptedSource {
    async fn latest_posts(&self, subreddit: &str) -> Result<Vec<Post>, RelayError> {
        *self
            .fetch_count
            .lock()
            .unwrap()
            .entry(subreddit.to_string())
            .or_insert(0) += 1;

        Ok(self
            .pages
            .lock()
            .unwrap()
            .get_mut(subreddit)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_default())
    }

    async fn top_posts(
        &self,
        subreddit: &str,
        _window: TimeWindow,
        amount: usize,
    ) -> Result<Vec<Post>, RelayError> {
        let mut posts = self
            .top
            .lock()
            .unwrap()
            .get(subreddit)
            .cloned()
            .unwrap_or_default();
        posts.truncate(amount);
        Ok(posts)
    }

    async fn new_feed_size(&self, subreddit: &str) -> Result<Option<String>, RelayError> {
        Ok(self
            .probes
            .lock()
            .unwrap()
            .get_mut(subreddit)
            .and_then(|probes| probes.pop_front()))
    }
}

/// Records every send and mirrors the platform's pin list, newest first.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<String>>,
    pins: Mutex<Vec<String>>,
    unpinned: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl RecordingSink {
    fn with_pins(pins: Vec<&str>) -> Self {
        Self {
            pins: Mutex::new(pins.into_iter().map(str::to_string).collect()),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn pins(&self) -> Vec<String> {
        self.pins.lock().unwrap().clone()
    }

    fn unpinned(&self) -> Vec<String> {
        self.unpinned.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(&self, _channel_id: u64, content: &str) -> Result<String, SinkError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        self.sent.lock().unwrap().push(content.to_string());
        Ok(format!("m{}", next_id))
    }

    async fn pinned_messages(&self, _channel_id: u64) -> Result<Vec<String>, SinkError> {
        Ok(self.pins())
    }

    async fn pin_message(&self, _channel_id: u64, message_id: &str) -> Result<(), SinkError> {
        self.pins.lock().unwrap().insert(0, message_id.to_string());
        Ok(())
    }

    async fn unpin_message(&self, _channel_id: u64, message_id: &str) -> Result<(), SinkError> {
        self.pins.lock().unwrap().retain(|pin| pin != message_id);
        self.unpinned.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

/// Sink whose sends always fail; pin operations are never expected.
struct FailingSink;

#[async_trait]
impl MessageSink for FailingSink {
    async fn send_message(&self, channel_id: u64, _content: &str) -> Result<String, SinkError> {
        Err(SinkError::SendRejected {
            channel: channel_id,
            reason: "scripted failure".to_string(),
        })
    }

    async fn pinned_messages(&self, _channel_id: u64) -> Result<Vec<String>, SinkError> {
        Ok(Vec::new())
    }

    async fn pin_message(&self, _channel_id: u64, _message_id: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn unpin_message(&self, _channel_id: u64, _message_id: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

fn poller<S: MessageSink>(
    source: Arc<ScriptedSource>,
    sink: Arc<S>,
) -> NewPostPoller<ScriptedSource, S> {
    NewPostPoller::new(
        source,
        sink,
        CHANNEL,
        vec!["r/Python".to_string()],
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn cold_start_establishes_watermark_without_emitting() {
    let source = Arc::new(ScriptedSource::default());
    source.script_probe("r/Python", "120");
    source.script_page("r/Python", vec![post("2"), post("1")]);

    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(Arc::clone(&source), Arc::clone(&sink));

    poller.poll_cycle().await;

    assert!(sink.sent().is_empty());
    assert_eq!(poller.watermark("r/Python"), Some(2));
}

#[tokio::test]
async fn second_cycle_emits_only_unseen_posts_in_ascending_order() {
    let source = Arc::new(ScriptedSource::default());
    source.script_probe("r/Python", "120");
    source.script_probe("r/Python", "140");
    source.script_page("r/Python", vec![post("2"), post("1")]);
    source.script_page("r/Python", vec![post("4"), post("3"), post("2")]);

    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(Arc::clone(&source), Arc::clone(&sink));

    poller.poll_cycle().await;
    poller.poll_cycle().await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("post 3"));
    assert!(sent[1].contains("post 4"));
    assert_eq!(poller.watermark("r/Python"), Some(4));
}

#[tokio::test]
async fn unchanged_probe_suppresses_the_full_fetch() {
    let source = Arc::new(ScriptedSource::default());
    source.script_probe("r/Python", "100");
    source.script_probe("r/Python", "100");
    source.script_page("r/Python", vec![post("2"), post("1")]);
    // This page would yield new posts, but the identical probe value means
    // it is never requested. A coincidentally equal size masking a real
    // change is the accepted accuracy trade-off of the heuristic.
    source.script_page("r/Python", vec![post("9"), post("8")]);

    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(Arc::clone(&source), Arc::clone(&sink));

    poller.poll_cycle().await;
    poller.poll_cycle().await;

    assert_eq!(source.fetches("r/Python"), 1);
    assert!(sink.sent().is_empty());
    assert_eq!(poller.watermark("r/Python"), Some(2));
}

#[tokio::test]
async fn empty_fetch_is_not_indexed() {
    let source = Arc::new(ScriptedSource::default());
    source.script_probe("r/Python", "50");
    source.script_page("r/Python", Vec::new());

    let sink = Arc::new(RecordingSink::default());
    let mut poller = poller(Arc::clone(&source), Arc::clone(&sink));

    poller.poll_cycle().await;

    assert!(sink.sent().is_empty());
    assert_eq!(poller.watermark("r/Python"), None);
}

#[tokio::test]
async fn sink_failure_does_not_stop_the_cycle() {
    let source = Arc::new(ScriptedSource::default());
    source.script_probe("r/Python", "120");
    source.script_probe("r/Python", "140");
    source.script_page("r/Python", vec![post("2"), post("1")]);
    source.script_page("r/Python", vec![post("3"), post("2")]);

    let sink = Arc::new(FailingSink);
    let mut poller = poller(Arc::clone(&source), sink);

    poller.poll_cycle().await;
    poller.poll_cycle().await;

    // Best-effort delivery: the send was rejected but the watermark still
    // advanced.
    assert_eq!(poller.watermark("r/Python"), Some(3));
}

fn scheduler<S: MessageSink>(
    source: Arc<ScriptedSource>,
    sink: Arc<S>,
    subreddits: Vec<&str>,
    primary: &str,
) -> DigestScheduler<ScriptedSource, S> {
    DigestScheduler::new(
        source,
        sink,
        CHANNEL,
        subreddits.into_iter().map(str::to_string).collect(),
        primary.to_string(),
    )
}

#[tokio::test]
async fn digest_message_summarizes_top_posts() {
    let source = Arc::new(ScriptedSource::default());
    source.script_top("r/Python", vec![post("9"), post("8")]);

    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(source, Arc::clone(&sink), vec!["r/Python"], "r/Python");

    scheduler.digest_cycle().await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("This week's top r/Python posts have arrived!"));
    assert!(sent[0].contains("post 9"));
    assert!(sent[0].contains("| 10 upvotes | 3 comments | u/tester | r/Python |"));
}

#[tokio::test]
async fn digest_rotates_pins_oldest_first() {
    let source = Arc::new(ScriptedSource::default());
    source.script_top("r/Python", vec![post("9")]);

    // Five existing pins, newest first; "1" is the oldest.
    let sink = Arc::new(RecordingSink::with_pins(vec!["5", "4", "3", "2", "1"]));
    let scheduler = scheduler(source, Arc::clone(&sink), vec!["r/Python"], "r/Python");

    scheduler.digest_cycle().await;

    assert_eq!(sink.unpinned(), vec!["1"]);
    let pins = sink.pins();
    assert_eq!(pins.len(), 5);
    assert_eq!(pins[0], "m1");
}

#[tokio::test]
async fn digest_only_pins_for_the_primary_subreddit() {
    let source = Arc::new(ScriptedSource::default());
    source.script_top("r/rust", vec![post("9")]);

    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(source, Arc::clone(&sink), vec!["r/rust"], "r/Python");

    scheduler.digest_cycle().await;

    assert_eq!(sink.sent().len(), 1);
    assert!(sink.pins().is_empty());
}

#[tokio::test]
async fn primary_subreddit_match_is_case_insensitive() {
    let source = Arc::new(ScriptedSource::default());
    source.script_top("r/Python", vec![post("9")]);

    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(source, Arc::clone(&sink), vec!["r/Python"], "r/python");

    scheduler.digest_cycle().await;

    assert_eq!(sink.pins(), vec!["m1"]);
}

#[tokio::test]
async fn empty_digest_sends_notice_and_skips_pinning() {
    let source = Arc::new(ScriptedSource::default());

    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(source, Arc::clone(&sink), vec!["r/Python"], "r/Python");

    scheduler.digest_cycle().await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("couldn't find any posts from r/Python"));
    assert!(sink.pins().is_empty());
}
