use async_trait::async_trait;

use subrelay_core::SinkError;

/// Where relayed messages land.
///
/// Implementations are best-effort: callers log failures and move on, there
/// is no retry queue for rejected sends.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message; returns the platform-assigned message id.
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<String, SinkError>;

    /// Currently pinned messages, newest pin first.
    async fn pinned_messages(&self, channel_id: u64) -> Result<Vec<String>, SinkError>;

    async fn pin_message(&self, channel_id: u64, message_id: &str) -> Result<(), SinkError>;

    async fn unpin_message(&self, channel_id: u64, message_id: &str) -> Result<(), SinkError>;
}
