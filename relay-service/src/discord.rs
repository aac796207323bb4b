use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use subrelay_core::SinkError;

use crate::sink::MessageSink;

const API_BASE_URL: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
struct MessageRef {
    id: String,
}

/// Thin Discord REST sink: message delivery plus pin maintenance.
pub struct DiscordSink {
    http: reqwest::Client,
    bot_token: String,
}

impl DiscordSink {
    pub fn new(bot_token: String) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SinkError::Transport {
                details: error.to_string(),
            })?;

        Ok(Self { http, bot_token })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<String, SinkError> {
        let response = self
            .http
            .post(format!("{}/channels/{}/messages", API_BASE_URL, channel_id))
            .header(AUTHORIZATION, self.auth_header())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|error| SinkError::Transport {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SinkError::SendRejected {
                channel: channel_id,
                reason: format!("status {}", response.status()),
            });
        }

        let message: MessageRef =
            response
                .json()
                .await
                .map_err(|error| SinkError::Transport {
                    details: error.to_string(),
                })?;

        debug!("Delivered message {} to channel {}", message.id, channel_id);
        Ok(message.id)
    }

    async fn pinned_messages(&self, channel_id: u64) -> Result<Vec<String>, SinkError> {
        let response = self
            .http
            .get(format!("{}/channels/{}/pins", API_BASE_URL, channel_id))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|error| SinkError::Transport {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SinkError::PinFailed {
                channel: channel_id,
                reason: format!("listing pins failed with status {}", response.status()),
            });
        }

        // Discord lists pins newest first, which is the order the trait
        // promises.
        let pins: Vec<MessageRef> =
            response
                .json()
                .await
                .map_err(|error| SinkError::Transport {
                    details: error.to_string(),
                })?;

        Ok(pins.into_iter().map(|message| message.id).collect())
    }

    async fn pin_message(&self, channel_id: u64, message_id: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .put(format!(
                "{}/channels/{}/pins/{}",
                API_BASE_URL, channel_id, message_id
            ))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|error| SinkError::Transport {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SinkError::PinFailed {
                channel: channel_id,
                reason: format!("pinning {} failed with status {}", message_id, response.status()),
            });
        }

        Ok(())
    }

    async fn unpin_message(&self, channel_id: u64, message_id: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .delete(format!(
                "{}/channels/{}/pins/{}",
                API_BASE_URL, channel_id, message_id
            ))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|error| SinkError::Transport {
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SinkError::PinFailed {
                channel: channel_id,
                reason: format!(
                    "unpinning {} failed with status {}",
                    message_id,
                    response.status()
                ),
            });
        }

        Ok(())
    }
}
