use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Descriptive client identifier sent with every Reddit request, in the
/// format the platform asks for.
pub const USER_AGENT: &str = "linux:subrelay:v0.1.0 (by /u/subrelay)";

const DEFAULT_SUBREDDIT: &str = "r/Python";
const DEFAULT_REQUEST_DELAY_SECS: u64 = 60;

/// Startup configuration, loaded once from the process environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub client_id: String,
    pub client_secret: String,
    pub bot_token: String,
    /// Channel all relayed posts and digests are delivered to.
    pub channel_id: u64,
    /// Ordered list of monitored subreddits.
    pub subreddits: Vec<String>,
    /// Delay between new-post polling cycles.
    pub request_delay: Duration,
    /// Subreddit whose weekly digests get pinned.
    pub primary_subreddit: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel_raw = require(&get, "RELAY_CHANNEL_ID")?;
        let channel_id =
            channel_raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "RELAY_CHANNEL_ID".to_string(),
                    value: channel_raw.clone(),
                })?;

        let request_delay = match get("RELAY_REQUEST_DELAY_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    field: "RELAY_REQUEST_DELAY_SECS".to_string(),
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
        };

        let subreddits = match get("RELAY_SUBREDDITS") {
            Some(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "RELAY_SUBREDDITS".to_string(),
                        value: raw,
                    });
                }
                parsed
            }
            None => vec![DEFAULT_SUBREDDIT.to_string()],
        };

        Ok(Self {
            client_id: require(&get, "REDDIT_CLIENT_ID")?,
            client_secret: require(&get, "REDDIT_CLIENT_SECRET")?,
            bot_token: require(&get, "DISCORD_BOT_TOKEN")?,
            channel_id,
            subreddits,
            request_delay,
            primary_subreddit: get("RELAY_PRIMARY_SUBREDDIT")
                .unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string()),
        })
    }
}

fn require<F>(get: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
            var_name: name.to_string(),
        })
}
