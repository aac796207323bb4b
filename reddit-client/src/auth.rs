use std::sync::Arc;
use std::time::{Duration, SystemTime};

use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use subrelay_core::{ApiError, RelayError};

/// Access tokens are valid for one hour; refreshing just under that window
/// keeps an in-flight fetch from ever racing an expiring token.
pub const TOKEN_REFRESH_PERIOD: Duration = Duration::from_secs(59 * 60);

const AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(3600);

/// The credential owned by [`RedditAuth`]. Other components only ever see
/// read-only snapshots of the access token.
#[derive(Debug, Clone)]
pub struct BearerCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: SystemTime,
}

impl BearerCredential {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }
}

/// OAuth2 token lifecycle manager: one client-credentials bootstrap at
/// startup, then a periodic refresh for process lifetime.
pub struct RedditAuth {
    oauth: BasicClient,
    credential: RwLock<Option<BearerCredential>>,
}

impl RedditAuth {
    pub fn new(client_id: String, client_secret: String) -> Result<Self, RelayError> {
        let auth_url = AuthUrl::new(AUTHORIZE_URL.to_string()).map_err(|error| {
            RelayError::Internal {
                message: format!("invalid authorize URL: {}", error),
            }
        })?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).map_err(|error| {
            RelayError::Internal {
                message: format!("invalid token URL: {}", error),
            }
        })?;

        let oauth = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth,
            credential: RwLock::new(None),
        })
    }

    /// One-time client-credentials exchange, requesting a permanent-duration
    /// refresh token. A failure here is fatal for the whole subsystem: no
    /// polling loop may start without a credential.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let response = self
            .oauth
            .exchange_client_credentials()
            .add_extra_param("duration", "permanent")
            .request_async(async_http_client)
            .await
            .map_err(|error| ApiError::AuthenticationFailed {
                reason: error.to_string(),
            })?;

        let refresh_token = response
            .refresh_token()
            .map(|token| token.secret().clone())
            .ok_or_else(|| ApiError::AuthenticationFailed {
                reason: "token endpoint granted no refresh token".to_string(),
            })?;

        *self.credential.write().await = Some(BearerCredential {
            access_token: response.access_token().secret().clone(),
            refresh_token,
            expires_at: SystemTime::now()
                + response.expires_in().unwrap_or(DEFAULT_TOKEN_VALIDITY),
        });

        info!("Reddit token bootstrap complete");
        Ok(())
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// On failure the previous credential stays in place; a single failed
    /// refresh is recoverable in a way that a failed bootstrap is not.
    pub async fn refresh(&self) -> Result<(), RelayError> {
        let refresh_token = {
            let guard = self.credential.read().await;
            guard
                .as_ref()
                .map(|credential| credential.refresh_token.clone())
                .ok_or(ApiError::MissingToken)?
        };

        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|error| ApiError::RefreshFailed {
                reason: error.to_string(),
            })?;

        *self.credential.write().await = Some(BearerCredential {
            access_token: response.access_token().secret().clone(),
            // Reddit only rotates the refresh token when it chooses to.
            refresh_token: response
                .refresh_token()
                .map(|token| token.secret().clone())
                .unwrap_or(refresh_token),
            expires_at: SystemTime::now()
                + response.expires_in().unwrap_or(DEFAULT_TOKEN_VALIDITY),
        });

        debug!("Reddit access token refreshed");
        Ok(())
    }

    /// Read-only snapshot of the current access token; `None` until
    /// [`initialize`](Self::initialize) has succeeded.
    pub async fn bearer_token(&self) -> Option<String> {
        self.credential
            .read()
            .await
            .as_ref()
            .map(|credential| credential.access_token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Periodic refresh for process lifetime. The first interval tick fires
    /// immediately and is consumed, since the bootstrap token is still fresh.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut timer = interval(TOKEN_REFRESH_PERIOD);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            timer.tick().await;
            if let Err(error) = self.refresh().await {
                warn!("Token refresh failed, keeping previous token: {}", error);
            }
        }
    }
}
