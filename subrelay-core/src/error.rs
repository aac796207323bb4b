use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Reddit API error: {0}")]
    Api(#[from] ApiError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("No OAuth token available")]
    MissingToken,

    #[error("Unexpected response from {route}: status {status}, content type {content_type}")]
    UnexpectedResponse {
        route: String,
        status: u16,
        content_type: String,
    },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Request failed: {details}")]
    RequestFailed { details: String },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Message send rejected by channel {channel}: {reason}")]
    SendRejected { channel: u64, reason: String },

    #[error("Pin maintenance failed in channel {channel}: {reason}")]
    PinFailed { channel: u64, reason: String },

    #[error("Sink transport error: {details}")]
    Transport { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}
