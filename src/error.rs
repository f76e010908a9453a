use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZoomError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid run: {0}")]
    InvalidRun(String),

    #[error("API returned status {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    #[error("Page size {requested} is out of range (1..={max})")]
    InvalidPageSize { requested: u32, max: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Task cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl ZoomError {
    /// True when this error, or anything it wraps, is a cooperative cancellation.
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        err.chain()
            .any(|cause| matches!(cause.downcast_ref::<ZoomError>(), Some(ZoomError::Cancelled)))
    }
}
