use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{Credentials, TokenProvider, TokenRefreshHandler};
use crate::error::ZoomError;

use super::meetings::Meetings;
use super::reports::Reports;
use super::retry::RetryConfig;
use super::users::Users;

const API_URL: &str = "https://api.zoom.us/v2";
const OAUTH_URL: &str = "https://zoom.us";

/// Longest single backoff, whatever `Retry-After` asks for.
const MAX_BACKOFF_MS: u64 = 5 * 60 * 1000;

/// API error code for a malformed or expired `next_page_token`.
const INVALID_PARAMETER_CODE: i64 = 300;

/// Endpoint and retry settings for [`ZoomClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub retry: RetryConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: API_URL.to_string(),
            oauth_base_url: OAUTH_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Authenticated connection shared by every work unit of a run.
pub struct ZoomClient {
    client: Client,
    base_url: String,
    tokens: TokenProvider,
    retry: RetryConfig,
}

impl ZoomClient {
    pub fn new(
        credentials: Credentials,
        handler: Option<Arc<dyn TokenRefreshHandler>>,
    ) -> Result<Self, ZoomError> {
        Self::with_options(ClientOptions::default(), credentials, handler)
    }

    /// Create a client with custom endpoints (useful for testing).
    pub fn with_options(
        options: ClientOptions,
        credentials: Credentials,
        handler: Option<Arc<dyn TokenRefreshHandler>>,
    ) -> Result<Self, ZoomError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        let tokens = TokenProvider::new(client.clone(), &options.oauth_base_url, credentials, handler);
        Ok(Self {
            client,
            base_url: options.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            retry: options.retry,
        })
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn meetings(&self) -> Meetings<'_> {
        Meetings::new(self)
    }

    pub fn reports(&self) -> Reports<'_> {
        Reports::new(self)
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// GET `path` and decode the JSON body.
    ///
    /// A 401 triggers one token rotation and a retry; 429 is retried with
    /// exponential backoff. Every wait races `cancel`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ZoomError> {
        let url = format!("{}{}", self.base_url, path);
        if cancel.is_cancelled() {
            return Err(ZoomError::Cancelled);
        }
        // Rotation is never raced against `cancel`: dropping it halfway could
        // lose a refresh token the server already consumed.
        let mut token = self.tokens.access_token().await?;
        let mut reauthenticated = false;
        let mut attempt: u32 = 0;

        loop {
            let request = self.client.get(&url).bearer_auth(&token).query(query).send();
            let response = cancellable(cancel, request).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                debug!(%url, "access token rejected, rotating");
                token = self.tokens.replace_rejected(&token).await?;
                reauthenticated = true;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_ms = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs.saturating_mul(1000).min(MAX_BACKOFF_MS))
                    .unwrap_or(self.retry.base_delay_ms);
                attempt += 1;
                if attempt > self.retry.max_retries {
                    return Err(ZoomError::RateLimited { retry_after_ms });
                }
                let delay_ms = self
                    .retry
                    .delay_for_attempt(attempt)
                    .max(retry_after_ms)
                    .min(MAX_BACKOFF_MS);
                warn!(%url, attempt, delay_ms, "rate limited, backing off");
                cancellable(cancel, async {
                    sleep(Duration::from_millis(delay_ms)).await;
                    Ok::<(), ZoomError>(())
                })
                .await?;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(api_error(status, &text));
            }

            let body = cancellable(cancel, response.json::<T>()).await?;
            return Ok(body);
        }
    }
}

/// Resolves `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<F, T, E>(cancel: &CancellationToken, fut: F) -> Result<T, ZoomError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ZoomError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ZoomError::Cancelled),
        out = fut => out.map_err(Into::into),
    }
}

fn api_error(status: StatusCode, text: &str) -> ZoomError {
    let body = serde_json::from_str::<ApiErrorBody>(text).ok();
    let code = body.as_ref().and_then(|b| b.code);
    let message = body
        .and_then(|b| b.message)
        .unwrap_or_else(|| if text.is_empty() { status.to_string() } else { text.to_string() });

    if code == Some(INVALID_PARAMETER_CODE) && message.to_ascii_lowercase().contains("page token") {
        return ZoomError::InvalidPageToken(message);
    }
    ZoomError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Encodes a meeting id or UUID for use as a path segment.
///
/// UUIDs that start with `/` or contain `//` must be encoded twice.
pub(crate) fn encode_meeting_id(id: &str) -> String {
    let once = urlencoding::encode(id).into_owned();
    if id.starts_with('/') || id.contains("//") {
        urlencoding::encode(&once).into_owned()
    } else {
        once
    }
}
