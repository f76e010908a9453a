//! Access-token lifecycle shared by every request of a run.
//!
//! - tokens are reused until they are about to expire
//! - concurrent callers that see an expired token share a single rotation
//! - a token rejected by the API (HTTP 401) is rotated once, keyed on the rejected value
//! - every OAuth rotation is handed to the registered [`TokenRefreshHandler`]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::ZoomError;

use super::credentials::{Credentials, OAuthGrant};
use super::jwt;
use super::store::{TokenRefreshHandler, TokenRotation};

/// Tokens closer than this to expiry are rotated before use.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Lifetime of locally signed JWTs.
const JWT_LIFETIME_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    /// `None` when the token came from the environment and its expiry is unknown;
    /// it is used until the API rejects it.
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|at| at - Duration::seconds(EXPIRY_MARGIN_SECONDS) > now)
    }
}

#[derive(Debug, Default)]
struct TokenState {
    access: Option<AccessToken>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Hands out access tokens, rotating them when needed.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    state: RwLock<TokenState>,
    rotation: Mutex<()>,
    handler: Option<Arc<dyn TokenRefreshHandler>>,
    rotations: AtomicU64,
}

impl TokenProvider {
    pub fn new(
        http: reqwest::Client,
        oauth_base_url: &str,
        credentials: Credentials,
        handler: Option<Arc<dyn TokenRefreshHandler>>,
    ) -> Self {
        let state = match &credentials {
            Credentials::Jwt { .. } => TokenState::default(),
            Credentials::OAuth(OAuthGrant::RefreshToken {
                refresh_token,
                access_token,
                ..
            }) => TokenState {
                access: access_token.clone().map(|value| AccessToken {
                    value,
                    expires_at: None,
                }),
                refresh_token: Some(refresh_token.clone()),
            },
            Credentials::OAuth(OAuthGrant::ServerToServer { access_token, .. }) => TokenState {
                access: access_token.clone().map(|value| AccessToken {
                    value,
                    expires_at: None,
                }),
                refresh_token: None,
            },
        };

        Self {
            http,
            token_url: format!("{}/oauth/token", oauth_base_url.trim_end_matches('/')),
            credentials,
            state: RwLock::new(state),
            rotation: Mutex::new(()),
            handler,
            rotations: AtomicU64::new(0),
        }
    }

    /// Returns a usable access token, rotating first if the current one expired.
    pub async fn access_token(&self) -> Result<String, ZoomError> {
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }

        let _guard = self.rotation.lock().await;
        // Someone else may have rotated while we waited for the lock.
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }
        self.rotate().await
    }

    /// Called after the API answered 401 for `rejected`.
    ///
    /// Rotates unless another caller already replaced that token, in which case
    /// the replacement is returned.
    pub async fn replace_rejected(&self, rejected: &str) -> Result<String, ZoomError> {
        let _guard = self.rotation.lock().await;
        {
            let state = self.state.read().await;
            if let Some(current) = &state.access
                && current.value != rejected
                && current.is_usable(Utc::now())
            {
                return Ok(current.value.clone());
            }
        }
        self.rotate().await
    }

    /// Number of rotations performed since construction.
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    async fn usable_token(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .access
            .as_ref()
            .filter(|t| t.is_usable(Utc::now()))
            .map(|t| t.value.clone())
    }

    // Callers hold `self.rotation`.
    async fn rotate(&self) -> Result<String, ZoomError> {
        let (access, rotation) = match &self.credentials {
            Credentials::Jwt {
                api_key,
                api_secret,
            } => {
                let expires_at = Utc::now() + Duration::minutes(JWT_LIFETIME_MINUTES);
                let value = jwt::sign(api_key, api_secret, expires_at)?;
                (
                    AccessToken {
                        value,
                        expires_at: Some(expires_at),
                    },
                    None,
                )
            }
            Credentials::OAuth(grant) => {
                let (access, rotation) = self.request_oauth_token(grant).await?;
                (access, Some(rotation))
            }
        };

        {
            let mut state = self.state.write().await;
            state.access = Some(access.clone());
            if let Some(refresh) = rotation.as_ref().and_then(|r| r.refresh_token.clone()) {
                state.refresh_token = Some(refresh);
            }
        }
        let count = self.rotations.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(rotation) = &rotation {
            info!(rotation = count, "access token rotated");
            self.persist(rotation);
        } else {
            debug!(rotation = count, "signed new JWT");
        }
        Ok(access.value)
    }

    async fn request_oauth_token(
        &self,
        grant: &OAuthGrant,
    ) -> Result<(AccessToken, TokenRotation), ZoomError> {
        let previous_refresh_token = self.state.read().await.refresh_token.clone();

        let (client_id, client_secret, form, account_id) = match grant {
            OAuthGrant::RefreshToken {
                client_id,
                client_secret,
                ..
            } => {
                let refresh = previous_refresh_token
                    .clone()
                    .ok_or_else(|| ZoomError::TokenRequest("no refresh token available".into()))?;
                (
                    client_id,
                    client_secret,
                    vec![("grant_type", "refresh_token".to_string()), ("refresh_token", refresh)],
                    None,
                )
            }
            OAuthGrant::ServerToServer {
                client_id,
                client_secret,
                account_id,
                ..
            } => (
                client_id,
                client_secret,
                vec![
                    ("grant_type", "account_credentials".to_string()),
                    ("account_id", account_id.clone()),
                ],
                Some(account_id.clone()),
            ),
        };

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ZoomError::TokenRequest(format!("status {status}: {message}")));
        }

        let body = response.json::<TokenResponse>().await?;
        let access = AccessToken {
            value: body.access_token.clone(),
            expires_at: Some(Utc::now() + Duration::seconds(body.expires_in)),
        };
        let rotation = TokenRotation {
            previous_refresh_token,
            refresh_token: body.refresh_token,
            access_token: body.access_token,
            account_id,
        };
        Ok((access, rotation))
    }

    fn persist(&self, rotation: &TokenRotation) {
        let Some(handler) = &self.handler else {
            return;
        };
        // Handlers may do blocking I/O; keep it off the other tasks' worker.
        let multi_thread = Handle::try_current()
            .is_ok_and(|h| h.runtime_flavor() == RuntimeFlavor::MultiThread);
        let result = if multi_thread {
            tokio::task::block_in_place(|| handler.on_token_rotated(rotation))
        } else {
            handler.on_token_rotated(rotation)
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist rotated token, continuing with the new one");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refresh_grant(access_token: Option<&str>) -> Credentials {
        Credentials::OAuth(OAuthGrant::RefreshToken {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh-1".into(),
            access_token: access_token.map(String::from),
        })
    }

    fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "access_token": access,
            "token_type": "bearer",
            "refresh_token": refresh,
            "expires_in": 3600,
            "scope": "user:read"
        })
    }

    fn counting_handler(seen: Arc<AtomicUsize>) -> Arc<dyn TokenRefreshHandler> {
        Arc::new(move |_: &TokenRotation| -> anyhow::Result<()> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn provided_access_token_is_used_without_rotation() {
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            refresh_grant(Some("initial")),
            None,
        );
        assert_eq!(provider.access_token().await.unwrap(), "initial");
        assert_eq!(provider.rotation_count(), 0);
    }

    #[tokio::test]
    async fn jwt_tokens_are_signed_once_and_cached() {
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Credentials::Jwt {
                api_key: "key".into(),
                api_secret: "secret".into(),
            },
            None,
        );
        let first = provider.access_token().await.unwrap();
        let second = provider.access_token().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.rotation_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_expired_callers_share_one_rotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body("access-2", Some("refresh-2")))
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let persisted = Arc::new(AtomicUsize::new(0));
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            refresh_grant(None),
            Some(counting_handler(persisted.clone())),
        );

        let (a, b) = tokio::join!(provider.access_token(), provider.access_token());
        assert_eq!(a.unwrap(), "access-2");
        assert_eq!(b.unwrap(), "access-2");
        assert_eq!(provider.rotation_count(), 1);
        assert_eq!(persisted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_used_next_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", Some("refresh-2"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("refresh_token=refresh-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-3", Some("refresh-3"))))
            .expect(1)
            .mount(&server)
            .await;

        let provider = TokenProvider::new(reqwest::Client::new(), &server.uri(), refresh_grant(None), None);
        assert_eq!(provider.access_token().await.unwrap(), "access-2");
        assert_eq!(provider.replace_rejected("access-2").await.unwrap(), "access-3");
    }

    #[tokio::test]
    async fn stale_rejection_reuses_newer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", Some("refresh-2"))))
            .expect(1)
            .mount(&server)
            .await;

        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            refresh_grant(Some("access-1")),
            None,
        );
        // Two requests both failed with access-1; only the first rotates.
        let first = provider.replace_rejected("access-1").await.unwrap();
        let second = provider.replace_rejected("access-1").await.unwrap();
        assert_eq!(first, "access-2");
        assert_eq!(second, "access-2");
        assert_eq!(provider.rotation_count(), 1);
    }

    #[tokio::test]
    async fn handler_failure_does_not_fail_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", Some("refresh-2"))))
            .mount(&server)
            .await;

        let failing: Arc<dyn TokenRefreshHandler> =
            Arc::new(|_: &TokenRotation| -> anyhow::Result<()> { anyhow::bail!("disk full") });
        let provider = TokenProvider::new(reqwest::Client::new(), &server.uri(), refresh_grant(None), Some(failing));

        assert_eq!(provider.access_token().await.unwrap(), "access-2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_store_persists_rotation_on_worker_runtime() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", Some("refresh-2"))))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = crate::auth::FileTokenStore::new(dir.path().join("tokens.toml"));
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            refresh_grant(None),
            Some(Arc::new(store.clone())),
        );

        assert_eq!(provider.access_token().await.unwrap(), "access-2");
        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(stored.access_token, "access-2");
    }

    #[tokio::test]
    async fn server_to_server_sends_account_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=account_credentials"))
            .and(body_string_contains("account_id=acct-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("s2s-access", None)))
            .expect(1)
            .mount(&server)
            .await;

        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_in_handler = seen.clone();
        let handler: Arc<dyn TokenRefreshHandler> = Arc::new(move |r: &TokenRotation| -> anyhow::Result<()> {
            *seen_in_handler.lock().unwrap() = Some(r.clone());
            Ok(())
        });
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            Credentials::OAuth(OAuthGrant::ServerToServer {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                account_id: "acct-9".into(),
                access_token: None,
            }),
            Some(handler),
        );

        assert_eq!(provider.access_token().await.unwrap(), "s2s-access");
        let rotation = seen.lock().unwrap().clone().unwrap();
        assert_eq!(rotation.account_id.as_deref(), Some("acct-9"));
        assert!(rotation.refresh_token.is_none());
    }

    #[tokio::test]
    async fn token_endpoint_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let provider = TokenProvider::new(reqwest::Client::new(), &server.uri(), refresh_grant(None), None);
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, ZoomError::TokenRequest(msg) if msg.contains("invalid_client")));
    }
}
