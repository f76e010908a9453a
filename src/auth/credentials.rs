use std::fmt;

use crate::error::ZoomError;

use super::store::StoredTokens;

/// How the client authenticates against the API.
#[derive(Clone)]
pub enum Credentials {
    /// Fixed key/secret pair. Tokens are signed locally and never persisted.
    Jwt { api_key: String, api_secret: String },
    /// OAuth app whose access token rotates during the run.
    OAuth(OAuthGrant),
}

/// The OAuth flows that can mint a new access token without user interaction.
#[derive(Clone)]
pub enum OAuthGrant {
    /// Authorization-code app holding a refresh token. Every rotation also
    /// replaces the refresh token.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        access_token: Option<String>,
    },
    /// Server-to-server app bound to one account.
    ServerToServer {
        client_id: String,
        client_secret: String,
        account_id: String,
        access_token: Option<String>,
    },
}

impl Credentials {
    /// Reads credentials from the process environment.
    pub fn from_env() -> Result<Self, ZoomError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Reads credentials through `lookup`, which maps a variable name to its value.
    ///
    /// `ZOOM_CONNECTION` selects `oauth` or `jwt`. When unset, OAuth wins if a
    /// client id is present, otherwise a JWT key pair is expected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ZoomError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| ZoomError::Config(format!("missing environment variable {key}")))
        };

        let connection = lookup("ZOOM_CONNECTION").map(|c| c.to_ascii_lowercase());
        let use_oauth = match connection.as_deref() {
            Some("oauth") => true,
            Some("jwt") => false,
            Some(other) => {
                return Err(ZoomError::Config(format!(
                    "ZOOM_CONNECTION must be `oauth` or `jwt`, got `{other}`"
                )));
            }
            None if lookup("ZOOM_OAUTH_CLIENTID").is_some() => true,
            None if lookup("ZOOM_APIKEY").is_some() => false,
            None => {
                return Err(ZoomError::Config(
                    "no credentials found: set ZOOM_OAUTH_CLIENTID or ZOOM_APIKEY".into(),
                ));
            }
        };

        if !use_oauth {
            return Ok(Credentials::Jwt {
                api_key: require("ZOOM_APIKEY")?,
                api_secret: require("ZOOM_APISECRET")?,
            });
        }

        let client_id = require("ZOOM_OAUTH_CLIENTID")?;
        let client_secret = require("ZOOM_OAUTH_CLIENTSECRET")?;
        let access_token = lookup("ZOOM_OAUTH_ACCESSTOKEN");

        let grant = match lookup("ZOOM_OAUTH_ACCOUNTID") {
            Some(account_id) => OAuthGrant::ServerToServer {
                client_id,
                client_secret,
                account_id,
                access_token,
            },
            None => OAuthGrant::RefreshToken {
                client_id,
                client_secret,
                refresh_token: require("ZOOM_OAUTH_REFRESHTOKEN")?,
                access_token,
            },
        };
        Ok(Credentials::OAuth(grant))
    }

    /// Overrides the environment's tokens with the ones persisted by a previous run.
    pub fn apply_stored(&mut self, stored: &StoredTokens) {
        match self {
            Credentials::Jwt { .. } => {}
            Credentials::OAuth(OAuthGrant::RefreshToken {
                refresh_token,
                access_token,
                ..
            }) => {
                if let Some(stored_refresh) = &stored.refresh_token {
                    *refresh_token = stored_refresh.clone();
                }
                *access_token = Some(stored.access_token.clone());
            }
            Credentials::OAuth(OAuthGrant::ServerToServer {
                account_id,
                access_token,
                ..
            }) => {
                if stored.account_id.as_deref().is_none_or(|id| id == account_id) {
                    *access_token = Some(stored.access_token.clone());
                }
            }
        }
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self, Credentials::OAuth(_))
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Jwt { api_key, .. } => {
                f.debug_struct("Jwt").field("api_key", api_key).finish_non_exhaustive()
            }
            Credentials::OAuth(OAuthGrant::RefreshToken { client_id, .. }) => f
                .debug_struct("OAuthRefreshToken")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::OAuth(OAuthGrant::ServerToServer {
                client_id,
                account_id,
                ..
            }) => f
                .debug_struct("OAuthServerToServer")
                .field("client_id", client_id)
                .field("account_id", account_id)
                .finish_non_exhaustive(),
        }
    }
}
