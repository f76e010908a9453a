use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ZoomError;

/// What changed when the provider minted a new access token.
#[derive(Clone)]
pub struct TokenRotation {
    pub previous_refresh_token: Option<String>,
    /// `None` for server-to-server apps, which have no refresh token.
    pub refresh_token: Option<String>,
    pub access_token: String,
    pub account_id: Option<String>,
}

impl fmt::Debug for TokenRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRotation")
            .field("refresh_token_rotated", &self.refresh_token.is_some())
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Persists rotated credentials somewhere the next run can find them.
///
/// Called synchronously while the rotation lock is held, so at most one call
/// is in flight. Errors are logged by the caller and never fail the request
/// that triggered the rotation.
pub trait TokenRefreshHandler: Send + Sync {
    fn on_token_rotated(&self, rotation: &TokenRotation) -> anyhow::Result<()>;
}

impl<F> TokenRefreshHandler for F
where
    F: Fn(&TokenRotation) -> anyhow::Result<()> + Send + Sync,
{
    fn on_token_rotated(&self, rotation: &TokenRotation) -> anyhow::Result<()> {
        self(rotation)
    }
}

/// On-disk shape written by [`FileTokenStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub account_id: Option<String>,
    pub rotated_at: DateTime<Utc>,
}

/// Keeps the latest tokens in a TOML file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Suffix on the whole file name, so it never equals `path` whatever its extension.
    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".partial");
        PathBuf::from(name)
    }

    /// Returns the stored tokens, or `None` when nothing was persisted yet.
    pub fn load(&self) -> Result<Option<StoredTokens>, ZoomError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    /// Writes through a sibling temp file so readers never see half a file.
    pub fn save(&self, tokens: &StoredTokens) -> Result<(), ZoomError> {
        let contents = toml::to_string(tokens)?;
        let tmp = self.partial_path();
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenRefreshHandler for FileTokenStore {
    fn on_token_rotated(&self, rotation: &TokenRotation) -> anyhow::Result<()> {
        // Keep the old refresh token if the server did not issue a new one.
        let refresh_token = rotation
            .refresh_token
            .clone()
            .or_else(|| rotation.previous_refresh_token.clone());
        self.save(&StoredTokens {
            refresh_token,
            access_token: rotation.access_token.clone(),
            account_id: rotation.account_id.clone(),
            rotated_at: Utc::now(),
        })?;
        Ok(())
    }
}
