use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{User, ZoomClient};
use crate::error::ZoomError;

/// Who the run acts as. Resolved once before any unit starts.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub permissions: BTreeSet<String>,
}

impl Identity {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Looks up the ambient identity for a run.
pub trait IdentitySource {
    async fn resolve_identity(&self, cancel: &CancellationToken) -> Result<Identity, ZoomError>;
}

impl IdentitySource for ZoomClient {
    async fn resolve_identity(&self, cancel: &CancellationToken) -> Result<Identity, ZoomError> {
        let user = self.users().me(cancel).await?;
        let permissions = self.users().permissions(&user.id, cancel).await?;
        Ok(Identity {
            user,
            permissions: permissions.into_iter().collect(),
        })
    }
}

/// State shared by every unit of a run.
pub struct RunContext {
    pub client: Arc<ZoomClient>,
    pub identity: Identity,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn user(&self) -> &User {
        &self.identity.user
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.identity.has_permission(permission)
    }

    /// Explicit suspension point: fails with [`ZoomError::Cancelled`] once the run is cancelled.
    pub fn checkpoint(&self) -> Result<(), ZoomError> {
        if self.cancel.is_cancelled() {
            Err(ZoomError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::client::{ClientOptions, RetryConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn client_resolves_user_and_permissions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u-42",
                "email": "owner@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u-42/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permissions": ["Report:Read:Admin", "User:Read:Admin"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ZoomClient::with_options(
            ClientOptions {
                api_base_url: server.uri(),
                oauth_base_url: server.uri(),
                retry: RetryConfig::default(),
            },
            Credentials::Jwt {
                api_key: "k".into(),
                api_secret: "s".into(),
            },
            None,
        )
        .unwrap();

        let identity = client.resolve_identity(&CancellationToken::new()).await.unwrap();
        assert_eq!(identity.user.id, "u-42");
        assert!(identity.has_permission("Report:Read:Admin"));
        assert!(!identity.has_permission("Meeting:Write"));
    }
}
