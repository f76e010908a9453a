use tokio_util::sync::CancellationToken;

use crate::error::ZoomError;

use super::http::ZoomClient;
use super::pagination::{Page, PageRequest, parse_page};
use super::types::{PermissionsResponse, User, UserStatus};

pub struct Users<'a> {
    client: &'a ZoomClient,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a ZoomClient) -> Self {
        Self { client }
    }

    /// The user the credentials act as.
    pub async fn me(&self, cancel: &CancellationToken) -> Result<User, ZoomError> {
        self.client.get_json("/users/me", &[], cancel).await
    }

    pub async fn get(&self, user_id: &str, cancel: &CancellationToken) -> Result<User, ZoomError> {
        let path = format!("/users/{}", urlencoding::encode(user_id));
        self.client.get_json(&path, &[], cancel).await
    }

    pub async fn permissions(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ZoomError> {
        let path = format!("/users/{}/permissions", urlencoding::encode(user_id));
        let body: PermissionsResponse = self.client.get_json(&path, &[], cancel).await?;
        Ok(body.permissions)
    }

    pub async fn list(
        &self,
        status: UserStatus,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<User>, ZoomError> {
        let mut query = page.to_query()?;
        query.push(("status", status.as_str().to_string()));
        let body = self.client.get_json("/users", &query, cancel).await?;
        parse_page(body, "users")
    }
}
