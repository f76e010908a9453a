use tokio_util::sync::CancellationToken;

use crate::error::ZoomError;

use super::http::{ZoomClient, encode_meeting_id};
use super::pagination::{Page, PageRequest, parse_page};
use super::types::{Meeting, MeetingListType, Participant};

pub struct Meetings<'a> {
    client: &'a ZoomClient,
}

impl<'a> Meetings<'a> {
    pub(crate) fn new(client: &'a ZoomClient) -> Self {
        Self { client }
    }

    /// Meetings hosted by `user_id` (`"me"` for the current user).
    pub async fn list(
        &self,
        user_id: &str,
        kind: MeetingListType,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<Meeting>, ZoomError> {
        let mut query = page.to_query()?;
        query.push(("type", kind.as_str().to_string()));
        let path = format!("/users/{}/meetings", urlencoding::encode(user_id));
        let body = self.client.get_json(&path, &query, cancel).await?;
        parse_page(body, "meetings")
    }

    pub async fn get(&self, meeting_id: u64, cancel: &CancellationToken) -> Result<Meeting, ZoomError> {
        self.client
            .get_json(&format!("/meetings/{meeting_id}"), &[], cancel)
            .await
    }

    /// Participants of a finished meeting instance, identified by its UUID.
    pub async fn past_participants(
        &self,
        meeting_uuid: &str,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<Participant>, ZoomError> {
        let query = page.to_query()?;
        let path = format!("/past_meetings/{}/participants", encode_meeting_id(meeting_uuid));
        let body = self.client.get_json(&path, &query, cancel).await?;
        parse_page(body, "participants")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::client::{ClientOptions, RetryConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ZoomClient {
        ZoomClient::with_options(
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
        .unwrap()
    }

    #[tokio::test]
    async fn list_scheduled_meetings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/meetings"))
            .and(query_param("type", "scheduled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page_size": 30,
                "total_records": 1,
                "next_page_token": "",
                "meetings": [{
                    "id": 85746065432u64,
                    "uuid": "abc==",
                    "topic": "Standup",
                    "type": 2,
                    "start_time": "2024-05-01T09:00:00Z",
                    "duration": 15
                }]
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .meetings()
            .list("me", MeetingListType::Scheduled, &PageRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(page.is_last());
        assert_eq!(page.records[0].topic, "Standup");
        assert_eq!(page.records[0].meeting_type, 2);
    }

    #[tokio::test]
    async fn past_participants_follow_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/past_meetings/abc%3D%3D/participants"))
            .and(query_param("next_page_token", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page_size": 1,
                "next_page_token": "",
                "participants": [{"name": "Bo", "user_email": "bo@example.com"}]
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .meetings()
            .past_participants("abc==", &PageRequest::first(1).next("p2"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(page.records[0].name, "Bo");
    }
}
