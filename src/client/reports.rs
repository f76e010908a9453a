use chrono::{Months, NaiveDate};
use tokio_util::sync::CancellationToken;

use crate::error::ZoomError;

use super::http::{ZoomClient, encode_meeting_id};
use super::pagination::{Page, PageRequest, parse_page};
use super::types::{Participant, ReportMeeting};

pub struct Reports<'a> {
    client: &'a ZoomClient,
}

impl<'a> Reports<'a> {
    pub(crate) fn new(client: &'a ZoomClient) -> Self {
        Self { client }
    }

    /// Past meetings hosted by `user_id` between `from` and `to`, both inclusive.
    ///
    /// The API accepts ranges of at most one month.
    pub async fn meetings(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<ReportMeeting>, ZoomError> {
        validate_range(from, to)?;
        let mut query = page.to_query()?;
        query.push(("from", from.format("%Y-%m-%d").to_string()));
        query.push(("to", to.format("%Y-%m-%d").to_string()));
        let path = format!("/report/users/{}/meetings", urlencoding::encode(user_id));
        let body = self.client.get_json(&path, &query, cancel).await?;
        parse_page(body, "meetings")
    }

    pub async fn meeting_participants(
        &self,
        meeting_id: &str,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page<Participant>, ZoomError> {
        let query = page.to_query()?;
        let path = format!("/report/meetings/{}/participants", encode_meeting_id(meeting_id));
        let body = self.client.get_json(&path, &query, cancel).await?;
        parse_page(body, "participants")
    }
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), ZoomError> {
    if to < from {
        return Err(ZoomError::InvalidArgument(format!(
            "report range ends ({to}) before it starts ({from})"
        )));
    }
    if from.checked_add_months(Months::new(1)).is_some_and(|limit| to > limit) {
        return Err(ZoomError::InvalidArgument(format!(
            "report range {from}..{to} is longer than one month"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::client::{ClientOptions, RetryConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_validation() {
        assert!(validate_range(date(2024, 1, 1), date(2024, 1, 1)).is_ok());
        assert!(validate_range(date(2024, 1, 15), date(2024, 2, 15)).is_ok());
        assert!(validate_range(date(2024, 1, 15), date(2024, 2, 16)).is_err());
        assert!(validate_range(date(2024, 2, 1), date(2024, 1, 31)).is_err());
    }

    #[tokio::test]
    async fn meetings_report_sends_dates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report/users/me/meetings"))
            .and(query_param("from", "2024-03-01"))
            .and(query_param("to", "2024-03-31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page_size": 30,
                "total_records": 1,
                "next_page_token": "",
                "meetings": [{"uuid": "u==", "id": 1, "topic": "Retro", "duration": 30}]
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

        let page = client
            .reports()
            .meetings(
                "me",
                date(2024, 3, 1),
                date(2024, 3, 31),
                &PageRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(page.records[0].topic, "Retro");
    }
}
