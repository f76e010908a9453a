use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};

use crate::client::{PageRequest, collect_all};
use crate::harness::{LogBuffer, RunContext, WorkUnit};

/// Permission required by the `/report` endpoints.
pub const REPORT_PERMISSION: &str = "Report:Read:Admin";

const PAGE_SIZE: u32 = 300;
const MAX_MEETINGS: usize = 300;
const LOOKBACK_DAYS: u64 = 28;

/// Past meetings of the last four weeks and the participants of the most recent one.
///
/// Skips itself, successfully, when the account cannot read reports.
#[derive(Debug, Default)]
pub struct ReportsSuite {
    /// Fixed "today", for tests. `None` means the current UTC date.
    pub today: Option<NaiveDate>,
}

#[async_trait]
impl WorkUnit for ReportsSuite {
    async fn run(&self, ctx: &RunContext, log: &mut LogBuffer) -> Result<()> {
        if !ctx.has_permission(REPORT_PERMISSION) {
            log.line(format!("Skipped: {REPORT_PERMISSION} permission is missing"));
            return Ok(());
        }

        let to = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let from = to.checked_sub_days(Days::new(LOOKBACK_DAYS)).unwrap_or(to);
        let user_id = ctx.user().id.as_str();
        let client = &ctx.client;
        let cancel = &ctx.cancel;

        ctx.checkpoint()?;
        let mut meetings = collect_all(PAGE_SIZE, Some(MAX_MEETINGS), cancel, |page| async move {
            client.reports().meetings(user_id, from, to, &page, cancel).await
        })
        .await
        .with_context(|| format!("reading meeting report {from}..{to}"))?;
        log.line(format!("{} past meeting(s) between {from} and {to}", meetings.len()));

        meetings.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        let Some(latest) = meetings.first() else {
            return Ok(());
        };

        ctx.checkpoint()?;
        let participants = collect_all(PAGE_SIZE, None, cancel, |page: PageRequest| {
            let uuid = latest.uuid.as_str();
            async move { client.reports().meeting_participants(uuid, &page, cancel).await }
        })
        .await
        .with_context(|| format!("reading participants of {}", latest.uuid))?;

        log.line(format!(
            "\"{}\" had {} participant record(s)",
            latest.topic,
            participants.len()
        ));
        let minutes: i64 = participants.iter().filter_map(|p| p.duration).sum::<i64>() / 60;
        log.line(format!("  {minutes} attendee minute(s) in total"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::testing::context;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn skips_without_report_permission() {
        let server = MockServer::start().await;
        let ctx = context(&server, &["User:Read:Admin"]);
        let mut log = LogBuffer::new("Reports");

        ReportsSuite::default().run(&ctx, &mut log).await.unwrap();

        assert!(log.lines()[0].starts_with("Skipped"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_participants_of_latest_meeting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report/users/u-1/meetings"))
            .and(query_param("from", "2026-02-01"))
            .and(query_param("to", "2026-03-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page_size": 300,
                "next_page_token": "",
                "meetings": [
                    {"uuid": "old==", "id": 1, "topic": "Kickoff", "start_time": "2026-02-03T10:00:00Z"},
                    {"uuid": "new==", "id": 2, "topic": "Retro", "start_time": "2026-02-27T10:00:00Z"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/report/meetings/new%3D%3D/participants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page_size": 300,
                "next_page_token": "",
                "participants": [
                    {"name": "Ana", "duration": 1800},
                    {"name": "Bruno", "duration": 1200}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server, &[REPORT_PERMISSION]);
        let suite = ReportsSuite {
            today: NaiveDate::from_ymd_opt(2026, 3, 1),
        };
        let mut log = LogBuffer::new("Reports");
        suite.run(&ctx, &mut log).await.unwrap();

        assert_eq!(log.lines()[0], "2 past meeting(s) between 2026-02-01 and 2026-03-01");
        assert_eq!(log.lines()[1], "\"Retro\" had 2 participant record(s)");
        assert_eq!(log.lines()[2], "  50 attendee minute(s) in total");
    }
}
