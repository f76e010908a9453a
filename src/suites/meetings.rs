use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::client::{MeetingListType, PageRequest};
use crate::harness::{LogBuffer, RunContext, WorkUnit};

const PAGE_SIZE: u32 = 30;

/// Lists the current user's scheduled meetings and reloads the first one.
#[derive(Debug, Default)]
pub struct MeetingsSuite;

#[async_trait]
impl WorkUnit for MeetingsSuite {
    async fn run(&self, ctx: &RunContext, log: &mut LogBuffer) -> Result<()> {
        ctx.checkpoint()?;
        let page = ctx
            .client
            .meetings()
            .list("me", MeetingListType::Scheduled, &PageRequest::first(PAGE_SIZE), &ctx.cancel)
            .await
            .context("listing scheduled meetings")?;

        let total = page
            .total_records
            .map_or_else(|| page.records.len().to_string(), |t| t.to_string());
        log.line(format!("{} scheduled meeting(s) on the first page, {total} in total", page.records.len()));

        let Some(first) = page.records.first() else {
            log.line("Nothing to reload");
            return Ok(());
        };

        ctx.checkpoint()?;
        let meeting = ctx
            .client
            .meetings()
            .get(first.id, &ctx.cancel)
            .await
            .with_context(|| format!("loading meeting {}", first.id))?;
        if meeting.id != first.id {
            bail!("meeting lookup returned {} instead of {}", meeting.id, first.id);
        }
        log.line(format!("Reloaded \"{}\" ({})", meeting.topic, meeting.id));
        if let Some(url) = &meeting.join_url {
            log.line(format!("  join: {url}"));
        }
        Ok(())
    }
}
