use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::client::{UserStatus, collect_all};
use crate::harness::{LogBuffer, RunContext, WorkUnit};

const PAGE_SIZE: u32 = 30;
const MAX_USERS: usize = 90;

/// Walks the active user list and re-reads the current user by id.
#[derive(Debug, Default)]
pub struct UsersSuite;

#[async_trait]
impl WorkUnit for UsersSuite {
    async fn run(&self, ctx: &RunContext, log: &mut LogBuffer) -> Result<()> {
        let me = ctx.user();
        log.line(format!("Signed in as {} <{}>", me.display_name(), me.email));

        ctx.checkpoint()?;
        let client = &ctx.client;
        let cancel = &ctx.cancel;
        let users = collect_all(PAGE_SIZE, Some(MAX_USERS), cancel, |page| async move {
            client.users().list(UserStatus::Active, &page, cancel).await
        })
        .await
        .context("listing active users")?;
        log.line(format!("{} active user(s)", users.len()));
        for user in users.iter().take(5) {
            log.line(format!("  {} ({})", user.display_name(), user.id));
        }

        ctx.checkpoint()?;
        let again = client
            .users()
            .get(&me.id, cancel)
            .await
            .with_context(|| format!("loading user {}", me.id))?;
        if again.id != me.id {
            bail!("user lookup returned {} instead of {}", again.id, me.id);
        }
        log.line(format!("Lookup by id matches ({})", again.id));
        Ok(())
    }
}
