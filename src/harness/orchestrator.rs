//! Runs work units with a bounded number of them active at once.
//!
//! Units are admitted in input order as slots free up, each in its own task.
//! A unit's log block is flushed before its outcome is recorded, and the run
//! only returns after every task has joined.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::ZoomClient;
use crate::error::ZoomError;

use super::console::Console;
use super::context::{IdentitySource, RunContext};
use super::outcome::{CANCELLED_MESSAGE, Outcome, ResultCode};
use super::unit::{LogBuffer, UnitDescriptor};

pub struct Orchestrator {
    client: Arc<ZoomClient>,
    console: Arc<Console>,
}

impl Orchestrator {
    pub fn new(client: Arc<ZoomClient>, console: Arc<Console>) -> Self {
        Self { client, console }
    }

    /// Runs `units` against the identity the client authenticates as.
    pub async fn run(
        &self,
        units: Vec<UnitDescriptor>,
        concurrency_limit: usize,
        cancel: CancellationToken,
    ) -> Result<Vec<Outcome>, ZoomError> {
        let client = self.client.clone();
        self.run_with(client.as_ref(), units, concurrency_limit, cancel)
            .await
    }

    /// Runs `units`, resolving the shared identity through `source`.
    ///
    /// Returns one outcome per unit, sorted by name. Errors only when the
    /// arguments are invalid or identity resolution fails, in which case no
    /// unit has run.
    pub async fn run_with<S: IdentitySource>(
        &self,
        source: &S,
        units: Vec<UnitDescriptor>,
        concurrency_limit: usize,
        cancel: CancellationToken,
    ) -> Result<Vec<Outcome>, ZoomError> {
        validate(&units, concurrency_limit)?;

        let identity = source.resolve_identity(&cancel).await?;
        info!(
            user = %identity.user.display_name(),
            permissions = identity.permissions.len(),
            units = units.len(),
            concurrency_limit,
            "starting run"
        );
        let ctx = Arc::new(RunContext {
            client: self.client.clone(),
            identity,
            cancel: cancel.clone(),
        });

        let names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();
        let slots = Arc::new(Semaphore::new(concurrency_limit));
        let mut tasks = JoinSet::new();
        let mut skipped = Vec::new();

        let mut pending = units.into_iter();
        while let Some(unit) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = slots.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                skipped.push(unit);
                skipped.extend(pending.by_ref());
                break;
            };

            debug!(unit = %unit.name, "admitted");
            let ctx = ctx.clone();
            let console = self.console.clone();
            tasks.spawn(async move {
                let outcome = execute(&ctx, &console, unit).await;
                drop(permit);
                outcome
            });
        }

        let mut outcomes = Vec::with_capacity(names.len());
        for unit in skipped {
            debug!(unit = %unit.name, "not started, run cancelled");
            let mut log = LogBuffer::new(&unit.name);
            log.line(cancel_marker());
            self.console.flush(&log).await;
            outcomes.push(Outcome::cancelled(unit.name));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "unit task did not complete"),
            }
        }

        for name in names {
            if !outcomes.iter().any(|o| o.name == name) {
                outcomes.push(Outcome::failure(name, "unit task aborted"));
            }
        }

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(outcomes)
    }
}

fn validate(units: &[UnitDescriptor], concurrency_limit: usize) -> Result<(), ZoomError> {
    if units.is_empty() {
        return Err(ZoomError::InvalidRun("no units to run".into()));
    }
    if concurrency_limit == 0 {
        return Err(ZoomError::InvalidRun("concurrency limit must be at least 1".into()));
    }
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            return Err(ZoomError::InvalidRun(format!("unit `{}` appears twice", unit.name)));
        }
    }
    Ok(())
}

async fn execute(ctx: &RunContext, console: &Console, unit: UnitDescriptor) -> Outcome {
    let mut log = LogBuffer::new(&unit.name);

    let result = AssertUnwindSafe(unit.unit.run(ctx, &mut log))
        .catch_unwind()
        .await;

    let outcome = match result {
        Ok(Ok(())) => Outcome::success(&unit.name),
        Ok(Err(err)) if ZoomError::is_cancellation(&err) => {
            log.line(cancel_marker());
            Outcome::cancelled(&unit.name)
        }
        Ok(Err(err)) => {
            let message = err.root_cause().to_string();
            log.line(format!("!! Error: {err:#}"));
            Outcome::failure(&unit.name, message)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            log.line(format!("!! Panicked: {message}"));
            Outcome::failure(&unit.name, message)
        }
    };

    console.flush(&log).await;
    match outcome.code {
        ResultCode::Failure => info!(unit = %outcome.name, result = %outcome.code, message = %outcome.message, "unit finished"),
        _ => info!(unit = %outcome.name, result = %outcome.code, "unit finished"),
    }
    outcome
}

fn cancel_marker() -> String {
    format!("!! {CANCELLED_MESSAGE}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit panicked".to_string()
    }
}
