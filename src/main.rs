mod cli;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use ui::RunProgress;
use zoomkit::auth::{Credentials, FileTokenStore, TokenRefreshHandler};
use zoomkit::client::{ClientOptions, ZoomClient};
use zoomkit::config::ZoomkitConfig;
use zoomkit::harness::{Console, Orchestrator, ResultCode, summarize};
use zoomkit::suites::default_registry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ResultCode::Failure.exit_code()
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "zoomkit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn execute(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::List => {
            for name in default_registry()?.names() {
                println!("{name}");
            }
            Ok(ResultCode::Success.exit_code())
        }
        Command::Run {
            concurrency,
            only,
            no_pause,
            json,
        } => {
            if let Err(e) = dotenvy::dotenv() {
                debug!(error = %e, "no .env file loaded");
            }
            let config = ZoomkitConfig::load()?;
            let concurrency_limit = concurrency.unwrap_or(config.concurrency_limit);

            let client = connect(&config)?;
            let units = default_registry()?.build(&only)?;

            let interactive = Term::stdout().is_term();
            let progress = if interactive {
                RunProgress::start(units.len())
            } else {
                RunProgress::hidden(units.len())
            };
            let console = Arc::new(Console::new(progress.clone()));

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling remaining suites");
                    trigger.cancel();
                }
            });

            let orchestrator = Orchestrator::new(Arc::new(client), console);
            let outcomes = orchestrator.run(units, concurrency_limit, cancel).await;
            progress.finish();
            let outcomes = outcomes.context("run aborted before any suite started")?;

            let (text, code) = summarize(&outcomes, config.name_width);
            ui::print_summary(&text, code);
            if json {
                ui::print_json(&outcomes);
            }

            if config.pause_on_exit && !no_pause && interactive {
                let _ = tokio::task::spawn_blocking(ui::wait_for_key).await;
            }
            Ok(code.exit_code())
        }
    }
}

/// Builds the client from the environment, preferring tokens saved by an earlier run.
fn connect(config: &ZoomkitConfig) -> Result<ZoomClient> {
    let mut credentials = Credentials::from_env()?;

    let mut handler: Option<Arc<dyn TokenRefreshHandler>> = None;
    if let Some(path) = &config.token_store
        && credentials.is_rotating()
    {
        let store = FileTokenStore::new(path);
        if let Some(stored) = store
            .load()
            .with_context(|| format!("failed to read token store {}", path.display()))?
        {
            debug!(rotated_at = %stored.rotated_at, "using persisted tokens");
            credentials.apply_stored(&stored);
        }
        handler = Some(Arc::new(store));
    }

    let options = ClientOptions {
        api_base_url: config.api_base_url.clone(),
        oauth_base_url: config.oauth_base_url.clone(),
        retry: config.retry_config(),
    };
    Ok(ZoomClient::with_options(options, credentials, handler)?)
}
