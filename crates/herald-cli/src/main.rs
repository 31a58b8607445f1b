//! `herald` - runs the reminder scheduler against an in-memory store.
//!
//! ```text
//! herald [CONFIG] [--seed FILE]
//! ```
//!
//! CONFIG defaults to `herald.toml` (all defaults when absent). `--seed` loads a
//! JSON array of reminder drafts owned by one generated user. Notifications are
//! written to the log. Ctrl-C stops the loop and prints the final status as
//! JSON on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use herald_core::app::{HeraldConfig, ReminderService, SchedulerBuilder, ShutdownOutcome};
use herald_core::domain::ReminderDraft;
use herald_core::impls::{InMemoryReminderStore, LogNotifier};
use herald_core::ports::{Clock, IdGenerator, ReminderStore, SystemClock, UlidGenerator};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "herald.toml";

struct Args {
    config: PathBuf,
    seed: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut seed = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let path = args.next().context("--seed needs a file path")?;
                seed = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("usage: herald [CONFIG] [--seed FILE]");
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option '{flag}'"),
            path if config.is_none() => config = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument '{extra}'"),
        }
    }

    Ok(Args {
        config: config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
        seed,
    })
}

async fn seed_reminders(
    path: &Path,
    service: &ReminderService,
    ids: &dyn IdGenerator,
) -> anyhow::Result<usize> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    let drafts: Vec<ReminderDraft> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse seed file '{}'", path.display()))?;

    let owner = ids.generate_owner_id();
    let mut created = 0;
    for draft in drafts {
        let title = draft.title.clone();
        match service.create(owner, draft).await {
            Ok(_) => created += 1,
            Err(e) => warn!(%title, error = %e, "skipping seed reminder"),
        }
    }
    info!(owner_id = %owner, created, "seeded reminders");
    Ok(created)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let config = HeraldConfig::load(&args.config).map_err(|e| {
        tracing::error!(error = %e, "refusing to start");
        anyhow::anyhow!("invalid configuration: {e}")
    })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn ReminderStore> = Arc::new(InMemoryReminderStore::new(Arc::clone(&clock)));
    let notifier = LogNotifier::from_settings(&config.notifier)?;
    info!(from = notifier.from_address(), "using log notifier");

    let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
    let service = ReminderService::new(Arc::clone(&store), ids.clone(), Arc::clone(&clock));
    if let Some(seed) = &args.seed {
        seed_reminders(seed, &service, ids.as_ref()).await?;
    }

    let scheduler = SchedulerBuilder::new()
        .store(store)
        .notifier(Arc::new(notifier))
        .clock(clock)
        .config(config.scheduler)
        .build()?;
    let handle = scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested");

    let status_rx = handle.subscribe();
    match handle.stop().await {
        ShutdownOutcome::Graceful => info!("herald shut down cleanly"),
        ShutdownOutcome::Abandoned => warn!("herald shut down with a tick still running"),
    }

    let status = status_rx.borrow().clone();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
