use crate::clock::{Clock, SystemClock};
use crate::comparator::{EntryFetcher, HttpEntryFetcher, VersionComparator};
use crate::config::ReconcileConfig;
use crate::document::{HtmlDocument, LiveDocument};
use crate::error::AppError;
use crate::guard::RefreshLoopGuard;
use crate::navigation::{HostNavigator, Navigator, RecordingNavigator};
use crate::orchestrator::{UpdateOrchestrator, UpdateReport};
use crate::source::{self, TagReconciliation};
use crate::storage::{FileStorage, SessionStorage};
use crate::token::BuildVersionStamp;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the startup update check against a deployed site.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Entry document the client is currently running from
    #[arg(long)]
    pub html: PathBuf,
    /// Site URL; the current location and the base for the entry fetch
    #[arg(long)]
    pub site: String,
    /// Session storage file (defaults to the local data dir)
    #[arg(long)]
    pub session_file: Option<PathBuf>,
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Report the reload target instead of handing it to the shell
    #[arg(long)]
    pub dry_run: bool,
}

/// Ports one startup pass runs against.
pub struct StartupPorts {
    pub document: Arc<dyn LiveDocument>,
    pub fetcher: Arc<dyn EntryFetcher>,
    pub storage: Arc<dyn SessionStorage>,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub tag: TagReconciliation,
    pub update: UpdateReport,
}

/// Repair the live version tag, then run the update state machine once.
pub async fn startup(
    ports: StartupPorts,
    stamp: &BuildVersionStamp,
    config: &ReconcileConfig,
) -> StartupReport {
    let tag = source::reconcile_live_version_tag(ports.document.as_ref(), stamp);

    let comparator = VersionComparator::new(ports.document, ports.fetcher);
    let guard = RefreshLoopGuard::new(ports.storage, ports.clock.clone(), config);
    let orchestrator = UpdateOrchestrator::new(
        comparator,
        guard,
        ports.navigator,
        ports.clock,
        config.update_delay(),
    );

    StartupReport {
        tag,
        update: orchestrator.run().await,
    }
}

pub async fn execute(args: CheckArgs) -> Result<(), AppError> {
    let config = ReconcileConfig::load(args.config.as_deref())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let session_file = match args.session_file {
        Some(path) => path,
        None => FileStorage::default_path()?,
    };
    let navigator: Arc<dyn Navigator> = if args.dry_run {
        Arc::new(RecordingNavigator::new(args.site.clone()))
    } else {
        Arc::new(HostNavigator::new(args.site.clone()))
    };

    let ports = StartupPorts {
        document: Arc::new(HtmlDocument::open(&args.html)?),
        fetcher: Arc::new(HttpEntryFetcher::new(&args.site, &config, clock.clone())?),
        storage: Arc::new(FileStorage::new(session_file)),
        navigator,
        clock,
    };

    let report = startup(ports, BuildVersionStamp::compiled(), &config).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
