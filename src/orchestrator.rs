use crate::clock::Clock;
use crate::comparator::{VersionCheck, VersionComparator};
use crate::guard::RefreshLoopGuard;
use crate::navigation::{cache_bust_value, cache_busted_url, Navigator};
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where the startup update check stands, as the UI sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    Idle,
    Checking,
    /// Terminal. Client is current, or the check could not tell.
    NoActionNeeded,
    /// Terminal. This session already reloaded once for the running version.
    Blocked,
    /// Terminal. The updating notice is up; a reload may have been issued.
    Updating,
}

impl UpdatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoActionNeeded | Self::Blocked | Self::Updating)
    }
}

/// Summary of one orchestrator pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub phase: UpdatePhase,
    pub check: Option<VersionCheck>,
    /// Location handed to the navigator, when a reload was issued.
    pub navigated_to: Option<String>,
}

impl UpdateReport {
    fn terminal(phase: UpdatePhase, check: Option<VersionCheck>) -> Self {
        Self {
            phase,
            check,
            navigated_to: None,
        }
    }
}

/// Runs the startup update check once and reloads a stale client at most once.
pub struct UpdateOrchestrator {
    comparator: VersionComparator,
    guard: RefreshLoopGuard,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    update_delay: Duration,
    started: AtomicBool,
    mounted: AtomicBool,
    phase: watch::Sender<UpdatePhase>,
}

impl UpdateOrchestrator {
    pub fn new(
        comparator: VersionComparator,
        guard: RefreshLoopGuard,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        update_delay: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(UpdatePhase::Idle);
        Self {
            comparator,
            guard,
            navigator,
            clock,
            update_delay,
            started: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
            phase,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UpdatePhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> UpdatePhase {
        *self.phase.borrow()
    }

    /// Stop publishing phase changes. An in-flight check still completes,
    /// but its verdict is discarded: no guard writes, no navigation.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn publish(&self, phase: UpdatePhase) {
        if !self.mounted.load(Ordering::SeqCst) {
            debug!("Dropping {phase:?} transition, view unmounted");
            return;
        }
        self.phase.send_replace(phase);
    }

    /// One pass of the update state machine. Later calls do not re-enter.
    pub async fn run(&self) -> UpdateReport {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Update check already started");
            return UpdateReport::terminal(self.phase(), None);
        }

        self.publish(UpdatePhase::Checking);

        let check = match AssertUnwindSafe(self.comparator.check_version())
            .catch_unwind()
            .await
        {
            Ok(check) => check,
            Err(_) => {
                error!("Update check panicked, continuing without it");
                self.publish(UpdatePhase::NoActionNeeded);
                return UpdateReport::terminal(UpdatePhase::NoActionNeeded, None);
            }
        };

        if !self.mounted.load(Ordering::SeqCst) {
            debug!("View unmounted during update check, discarding verdict");
            return UpdateReport::terminal(UpdatePhase::NoActionNeeded, Some(check));
        }

        let report = self.act_on(check).await;
        info!("Update check finished: {:?}", report.phase);
        report
    }

    async fn act_on(&self, check: VersionCheck) -> UpdateReport {
        let running = match (check.needs_refresh, &check.running_version) {
            (true, Some(running)) => running.clone(),
            _ => {
                self.guard.clear_global();
                if let Some(running) = &check.running_version {
                    self.guard.clear_for(running.as_str());
                }
                self.publish(UpdatePhase::NoActionNeeded);
                return UpdateReport::terminal(UpdatePhase::NoActionNeeded, Some(check));
            }
        };

        if self.guard.has_already_handled(running.as_str()) {
            warn!("Already reloaded once for {running} this session, not reloading again");
            self.publish(UpdatePhase::Blocked);
            return UpdateReport::terminal(UpdatePhase::Blocked, Some(check));
        }

        self.guard.mark_handled(running.as_str());
        self.publish(UpdatePhase::Updating);

        // let the notice paint before the page goes away
        tokio::time::sleep(self.update_delay).await;

        if !self.guard.can_attempt() {
            warn!("A reload happened moments ago, skipping navigation");
            return UpdateReport::terminal(UpdatePhase::Updating, Some(check));
        }
        self.guard.record_attempt();

        let target = cache_busted_url(
            &self.navigator.current_url(),
            &cache_bust_value(self.clock.as_ref()),
        );
        info!("Reloading stale client {running} via {target}");

        let navigated_to = match self.navigator.replace(&target) {
            Ok(()) => Some(target),
            Err(e) => {
                error!("Navigation to {target} failed: {e}");
                None
            }
        };

        UpdateReport {
            phase: UpdatePhase::Updating,
            check: Some(check),
            navigated_to,
        }
    }
}
