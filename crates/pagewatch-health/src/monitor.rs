//! Poll loop — drives aggregation, debounce and paging on a fixed period.
//!
//! Everything runs sequentially on the caller's task. A slow cycle delays
//! the next tick instead of overlapping with it, so the debounce engine
//! never sees concurrent decisions for the same check.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use pagewatch_client::{PagerClient, RegistryClient};

use crate::aggregator::collect_failing_checks;
use crate::debounce::{DebounceEngine, DebouncePolicy};
use crate::notifier::notify;

/// Summary of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    /// Non-passing checks returned by the registry.
    pub failing: usize,
    /// Checks the debounce engine approved for paging.
    pub approved: usize,
    /// Incidents the pager accepted.
    pub paged: usize,
    pub page_errors: usize,
    /// Debounce records dropped by the retention sweep.
    pub evicted: usize,
    /// Debounce records still held after the cycle.
    pub tracked: usize,
}

/// Owns the collaborators and the debounce state for the process lifetime.
pub struct Monitor<R, P> {
    registry: R,
    pager: P,
    engine: DebounceEngine,
    interval: Duration,
}

impl<R, P> Monitor<R, P>
where
    R: RegistryClient,
    P: PagerClient,
{
    pub fn new(registry: R, pager: P, policy: DebouncePolicy, interval: Duration) -> Self {
        Self {
            registry,
            pager,
            engine: DebounceEngine::new(policy),
            interval,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn pager(&self) -> &P {
        &self.pager
    }

    pub fn engine(&self) -> &DebounceEngine {
        &self.engine
    }

    /// Run one full pipeline pass as of `now`.
    pub async fn run_cycle(&mut self, now: Instant) -> CycleReport {
        let cycle = self.engine.begin_cycle();
        let failing = collect_failing_checks(&self.registry).await;
        let outcome = notify(&mut self.engine, &self.pager, &failing, now).await;
        let evicted = self.engine.sweep();

        let report = CycleReport {
            cycle,
            failing: failing.len(),
            approved: outcome.approved,
            paged: outcome.paged,
            page_errors: outcome.page_errors,
            evicted,
            tracked: self.engine.len(),
        };
        debug!(?report, "poll cycle complete");
        report
    }

    /// Poll every `interval` until `shutdown` flips.
    ///
    /// The first cycle runs one full interval after start. An interval that
    /// is zero or too large to schedule is logged and the loop never starts.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let start = match tokio::time::Instant::now().checked_add(self.interval) {
            Some(start) if !self.interval.is_zero() => start,
            _ => {
                error!(interval = ?self.interval, "poll interval cannot be scheduled");
                return;
            }
        };

        let policy = self.engine.policy();
        info!(
            interval_secs = self.interval.as_secs(),
            grace_secs = policy.grace.as_secs(),
            escalation_secs = policy.escalation_interval.as_secs(),
            grace_mode = ?policy.grace_mode,
            "monitor started"
        );

        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(Instant::now()).await;
                }
                _ = shutdown.changed() => {
                    info!("monitor shutting down");
                    break;
                }
            }
        }
    }
}
