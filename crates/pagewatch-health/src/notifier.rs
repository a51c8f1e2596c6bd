//! Pages for the failing checks the debounce engine lets through.

use std::time::Instant;

use tracing::{debug, error, info};

use pagewatch_client::PagerClient;
use pagewatch_core::HealthCheck;

use crate::debounce::{DebounceEngine, Decision};

/// Counters for one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Checks the engine approved for paging.
    pub approved: usize,
    /// Incidents the pager accepted.
    pub paged: usize,
    /// Trigger calls that failed.
    pub page_errors: usize,
}

/// Run every failing check through the engine and page the approved ones.
///
/// The engine records an escalation before the pager is called, so a
/// failed trigger is not retried until the next escalation is due.
pub async fn notify<P>(
    engine: &mut DebounceEngine,
    pager: &P,
    failing: &[HealthCheck],
    now: Instant,
) -> NotifyOutcome
where
    P: PagerClient + ?Sized,
{
    let mut outcome = NotifyOutcome::default();

    for check in failing {
        let decision = engine.decide(check, now);
        if !decision.should_page() {
            debug!(check = %check.key(), ?decision, "notification suppressed");
            continue;
        }
        outcome.approved += 1;

        let description = check.description();
        let escalation = decision == Decision::Escalate;
        match pager.trigger(&description).await {
            Ok(incident_key) => {
                outcome.paged += 1;
                info!(
                    service = %check.service_name,
                    check = %check.check_id,
                    %incident_key,
                    escalation,
                    "new incident submitted to pager"
                );
            }
            Err(e) => {
                outcome.page_errors += 1;
                error!(
                    service = %check.service_name,
                    check = %check.check_id,
                    error = %e,
                    "failed to trigger incident"
                );
            }
        }
    }

    outcome
}
