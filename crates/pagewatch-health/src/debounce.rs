//! Notification debounce engine.
//!
//! Keeps one `NotificationRecord` per failing check and decides, each poll,
//! whether that check should page now.
//!
//! ```text
//! Unseen ──first sighting──▶ Grace (count 0)
//! Grace ──elapsed ≥ grace──▶ Notify ──▶ Escalated (count ≥ 1)
//! Escalated ──elapsed > escalation_interval──▶ Escalate (count + 1)
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use tracing::debug;

use pagewatch_core::{CheckKey, GraceMode, HealthCheck, PagewatchConfig};

/// Thresholds for the debounce state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Suppression window after a check is first seen failing.
    pub grace: Duration,
    /// Hold time between escalations of a check that keeps failing.
    pub escalation_interval: Duration,
    pub grace_mode: GraceMode,
    /// Cycles a record may go unseen before `sweep` drops it. Zero keeps
    /// records for the process lifetime.
    pub retention_cycles: u64,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            escalation_interval: Duration::from_secs(3600),
            grace_mode: GraceMode::Escalate,
            retention_cycles: 240,
        }
    }
}

impl DebouncePolicy {
    pub fn from_config(config: &PagewatchConfig) -> Self {
        Self {
            grace: config.grace,
            escalation_interval: config.escalation_interval,
            grace_mode: config.grace_mode,
            retention_cycles: config.retention_cycles,
        }
    }
}

/// Per-check debounce history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRecord {
    /// When the check was first seen failing, or last escalated.
    pub since: Instant,
    /// Number of escalations recorded so far.
    pub escalations: u32,
    /// Poll cycle in which the check was last seen failing.
    pub last_seen_cycle: u64,
}

/// Outcome of evaluating one failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First time this check is seen failing; never paged.
    FirstSeen,
    /// Still inside the grace period or the escalation hold.
    Hold,
    /// The first failure outlived the grace period.
    Notify,
    /// An escalated check stayed failing past the escalation interval.
    Escalate,
}

impl Decision {
    /// Whether the caller should page for this decision.
    pub fn should_page(self) -> bool {
        matches!(self, Decision::Notify | Decision::Escalate)
    }
}

/// Owned debounce state, keyed by check identity.
#[derive(Debug, Default)]
pub struct DebounceEngine {
    policy: DebouncePolicy,
    records: HashMap<CheckKey, NotificationRecord>,
    cycle: u64,
}

impl DebounceEngine {
    pub fn new(policy: DebouncePolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
            cycle: 0,
        }
    }

    pub fn policy(&self) -> &DebouncePolicy {
        &self.policy
    }

    /// Start a new poll cycle. Records touched from now on are stamped
    /// with the returned cycle number.
    pub fn begin_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.cycle
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Evaluate a failing check at `now`, updating its record.
    pub fn decide(&mut self, check: &HealthCheck, now: Instant) -> Decision {
        let policy = self.policy;
        let cycle = self.cycle;

        let record = match self.records.entry(check.key()) {
            Entry::Vacant(slot) => {
                // A first failure might be a deployment in progress.
                slot.insert(NotificationRecord {
                    since: now,
                    escalations: 0,
                    last_seen_cycle: cycle,
                });
                debug!(check = %check.key(), "first failure observed, holding");
                return Decision::FirstSeen;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        record.last_seen_cycle = cycle;
        let elapsed = now.saturating_duration_since(record.since);
        let grace_over = record.escalations == 0 && elapsed >= policy.grace;

        match policy.grace_mode {
            GraceMode::Escalate if grace_over => {
                record.since = now;
                record.escalations = 1;
                Decision::Notify
            }
            GraceMode::Repeat if grace_over && elapsed <= policy.escalation_interval => {
                Decision::Notify
            }
            _ if elapsed > policy.escalation_interval => {
                record.since = now;
                record.escalations += 1;
                Decision::Escalate
            }
            _ => Decision::Hold,
        }
    }

    /// `true` when the check is already notified (or still in grace) and
    /// must not page now.
    pub fn is_notified(&mut self, check: &HealthCheck, now: Instant) -> bool {
        !self.decide(check, now).should_page()
    }

    /// Drop records that have not been seen failing within the retention
    /// window. Returns the number of records removed.
    pub fn sweep(&mut self) -> usize {
        let retention = self.policy.retention_cycles;
        if retention == 0 {
            return 0;
        }

        let cycle = self.cycle;
        let before = self.records.len();
        self.records
            .retain(|_, record| cycle.saturating_sub(record.last_seen_cycle) <= retention);
        let evicted = before - self.records.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.records.len(), "swept recovered checks");
        }
        evicted
    }

    pub fn record(&self, key: &CheckKey) -> Option<&NotificationRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
