//! pagewatch-health — the poll → debounce → page pipeline.
//!
//! # Architecture
//!
//! ```text
//! Monitor (fixed-period tick, single task)
//!   ├── collect_failing_checks()   registry → Vec<HealthCheck>, non-passing only
//!   ├── notify()
//!   │   ├── DebounceEngine::decide()   per CheckKey history
//!   │   └── PagerClient::trigger()     "<service> => <output>"
//!   └── DebounceEngine::sweep()        drop records unseen past retention
//! ```
//!
//! # Debounce policy
//!
//! A check is never paged the first time it is seen failing. Once its first
//! failure has lasted `grace` (30s by default) it pages; after that it is
//! held until `escalation_interval` (1h) passes without recovery, at which
//! point it pages again and the escalation count grows.

pub mod aggregator;
pub mod debounce;
pub mod monitor;
pub mod notifier;

pub use aggregator::collect_failing_checks;
pub use debounce::{DebounceEngine, DebouncePolicy, Decision, NotificationRecord};
pub use monitor::{CycleReport, Monitor};
pub use notifier::{NotifyOutcome, notify};
