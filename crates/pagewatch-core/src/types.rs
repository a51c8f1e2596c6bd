//! Domain types shared by the registry client, the debounce engine and
//! the notifier.
//!
//! Field names follow the Consul health API (`PascalCase` JSON) so that
//! registry responses deserialize straight into these types.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ── Check status ──────────────────────────────────────────────────

/// Status reported by the registry for a single health check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
    /// Any status string the registry reports that we don't model.
    Other(String),
}

impl CheckStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CheckStatus::Passing => "passing",
            CheckStatus::Warning => "warning",
            CheckStatus::Critical => "critical",
            CheckStatus::Maintenance => "maintenance",
            CheckStatus::Other(s) => s,
        }
    }

    /// Only the exact `passing` status counts as healthy.
    pub fn is_passing(&self) -> bool {
        matches!(self, CheckStatus::Passing)
    }
}

impl From<String> for CheckStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "passing" => CheckStatus::Passing,
            "warning" => CheckStatus::Warning,
            "critical" => CheckStatus::Critical,
            "maintenance" => CheckStatus::Maintenance,
            _ => CheckStatus::Other(s),
        }
    }
}

impl From<&str> for CheckStatus {
    fn from(s: &str) -> Self {
        CheckStatus::from(s.to_string())
    }
}

impl From<CheckStatus> for String {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Health check ──────────────────────────────────────────────────

/// Stable identity of a health probe across polls.
///
/// Built from the registry's identifying fields, never from the record
/// itself: every poll returns freshly decoded checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckKey {
    /// Node the check runs on.
    pub node: String,
    /// Service instance the check is bound to; empty for node-level checks.
    pub service_id: String,
    /// Check identifier, unique per node.
    pub check_id: String,
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.node, self.service_id, self.check_id)
    }
}

/// A single health check as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    /// Node the check runs on.
    #[serde(default)]
    pub node: String,
    /// Check identifier, unique per node.
    #[serde(rename = "CheckID")]
    pub check_id: String,
    /// Human-readable check name.
    #[serde(default)]
    pub name: String,
    /// Latest reported status.
    pub status: CheckStatus,
    /// Output of the last probe run, used as the page body.
    #[serde(default)]
    pub output: String,
    /// Service instance the check belongs to; empty for node-level checks.
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    /// Logical service name, used as the page prefix.
    #[serde(default)]
    pub service_name: String,
}

impl HealthCheck {
    pub fn key(&self) -> CheckKey {
        CheckKey {
            node: self.node.clone(),
            service_id: self.service_id.clone(),
            check_id: self.check_id.clone(),
        }
    }

    pub fn is_passing(&self) -> bool {
        self.status.is_passing()
    }

    /// Incident description sent to the pager: `<service> => <output>`.
    pub fn description(&self) -> String {
        format!("{} => {}", self.service_name, self.output)
    }
}

// ── Services ──────────────────────────────────────────────────────

/// Service catalog: service name → tags, in the order the registry
/// returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Services(Vec<(String, Vec<String>)>);

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a service, replacing the tags of an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, tags: Vec<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = tags,
            None => self.0.push((name, tags)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn tags(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tags)| tags.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<String>)> for Services {
    fn from_iter<I: IntoIterator<Item = (N, Vec<String>)>>(iter: I) -> Self {
        let mut services = Services::new();
        for (name, tags) in iter {
            services.insert(name, tags);
        }
        services
    }
}

impl<'de> Deserialize<'de> for Services {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ServicesVisitor;

        impl<'de> Visitor<'de> for ServicesVisitor {
            type Value = Services;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of service name to tag list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Services, A::Error> {
                let mut services = Services::new();
                while let Some((name, tags)) = map.next_entry::<String, Option<Vec<String>>>()? {
                    services.insert(name, tags.unwrap_or_default());
                }
                Ok(services)
            }
        }

        deserializer.deserialize_map(ServicesVisitor)
    }
}

// ── Grace mode ────────────────────────────────────────────────────

/// What happens once a first failure outlives the grace period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraceMode {
    /// Notify once, record it as the first escalation, then hold until
    /// the escalation interval elapses.
    #[default]
    Escalate,
    /// Notify on every poll after the grace period until the escalation
    /// interval takes over.
    Repeat,
}

impl std::str::FromStr for GraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "escalate" => Ok(GraceMode::Escalate),
            "repeat" => Ok(GraceMode::Repeat),
            other => Err(other.to_string()),
        }
    }
}
