//! Environment configuration for the Pagewatch daemon.
//!
//! There are no CLI flags and no config file: every setting comes from an
//! environment variable, with defaults for everything except the pager
//! service key.

use std::time::Duration;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::types::GraceMode;

pub const DEFAULT_REGISTRY_ADDR: &str = "localhost:8500";
pub const DEFAULT_PAGER_EVENTS_URL: &str =
    "https://events.pagerduty.com/generic/2010-04-15/create_event.json";

/// Largest accepted value for any duration setting (30 days).
pub const MAX_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

/// Fully resolved daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PagewatchConfig {
    /// Registry endpoint, `host:port` or a full `http://` URL.
    pub registry_addr: String,
    pub pager_service_key: String,
    pub pager_events_url: String,
    /// Scheduler period.
    pub poll_interval: Duration,
    /// Upper bound for every registry and pager call.
    pub request_timeout: Duration,
    /// How long a first failure is suppressed.
    pub grace: Duration,
    /// How long an escalated check is held before paging again.
    pub escalation_interval: Duration,
    /// Poll cycles a debounce record survives without being seen failing.
    /// Zero keeps records forever.
    pub retention_cycles: u64,
    pub grace_mode: GraceMode,
}

impl Default for PagewatchConfig {
    fn default() -> Self {
        Self {
            registry_addr: DEFAULT_REGISTRY_ADDR.to_string(),
            pager_service_key: String::new(),
            pager_events_url: DEFAULT_PAGER_EVENTS_URL.to_string(),
            poll_interval: Duration::from_secs(15),
            request_timeout: Duration::from_secs(5),
            grace: Duration::from_secs(30),
            escalation_interval: Duration::from_secs(3600),
            retention_cycles: 240,
            grace_mode: GraceMode::Escalate,
        }
    }
}

impl PagewatchConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = PagewatchConfig::default();

        match get("REGISTRY_ADDR").or_else(|| get("CONSUL_ADDR")) {
            Some(addr) => config.registry_addr = addr,
            None => info!("REGISTRY_ADDR is not set, using {DEFAULT_REGISTRY_ADDR}"),
        }

        config.pager_service_key = get("PAGER_SERVICE_KEY")
            .or_else(|| get("PAGERDUTY_SERVICE_KEY"))
            .ok_or(ConfigError::Missing("PAGER_SERVICE_KEY"))?;

        if let Some(url) = get("PAGER_EVENTS_URL") {
            config.pager_events_url = url;
        }

        let duration = |var: &'static str, default: Duration| -> ConfigResult<Duration> {
            match get(var) {
                Some(value) => match parse_duration(&value) {
                    Some(parsed) if parsed <= MAX_DURATION => Ok(parsed),
                    _ => Err(ConfigError::Invalid { var, value }),
                },
                None => Ok(default),
            }
        };
        config.poll_interval = duration("POLL_INTERVAL", config.poll_interval)?;
        config.request_timeout = duration("REQUEST_TIMEOUT", config.request_timeout)?;
        config.grace = duration("NOTIFY_GRACE", config.grace)?;
        config.escalation_interval = duration("ESCALATION_INTERVAL", config.escalation_interval)?;

        if config.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL",
                value: "0".to_string(),
            });
        }

        if let Some(value) = get("DEBOUNCE_RETENTION_CYCLES") {
            config.retention_cycles = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "DEBOUNCE_RETENTION_CYCLES",
                value,
            })?;
        }

        if let Some(value) = get("GRACE_MODE") {
            config.grace_mode = value.parse::<GraceMode>().map_err(|_| ConfigError::Invalid {
                var: "GRACE_MODE",
                value,
            })?;
        }

        Ok(config)
    }

    /// Registry base URL, adding the `http://` scheme to a bare `host:port`.
    pub fn registry_url(&self) -> String {
        let addr = self.registry_addr.trim_end_matches('/');
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }
}

/// Parse a duration string like "15s", "500ms", "2m", "1h".
///
/// A bare number is taken as seconds. Returns `None` for values that do not
/// fit in a `u64` number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<PagewatchConfig> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PagewatchConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn missing_service_key_is_an_error() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("PAGER_SERVICE_KEY")));
        assert_eq!(
            load(&[("PAGER_SERVICE_KEY", "  ")]),
            Err(ConfigError::Missing("PAGER_SERVICE_KEY"))
        );
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = load(&[("PAGER_SERVICE_KEY", "abc")]).unwrap();
        assert_eq!(config.pager_service_key, "abc");
        assert_eq!(config.registry_addr, "localhost:8500");
        assert_eq!(config.registry_url(), "http://localhost:8500");
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.grace, Duration::from_secs(30));
        assert_eq!(config.escalation_interval, Duration::from_secs(3600));
        assert_eq!(config.grace_mode, GraceMode::Escalate);
    }

    #[test]
    fn legacy_variable_names_are_accepted() {
        let config = load(&[
            ("CONSUL_ADDR", "consul.internal:8500"),
            ("PAGERDUTY_SERVICE_KEY", "legacy"),
        ])
        .unwrap();
        assert_eq!(config.registry_addr, "consul.internal:8500");
        assert_eq!(config.pager_service_key, "legacy");
    }

    #[test]
    fn primary_names_win_over_legacy_names() {
        let config = load(&[
            ("REGISTRY_ADDR", "primary:8500"),
            ("CONSUL_ADDR", "legacy:8500"),
            ("PAGER_SERVICE_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(config.registry_addr, "primary:8500");
    }

    #[test]
    fn tunables_are_parsed() {
        let config = load(&[
            ("PAGER_SERVICE_KEY", "k"),
            ("REGISTRY_ADDR", "http://10.0.0.1:8500/"),
            ("POLL_INTERVAL", "5s"),
            ("REQUEST_TIMEOUT", "750ms"),
            ("NOTIFY_GRACE", "1m"),
            ("ESCALATION_INTERVAL", "2h"),
            ("DEBOUNCE_RETENTION_CYCLES", "0"),
            ("GRACE_MODE", "repeat"),
        ])
        .unwrap();
        assert_eq!(config.registry_url(), "http://10.0.0.1:8500");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert_eq!(config.grace, Duration::from_secs(60));
        assert_eq!(config.escalation_interval, Duration::from_secs(7200));
        assert_eq!(config.retention_cycles, 0);
        assert_eq!(config.grace_mode, GraceMode::Repeat);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            load(&[("PAGER_SERVICE_KEY", "k"), ("POLL_INTERVAL", "soon")]),
            Err(ConfigError::Invalid {
                var: "POLL_INTERVAL",
                value: "soon".to_string()
            })
        );
        assert!(load(&[("PAGER_SERVICE_KEY", "k"), ("POLL_INTERVAL", "0s")]).is_err());
        assert!(load(&[("PAGER_SERVICE_KEY", "k"), ("GRACE_MODE", "never")]).is_err());
        assert!(load(&[("PAGER_SERVICE_KEY", "k"), ("DEBOUNCE_RETENTION_CYCLES", "-1")]).is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert_eq!(
            load(&[("PAGER_SERVICE_KEY", "k"), ("POLL_INTERVAL", "18446744073709551615s")]),
            Err(ConfigError::Invalid {
                var: "POLL_INTERVAL",
                value: "18446744073709551615s".to_string()
            })
        );
        assert_eq!(
            load(&[("PAGER_SERVICE_KEY", "k"), ("ESCALATION_INTERVAL", "400000000000000000m")]),
            Err(ConfigError::Invalid {
                var: "ESCALATION_INTERVAL",
                value: "400000000000000000m".to_string()
            })
        );
        assert!(load(&[("PAGER_SERVICE_KEY", "k"), ("NOTIFY_GRACE", "2592001s")]).is_err());
        assert!(load(&[("PAGER_SERVICE_KEY", "k"), ("REQUEST_TIMEOUT", "721h")]).is_err());

        let config = load(&[("PAGER_SERVICE_KEY", "k"), ("ESCALATION_INTERVAL", "720h")]).unwrap();
        assert_eq!(config.escalation_interval, MAX_DURATION);
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("ten"), None);
        assert_eq!(parse_duration("400000000000000000m"), None);
        assert_eq!(parse_duration("18446744073709551615h"), None);
    }
}
