//! Engine configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_ANALYSIS_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 60;
pub const DEFAULT_DEDUP_RADIUS: f64 = 150.0;
pub const DEFAULT_ANALYZE_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_TUTOR_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_MARKER_TILT_RADIANS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    /// Timer period between automatic analysis passes.
    pub analysis_interval: Duration,
    /// Inactivity after which a pass runs in idle mode.
    pub idle_threshold: Duration,
    /// Markers closer than this (page units) to an existing one are suppressed.
    pub dedup_radius: f64,
    /// Ignore timer ticks; only explicit triggers run passes.
    pub manual_trigger_only: bool,
    /// Backstop on a single analyze call.
    pub analyze_timeout: Duration,
    pub api_base_url: String,
    /// Markers and labels are tilted uniformly within `±marker_tilt` radians.
    pub marker_tilt: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            analysis_interval: Duration::from_secs(DEFAULT_ANALYSIS_INTERVAL_SECS),
            idle_threshold: Duration::from_secs(DEFAULT_IDLE_THRESHOLD_SECS),
            dedup_radius: DEFAULT_DEDUP_RADIUS,
            manual_trigger_only: false,
            analyze_timeout: Duration::from_secs(DEFAULT_ANALYZE_TIMEOUT_SECS),
            api_base_url: DEFAULT_TUTOR_API_BASE_URL.to_string(),
            marker_tilt: DEFAULT_MARKER_TILT_RADIANS,
        }
    }
}

impl AnnotatorConfig {
    /// Build config from environment variables, falling back to defaults for
    /// anything absent or unparseable.
    ///
    /// - `ANALYSIS_INTERVAL_SECS` (10)
    /// - `IDLE_THRESHOLD_SECS` (60)
    /// - `DEDUP_RADIUS` (150.0)
    /// - `MANUAL_TRIGGER_ONLY` (false)
    /// - `ANALYZE_TIMEOUT_SECS` (45)
    /// - `TUTOR_API_BASE_URL` (`http://127.0.0.1:3000`)
    /// - `MARKER_TILT_RADIANS` (0.1)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(env_parse(&lookup, key, default.as_secs()))
        };
        Self {
            analysis_interval: secs("ANALYSIS_INTERVAL_SECS", defaults.analysis_interval).max(Duration::from_secs(1)),
            idle_threshold: secs("IDLE_THRESHOLD_SECS", defaults.idle_threshold),
            dedup_radius: env_parse(&lookup, "DEDUP_RADIUS", defaults.dedup_radius).max(0.0),
            manual_trigger_only: env_flag(&lookup, "MANUAL_TRIGGER_ONLY", defaults.manual_trigger_only),
            analyze_timeout: secs("ANALYZE_TIMEOUT_SECS", defaults.analyze_timeout).max(Duration::from_secs(1)),
            api_base_url: lookup("TUTOR_API_BASE_URL")
                .map_or(defaults.api_base_url, |url| url.trim_end_matches('/').to_string()),
            marker_tilt: env_parse(&lookup, "MARKER_TILT_RADIANS", defaults.marker_tilt).abs(),
        }
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
