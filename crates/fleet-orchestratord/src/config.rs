//! Startup configuration, assembled from environment variables.
//!
//! Mirrors the teacher's `sem_os_server` convention of reading config
//! directly from `std::env` rather than a dedicated config crate.

use std::path::PathBuf;
use std::time::Duration;

use fleet_registry::DEFAULT_PROBE_INTERVAL;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to the fleet topology YAML document (see spec.md §6).
    pub fleet_config_path: PathBuf,
    /// Directory holding `manifest.yaml` plus the per-template graph files.
    pub templates_dir: PathBuf,
    /// Health-probe interval; defaults to `fleet_registry`'s 10s default.
    pub probe_interval: Duration,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            fleet_config_path: std::env::var("FLEET_CONFIG_PATH")
                .unwrap_or_else(|_| "fleet.yaml".to_string())
                .into(),
            templates_dir: std::env::var("TEMPLATES_DIR")
                .unwrap_or_else(|_| "templates".to_string())
                .into(),
            probe_interval: std::env::var("PROBE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PROBE_INTERVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        // Scoped var names avoid clobbering a real deployment's env in
        // the (unlikely) case tests run in-process alongside one.
        std::env::remove_var("FLEET_CONFIG_PATH");
        std::env::remove_var("TEMPLATES_DIR");
        std::env::remove_var("PROBE_INTERVAL_SECS");

        let config = RuntimeConfig::from_env();
        assert_eq!(config.fleet_config_path, PathBuf::from("fleet.yaml"));
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.probe_interval, DEFAULT_PROBE_INTERVAL);
    }
}
