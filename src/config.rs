//! Harness configuration
//!
//! One [`HarnessConfig`] covers all tunable components. Loading is layered:
//! built-in defaults, then `dokimi.toml` (or `DOKIMI_CONFIG_PATH`), then
//! `DOKIMI_`-prefixed environment variables.

use serde::{Deserialize, Serialize};

use crate::backend::ExecutorConfig;
use crate::error::{DokimiError, Result};
use crate::orchestrator::OrchestratorConfig;
use crate::scheduler::SchedulerConfig;
use crate::validate::perf::PerfBenchmarks;

/// Complete harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub executor: ExecutorConfig,
    pub scheduler: SchedulerConfig,
    pub orchestrator: OrchestratorConfig,
    pub benchmarks: PerfBenchmarks,
}

impl HarnessConfig {
    /// Load configuration from file and environment variables
    ///
    /// Layers, later wins: defaults, `dokimi.toml`, the file named by
    /// `DOKIMI_CONFIG_PATH`, then `DOKIMI_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::new()
            .merge(Serialized::defaults(HarnessConfig::default()))
            .merge(Toml::file("dokimi.toml"));

        if let Ok(path) = std::env::var("DOKIMI_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: HarnessConfig = figment
            .merge(Env::prefixed("DOKIMI_").split("__"))
            .extract()
            .map_err(|e| {
                DokimiError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file over the defaults
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: HarnessConfig = Figment::new()
            .merge(Serialized::defaults(HarnessConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                DokimiError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no component could run with
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_parallel == 0 {
            return Err(DokimiError::Configuration(
                "scheduler.max_parallel must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.max_workers == 0 {
            return Err(DokimiError::Configuration(
                "orchestrator.max_workers must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.benchmarks.min_success_rate) {
            return Err(DokimiError::Configuration(
                "benchmarks.min_success_rate must be within 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_validate() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.executor.cache_results);
        assert_eq!(config.orchestrator.max_workers, 4);
        assert_eq!(config.benchmarks.min_success_rate, 0.95);
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dokimi.toml");
        std::fs::write(
            &path,
            r#"
[orchestrator]
max_workers = 8
timeout_per_agent = "45s"

[benchmarks]
max_total_tokens = 10000
"#,
        )
        .unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.orchestrator.max_workers, 8);
        assert_eq!(config.orchestrator.timeout_per_agent, Duration::from_secs(45));
        assert_eq!(config.benchmarks.max_total_tokens, 10_000);
        // Untouched sections keep defaults
        assert_eq!(config.scheduler.max_parallel, 4);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dokimi.toml");
        std::fs::write(&path, "[scheduler]\nmax_parallel = 0\n").unwrap();

        assert!(matches!(
            HarnessConfig::from_file(&path),
            Err(DokimiError::Configuration(_))
        ));
    }
}
