//! Performance benchmark validation
//!
//! Aggregate run metrics checked against a fixed benchmark table. Exceeding a
//! ceiling (or missing the success-rate floor) is a hard violation; sitting
//! at 80% or more of a ceiling is a soft warning only.

use serde::{Deserialize, Serialize};

/// Fixed benchmark table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfBenchmarks {
    /// Maximum total execution time in seconds
    pub max_execution_time: f64,

    /// Maximum tokens any single agent may consume
    pub max_tokens_per_agent: u64,

    /// Maximum tokens for the whole run
    pub max_total_tokens: u64,

    /// Minimum fraction of tests that must pass
    pub min_success_rate: f64,
}

impl Default for PerfBenchmarks {
    fn default() -> Self {
        Self {
            max_execution_time: 60.0,
            max_tokens_per_agent: 2_000,
            max_total_tokens: 50_000,
            min_success_rate: 0.95,
        }
    }
}

/// Aggregate metrics for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfMetrics {
    /// Total execution time in seconds
    pub execution_time: f64,

    /// Tokens consumed across the run
    pub total_tokens: u64,

    /// Fraction of tests that passed, 0.0..=1.0
    pub success_rate: f64,

    /// Largest per-agent token total, when tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agent_tokens: Option<u64>,
}

/// A metric that broke its benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkViolation {
    pub metric: String,
    pub value: f64,
    pub limit: f64,
}

/// A metric approaching its ceiling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkWarning {
    pub metric: String,
    pub message: String,
}

/// Result of a benchmark validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfReport {
    pub meets_benchmarks: bool,
    pub violations: Vec<BenchmarkViolation>,
    pub warnings: Vec<BenchmarkWarning>,
    pub metrics: PerfMetrics,
}

/// Benchmark checker
#[derive(Debug, Clone, Default)]
pub struct PerformanceValidator {
    benchmarks: PerfBenchmarks,
}

impl PerformanceValidator {
    /// Create a validator with the default benchmark table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom benchmarks
    pub fn with_benchmarks(benchmarks: PerfBenchmarks) -> Self {
        Self { benchmarks }
    }

    /// Check metrics against the benchmark table
    pub fn validate(&self, metrics: &PerfMetrics) -> (bool, PerfReport) {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        Self::check_ceiling(
            "execution_time",
            metrics.execution_time,
            self.benchmarks.max_execution_time,
            &mut violations,
            &mut warnings,
        );
        Self::check_ceiling(
            "total_tokens",
            metrics.total_tokens as f64,
            self.benchmarks.max_total_tokens as f64,
            &mut violations,
            &mut warnings,
        );
        if let Some(agent_tokens) = metrics.max_agent_tokens {
            Self::check_ceiling(
                "tokens_per_agent",
                agent_tokens as f64,
                self.benchmarks.max_tokens_per_agent as f64,
                &mut violations,
                &mut warnings,
            );
        }

        if metrics.success_rate < self.benchmarks.min_success_rate {
            violations.push(BenchmarkViolation {
                metric: "success_rate".to_string(),
                value: metrics.success_rate,
                limit: self.benchmarks.min_success_rate,
            });
        }

        let meets_benchmarks = violations.is_empty();
        let report = PerfReport {
            meets_benchmarks,
            violations,
            warnings,
            metrics: metrics.clone(),
        };
        (meets_benchmarks, report)
    }

    fn check_ceiling(
        metric: &str,
        value: f64,
        limit: f64,
        violations: &mut Vec<BenchmarkViolation>,
        warnings: &mut Vec<BenchmarkWarning>,
    ) {
        if value > limit {
            violations.push(BenchmarkViolation {
                metric: metric.to_string(),
                value,
                limit,
            });
        } else if value >= limit * 0.8 {
            warnings.push(BenchmarkWarning {
                metric: metric.to_string(),
                message: format!("Approaching limit: {} of {}", value, limit),
            });
        }
    }
}

#[cfg(test)]
mod perf_tests {
    use super::*;

    #[test]
    fn test_within_benchmarks() {
        let validator = PerformanceValidator::new();
        let (ok, report) = validator.validate(&PerfMetrics {
            execution_time: 10.0,
            total_tokens: 5_000,
            success_rate: 1.0,
            max_agent_tokens: Some(400),
        });
        assert!(ok);
        assert!(report.violations.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_exceeded_time_is_hard_violation() {
        let validator = PerformanceValidator::new();
        let (ok, report) = validator.validate(&PerfMetrics {
            execution_time: 75.0,
            total_tokens: 100,
            success_rate: 1.0,
            max_agent_tokens: None,
        });
        assert!(!ok);
        assert_eq!(report.violations[0].metric, "execution_time");
    }

    #[test]
    fn test_near_ceiling_is_soft_warning() {
        let validator = PerformanceValidator::new();
        let (ok, report) = validator.validate(&PerfMetrics {
            execution_time: 50.0, // 83% of the 60s ceiling
            total_tokens: 100,
            success_rate: 1.0,
            max_agent_tokens: None,
        });
        assert!(ok);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].metric, "execution_time");
    }

    #[test]
    fn test_success_rate_floor() {
        let validator = PerformanceValidator::new();
        let (ok, report) = validator.validate(&PerfMetrics {
            execution_time: 1.0,
            total_tokens: 10,
            success_rate: 0.90,
            max_agent_tokens: None,
        });
        assert!(!ok);
        assert!(report.violations.iter().any(|v| v.metric == "success_rate"));
    }

    #[test]
    fn test_per_agent_token_ceiling() {
        let validator = PerformanceValidator::with_benchmarks(PerfBenchmarks {
            max_tokens_per_agent: 100,
            ..Default::default()
        });
        let (ok, report) = validator.validate(&PerfMetrics {
            execution_time: 1.0,
            total_tokens: 150,
            success_rate: 1.0,
            max_agent_tokens: Some(150),
        });
        assert!(!ok);
        assert!(report.violations.iter().any(|v| v.metric == "tokens_per_agent"));
    }
}
