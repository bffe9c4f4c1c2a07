//! Run report artifact
//!
//! The durable output of an orchestrated run: identity, tallies, the
//! per-phase per-agent tree, a bounded tail of the execution log, and any
//! cross-cutting validation the run performed. The report is pure data;
//! rendering it is the caller's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::phases::ExecutionLogEntry;
use crate::runner::TestStatus;
use crate::validate::flow::FlowReport;
use crate::validate::perf::PerfReport;

/// How many trailing execution log entries a report retains
pub const LOG_TAIL: usize = 100;

/// Identity and shape of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,

    /// Caller-chosen label ("comprehensive", "workflow:blog-post", ...)
    pub mode: String,

    pub duration_secs: f64,
    pub parallel: bool,
}

/// Aggregated outcome of one agent's fixtures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Every fixture passed
    Passed,
    /// At least one fixture failed or errored
    Failed,
    /// The agent had no fixtures to run
    Skipped,
}

/// One fixture's row in the agent detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDetail {
    pub test_name: String,
    pub status: TestStatus,
    pub duration_secs: f64,

    /// Quality score of the produced output, when one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<i32>,
}

/// Per-agent node of the report tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_id: String,
    pub status: AgentStatus,
    pub tests_run: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_errored: usize,
    pub duration_secs: f64,
    pub tokens_used: u64,
    pub test_details: Vec<TestDetail>,
}

impl AgentReport {
    /// Report for an agent with no fixtures
    pub fn skipped(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            status: AgentStatus::Skipped,
            tests_run: 0,
            tests_passed: 0,
            tests_failed: 0,
            tests_errored: 0,
            duration_secs: 0.0,
            tokens_used: 0,
            test_details: Vec::new(),
        }
    }
}

/// Run-level tallies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_agents: usize,
    pub agents_tested: usize,
    pub agents_passed: usize,
    pub agents_failed: usize,
    pub total_tests: usize,

    /// Agents passed over agents tested, as a percentage
    pub success_rate: f64,

    pub phases_completed: Vec<String>,
}

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run: RunInfo,
    pub summary: Summary,

    /// phase name -> agent id -> agent report
    pub phases: BTreeMap<String, BTreeMap<String, AgentReport>>,

    pub failed_agents: Vec<String>,

    /// Last [`LOG_TAIL`] execution log entries
    pub execution_log: Vec<ExecutionLogEntry>,

    pub recommendations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerfReport>,
}

impl Report {
    /// Write the report as pretty-printed JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Keep only the last [`LOG_TAIL`] entries of an execution log
pub fn log_tail(log: &[ExecutionLogEntry]) -> Vec<ExecutionLogEntry> {
    let start = log.len().saturating_sub(LOG_TAIL);
    log[start..].to_vec()
}

#[cfg(test)]
mod report_tests {
    use super::*;

    fn sample_report() -> Report {
        let mut research = BTreeMap::new();
        research.insert(
            "keyword-researcher".to_string(),
            AgentReport {
                agent_id: "keyword-researcher".to_string(),
                status: AgentStatus::Passed,
                tests_run: 2,
                tests_passed: 2,
                tests_failed: 0,
                tests_errored: 0,
                duration_secs: 0.4,
                tokens_used: 120,
                test_details: vec![TestDetail {
                    test_name: "basic".to_string(),
                    status: TestStatus::Pass,
                    duration_secs: 0.2,
                    quality_score: Some(100),
                }],
            },
        );

        let mut phases = BTreeMap::new();
        phases.insert("research".to_string(), research);

        Report {
            run: RunInfo {
                run_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                mode: "comprehensive".to_string(),
                duration_secs: 1.5,
                parallel: true,
            },
            summary: Summary {
                total_agents: 41,
                agents_tested: 1,
                agents_passed: 1,
                agents_failed: 0,
                total_tests: 2,
                success_rate: 100.0,
                phases_completed: vec!["research".to_string()],
            },
            phases,
            failed_agents: Vec::new(),
            execution_log: Vec::new(),
            recommendations: vec!["All systems operational.".to_string()],
            flow: None,
            performance: None,
        }
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = sample_report();
        report.save_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reloaded: Report = serde_json::from_str(&content).unwrap();
        assert_eq!(reloaded.run.run_id, report.run.run_id);
        assert_eq!(reloaded.summary.total_tests, 2);
        assert_eq!(
            reloaded.phases["research"]["keyword-researcher"].status,
            AgentStatus::Passed
        );
    }

    #[test]
    fn test_log_tail_bounds() {
        let entry = ExecutionLogEntry {
            timestamp: Utc::now(),
            phase: "research".to_string(),
            agent_id: "topic-scout".to_string(),
            status: "passed".to_string(),
            summary: "ok".to_string(),
            input: None,
            output: None,
        };

        let log: Vec<ExecutionLogEntry> = (0..250).map(|_| entry.clone()).collect();
        assert_eq!(log_tail(&log).len(), LOG_TAIL);
        assert_eq!(log_tail(&log[..10]).len(), 10);
    }
}
