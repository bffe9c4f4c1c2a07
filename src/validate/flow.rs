//! Pipeline flow validation
//!
//! Checks a whole execution log after the fact: did phases run in an order
//! that satisfies their declared prerequisites, did timestamps move forward,
//! and did data actually get handed from one stage to the next.

use crate::phases::{ExecutionLogEntry, PhaseRegistry};
use serde::{Deserialize, Serialize};

/// A phase ran before one of its prerequisites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyViolation {
    pub phase: String,
    pub missing_dependency: String,
}

/// A log entry with a timestamp earlier than its predecessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingIssue {
    pub agent_id: String,
    pub error: String,
}

/// An upstream stage produced output the next stage never received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffProblem {
    pub from: String,
    pub to: String,
    pub issue: String,
}

/// Result of a flow validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    /// False when a dependency or ordering rule was broken
    pub is_valid: bool,

    /// Distinct phases in first-seen order
    pub phases_executed: Vec<String>,

    pub dependency_violations: Vec<DependencyViolation>,
    pub timing_issues: Vec<TimingIssue>,

    /// Recorded but advisory; handoff gaps do not invalidate on their own
    pub handoff_problems: Vec<HandoffProblem>,
}

/// Cross-stage ordering and handoff checker
#[derive(Debug, Clone)]
pub struct PipelineFlowValidator {
    registry: PhaseRegistry,
}

impl PipelineFlowValidator {
    /// Create a validator over the given phase registry
    pub fn new(registry: PhaseRegistry) -> Self {
        Self { registry }
    }

    /// Validate an execution log
    pub fn validate(&self, log: &[ExecutionLogEntry]) -> (bool, FlowReport) {
        let mut report = FlowReport {
            is_valid: true,
            phases_executed: Vec::new(),
            dependency_violations: Vec::new(),
            timing_issues: Vec::new(),
            handoff_problems: Vec::new(),
        };

        for entry in log {
            if !report.phases_executed.contains(&entry.phase) {
                report.phases_executed.push(entry.phase.clone());
            }
        }

        // Every prerequisite must have been first-seen strictly earlier
        for (i, phase) in report.phases_executed.iter().enumerate() {
            for prerequisite in self.registry.prerequisites_of(phase) {
                if !report.phases_executed[..i].contains(prerequisite) {
                    report.dependency_violations.push(DependencyViolation {
                        phase: phase.clone(),
                        missing_dependency: prerequisite.clone(),
                    });
                }
            }
        }

        self.check_timing(log, &mut report);
        self.check_handoffs(log, &mut report);

        report.is_valid =
            report.dependency_violations.is_empty() && report.timing_issues.is_empty();
        (report.is_valid, report)
    }

    fn check_timing(&self, log: &[ExecutionLogEntry], report: &mut FlowReport) {
        for pair in log.windows(2) {
            if pair[1].timestamp < pair[0].timestamp {
                report.timing_issues.push(TimingIssue {
                    agent_id: pair[1].agent_id.clone(),
                    error: "Out of order execution".to_string(),
                });
            }
        }
    }

    fn check_handoffs(&self, log: &[ExecutionLogEntry], report: &mut FlowReport) {
        for pair in log.windows(2) {
            let produced = pair[0].output.as_ref().is_some_and(|v| !v.is_null());
            let received = pair[1].input.as_ref().is_some_and(|v| !v.is_null());
            if produced && !received {
                report.handoff_problems.push(HandoffProblem {
                    from: pair[0].agent_id.clone(),
                    to: pair[1].agent_id.clone(),
                    issue: "No input received".to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod flow_tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn entry(phase: &str, agent: &str, offset_secs: i64) -> ExecutionLogEntry {
        ExecutionLogEntry {
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            phase: phase.to_string(),
            agent_id: agent.to_string(),
            status: "passed".to_string(),
            summary: format!("{} complete", agent),
            input: Some(json!({"topic": "x"})),
            output: Some(json!({"result": "y"})),
        }
    }

    fn validator() -> PipelineFlowValidator {
        PipelineFlowValidator::new(PhaseRegistry::content_pipeline())
    }

    #[test]
    fn test_content_without_prerequisites_is_violation() {
        let log = vec![entry("content", "body-writer", 0)];
        let (valid, report) = validator().validate(&log);

        assert!(!valid);
        assert_eq!(report.dependency_violations.len(), 2);
        assert!(report
            .dependency_violations
            .iter()
            .any(|v| v.phase == "content" && v.missing_dependency == "research"));
        assert!(report
            .dependency_violations
            .iter()
            .any(|v| v.phase == "content" && v.missing_dependency == "strategy"));
    }

    #[test]
    fn test_declared_order_is_valid() {
        let log = vec![
            entry("research", "keyword-researcher", 0),
            entry("strategy", "content-planner", 1),
            entry("content", "body-writer", 2),
            entry("qa", "grammar-checker", 3),
            entry("distribution", "content-atomizer", 4),
        ];
        let (valid, report) = validator().validate(&log);
        assert!(valid, "{:?}", report);
        assert_eq!(report.phases_executed.len(), 5);
    }

    #[test]
    fn test_out_of_order_timestamps_flagged() {
        let mut log = vec![
            entry("research", "topic-scout", 10),
            entry("research", "keyword-researcher", 0),
        ];
        log[1].timestamp = log[0].timestamp - Duration::seconds(5);

        let (valid, report) = validator().validate(&log);
        assert!(!valid);
        assert_eq!(report.timing_issues.len(), 1);
        assert_eq!(report.timing_issues[0].agent_id, "keyword-researcher");
    }

    #[test]
    fn test_handoff_gap_recorded_but_advisory() {
        let mut log = vec![
            entry("research", "source-gatherer", 0),
            entry("strategy", "content-planner", 1),
        ];
        log[1].input = None;

        let (valid, report) = validator().validate(&log);
        assert!(valid);
        assert_eq!(report.handoff_problems.len(), 1);
        assert_eq!(report.handoff_problems[0].from, "source-gatherer");
        assert_eq!(report.handoff_problems[0].to, "content-planner");
    }

    #[test]
    fn test_empty_log_is_valid() {
        let (valid, report) = validator().validate(&[]);
        assert!(valid);
        assert!(report.phases_executed.is_empty());
    }
}
