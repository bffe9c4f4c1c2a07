//! Run orchestration
//!
//! Drives the registry's phases through the test case runner: every agent's
//! fixtures, optional retries for failing fixtures, per-agent quality
//! scoring, and an append-only execution log with one entry per attempt so
//! retries stay visible after the fact. Every run completes with a report;
//! only naming an unknown phase or workflow is an error.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DokimiError, Result};
use crate::fixture::FixtureStore;
use crate::phases::{ExecutionLogEntry, PhaseRegistry};
use crate::report::{AgentReport, AgentStatus, Report, RunInfo, Summary, TestDetail, log_tail};
use crate::runner::{TestCaseRunner, TestStatus};
use crate::validate::flow::PipelineFlowValidator;
use crate::validate::perf::{PerfMetrics, PerformanceValidator};
use crate::validate::quality::OutputQualityValidator;

/// Agents re-tested by the regression shortcut
pub const CRITICAL_AGENTS: [&str; 4] = [
    "spec-writer",
    "body-writer",
    "grammar-checker",
    "content-atomizer",
];

/// Orchestrator tuning knobs
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Test agents within a phase concurrently
    pub parallel: bool,

    /// Worker bound for concurrent agents within a phase
    pub max_workers: usize,

    /// Budget for one agent's whole fixture set
    #[serde(with = "humantime_serde")]
    pub timeout_per_agent: Duration,

    /// Re-run failing fixtures
    pub retry_on_failure: bool,

    /// Extra attempts per failing fixture
    pub max_retries: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: 4,
            timeout_per_agent: Duration::from_secs(30),
            retry_on_failure: true,
            max_retries: 2,
        }
    }
}

struct Inner {
    registry: PhaseRegistry,
    runner: TestCaseRunner,
    fixtures: Arc<dyn FixtureStore>,
    quality: OutputQualityValidator,
    config: OrchestratorConfig,
}

/// Drives full runs, phase runs, workflows, and regression subsets
pub struct Orchestrator {
    inner: Arc<Inner>,
}

type PhaseTree = BTreeMap<String, BTreeMap<String, AgentReport>>;

impl Orchestrator {
    pub fn new(
        registry: PhaseRegistry,
        runner: TestCaseRunner,
        fixtures: Arc<dyn FixtureStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                runner,
                fixtures,
                quality: OutputQualityValidator::new(),
                config,
            }),
        }
    }

    /// Test every agent of every phase, in registry order
    pub async fn run_all(&self) -> Report {
        let started = Instant::now();
        let mut tree = PhaseTree::new();
        let mut log = Vec::new();

        let phase_names: Vec<String> = self
            .inner
            .registry
            .phases()
            .iter()
            .map(|p| p.name.clone())
            .collect();

        for phase in &phase_names {
            let (agents, entries) = self.run_phase_agents(phase).await;
            tree.insert(phase.clone(), agents);
            log.extend(entries);
        }

        self.build_report("comprehensive", started, tree, log, None, None)
    }

    /// Test the agents of one phase
    pub async fn run_phase(&self, phase: &str) -> Result<Report> {
        if self.inner.registry.agents_for_phase(phase).is_none() {
            return Err(DokimiError::UnknownPhase(phase.to_string()));
        }

        let started = Instant::now();
        let (agents, log) = self.run_phase_agents(phase).await;
        let mut tree = PhaseTree::new();
        tree.insert(phase.to_string(), agents);

        Ok(self.build_report(&format!("phase:{}", phase), started, tree, log, None, None))
    }

    /// Run a named workflow's phases, then judge the whole run with the
    /// flow and performance validators
    pub async fn run_workflow(&self, workflow: &str) -> Result<Report> {
        let phase_names: Vec<String> = self
            .inner
            .registry
            .workflow_phases(workflow)
            .ok_or_else(|| DokimiError::UnknownWorkflow(workflow.to_string()))?
            .to_vec();

        let started = Instant::now();
        let mut tree = PhaseTree::new();
        let mut log = Vec::new();

        for phase in &phase_names {
            let (agents, entries) = self.run_phase_agents(phase).await;
            tree.insert(phase.clone(), agents);
            log.extend(entries);
        }

        let (_, flow) =
            PipelineFlowValidator::new(self.inner.registry.clone()).validate(&log);

        let metrics = run_metrics(&tree, started.elapsed());
        let (_, perf) = PerformanceValidator::new().validate(&metrics);

        Ok(self.build_report(
            &format!("workflow:{}", workflow),
            started,
            tree,
            log,
            Some(flow),
            Some(perf),
        ))
    }

    /// Re-test a subset of agents, grouped under their home phases
    pub async fn run_regression(&self, agents: &[&str]) -> Report {
        let started = Instant::now();
        let mut tree = PhaseTree::new();
        let mut log = Vec::new();

        for agent_id in agents {
            let phase = self
                .inner
                .registry
                .phase_for_agent(agent_id)
                .unwrap_or("unknown")
                .to_string();
            let (report, entries) = Self::test_agent(self.inner.clone(), &phase, agent_id).await;
            tree.entry(phase).or_default().insert(agent_id.to_string(), report);
            log.extend(entries);
        }

        self.build_report("regression", started, tree, log, None, None)
    }

    async fn run_phase_agents(
        &self,
        phase: &str,
    ) -> (BTreeMap<String, AgentReport>, Vec<ExecutionLogEntry>) {
        let agent_ids: Vec<String> = self
            .inner
            .registry
            .agents_for_phase(phase)
            .map(|a| a.to_vec())
            .unwrap_or_default();
        info!(phase, agents = agent_ids.len(), "testing phase");

        let mut agents = BTreeMap::new();
        let mut log = Vec::new();

        if self.inner.config.parallel && agent_ids.len() > 1 {
            let workers = self.inner.config.max_workers.max(1).min(agent_ids.len());
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut handles = Vec::with_capacity(agent_ids.len());

            for agent_id in agent_ids {
                let inner = self.inner.clone();
                let semaphore = semaphore.clone();
                let phase = phase.to_string();
                let timeout = self.inner.config.timeout_per_agent;

                handles.push((
                    agent_id.clone(),
                    tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await;
                        tokio::time::timeout(
                            timeout,
                            Self::test_agent(inner, &phase, &agent_id),
                        )
                        .await
                    }),
                ));
            }

            for (agent_id, handle) in handles {
                match handle.await {
                    Ok(Ok((report, entries))) => {
                        agents.insert(agent_id, report);
                        log.extend(entries);
                    }
                    Ok(Err(_)) | Err(_) => {
                        warn!(agent_id, phase, "agent test run aborted");
                        let (report, entry) = aborted_agent(phase, &agent_id);
                        agents.insert(agent_id, report);
                        log.push(entry);
                    }
                }
            }
        } else {
            for agent_id in agent_ids {
                let (report, entries) =
                    Self::test_agent(self.inner.clone(), phase, &agent_id).await;
                agents.insert(agent_id, report);
                log.extend(entries);
            }
        }

        // Concurrent agents finish in arbitrary order; keep the log
        // chronological for the flow validator.
        log.sort_by_key(|entry| entry.timestamp);
        (agents, log)
    }

    /// Run every fixture of one agent, retrying failures when configured.
    /// A retried fixture overwrites the tally, but each attempt gets its own
    /// log entry.
    async fn test_agent(
        inner: Arc<Inner>,
        phase: &str,
        agent_id: &str,
    ) -> (AgentReport, Vec<ExecutionLogEntry>) {
        let fixtures = inner.fixtures.fixtures_for(agent_id);
        if fixtures.is_empty() {
            return (AgentReport::skipped(agent_id), Vec::new());
        }

        let started = Instant::now();
        let mut report = AgentReport {
            agent_id: agent_id.to_string(),
            status: AgentStatus::Passed,
            tests_run: 0,
            tests_passed: 0,
            tests_failed: 0,
            tests_errored: 0,
            duration_secs: 0.0,
            tokens_used: 0,
            test_details: Vec::new(),
        };
        let mut log = Vec::new();

        for fixture in &fixtures {
            report.tests_run += 1;

            let mut result = inner.runner.run_case(agent_id, fixture).await;
            log.push(attempt_entry(phase, agent_id, fixture.test_name.as_str(), 1, &result));

            if result.status != TestStatus::Pass && inner.config.retry_on_failure {
                for attempt in 2..=inner.config.max_retries + 1 {
                    let retry = inner.runner.run_case(agent_id, fixture).await;
                    log.push(attempt_entry(
                        phase,
                        agent_id,
                        fixture.test_name.as_str(),
                        attempt,
                        &retry,
                    ));
                    let passed = retry.status == TestStatus::Pass;
                    result = retry;
                    if passed {
                        break;
                    }
                }
            }

            match result.status {
                TestStatus::Pass => report.tests_passed += 1,
                TestStatus::Fail => report.tests_failed += 1,
                TestStatus::Error => report.tests_errored += 1,
            }
            report.tokens_used += result.tokens_used;

            let quality_score = result.actual_output.as_ref().map(|output| {
                let (_, quality) = inner.quality.score(agent_id, output, None);
                quality.score
            });
            report.test_details.push(TestDetail {
                test_name: fixture.test_name.clone(),
                status: result.status,
                duration_secs: result.duration_secs,
                quality_score,
            });
        }

        if report.tests_failed + report.tests_errored > 0 {
            report.status = AgentStatus::Failed;
        }
        report.duration_secs = started.elapsed().as_secs_f64();

        info!(
            agent_id,
            phase,
            passed = report.tests_passed,
            run = report.tests_run,
            "agent tested"
        );
        (report, log)
    }

    fn build_report(
        &self,
        mode: &str,
        started: Instant,
        tree: PhaseTree,
        log: Vec<ExecutionLogEntry>,
        flow: Option<crate::validate::flow::FlowReport>,
        perf: Option<crate::validate::perf::PerfReport>,
    ) -> Report {
        let mut agents_tested = 0;
        let mut agents_passed = 0;
        let mut agents_failed = 0;
        let mut total_tests = 0;
        let mut failed_agents = Vec::new();

        for agents in tree.values() {
            for agent in agents.values() {
                total_tests += agent.tests_run;
                match agent.status {
                    AgentStatus::Passed => {
                        agents_tested += 1;
                        agents_passed += 1;
                    }
                    AgentStatus::Failed => {
                        agents_tested += 1;
                        agents_failed += 1;
                        failed_agents.push(agent.agent_id.clone());
                    }
                    AgentStatus::Skipped => {}
                }
            }
        }

        let recommendations = recommendations(&tree);

        Report {
            run: RunInfo {
                run_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                mode: mode.to_string(),
                duration_secs: started.elapsed().as_secs_f64(),
                parallel: self.inner.config.parallel,
            },
            summary: Summary {
                total_agents: self.inner.registry.all_agents().len(),
                agents_tested,
                agents_passed,
                agents_failed,
                total_tests,
                success_rate: agents_passed as f64 / agents_tested.max(1) as f64 * 100.0,
                phases_completed: tree.keys().cloned().collect(),
            },
            phases: tree,
            failed_agents,
            execution_log: log_tail(&log),
            recommendations,
            flow,
            performance: perf,
        }
    }
}

fn attempt_entry(
    phase: &str,
    agent_id: &str,
    test_name: &str,
    attempt: usize,
    result: &crate::runner::TestResult,
) -> ExecutionLogEntry {
    ExecutionLogEntry {
        timestamp: result.timestamp,
        phase: phase.to_string(),
        agent_id: agent_id.to_string(),
        status: result.status.to_string(),
        summary: format!("{} attempt {}: {}", test_name, attempt, result.status),
        input: Some(result.input.clone()),
        output: result.actual_output.clone(),
    }
}

fn aborted_agent(phase: &str, agent_id: &str) -> (AgentReport, ExecutionLogEntry) {
    let mut report = AgentReport::skipped(agent_id);
    report.status = AgentStatus::Failed;
    let entry = ExecutionLogEntry {
        timestamp: Utc::now(),
        phase: phase.to_string(),
        agent_id: agent_id.to_string(),
        status: "error".to_string(),
        summary: "agent test run aborted (timeout or panic)".to_string(),
        input: None,
        output: None,
    };
    (report, entry)
}

/// Aggregate run metrics for the performance validator
fn run_metrics(tree: &PhaseTree, elapsed: Duration) -> PerfMetrics {
    let mut total_tokens = 0u64;
    let mut max_agent_tokens = 0u64;
    let mut tests_run = 0usize;
    let mut tests_passed = 0usize;

    for agents in tree.values() {
        for agent in agents.values() {
            total_tokens += agent.tokens_used;
            max_agent_tokens = max_agent_tokens.max(agent.tokens_used);
            tests_run += agent.tests_run;
            tests_passed += agent.tests_passed;
        }
    }

    PerfMetrics {
        execution_time: elapsed.as_secs_f64(),
        total_tokens,
        success_rate: tests_passed as f64 / tests_run.max(1) as f64,
        max_agent_tokens: (max_agent_tokens > 0).then_some(max_agent_tokens),
    }
}

/// Threshold recommendations over the finished tree
fn recommendations(tree: &PhaseTree) -> Vec<String> {
    let mut out = Vec::new();

    let failing: Vec<&str> = tree
        .values()
        .flat_map(|agents| agents.values())
        .filter(|a| a.status == AgentStatus::Failed)
        .map(|a| a.agent_id.as_str())
        .collect();
    if !failing.is_empty() {
        out.push(format!(
            "Review and fix failing agents: {}",
            failing.iter().take(5).copied().collect::<Vec<_>>().join(", ")
        ));
    }

    let slow: Vec<&str> = tree
        .values()
        .flat_map(|agents| agents.values())
        .filter(|a| a.duration_secs > 10.0)
        .map(|a| a.agent_id.as_str())
        .collect();
    if !slow.is_empty() {
        out.push(format!(
            "Optimize slow agents: {}",
            slow.iter().take(3).copied().collect::<Vec<_>>().join(", ")
        ));
    }

    let untested: Vec<&str> = tree
        .values()
        .flat_map(|agents| agents.values())
        .filter(|a| a.status == AgentStatus::Skipped)
        .map(|a| a.agent_id.as_str())
        .collect();
    if !untested.is_empty() {
        out.push(format!(
            "Add test fixtures for: {}",
            untested.iter().take(5).copied().collect::<Vec<_>>().join(", ")
        ));
    }

    if out.is_empty() {
        out.push("All systems operational. Continue monitoring performance.".to_string());
    }
    out
}
