//! # Dokimi - A Testing Harness for Agent Pipelines
//!
//! Dokimi (δοκιμή, "trial") exercises multi-agent content pipelines against
//! recorded fixtures:
//! - Fixture-driven test cases with schema and shape validation
//! - Heuristic output quality scoring
//! - Caching, statistics, and retries around interchangeable backends
//! - Bounded parallel batch scheduling with per-task timeouts
//! - Cross-phase flow validation and performance benchmarks
//! - Orchestrated runs producing a durable JSON report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dokimi::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dokimi::telemetry::init();
//!
//!     let executor = Arc::new(TaskExecutor::new(ExecutorConfig::default()));
//!     let runner = TestCaseRunner::new(
//!         executor,
//!         Arc::new(StaticSpecProvider::new()),
//!         SchemaSet::new(),
//!     );
//!     let orchestrator = Orchestrator::new(
//!         PhaseRegistry::content_pipeline(),
//!         runner,
//!         Arc::new(JsonFixtureStore::load("fixtures.json")?),
//!         OrchestratorConfig::default(),
//!     );
//!
//!     let report = orchestrator.run_all().await;
//!     report.save_json("report.json")?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod fixture;
pub mod orchestrator;
pub mod phases;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod spec;
pub mod telemetry;
pub mod validate;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::{
        AgentBackend, BackendResponse, ExecutionResult, ExecutorConfig, MockBackend,
        RunStatistics, TaskExecutor,
    };
    pub use crate::config::HarnessConfig;
    pub use crate::error::{DokimiError, Result};
    pub use crate::fixture::{
        CoverageReport, Fixture, FixtureStore, InMemoryFixtureStore, JsonFixtureStore,
        coverage_report,
    };
    pub use crate::orchestrator::{CRITICAL_AGENTS, Orchestrator, OrchestratorConfig};
    pub use crate::phases::{ExecutionLogEntry, Phase, PhaseRegistry};
    pub use crate::report::{AgentReport, AgentStatus, Report, RunInfo, Summary};
    pub use crate::runner::{SchemaSet, TestCaseRunner, TestResult, TestStatus};
    pub use crate::scheduler::{BatchScheduler, DispatchRequest, SchedulerConfig};
    pub use crate::spec::{AgentSpec, ModelTier, SpecProvider, StaticSpecProvider};
    pub use crate::validate::flow::{FlowReport, PipelineFlowValidator};
    pub use crate::validate::perf::{PerfBenchmarks, PerfMetrics, PerformanceValidator};
    pub use crate::validate::quality::{OutputQualityValidator, QualityReport};
    pub use crate::validate::schema::{Schema, SchemaValidator};
}
