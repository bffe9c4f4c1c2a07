//! Layered validation
//!
//! Four independent validators, applied at different granularities:
//! - [`schema`]: structural conformance of a single value
//! - [`quality`]: heuristic scoring of a single output
//! - [`flow`]: cross-stage ordering over a whole execution log
//! - [`perf`]: aggregate metrics against fixed benchmarks

pub mod flow;
pub mod perf;
pub mod quality;
pub mod schema;

pub use flow::{DependencyViolation, FlowReport, HandoffProblem, PipelineFlowValidator, TimingIssue};
pub use perf::{
    BenchmarkViolation, BenchmarkWarning, PerfBenchmarks, PerfMetrics, PerfReport,
    PerformanceValidator,
};
pub use quality::{
    AgentRule, CheckOutcome, OutputQualityValidator, QualityReport, QualityRequirements,
};
pub use schema::{Schema, SchemaKind, SchemaValidator, value_kind};
