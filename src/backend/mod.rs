//! Execution backends
//!
//! [`AgentBackend`] is the seam between the harness and whatever actually
//! runs an agent. The bundled [`MockBackend`] returns deterministic canned
//! outputs; [`TaskExecutor`] wraps any backend with caching, statistics,
//! retries, and mock fallback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub mod executor;
pub mod mock;

pub use executor::{ExecutorConfig, RunStatistics, TaskExecutor, TaskHistoryEntry};
pub use mock::MockBackend;

/// Raw response from a backend before the executor wraps it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Whether the agent completed its task
    pub success: bool,

    /// Structured output, when the agent produced any
    pub output: Option<Value>,

    /// Token usage reported by the backend; `None` when unknown
    pub tokens_used: Option<u64>,

    /// Failure description when `success` is false
    pub error: Option<String>,
}

impl BackendResponse {
    /// A successful response carrying output
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            tokens_used: None,
            error: None,
        }
    }

    /// A failed response carrying an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            tokens_used: None,
            error: Some(error.into()),
        }
    }
}

/// One completed dispatch, as seen by callers of the executor
///
/// Results are immutable once produced. Cached dispatches return the stored
/// result unchanged, duration and timestamp included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the dispatch succeeded
    pub success: bool,

    /// Agent output, when any
    pub output: Option<Value>,

    /// Tokens consumed, reported or estimated
    pub tokens_used: u64,

    /// Failure description when `success` is false
    pub error: Option<String>,

    /// Agent that was dispatched
    pub agent_id: String,

    /// Wall-clock duration of the dispatch in seconds
    pub duration_secs: f64,

    /// When the dispatch completed
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    /// A failed result with zero cost
    pub fn failure(agent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            tokens_used: 0,
            error: Some(error.into()),
            agent_id: agent_id.into(),
            duration_secs: 0.0,
            timestamp: Utc::now(),
        }
    }
}

/// Something that can run an agent
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Run one agent against one input
    ///
    /// `spec_text` is the full prompt composed for the agent. An `Err` here
    /// means the backend itself broke; an unsuccessful `BackendResponse`
    /// means the agent ran and failed.
    async fn execute(&self, agent_id: &str, spec_text: &str, input: &Value)
    -> Result<BackendResponse>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
