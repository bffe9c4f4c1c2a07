//! Task executor
//!
//! Wraps an [`AgentBackend`] with the run-level concerns the harness needs:
//! result caching keyed on canonical input, execution statistics, sequential
//! retries, and transparent fallback to the mock when a real backend breaks.
//! A dispatch never returns `Err`; every failure surfaces as an
//! [`ExecutionResult`] with `success == false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{AgentBackend, BackendResponse, ExecutionResult, MockBackend};

/// Executor tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Dispatch to the configured real backend instead of the mock
    pub use_real_backend: bool,

    /// Cache successful results keyed on agent id + canonical input
    pub cache_results: bool,

    /// Simulated latency of the bundled mock backend
    #[serde(with = "humantime_serde")]
    pub mock_delay: Duration,

    /// Pause between attempts in `retry_dispatch`
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            use_real_backend: false,
            cache_results: true,
            mock_delay: Duration::from_millis(100),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// One line of dispatch history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub agent_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub success: bool,
    pub duration_secs: f64,
}

/// Snapshot of executor statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_time_secs: f64,
    pub total_tokens: u64,
    /// Successes over total, as a percentage
    pub success_rate: f64,
    pub avg_execution_time: f64,
    pub cache_size: usize,
    pub history_size: usize,
}

#[derive(Default)]
struct Counters {
    total_executions: AtomicU64,
    successful_executions: AtomicU64,
    failed_executions: AtomicU64,
    total_time_micros: AtomicU64,
    total_tokens: AtomicU64,
}

/// Caching, counting, retrying dispatch front-end over a backend
pub struct TaskExecutor {
    backend: Option<Arc<dyn AgentBackend>>,
    mock: MockBackend,
    config: ExecutorConfig,
    cache: RwLock<HashMap<String, ExecutionResult>>,
    counters: Counters,
    history: RwLock<Vec<TaskHistoryEntry>>,
}

impl TaskExecutor {
    /// Mock-only executor
    pub fn new(config: ExecutorConfig) -> Self {
        let mock = MockBackend::with_delay(config.mock_delay);
        Self {
            backend: None,
            mock,
            config,
            cache: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Executor dispatching to a real backend, with mock fallback
    pub fn with_backend(backend: Arc<dyn AgentBackend>, config: ExecutorConfig) -> Self {
        let mut executor = Self::new(config);
        executor.backend = Some(backend);
        executor
    }

    /// Run one agent against one input
    ///
    /// The total-execution counter moves before the cache is consulted, so
    /// statistics count demand, not work. A cache hit returns the stored
    /// result unchanged and touches nothing else.
    pub async fn dispatch(&self, agent_id: &str, spec_text: &str, input: &Value) -> ExecutionResult {
        self.counters.total_executions.fetch_add(1, Ordering::Relaxed);

        let key = cache_key(agent_id, input);
        if self.config.cache_results {
            if let Some(cached) = self.cache.read().await.get(&key) {
                debug!(agent_id, "returning cached result");
                return cached.clone();
            }
        }

        let prompt = build_task_prompt(agent_id, spec_text, input);
        let started = Instant::now();
        let response = self.run_backend(agent_id, &prompt, input).await;
        let duration = started.elapsed();

        let result = self.finish(agent_id, input, response, duration).await;

        if self.config.cache_results && result.success {
            self.cache.write().await.insert(key, result.clone());
        }
        result
    }

    /// Dispatch with up to `max_attempts` sequential tries
    ///
    /// Stops at the first success. Exhaustion returns a failure naming the
    /// attempt count and the last error.
    pub async fn retry_dispatch(
        &self,
        agent_id: &str,
        spec_text: &str,
        input: &Value,
        max_attempts: usize,
    ) -> ExecutionResult {
        let mut last_error = None;

        for attempt in 1..=max_attempts.max(1) {
            if attempt > 1 {
                debug!(agent_id, attempt, "retrying dispatch");
                tokio::time::sleep(self.config.retry_delay).await;
            }

            let result = self.dispatch(agent_id, spec_text, input).await;
            if result.success {
                return result;
            }
            last_error = result.error;
        }

        ExecutionResult::failure(
            agent_id,
            format!(
                "Failed after {} attempts. Last error: {}",
                max_attempts.max(1),
                last_error.unwrap_or_else(|| "unknown".to_string()),
            ),
        )
    }

    async fn run_backend(&self, agent_id: &str, prompt: &str, input: &Value) -> BackendResponse {
        if self.config.use_real_backend {
            if let Some(backend) = &self.backend {
                match backend.execute(agent_id, prompt, input).await {
                    Ok(response) => return response,
                    Err(e) => {
                        warn!(agent_id, backend = backend.name(), error = %e,
                            "backend failed, falling back to mock");
                    }
                }
            }
        }
        match self.mock.execute(agent_id, prompt, input).await {
            Ok(response) => response,
            Err(e) => BackendResponse::failure(e.to_string()),
        }
    }

    async fn finish(
        &self,
        agent_id: &str,
        input: &Value,
        response: BackendResponse,
        duration: Duration,
    ) -> ExecutionResult {
        let tokens = response
            .tokens_used
            .unwrap_or_else(|| estimate_tokens(input, response.output.as_ref()));

        if response.success {
            self.counters
                .successful_executions
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters
                .failed_executions
                .fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .total_time_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.counters.total_tokens.fetch_add(tokens, Ordering::Relaxed);

        let result = ExecutionResult {
            success: response.success,
            output: response.output,
            tokens_used: tokens,
            error: response.error,
            agent_id: agent_id.to_string(),
            duration_secs: duration.as_secs_f64(),
            timestamp: chrono::Utc::now(),
        };

        self.history.write().await.push(TaskHistoryEntry {
            agent_id: result.agent_id.clone(),
            timestamp: result.timestamp,
            success: result.success,
            duration_secs: result.duration_secs,
        });

        result
    }

    /// Statistics snapshot, with derived rates
    pub async fn statistics(&self) -> RunStatistics {
        let total = self.counters.total_executions.load(Ordering::Relaxed);
        let successful = self.counters.successful_executions.load(Ordering::Relaxed);
        let failed = self.counters.failed_executions.load(Ordering::Relaxed);
        let total_time_secs =
            self.counters.total_time_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;

        RunStatistics {
            total_executions: total,
            successful_executions: successful,
            failed_executions: failed,
            total_time_secs,
            total_tokens: self.counters.total_tokens.load(Ordering::Relaxed),
            success_rate: successful as f64 / total.max(1) as f64 * 100.0,
            avg_execution_time: total_time_secs / total.max(1) as f64,
            cache_size: self.cache.read().await.len(),
            history_size: self.history.read().await.len(),
        }
    }

    /// Dispatch history, oldest first
    pub async fn history(&self) -> Vec<TaskHistoryEntry> {
        self.history.read().await.clone()
    }

    /// Drop all cached results
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Zero all counters and drop the history
    pub async fn reset_statistics(&self) {
        self.counters.total_executions.store(0, Ordering::Relaxed);
        self.counters.successful_executions.store(0, Ordering::Relaxed);
        self.counters.failed_executions.store(0, Ordering::Relaxed);
        self.counters.total_time_micros.store(0, Ordering::Relaxed);
        self.counters.total_tokens.store(0, Ordering::Relaxed);
        self.history.write().await.clear();
    }
}

/// Cache key: SHA-256 over the agent id and the canonical input encoding
pub fn cache_key(agent_id: &str, input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(agent_id.as_bytes());
    hasher.update(b":");
    hasher.update(canonical_json(input).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonical JSON encoding: objects rendered with recursively sorted keys
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

/// Rough token estimate when the backend reports no usage: a quarter of the
/// serialized input and output lengths
fn estimate_tokens(input: &Value, output: Option<&Value>) -> u64 {
    let input_len = input.to_string().len() as u64;
    let output_len = output.map_or(0, |v| v.to_string().len() as u64);
    (input_len + output_len) / 4
}

/// Full request text for a dispatch: agent identity, spec, input, task framing
fn build_task_prompt(agent_id: &str, spec_text: &str, input: &Value) -> String {
    format!(
        "You are the {agent_id} agent.\n\n\
         ## Agent Specification\n{spec_text}\n\n\
         ## Input Data\n{}\n\n\
         ## Instructions\n\
         Process the input according to your role as {agent_id}.\n\
         Return output in the expected JSON format.\n\
         Ensure all required fields are present.",
        serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string()),
    )
}
