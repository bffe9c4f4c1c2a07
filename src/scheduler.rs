//! Batch scheduling
//!
//! Runs a batch of dispatch requests through a shared [`TaskExecutor`],
//! either one at a time in submission order or on a semaphore-bounded worker
//! pool in completion order. Each request carries its own timeout; a timed
//! out request yields a failure result scoped to that request while the
//! underlying work is abandoned, not force-cancelled.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::backend::{ExecutionResult, TaskExecutor};

/// One unit of work for the scheduler
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub agent_id: String,
    pub spec_text: String,
    pub input: Value,

    /// Per-request timeout; the scheduler default applies when `None`
    pub timeout: Option<Duration>,
}

impl DispatchRequest {
    /// Request with the scheduler's default timeout
    pub fn new(agent_id: impl Into<String>, spec_text: impl Into<String>, input: Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            spec_text: spec_text.into(),
            input,
            timeout: None,
        }
    }

    /// Override the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Scheduler tuning knobs
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run batches on the worker pool instead of sequentially
    pub parallel: bool,

    /// Worker pool size; the effective bound is `min(max_parallel, batch len)`
    pub max_parallel: usize,

    /// Timeout for requests that do not set their own
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_parallel: 4,
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded batch runner over a shared executor
#[derive(Debug, Clone, Default)]
pub struct BatchScheduler {
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Run a batch, honoring the configured mode
    ///
    /// Sequential batches return results in submission order; parallel
    /// batches in completion order. A single request failing, timing out, or
    /// panicking never aborts its siblings.
    pub async fn run_batch(
        &self,
        executor: Arc<TaskExecutor>,
        requests: Vec<DispatchRequest>,
    ) -> Vec<ExecutionResult> {
        if self.config.parallel && requests.len() > 1 {
            self.run_parallel(executor, requests).await
        } else {
            self.run_sequential(executor, requests).await
        }
    }

    async fn run_sequential(
        &self,
        executor: Arc<TaskExecutor>,
        requests: Vec<DispatchRequest>,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.run_one(executor.clone(), request, None).await);
        }
        results
    }

    async fn run_parallel(
        &self,
        executor: Arc<TaskExecutor>,
        requests: Vec<DispatchRequest>,
    ) -> Vec<ExecutionResult> {
        let workers = self.config.max_parallel.max(1).min(requests.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        debug!(workers, batch = requests.len(), "running parallel batch");

        let mut in_flight = FuturesUnordered::new();
        for request in requests {
            in_flight.push(self.run_one(executor.clone(), request, Some(semaphore.clone())));
        }

        let mut results = Vec::with_capacity(in_flight.len());
        while let Some(result) = in_flight.next().await {
            results.push(result);
        }
        results
    }

    async fn run_one(
        &self,
        executor: Arc<TaskExecutor>,
        request: DispatchRequest,
        semaphore: Option<Arc<Semaphore>>,
    ) -> ExecutionResult {
        let agent_id = request.agent_id.clone();
        let timeout = request.timeout.unwrap_or(self.config.default_timeout);

        let permit = match semaphore {
            Some(semaphore) => match semaphore.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return ExecutionResult::failure(&agent_id, "worker pool closed"),
            },
            None => None,
        };

        // The worker slot is held by the spawned task, so an abandoned
        // (timed out) dispatch keeps occupying it until it finishes.
        let work = tokio::spawn(async move {
            let _permit = permit;
            executor
                .dispatch(&request.agent_id, &request.spec_text, &request.input)
                .await
        });

        match tokio::time::timeout(timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ExecutionResult::failure(&agent_id, format!("task panicked: {}", e)),
            Err(_) => ExecutionResult::failure(
                &agent_id,
                format!("timed out after {:.1}s", timeout.as_secs_f64()),
            ),
        }
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;
    use crate::backend::{AgentBackend, BackendResponse, ExecutorConfig};
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Sleeps for `sleep_ms` from the input, tracking peak concurrency
    struct SleepyBackend {
        current: AtomicU32,
        peak: AtomicU32,
    }

    impl SleepyBackend {
        fn new() -> Self {
            Self {
                current: AtomicU32::new(0),
                peak: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AgentBackend for SleepyBackend {
        async fn execute(
            &self,
            agent_id: &str,
            _spec_text: &str,
            input: &Value,
        ) -> Result<BackendResponse> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let sleep_ms = input.get("sleep_ms").and_then(Value::as_u64).unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;

            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(BackendResponse::success(json!({"agent": agent_id})))
        }

        fn name(&self) -> &str {
            "sleepy"
        }
    }

    fn executor_with(backend: Arc<dyn AgentBackend>) -> Arc<TaskExecutor> {
        Arc::new(TaskExecutor::with_backend(
            backend,
            ExecutorConfig {
                use_real_backend: true,
                cache_results: false,
                mock_delay: Duration::ZERO,
                retry_delay: Duration::from_millis(1),
            },
        ))
    }

    fn request(agent_id: &str, sleep_ms: u64) -> DispatchRequest {
        DispatchRequest::new(agent_id, "spec", json!({"sleep_ms": sleep_ms}))
    }

    #[tokio::test]
    async fn test_sequential_preserves_submission_order() {
        let executor = executor_with(Arc::new(SleepyBackend::new()));
        let scheduler = BatchScheduler::new(SchedulerConfig {
            parallel: false,
            ..Default::default()
        });

        let results = scheduler
            .run_batch(
                executor,
                vec![request("alpha", 5), request("beta", 1), request("gamma", 1)],
            )
            .await;

        let order: Vec<&str> = results.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(order, ["alpha", "beta", "gamma"]);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn test_parallel_batch_with_one_timeout() {
        let executor = executor_with(Arc::new(SleepyBackend::new()));
        let scheduler = BatchScheduler::new(SchedulerConfig {
            parallel: true,
            max_parallel: 4,
            default_timeout: Duration::from_secs(5),
        });

        let mut requests: Vec<DispatchRequest> = (0..4)
            .map(|i| request(&format!("agent-{}", i), 5))
            .collect();
        requests.push(request("slow-agent", 2_000).with_timeout(Duration::from_millis(50)));

        let results = scheduler.run_batch(executor, requests).await;

        assert_eq!(results.len(), 5);
        let failures: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].agent_id, "slow-agent");
        assert!(failures[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(results.iter().filter(|r| r.success).count(), 4);
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let backend = Arc::new(SleepyBackend::new());
        let executor = executor_with(backend.clone());
        let scheduler = BatchScheduler::new(SchedulerConfig {
            parallel: true,
            max_parallel: 2,
            default_timeout: Duration::from_secs(5),
        });

        let requests = (0..6)
            .map(|i| request(&format!("agent-{}", i), 20))
            .collect();
        let results = scheduler.run_batch(executor, requests).await;

        assert_eq!(results.len(), 6);
        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_single_request_runs_sequentially() {
        let executor = executor_with(Arc::new(SleepyBackend::new()));
        let scheduler = BatchScheduler::new(SchedulerConfig::default());

        let results = scheduler.run_batch(executor, vec![request("solo", 1)]).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
    }
}
