//! Deterministic mock backend
//!
//! Stands in for a real agent runtime during harness runs and tests. Outputs
//! are canned per agent id, shaped to satisfy the declared output schemas, so
//! the rest of the harness can be exercised without any external service.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

use super::{AgentBackend, BackendResponse};
use crate::error::Result;

static CANNED_OUTPUTS: Lazy<HashMap<&'static str, fn(&Value) -> Value>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, fn(&Value) -> Value> = HashMap::new();
    map.insert("keyword-researcher", |input| {
        let topic = input
            .get("topic")
            .and_then(Value::as_str)
            .unwrap_or("topic");
        json!({
            "primary_keyword": format!("test keyword for {}", topic),
            "long_tail": ["long tail 1", "long tail 2", "long tail 3"],
            "search_volume": "medium",
            "difficulty": "medium"
        })
    });
    map.insert("topic-scout", |_| {
        json!({
            "trending_topics": ["trend 1", "trend 2", "trend 3"],
            "content_gaps": ["gap 1", "gap 2"],
            "opportunities": ["opportunity 1", "opportunity 2"]
        })
    });
    map.insert("source-gatherer", |_| {
        json!({
            "sources": [
                "https://source1.com",
                "https://source2.com",
                "https://source3.com",
                "https://source4.com",
                "https://source5.com"
            ],
            "key_points": ["point 1", "point 2", "point 3"]
        })
    });
    map.insert("body-writer", |input| {
        let first_section = input
            .get("outline")
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(Value::as_str)
            .unwrap_or("topic");
        json!({
            "body_content": format!("Generated content for {}...", first_section),
            "sections_written": input
                .get("sections")
                .cloned()
                .unwrap_or_else(|| json!(["section 1", "section 2"]))
        })
    });
    map.insert("grammar-checker", |input| {
        json!({
            "corrected_content": input
                .get("content")
                .cloned()
                .unwrap_or_else(|| json!("corrected text")),
            "errors_found": ["error 1", "error 2"]
        })
    });
    map.insert("content-atomizer", |_| {
        json!({
            "key_points": ["key point 1", "key point 2", "key point 3"],
            "snippets": ["snippet 1", "snippet 2"]
        })
    });
    map
});

/// Backend returning canned outputs after a fixed simulated delay
#[derive(Debug, Clone)]
pub struct MockBackend {
    delay: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
        }
    }
}

impl MockBackend {
    /// Mock backend with the default 100 ms simulated latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock backend with a custom simulated latency
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// The canned output for one agent and input
    pub fn output_for(agent_id: &str, input: &Value) -> Value {
        match CANNED_OUTPUTS.get(agent_id) {
            Some(generate) => generate(input),
            None => json!({
                "status": "completed",
                "output": format!("Mock output for {}", agent_id),
                "data": input
            }),
        }
    }
}

#[async_trait]
impl AgentBackend for MockBackend {
    async fn execute(
        &self,
        agent_id: &str,
        _spec_text: &str,
        input: &Value,
    ) -> Result<BackendResponse> {
        tokio::time::sleep(self.delay).await;
        Ok(BackendResponse::success(Self::output_for(agent_id, input)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
