//! Test case runner
//!
//! Executes one fixture end to end: gate the input on its declared schema,
//! dispatch through the executor, then judge the output on its declared
//! schema and on shape compatibility with the fixture's expectation. The
//! three-way outcome keeps agent bugs (`Fail`) distinct from harness or
//! backend trouble (`Error`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::backend::TaskExecutor;
use crate::error::Result;
use crate::fixture::Fixture;
use crate::spec::SpecProvider;
use crate::validate::schema::{Schema, SchemaValidator, value_kind};

/// Three-way test outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Output conformed to schema and expectation
    Pass,
    /// The agent ran but its input or output was wrong
    Fail,
    /// The dispatch itself failed; says nothing about the agent's logic
    Error,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Immutable record of one fixture execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub agent_id: String,
    pub test_name: String,
    pub status: TestStatus,
    pub duration_secs: f64,
    pub tokens_used: u64,
    pub input: Value,
    pub actual_output: Option<Value>,
    pub expected_output: Value,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-agent input and output schemas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSchemas {
    #[serde(default)]
    pub input_schema: Option<Schema>,
    #[serde(default)]
    pub output_schema: Option<Schema>,
}

/// Collection of declared schemas, keyed by agent id
///
/// Agents without an entry are unconstrained; their fixtures are judged on
/// shape compatibility alone.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: HashMap<String, AgentSchemas>,
}

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(default)]
    agent_validation: HashMap<String, AgentSchemas>,
}

impl SchemaSet {
    /// Empty schema set
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file with the
    /// `{"agent_validation": {"<agent>": {"input_schema": ..,
    /// "output_schema": ..}}}` layout
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SchemaFile = serde_json::from_str(&content)?;
        Ok(Self {
            schemas: file.agent_validation,
        })
    }

    /// Build from parsed JSON in the same layout
    pub fn from_value(value: Value) -> Result<Self> {
        let file: SchemaFile = serde_json::from_value(value)?;
        Ok(Self {
            schemas: file.agent_validation,
        })
    }

    /// Set both schemas for one agent
    pub fn with_agent(mut self, agent_id: impl Into<String>, schemas: AgentSchemas) -> Self {
        self.schemas.insert(agent_id.into(), schemas);
        self
    }

    pub fn input_schema(&self, agent_id: &str) -> Option<&Schema> {
        self.schemas.get(agent_id)?.input_schema.as_ref()
    }

    pub fn output_schema(&self, agent_id: &str) -> Option<&Schema> {
        self.schemas.get(agent_id)?.output_schema.as_ref()
    }
}

/// Runs single fixtures through dispatch and judgment
pub struct TestCaseRunner {
    executor: Arc<TaskExecutor>,
    specs: Arc<dyn SpecProvider>,
    schemas: SchemaSet,
}

impl TestCaseRunner {
    pub fn new(executor: Arc<TaskExecutor>, specs: Arc<dyn SpecProvider>, schemas: SchemaSet) -> Self {
        Self {
            executor,
            specs,
            schemas,
        }
    }

    /// Run one fixture for one agent
    pub async fn run_case(&self, agent_id: &str, fixture: &Fixture) -> TestResult {
        debug!(agent_id, test_name = %fixture.test_name, "running test case");

        // Invalid input is a test failure, not an execution; nothing is
        // dispatched and no time or tokens are charged.
        if let Some(schema) = self.schemas.input_schema(agent_id) {
            let (valid, errors) = SchemaValidator::new(schema.clone()).validate(&fixture.input);
            if !valid {
                return self.result(
                    agent_id,
                    fixture,
                    TestStatus::Fail,
                    0.0,
                    0,
                    None,
                    Some(format!("Input validation failed: {}", errors.join("; "))),
                );
            }
        }

        let spec = self.specs.spec_for(agent_id);
        let execution = self
            .executor
            .dispatch(agent_id, &spec.prompt, &fixture.input)
            .await;

        if !execution.success {
            return self.result(
                agent_id,
                fixture,
                TestStatus::Error,
                execution.duration_secs,
                execution.tokens_used,
                None,
                execution.error,
            );
        }

        let actual = execution.output.unwrap_or(Value::Null);

        let mut schema_errors = Vec::new();
        if let Some(schema) = self.schemas.output_schema(agent_id) {
            let (_, errors) = SchemaValidator::new(schema.clone()).validate(&actual);
            schema_errors = errors;
        }
        let compatible = shape_compatible(&actual, &fixture.expected_output);

        let (status, error_message) = if schema_errors.is_empty() && compatible {
            (TestStatus::Pass, None)
        } else if !schema_errors.is_empty() {
            (
                TestStatus::Fail,
                Some(format!("Validation: {}", schema_errors.join("; "))),
            )
        } else {
            (
                TestStatus::Fail,
                Some("Output doesn't match expected".to_string()),
            )
        };

        self.result(
            agent_id,
            fixture,
            status,
            execution.duration_secs,
            execution.tokens_used,
            Some(actual),
            error_message,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn result(
        &self,
        agent_id: &str,
        fixture: &Fixture,
        status: TestStatus,
        duration_secs: f64,
        tokens_used: u64,
        actual_output: Option<Value>,
        error_message: Option<String>,
    ) -> TestResult {
        TestResult {
            agent_id: agent_id.to_string(),
            test_name: fixture.test_name.clone(),
            status,
            duration_secs,
            tokens_used,
            input: fixture.input.clone(),
            actual_output,
            expected_output: fixture.expected_output.clone(),
            error_message,
            timestamp: Utc::now(),
        }
    }
}

/// Shape compatibility: every key the expectation names must be present in
/// the actual output with the same JSON value kind. Values themselves are not
/// compared; fixtures describe shape, not content.
pub fn shape_compatible(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Object(expected_map) => {
            let Value::Object(actual_map) = actual else {
                return false;
            };
            expected_map.iter().all(|(key, expected_value)| {
                actual_map
                    .get(key)
                    .is_some_and(|actual_value| value_kind(actual_value) == value_kind(expected_value))
            })
        }
        other => value_kind(actual) == value_kind(other),
    }
}
