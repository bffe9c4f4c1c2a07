//! Fixture definitions and stores
//!
//! A fixture is one recorded test case for one agent: a name, the input to
//! feed it, and the output shape we expect back. Fixtures are immutable and
//! supplied externally through a [`FixtureStore`]; the harness never invents
//! or rewrites them.

use crate::error::Result;
use crate::phases::PhaseRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A named (input, expected output) test case for one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// Fixture name, unique within its agent
    pub test_name: String,

    /// Input record fed to the agent
    pub input: Value,

    /// Expected output shape, compared key-by-key for type equality
    pub expected_output: Value,
}

impl Fixture {
    /// Create a fixture
    pub fn new(test_name: impl Into<String>, input: Value, expected_output: Value) -> Self {
        Self {
            test_name: test_name.into(),
            input,
            expected_output,
        }
    }
}

/// Source of fixtures, keyed by agent id
///
/// An unknown agent yields an empty list, never an error.
pub trait FixtureStore: Send + Sync {
    /// Ordered fixtures for one agent
    fn fixtures_for(&self, agent_id: &str) -> Vec<Fixture>;

    /// A specific fixture by name
    fn fixture_by_name(&self, agent_id: &str, test_name: &str) -> Option<Fixture> {
        self.fixtures_for(agent_id)
            .into_iter()
            .find(|f| f.test_name == test_name)
    }

    /// Agents that have at least one fixture
    fn agents(&self) -> Vec<String>;
}

/// Fixture store backed by an in-memory map
#[derive(Debug, Clone, Default)]
pub struct InMemoryFixtureStore {
    fixtures: HashMap<String, Vec<Fixture>>,
}

impl InMemoryFixtureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fixtures for an agent
    pub fn with_fixtures<I>(mut self, agent_id: impl Into<String>, fixtures: I) -> Self
    where
        I: IntoIterator<Item = Fixture>,
    {
        self.fixtures
            .entry(agent_id.into())
            .or_default()
            .extend(fixtures);
        self
    }
}

impl FixtureStore for InMemoryFixtureStore {
    fn fixtures_for(&self, agent_id: &str) -> Vec<Fixture> {
        self.fixtures.get(agent_id).cloned().unwrap_or_default()
    }

    fn agents(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.fixtures.keys().cloned().collect();
        agents.sort_unstable();
        agents
    }
}

/// Fixture store loaded from a JSON file
///
/// Expected layout, matching the recorded fixture files:
/// `{"fixtures": {"<agent-id>": [{"test_name": ..., "input": ...,
/// "expected_output": ...}, ...]}}`.
#[derive(Debug, Clone)]
pub struct JsonFixtureStore {
    fixtures: HashMap<String, Vec<Fixture>>,
}

#[derive(Deserialize)]
struct FixtureFile {
    #[serde(default)]
    fixtures: HashMap<String, Vec<Fixture>>,
}

impl JsonFixtureStore {
    /// Load fixtures from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: FixtureFile = serde_json::from_str(&content)?;
        Ok(Self {
            fixtures: file.fixtures,
        })
    }

    /// Build a store directly from parsed JSON
    pub fn from_value(value: Value) -> Result<Self> {
        let file: FixtureFile = serde_json::from_value(value)?;
        Ok(Self {
            fixtures: file.fixtures,
        })
    }
}

impl FixtureStore for JsonFixtureStore {
    fn fixtures_for(&self, agent_id: &str) -> Vec<Fixture> {
        self.fixtures.get(agent_id).cloned().unwrap_or_default()
    }

    fn agents(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.fixtures.keys().cloned().collect();
        agents.sort_unstable();
        agents
    }
}

/// A raw fixture entry missing one of its required fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureFieldError {
    pub agent_id: String,
    pub fixture_index: usize,
    pub missing_field: String,
}

/// Structural validation of a raw fixture document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureSetReport {
    pub valid_fixtures: usize,
    pub invalid_fixtures: usize,
    pub errors: Vec<FixtureFieldError>,
}

/// Check that every fixture in a raw `fixtures` document carries
/// `test_name`, `input`, and `expected_output`
pub fn validate_fixture_set(document: &Value) -> FixtureSetReport {
    const REQUIRED: [&str; 3] = ["test_name", "input", "expected_output"];
    let mut report = FixtureSetReport::default();

    let Some(fixtures) = document.get("fixtures").and_then(Value::as_object) else {
        return report;
    };

    for (agent_id, entries) in fixtures {
        let Some(entries) = entries.as_array() else { continue };
        for (index, entry) in entries.iter().enumerate() {
            let mut valid = true;
            for field in REQUIRED {
                if entry.get(field).is_none() {
                    valid = false;
                    report.errors.push(FixtureFieldError {
                        agent_id: agent_id.clone(),
                        fixture_index: index,
                        missing_field: field.to_string(),
                    });
                }
            }
            if valid {
                report.valid_fixtures += 1;
            } else {
                report.invalid_fixtures += 1;
            }
        }
    }
    report
}

/// Per-phase fixture coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseCoverage {
    pub total_agents: usize,
    pub agents_with_fixtures: usize,
    pub coverage_percentage: f64,
    pub total_test_cases: usize,
}

/// Coverage of the registry's agents by the store's fixtures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub timestamp: DateTime<Utc>,
    pub total_agents: usize,
    pub agents_with_fixtures: usize,
    pub total_test_cases: usize,
    pub overall_coverage: f64,
    pub coverage_by_phase: BTreeMap<String, PhaseCoverage>,
    pub missing_fixtures: Vec<String>,
}

/// Measure how much of a registry's agent roster the store covers
pub fn coverage_report(registry: &PhaseRegistry, store: &dyn FixtureStore) -> CoverageReport {
    let mut coverage_by_phase = BTreeMap::new();
    let mut missing_fixtures = Vec::new();
    let mut covered = 0usize;
    let mut total_cases = 0usize;

    for phase in registry.phases() {
        let mut phase_covered = 0usize;
        let mut phase_cases = 0usize;

        for agent in &phase.agents {
            let fixtures = store.fixtures_for(agent);
            if fixtures.is_empty() {
                missing_fixtures.push(agent.clone());
            } else {
                phase_covered += 1;
                phase_cases += fixtures.len();
            }
        }

        covered += phase_covered;
        total_cases += phase_cases;
        coverage_by_phase.insert(
            phase.name.clone(),
            PhaseCoverage {
                total_agents: phase.agents.len(),
                agents_with_fixtures: phase_covered,
                coverage_percentage: if phase.agents.is_empty() {
                    0.0
                } else {
                    phase_covered as f64 / phase.agents.len() as f64 * 100.0
                },
                total_test_cases: phase_cases,
            },
        );
    }

    let total_agents = registry.all_agents().len();
    CoverageReport {
        timestamp: Utc::now(),
        total_agents,
        agents_with_fixtures: covered,
        total_test_cases: total_cases,
        overall_coverage: if total_agents == 0 {
            0.0
        } else {
            covered as f64 / total_agents as f64 * 100.0
        },
        coverage_by_phase,
        missing_fixtures,
    }
}

#[cfg(test)]
mod fixture_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_store_lookup() {
        let store = InMemoryFixtureStore::new().with_fixtures(
            "keyword-researcher",
            [Fixture::new("basic", json!({"topic": "AI"}), json!({"primary_keyword": "x"}))],
        );

        assert_eq!(store.fixtures_for("keyword-researcher").len(), 1);
        assert!(store.fixtures_for("unknown-agent").is_empty());
        assert!(store.fixture_by_name("keyword-researcher", "basic").is_some());
        assert!(store.fixture_by_name("keyword-researcher", "missing").is_none());
    }

    #[test]
    fn test_json_store_round_trip() {
        let store = JsonFixtureStore::from_value(json!({
            "fixtures": {
                "body-writer": [
                    {"test_name": "outline", "input": {"outline": ["intro"]}, "expected_output": {"body_content": "text"}}
                ]
            }
        }))
        .unwrap();

        let fixtures = store.fixtures_for("body-writer");
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].test_name, "outline");
        assert_eq!(store.agents(), vec!["body-writer".to_string()]);
    }

    #[test]
    fn test_json_store_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures.json");
        std::fs::write(
            &path,
            r#"{"fixtures": {"topic-scout": [{"test_name": "t", "input": {}, "expected_output": {}}]}}"#,
        )
        .unwrap();

        let store = JsonFixtureStore::load(&path).unwrap();
        assert_eq!(store.fixtures_for("topic-scout").len(), 1);
    }

    #[test]
    fn test_fixture_set_validation() {
        let report = validate_fixture_set(&json!({
            "fixtures": {
                "a": [
                    {"test_name": "ok", "input": {}, "expected_output": {}},
                    {"test_name": "broken", "input": {}}
                ]
            }
        }));

        assert_eq!(report.valid_fixtures, 1);
        assert_eq!(report.invalid_fixtures, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].missing_field, "expected_output");
    }

    #[test]
    fn test_coverage_report() {
        let registry = PhaseRegistry::content_pipeline();
        let store = InMemoryFixtureStore::new()
            .with_fixtures(
                "keyword-researcher",
                [
                    Fixture::new("one", json!({}), json!({})),
                    Fixture::new("two", json!({}), json!({})),
                ],
            )
            .with_fixtures("body-writer", [Fixture::new("one", json!({}), json!({}))]);

        let report = coverage_report(&registry, &store);
        assert_eq!(report.total_agents, 41);
        assert_eq!(report.agents_with_fixtures, 2);
        assert_eq!(report.total_test_cases, 3);
        assert_eq!(report.coverage_by_phase["research"].agents_with_fixtures, 1);
        assert!(report.missing_fixtures.contains(&"topic-scout".to_string()));
    }
}
