//! Heuristic output-quality scoring
//!
//! Complements structural schema validation with a graded view of one output
//! value: four generic checks plus one agent-specific rule, each deducting
//! from a starting score of 100. Any failed check flips the report invalid
//! regardless of the remaining score.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Optional caller-supplied requirements for the generic checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityRequirements {
    /// Minimum length for string outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length for string outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Fields that must be present and non-null on object outputs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

/// Outcome of a single quality check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Whether the check passed
    pub passed: bool,

    /// Points deducted when the check failed
    pub penalty: i32,

    /// Human-readable findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl CheckOutcome {
    fn pass() -> Self {
        Self {
            passed: true,
            penalty: 0,
            notes: Vec::new(),
        }
    }

    fn fail(penalty: i32, note: impl Into<String>) -> Self {
        Self {
            passed: false,
            penalty,
            notes: vec![note.into()],
        }
    }
}

/// Scoring report for one output value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Agent whose output was scored
    pub agent_id: String,

    /// When the scoring ran
    pub timestamp: DateTime<Utc>,

    /// Per-check outcomes, keyed by check name
    pub checks: BTreeMap<String, CheckOutcome>,

    /// False if any check failed
    pub is_valid: bool,

    /// 0..=100 after all deductions
    pub score: i32,
}

/// Agent-specific quality rule
///
/// Unmatched agents get no extra rule; the registry maps agent id to one of
/// these tagged variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AgentRule {
    /// A list field must have at least `min` entries
    MinListEntries {
        field: String,
        min: usize,
        penalty: i32,
    },

    /// A string field must have at least `min` whitespace-separated words
    MinWordCount {
        field: String,
        min: usize,
        penalty: i32,
    },

    /// A list field must have at least `min` distinct entries
    MinDistinctEntries {
        field: String,
        min: usize,
        penalty: i32,
    },
}

impl AgentRule {
    fn apply(&self, output: &Value) -> CheckOutcome {
        let Value::Object(map) = output else {
            return CheckOutcome::pass();
        };

        match self {
            AgentRule::MinListEntries { field, min, penalty } => {
                match map.get(field).and_then(Value::as_array) {
                    Some(items) if items.len() < *min => CheckOutcome::fail(
                        *penalty,
                        format!("'{}' has {} entries, minimum is {}", field, items.len(), min),
                    ),
                    _ => CheckOutcome::pass(),
                }
            }
            AgentRule::MinWordCount { field, min, penalty } => {
                match map.get(field).and_then(Value::as_str) {
                    Some(text) if text.split_whitespace().count() < *min => CheckOutcome::fail(
                        *penalty,
                        format!(
                            "'{}' has {} words, minimum is {}",
                            field,
                            text.split_whitespace().count(),
                            min
                        ),
                    ),
                    _ => CheckOutcome::pass(),
                }
            }
            AgentRule::MinDistinctEntries { field, min, penalty } => {
                match map.get(field).and_then(Value::as_array) {
                    Some(items) => {
                        let distinct: HashSet<String> =
                            items.iter().map(|v| v.to_string()).collect();
                        if distinct.len() < *min {
                            CheckOutcome::fail(
                                *penalty,
                                format!(
                                    "'{}' has {} distinct entries, minimum is {}",
                                    field,
                                    distinct.len(),
                                    min
                                ),
                            )
                        } else {
                            CheckOutcome::pass()
                        }
                    }
                    None => CheckOutcome::pass(),
                }
            }
        }
    }
}

/// Built-in rules for the content-pipeline agents
static DEFAULT_RULES: Lazy<HashMap<&'static str, AgentRule>> = Lazy::new(|| {
    HashMap::from([
        (
            "keyword-researcher",
            AgentRule::MinListEntries {
                field: "long_tail".to_string(),
                min: 3,
                penalty: 25,
            },
        ),
        (
            "body-writer",
            AgentRule::MinWordCount {
                field: "body_content".to_string(),
                min: 100,
                penalty: 35,
            },
        ),
        (
            "source-gatherer",
            AgentRule::MinDistinctEntries {
                field: "sources".to_string(),
                min: 5,
                penalty: 30,
            },
        ),
    ])
});

/// Heuristic scorer for one output value
#[derive(Debug, Clone, Default)]
pub struct OutputQualityValidator {
    /// Rules registered on top of the built-in set
    extra_rules: HashMap<String, AgentRule>,
}

impl OutputQualityValidator {
    /// Create a validator with the built-in agent rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or override) an agent-specific rule
    pub fn with_rule(mut self, agent_id: impl Into<String>, rule: AgentRule) -> Self {
        self.extra_rules.insert(agent_id.into(), rule);
        self
    }

    /// Score an output value
    pub fn score(
        &self,
        agent_id: &str,
        output: &Value,
        requirements: Option<&QualityRequirements>,
    ) -> (bool, QualityReport) {
        let mut checks = BTreeMap::new();

        checks.insert(
            "content_length".to_string(),
            Self::check_content_length(output, requirements),
        );
        checks.insert(
            "required_fields".to_string(),
            Self::check_required_fields(output, requirements),
        );
        checks.insert(
            "format_consistency".to_string(),
            Self::check_format_consistency(output),
        );
        checks.insert(
            "semantic_validity".to_string(),
            Self::check_semantic_validity(output),
        );

        let rule = self
            .extra_rules
            .get(agent_id)
            .or_else(|| DEFAULT_RULES.get(agent_id));
        checks.insert(
            "agent_specific".to_string(),
            rule.map_or_else(CheckOutcome::pass, |r| r.apply(output)),
        );

        let is_valid = checks.values().all(|c| c.passed);
        let deducted: i32 = checks.values().filter(|c| !c.passed).map(|c| c.penalty).sum();
        let score = (100 - deducted).max(0);

        let report = QualityReport {
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            checks,
            is_valid,
            score,
        };
        (is_valid, report)
    }

    fn check_content_length(output: &Value, requirements: Option<&QualityRequirements>) -> CheckOutcome {
        let Value::String(s) = output else {
            return CheckOutcome::pass();
        };
        let length = s.chars().count();
        let min = requirements.and_then(|r| r.min_length).unwrap_or(0);

        if length < min {
            return CheckOutcome::fail(20, format!("Content too short: {} < {}", length, min));
        }
        if let Some(max) = requirements.and_then(|r| r.max_length) {
            if length > max {
                return CheckOutcome::fail(10, format!("Content too long: {} > {}", length, max));
            }
        }
        CheckOutcome::pass()
    }

    fn check_required_fields(output: &Value, requirements: Option<&QualityRequirements>) -> CheckOutcome {
        let (Value::Object(map), Some(reqs)) = (output, requirements) else {
            return CheckOutcome::pass();
        };

        let missing: Vec<&str> = reqs
            .required_fields
            .iter()
            .filter(|f| map.get(f.as_str()).is_none_or(Value::is_null))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            CheckOutcome::pass()
        } else {
            CheckOutcome::fail(30, format!("Missing fields: {}", missing.join(", ")))
        }
    }

    /// Every list-valued field must hold elements of one runtime kind.
    /// Deliberately a soft penalty, not a schema failure.
    fn check_format_consistency(output: &Value) -> CheckOutcome {
        let Value::Object(map) = output else {
            return CheckOutcome::pass();
        };

        let mut outcome = CheckOutcome::pass();
        for (key, value) in map {
            let Value::Array(items) = value else { continue };
            let Some(first) = items.first() else { continue };

            let first_kind = super::schema::value_kind(first);
            if items.iter().any(|i| super::schema::value_kind(i) != first_kind) {
                outcome.passed = false;
                outcome.penalty += 15;
                outcome.notes.push(format!("Mixed types in array '{}'", key));
            }
        }
        outcome
    }

    fn check_semantic_validity(output: &Value) -> CheckOutcome {
        match output {
            Value::String(s) => {
                if s.trim().is_empty() {
                    CheckOutcome::fail(50, "Empty content")
                } else if s.split_whitespace().collect::<HashSet<_>>().len() < 10 {
                    CheckOutcome::fail(40, "Content appears repetitive or meaningless")
                } else {
                    CheckOutcome::pass()
                }
            }
            Value::Object(map) => {
                // First blank field only
                for (key, value) in map {
                    if let Value::String(s) = value {
                        if s.trim().is_empty() {
                            return CheckOutcome::fail(20, format!("Empty value in '{}'", key));
                        }
                    }
                }
                CheckOutcome::pass()
            }
            _ => CheckOutcome::pass(),
        }
    }
}

#[cfg(test)]
mod quality_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_writer_word_count() {
        let validator = OutputQualityValidator::new();

        let short: String = (0..50).map(|i| format!("word{} ", i)).collect();
        let (valid, report) =
            validator.score("body-writer", &json!({"body_content": short}), None);
        assert!(!valid);
        let agent_check = &report.checks["agent_specific"];
        assert!(!agent_check.passed);
        assert_eq!(agent_check.penalty, 35);
        assert_eq!(report.score, 65);

        let long: String = (0..120).map(|i| format!("word{} ", i)).collect();
        let (valid, report) =
            validator.score("body-writer", &json!({"body_content": long}), None);
        assert!(valid, "{:?}", report.checks);
        assert!(report.checks["agent_specific"].passed);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_keyword_researcher_long_tail() {
        let validator = OutputQualityValidator::new();
        let (valid, report) = validator.score(
            "keyword-researcher",
            &json!({"primary_keyword": "rust testing", "long_tail": ["a", "b"]}),
            None,
        );
        assert!(!valid);
        assert_eq!(report.checks["agent_specific"].penalty, 25);
    }

    #[test]
    fn test_source_gatherer_distinct_sources() {
        let validator = OutputQualityValidator::new();
        let (valid, _) = validator.score(
            "source-gatherer",
            &json!({"sources": ["https://a", "https://a", "https://a", "https://b", "https://c"]}),
            None,
        );
        assert!(!valid);

        let (valid, _) = validator.score(
            "source-gatherer",
            &json!({"sources": ["https://a", "https://b", "https://c", "https://d", "https://e"]}),
            None,
        );
        assert!(valid);
    }

    #[test]
    fn test_unknown_agent_gets_no_extra_rule() {
        let validator = OutputQualityValidator::new();
        let (valid, report) = validator.score("mystery-agent", &json!({"anything": "goes here"}), None);
        assert!(valid);
        assert!(report.checks["agent_specific"].passed);
    }

    #[test]
    fn test_empty_string_heavy_penalty() {
        let validator = OutputQualityValidator::new();
        let (valid, report) = validator.score("some-agent", &json!("   "), None);
        assert!(!valid);
        assert_eq!(report.score, 50);
    }

    #[test]
    fn test_repetitive_string() {
        let validator = OutputQualityValidator::new();
        let (valid, report) =
            validator.score("some-agent", &json!("same same same same same"), None);
        assert!(!valid);
        assert_eq!(report.checks["semantic_validity"].penalty, 40);
    }

    #[test]
    fn test_blank_object_field_first_offender_only() {
        let validator = OutputQualityValidator::new();
        let (valid, report) = validator.score(
            "some-agent",
            &json!({"a": "", "b": "", "c": "fine"}),
            None,
        );
        assert!(!valid);
        let check = &report.checks["semantic_validity"];
        assert_eq!(check.penalty, 20);
        assert_eq!(check.notes.len(), 1);
    }

    #[test]
    fn test_mixed_type_arrays_penalized_per_field() {
        let validator = OutputQualityValidator::new();
        let (valid, report) = validator.score(
            "some-agent",
            &json!({"xs": [1, "two", 3], "ys": ["a", 2], "ok": ["a", "b"]}),
            None,
        );
        assert!(!valid);
        let check = &report.checks["format_consistency"];
        assert_eq!(check.penalty, 30);
        assert_eq!(check.notes.len(), 2);
    }

    #[test]
    fn test_required_fields_with_null_value() {
        let validator = OutputQualityValidator::new();
        let reqs = QualityRequirements {
            required_fields: vec!["title".to_string(), "body".to_string()],
            ..Default::default()
        };
        let (valid, report) = validator.score(
            "some-agent",
            &json!({"title": null, "body": "present and accounted for today"}),
            Some(&reqs),
        );
        assert!(!valid);
        assert!(report.checks["required_fields"].notes[0].contains("title"));
    }

    #[test]
    fn test_length_bounds_for_string_output() {
        let validator = OutputQualityValidator::new();
        let reqs = QualityRequirements {
            min_length: Some(20),
            max_length: Some(40),
            ..Default::default()
        };

        let (_, report) = validator.score("a", &json!("far too short"), Some(&reqs));
        assert_eq!(report.checks["content_length"].penalty, 20);

        let (_, report) = validator.score(
            "a",
            &json!("this string is comfortably past the upper bound set above"),
            Some(&reqs),
        );
        assert_eq!(report.checks["content_length"].penalty, 10);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let validator = OutputQualityValidator::new()
            .with_rule(
                "harsh-agent",
                AgentRule::MinWordCount {
                    field: "text".to_string(),
                    min: 1000,
                    penalty: 90,
                },
            );
        let reqs = QualityRequirements {
            required_fields: vec!["missing".to_string()],
            ..Default::default()
        };
        let (valid, report) = validator.score(
            "harsh-agent",
            &json!({"text": "tiny", "broken": ["a", 1], "blank": ""}),
            Some(&reqs),
        );
        assert!(!valid);
        assert_eq!(report.score, 0);
    }
}
