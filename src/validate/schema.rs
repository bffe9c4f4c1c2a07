//! Structural schema validation
//!
//! A small, self-contained schema grammar for validating agent inputs and
//! outputs: the six JSON kinds with kind-specific constraints, plus an `enum`
//! constraint usable at any kind. Errors are path-qualified
//! (`root.sources[2]`) so a failing fixture names exactly where it broke.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema kind (JSON type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl SchemaKind {
    /// Whether a value is of this kind
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (SchemaKind::Object, Value::Object(_))
                | (SchemaKind::Array, Value::Array(_))
                | (SchemaKind::String, Value::String(_))
                | (SchemaKind::Number, Value::Number(_))
                | (SchemaKind::Boolean, Value::Bool(_))
                | (SchemaKind::Null, Value::Null)
        )
    }

    /// Display name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Null => "null",
        }
    }
}

/// Runtime kind name of a JSON value, for diagnostics
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// A schema node
///
/// Deserializes from the conventional JSON Schema field names (`minItems`,
/// `additionalProperties`, ...), so schema files written for the harness read
/// like ordinary JSON Schema even though only this subset is honored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schema {
    /// Expected kind; absent means any kind is accepted
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaKind>,

    /// Object: property names that must be present
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Object: per-property schemas
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    /// Object: when `Some(false)`, undeclared keys are rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,

    /// Array: element schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Array: minimum element count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    /// Array: maximum element count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    /// String: minimum length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// String: maximum length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// String: regular expression the value must match from its start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Number: inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Number: inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Allowed values, checked at any kind
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl Schema {
    /// Shorthand for a bare typed schema
    pub fn of_kind(kind: SchemaKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Parse a schema from a JSON value
    pub fn from_value(value: Value) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Recursive structural validator for [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
}

impl SchemaValidator {
    /// Create a validator for the given schema
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Validate a value, returning whether it conforms and the ordered list
    /// of path-qualified errors
    pub fn validate(&self, value: &Value) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        self.validate_value(value, &self.schema, &mut errors, "root");
        (errors.is_empty(), errors)
    }

    fn validate_value(&self, value: &Value, schema: &Schema, errors: &mut Vec<String>, path: &str) {
        if let Some(kind) = schema.kind {
            if !kind.matches(value) {
                errors.push(format!(
                    "{}: Expected type {}, got {}",
                    path,
                    kind.name(),
                    value_kind(value)
                ));
                return;
            }
        }

        if let Some(ref allowed) = schema.allowed {
            if !allowed.contains(value) {
                errors.push(format!("{}: Value '{}' not in allowed values", path, value));
            }
        }

        match schema.kind {
            Some(SchemaKind::Object) => self.validate_object(value, schema, errors, path),
            Some(SchemaKind::Array) => self.validate_array(value, schema, errors, path),
            Some(SchemaKind::String) => self.validate_string(value, schema, errors, path),
            Some(SchemaKind::Number) => self.validate_number(value, schema, errors, path),
            // Boolean and null are type-only checks
            _ => {}
        }
    }

    fn validate_object(&self, value: &Value, schema: &Schema, errors: &mut Vec<String>, path: &str) {
        let Value::Object(map) = value else { return };

        // First missing required field wins and halts this object's checks;
        // sibling branches elsewhere in the structure still accumulate.
        for required in &schema.required {
            if !map.contains_key(required) {
                errors.push(format!("{}.{}: Required property missing", path, required));
                return;
            }
        }

        for (name, prop_schema) in &schema.properties {
            if let Some(prop_value) = map.get(name) {
                self.validate_value(prop_value, prop_schema, errors, &format!("{}.{}", path, name));
            }
        }

        if schema.additional_properties == Some(false) {
            let mut extra: Vec<&str> = map
                .keys()
                .filter(|k| !schema.properties.contains_key(*k))
                .map(String::as_str)
                .collect();
            if !extra.is_empty() {
                extra.sort_unstable();
                errors.push(format!("{}: Unexpected properties: {}", path, extra.join(", ")));
            }
        }
    }

    fn validate_array(&self, value: &Value, schema: &Schema, errors: &mut Vec<String>, path: &str) {
        let Value::Array(items) = value else { return };

        if let Some(min) = schema.min_items {
            if items.len() < min {
                errors.push(format!(
                    "{}: Array has {} items, minimum is {}",
                    path,
                    items.len(),
                    min
                ));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                errors.push(format!(
                    "{}: Array has {} items, maximum is {}",
                    path,
                    items.len(),
                    max
                ));
            }
        }

        if let Some(ref item_schema) = schema.items {
            for (i, item) in items.iter().enumerate() {
                self.validate_value(item, item_schema, errors, &format!("{}[{}]", path, i));
            }
        }
    }

    fn validate_string(&self, value: &Value, schema: &Schema, errors: &mut Vec<String>, path: &str) {
        let Value::String(s) = value else { return };

        if let Some(min) = schema.min_length {
            if s.chars().count() < min {
                errors.push(format!(
                    "{}: String length {} is less than minLength {}",
                    path,
                    s.chars().count(),
                    min
                ));
            }
        }
        if let Some(max) = schema.max_length {
            if s.chars().count() > max {
                errors.push(format!(
                    "{}: String length {} exceeds maxLength {}",
                    path,
                    s.chars().count(),
                    max
                ));
            }
        }

        if let Some(ref pattern) = schema.pattern {
            match Regex::new(pattern) {
                // Match must begin at the start of the string
                Ok(re) => {
                    if !re.find(s).is_some_and(|m| m.start() == 0) {
                        errors.push(format!("{}: String doesn't match pattern {}", path, pattern));
                    }
                }
                Err(_) => {
                    errors.push(format!("{}: Invalid pattern {}", path, pattern));
                }
            }
        }
    }

    fn validate_number(&self, value: &Value, schema: &Schema, errors: &mut Vec<String>, path: &str) {
        let Some(n) = value.as_f64() else { return };

        if let Some(min) = schema.minimum {
            if n < min {
                errors.push(format!("{}: Value {} is less than minimum {}", path, n, min));
            }
        }
        if let Some(max) = schema.maximum {
            if n > max {
                errors.push(format!("{}: Value {} exceeds maximum {}", path, n, max));
            }
        }
    }
}

#[cfg(test)]
mod schema_tests {
    use super::*;
    use serde_json::json;

    fn validator(schema: Value) -> SchemaValidator {
        SchemaValidator::new(Schema::from_value(schema).unwrap())
    }

    #[test]
    fn test_min_length_violation() {
        let v = validator(json!({
            "type": "object",
            "required": ["x"],
            "properties": {"x": {"type": "string", "minLength": 3}}
        }));

        let (valid, errors) = v.validate(&json!({"x": "ab"}));
        assert!(!valid);
        assert!(errors[0].contains("minLength"));
        assert!(errors[0].starts_with("root.x"));

        let (valid, errors) = v.validate(&json!({"x": "abc"}));
        assert!(valid, "{:?}", errors);
    }

    #[test]
    fn test_missing_required_short_circuits_object() {
        let v = validator(json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {"c": {"type": "number", "minimum": 10}}
        }));

        // Both a and b missing, c invalid: only the first missing field is
        // reported for this object.
        let (valid, errors) = v.validate(&json!({"c": 1}));
        assert!(!valid);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("root.a"));
    }

    #[test]
    fn test_errors_accumulate_across_branches() {
        let v = validator(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 5},
                "count": {"type": "number", "minimum": 1}
            }
        }));

        let (valid, errors) = v.validate(&json!({"name": "ab", "count": 0}));
        assert!(!valid);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_array_index_qualified_errors() {
        let v = validator(json!({
            "type": "array",
            "minItems": 2,
            "items": {"type": "string"}
        }));

        let (valid, errors) = v.validate(&json!(["ok", 7, "ok", false]));
        assert!(!valid);
        assert!(errors.iter().any(|e| e.starts_with("root[1]")));
        assert!(errors.iter().any(|e| e.starts_with("root[3]")));

        let (valid, errors) = v.validate(&json!(["only"]));
        assert!(!valid);
        assert!(errors[0].contains("minimum is 2"));
    }

    #[test]
    fn test_closed_world_object() {
        let v = validator(json!({
            "type": "object",
            "properties": {"known": {"type": "string"}},
            "additionalProperties": false
        }));

        let (valid, errors) = v.validate(&json!({"known": "yes", "extra": 1}));
        assert!(!valid);
        assert!(errors[0].contains("Unexpected properties"));
        assert!(errors[0].contains("extra"));
    }

    #[test]
    fn test_enum_at_any_kind() {
        let v = validator(json!({"type": "string", "enum": ["low", "medium", "high"]}));
        let (valid, _) = v.validate(&json!("medium"));
        assert!(valid);
        let (valid, errors) = v.validate(&json!("extreme"));
        assert!(!valid);
        assert!(errors[0].contains("allowed values"));

        let v = validator(json!({"type": "number", "enum": [1, 2, 3]}));
        let (valid, _) = v.validate(&json!(4));
        assert!(!valid);
    }

    #[test]
    fn test_number_bounds_inclusive() {
        let v = validator(json!({"type": "number", "minimum": 0, "maximum": 100}));
        assert!(v.validate(&json!(0)).0);
        assert!(v.validate(&json!(100)).0);
        assert!(!v.validate(&json!(-1)).0);
        assert!(!v.validate(&json!(100.5)).0);
    }

    #[test]
    fn test_pattern_matches_from_start() {
        let v = validator(json!({"type": "string", "pattern": "https?://"}));
        assert!(v.validate(&json!("https://example.com")).0);
        assert!(!v.validate(&json!("see https://example.com")).0);
    }

    #[test]
    fn test_type_mismatch_reports_both_kinds() {
        let v = validator(json!({"type": "object"}));
        let (valid, errors) = v.validate(&json!([1, 2]));
        assert!(!valid);
        assert!(errors[0].contains("Expected type object, got array"));
    }

    #[test]
    fn test_boolean_and_null_are_type_only() {
        let v = validator(json!({"type": "boolean"}));
        assert!(v.validate(&json!(true)).0);
        assert!(!v.validate(&json!("true")).0);

        let v = validator(json!({"type": "null"}));
        assert!(v.validate(&Value::Null).0);
        assert!(!v.validate(&json!(0)).0);
    }
}
