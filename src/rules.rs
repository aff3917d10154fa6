// 🏷️ Field Rules - declarative checks for a single field value
// Order is fixed: required → null policy → type → range → length → pattern → enum → custom

use crate::coerce::parse_f64;
use crate::schema::{CustomPredicate, FieldSpec, FieldType, Pattern};
use crate::value::Value;
use serde::Serialize;
use std::fmt;

// ============================================================================
// FIELD ERROR
// ============================================================================

/// One failed check, attributed to the field that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// FIELD OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub field_name: String,
    pub raw_value: Value,
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl FieldOutcome {
    pub fn pass(field_name: &str, value: &Value) -> Self {
        FieldOutcome {
            field_name: field_name.to_string(),
            raw_value: value.clone(),
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(FieldError::new(&self.field_name, message));
    }

    fn absorb(&mut self, other: FieldOutcome) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Error messages as plain text
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

// ============================================================================
// FIELD EVALUATION
// ============================================================================

/// Run every configured check for one field, in the fixed order
pub fn validate_field(value: &Value, field_name: &str, spec: &FieldSpec) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);

    if spec.required {
        let required = validate_required(value, field_name);
        if !required.is_valid {
            outcome.absorb(required);
            return outcome;
        }
    }

    // Non-nullable nulls continue; checks before custom skip null
    if value.is_null() && spec.nullable {
        return outcome;
    }

    if let Some(field_type) = spec.field_type {
        outcome.absorb(validate_type(value, field_name, field_type));
    }

    if spec.min_value.is_some() || spec.max_value.is_some() {
        outcome.absorb(validate_range(value, field_name, spec.min_value, spec.max_value));
    }

    if spec.min_length.is_some() || spec.max_length.is_some() {
        outcome.absorb(validate_length(value, field_name, spec.min_length, spec.max_length));
    }

    if let Some(pattern) = &spec.pattern {
        outcome.absorb(validate_pattern(value, field_name, pattern));
    }

    if let Some(allowed) = &spec.allowed {
        outcome.absorb(validate_enum(value, field_name, allowed));
    }

    if let Some(custom) = &spec.custom {
        outcome.absorb(validate_custom(value, field_name, custom));
    }

    outcome
}

// ============================================================================
// INDIVIDUAL CHECKS
// ============================================================================

pub fn validate_required(value: &Value, field_name: &str) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    if value.is_blank() {
        outcome.fail(format!("Required field '{}' is null or empty", field_name));
    }
    outcome
}

pub fn validate_type(value: &Value, field_name: &str, expected: FieldType) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    if !value.is_null() && !expected.matches(value) {
        outcome.fail(format!(
            "Field '{}' has type {}, expected {}",
            field_name,
            value.type_name(),
            expected
        ));
    }
    outcome
}

pub fn validate_range(
    value: &Value,
    field_name: &str,
    min_value: Option<f64>,
    max_value: Option<f64>,
) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);

    let number = match parse_f64(value) {
        Ok(Some(number)) => number,
        Ok(None) => return outcome,
        Err(err) => {
            outcome.fail(format!("Cannot compare {} as numeric: {}", field_name, err));
            return outcome;
        }
    };

    if let Some(min) = min_value {
        if number < min {
            outcome.fail(format!(
                "Field '{}' value {} below minimum {}",
                field_name,
                Value::Float(number),
                min
            ));
        }
    }

    if let Some(max) = max_value {
        if number > max {
            outcome.fail(format!(
                "Field '{}' value {} above maximum {}",
                field_name,
                Value::Float(number),
                max
            ));
        }
    }

    outcome
}

/// Length of the stringified value, in characters
pub fn validate_length(
    value: &Value,
    field_name: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    if value.is_null() {
        return outcome;
    }

    let length = value.to_string().chars().count();

    if let Some(min) = min_length {
        if length < min {
            outcome.fail(format!(
                "Field '{}' length {} below minimum {}",
                field_name, length, min
            ));
        }
    }

    if let Some(max) = max_length {
        if length > max {
            outcome.fail(format!(
                "Field '{}' length {} above maximum {}",
                field_name, length, max
            ));
        }
    }

    outcome
}

pub fn validate_pattern(value: &Value, field_name: &str, pattern: &Pattern) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    if value.is_null() {
        return outcome;
    }

    let text = value.to_string();
    if !pattern.is_match(&text) {
        outcome.fail(format!(
            "Field '{}' value '{}' does not match pattern '{}'",
            field_name,
            text,
            pattern.as_str()
        ));
    }
    outcome
}

pub fn validate_enum(value: &Value, field_name: &str, allowed: &[Value]) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    if value.is_null() || allowed.iter().any(|candidate| enum_matches(candidate, value)) {
        return outcome;
    }

    let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
    outcome.fail(format!(
        "Field '{}' value '{}' not in allowed values: [{}]",
        field_name,
        value,
        listed.join(", ")
    ));
    outcome
}

/// Numbers compare by value, so 1 matches 1.0
fn enum_matches(candidate: &Value, value: &Value) -> bool {
    match (candidate.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => candidate == value,
    }
}

pub fn validate_custom(value: &Value, field_name: &str, predicate: &CustomPredicate) -> FieldOutcome {
    let mut outcome = FieldOutcome::pass(field_name, value);
    match predicate.check(value) {
        Ok(true) => {}
        Ok(false) => outcome.fail(format!("Custom validation failed for field '{}'", field_name)),
        Err(reason) => outcome.fail(format!(
            "Error in custom validation for {}: {}",
            field_name, reason
        )),
    }
    outcome
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sports() -> Vec<Value> {
        vec![Value::from("football"), Value::from("basketball")]
    }

    #[test]
    fn test_required() {
        assert!(validate_required(&Value::from("value"), "field1").is_valid);
        assert!(!validate_required(&Value::Null, "field1").is_valid);
        assert!(!validate_required(&Value::from("   "), "field1").is_valid);
        assert!(validate_required(&Value::from(0), "field1").is_valid);
    }

    #[test]
    fn test_type() {
        assert!(validate_type(&Value::from("hello"), "field1", FieldType::String).is_valid);
        assert!(validate_type(&Value::Null, "field1", FieldType::String).is_valid);

        let outcome = validate_type(&Value::from(123), "field1", FieldType::String);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors[0].message, "Field 'field1' has type integer, expected string");
    }

    #[test]
    fn test_range() {
        assert!(validate_range(&Value::from(50), "field1", Some(0.0), Some(100.0)).is_valid);
        assert!(!validate_range(&Value::from(-10), "field1", Some(0.0), Some(100.0)).is_valid);
        assert!(!validate_range(&Value::from(150), "field1", Some(0.0), Some(100.0)).is_valid);
        assert!(validate_range(&Value::from("42"), "field1", Some(0.0), None).is_valid);

        let outcome = validate_range(&Value::from("lots"), "field1", Some(0.0), None);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].message.starts_with("Cannot compare field1 as numeric"));
        assert_eq!(outcome.errors[0].field, "field1");
    }

    #[test]
    fn test_length() {
        assert!(validate_length(&Value::from("hello"), "field1", Some(2), Some(10)).is_valid);
        assert!(!validate_length(&Value::from("hi"), "field1", Some(5), Some(10)).is_valid);
        assert!(!validate_length(&Value::from("hello world"), "field1", Some(2), Some(10)).is_valid);
        assert!(validate_length(&Value::from("ñandú"), "field1", Some(5), Some(5)).is_valid);
    }

    #[test]
    fn test_pattern() {
        let pattern = Pattern::new("evt_[0-9]{3}").unwrap();

        assert!(validate_pattern(&Value::from("evt_001"), "event_id", &pattern).is_valid);
        assert!(!validate_pattern(&Value::from("event-1"), "event_id", &pattern).is_valid);
    }

    #[test]
    fn test_enum_boundary() {
        assert!(validate_enum(&Value::from("football"), "sport", &sports()).is_valid);

        let outcome = validate_enum(&Value::from("tennis"), "sport", &sports());
        assert!(!outcome.is_valid);
        let message = &outcome.errors[0].message;
        assert!(message.contains("tennis"));
        assert!(message.contains("[football, basketball]"));
    }

    #[test]
    fn test_custom() {
        let even = CustomPredicate::from_fn(|v| matches!(v, Value::Integer(i) if i % 2 == 0));
        assert!(validate_custom(&Value::from(4), "n", &even).is_valid);
        assert!(!validate_custom(&Value::from(3), "n", &even).is_valid);

        let broken = CustomPredicate::new(|_| Err("lookup table missing".to_string()));
        let outcome = validate_custom(&Value::from(3), "n", &broken);
        assert!(!outcome.is_valid);
        assert!(outcome.errors[0].message.contains("lookup table missing"));
    }

    #[test]
    fn test_field_required_short_circuit() {
        let spec = FieldSpec::of_type(FieldType::Integer)
            .required()
            .with_range(Some(0.0), None)
            .with_enum([1, 2]);

        let outcome = validate_field(&Value::Null, "volume", &spec);

        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].message, "Required field 'volume' is null or empty");
    }

    #[test]
    fn test_field_nullable_short_circuit() {
        let spec = FieldSpec::of_type(FieldType::Float)
            .with_range(Some(0.0), Some(1.0))
            .with_pattern(Pattern::new("x").unwrap())
            .with_enum([0.5])
            .with_custom(CustomPredicate::from_fn(|_| false));

        assert!(validate_field(&Value::Null, "line", &spec).is_valid);
    }

    #[test]
    fn test_field_not_nullable_runs_remaining_checks() {
        let spec = FieldSpec::of_type(FieldType::Float)
            .nullable(false)
            .with_range(Some(0.0), Some(1.0))
            .with_length(Some(3), None)
            .with_pattern(Pattern::new("x").unwrap())
            .with_enum([0.5]);

        // Every check below custom skips null
        assert!(validate_field(&Value::Null, "line", &spec).is_valid);

        let spec = spec.with_custom(CustomPredicate::from_fn(|value| !value.is_null()));
        let outcome = validate_field(&Value::Null, "line", &spec);

        assert!(!outcome.is_valid);
        assert_eq!(
            outcome.messages(),
            vec!["Custom validation failed for field 'line'".to_string()]
        );
    }

    #[test]
    fn test_enum_compares_numbers_by_value() {
        let spec = FieldSpec::new().with_enum([1.0, 2.0]);

        assert!(validate_field(&Value::Integer(1), "volume", &spec).is_valid);
        assert!(validate_field(&Value::Float(2.0), "volume", &spec).is_valid);
        assert!(!validate_field(&Value::Integer(3), "volume", &spec).is_valid);
        assert!(!validate_field(&Value::from("1"), "volume", &spec).is_valid);
    }

    #[test]
    fn test_field_accumulates_after_type_mismatch() {
        let spec = FieldSpec::of_type(FieldType::Integer).with_range(Some(0.0), Some(100.0));

        assert!(validate_field(&Value::from(50), "field1", &spec).is_valid);
        assert!(!validate_field(&Value::from(150), "field1", &spec).is_valid);

        // String "500": wrong type and out of range, both reported
        let outcome = validate_field(&Value::from("500"), "field1", &spec);
        assert_eq!(outcome.errors.len(), 2);
    }
}
