// 📐 Shape Layer - Declarative field schemas
// A schema maps field names to the rules that coerce and validate them

use crate::errors::ValidationStructureError;
use crate::value::{Value, TIMESTAMP_FORMAT};
use anyhow::{Context as AnyhowContext, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Sports accepted by the built-in betting schema
pub const SPORTS: [&str; 4] = ["football", "basketball", "baseball", "hockey"];

pub const DEFAULT_DECIMAL_PLACES: u32 = 2;
pub const DEFAULT_ODDS_MINIMUM: f64 = 1.0;

// ============================================================================
// FIELD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Mapping,
    Currency,
    Odds,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::Mapping => "mapping",
            FieldType::Currency => "currency",
            FieldType::Odds => "odds",
        }
    }

    /// Parse a type name; unrecognized names fall back to `String`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "integer" | "int" => FieldType::Integer,
            "float" | "numeric" | "decimal" | "number" => FieldType::Float,
            "boolean" | "bool" => FieldType::Boolean,
            "timestamp" | "datetime" => FieldType::Timestamp,
            "mapping" | "dict" | "object" => FieldType::Mapping,
            "currency" => FieldType::Currency,
            "odds" => FieldType::Odds,
            _ => FieldType::String,
        }
    }

    /// Does the runtime type of `value` match this field type?
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => matches!(value, Value::String(_)),
            FieldType::Integer => matches!(value, Value::Integer(_)),
            FieldType::Float => matches!(value, Value::Float(_) | Value::Integer(_)),
            FieldType::Boolean => matches!(value, Value::Bool(_)),
            FieldType::Timestamp => matches!(value, Value::Timestamp(_)),
            FieldType::Mapping => matches!(value, Value::Mapping(_)),
            FieldType::Currency | FieldType::Odds => {
                matches!(value, Value::Float(_) | Value::Integer(_))
            }
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::parse(&name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STRING CASE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum StringCase {
    Lower,
    Upper,
    Title,
    #[default]
    Original,
}

impl From<String> for StringCase {
    fn from(name: String) -> Self {
        match name.trim().to_lowercase().as_str() {
            "lower" => StringCase::Lower,
            "upper" => StringCase::Upper,
            "title" => StringCase::Title,
            _ => StringCase::Original,
        }
    }
}

// ============================================================================
// PATTERN
// ============================================================================

/// Regular expression anchored at the start of the value
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", source))?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Pattern::new(&source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// ============================================================================
// CUSTOM PREDICATE
// ============================================================================

type PredicateFn = dyn Fn(&Value) -> Result<bool, String> + Send + Sync;

/// Caller-supplied check; `Err` reports a failure inside the predicate itself
#[derive(Clone)]
pub struct CustomPredicate(Arc<PredicateFn>);

impl CustomPredicate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        CustomPredicate(Arc::new(predicate))
    }

    /// Wrap an infallible predicate
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        CustomPredicate(Arc::new(move |value: &Value| Ok(predicate(value))))
    }

    pub fn check(&self, value: &Value) -> Result<bool, String> {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

// ============================================================================
// FIELD SPEC
// ============================================================================

/// Rules for one field. Unknown keys in configuration are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub required: bool,
    pub nullable: bool,

    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,

    #[serde(alias = "minValue")]
    pub min_value: Option<f64>,
    #[serde(alias = "maxValue")]
    pub max_value: Option<f64>,

    #[serde(alias = "minLength")]
    pub min_length: Option<usize>,
    #[serde(alias = "maxLength")]
    pub max_length: Option<usize>,

    pub pattern: Option<Pattern>,

    #[serde(rename = "enum")]
    pub allowed: Option<Vec<Value>>,

    /// Not loadable from configuration
    #[serde(skip)]
    pub custom: Option<CustomPredicate>,

    // Coercion parameters
    #[serde(alias = "decimalPlaces")]
    pub decimal_places: Option<u32>,
    #[serde(alias = "timestampFormat", alias = "format")]
    pub timestamp_format: Option<String>,
    pub case: StringCase,
    #[serde(alias = "oddsMinimum")]
    pub odds_minimum: Option<f64>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        FieldSpec {
            required: false,
            nullable: true,
            field_type: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            pattern: None,
            allowed: None,
            custom: None,
            decimal_places: None,
            timestamp_format: None,
            case: StringCase::Original,
            odds_minimum: None,
        }
    }
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec with a type and nothing else
    pub fn of_type(field_type: FieldType) -> Self {
        FieldSpec {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    /// Builder: mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_enum<I, V>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_custom(mut self, predicate: CustomPredicate) -> Self {
        self.custom = Some(predicate);
        self
    }

    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = Some(places);
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    pub fn with_case(mut self, case: StringCase) -> Self {
        self.case = case;
        self
    }

    pub fn with_odds_minimum(mut self, minimum: f64) -> Self {
        self.odds_minimum = Some(minimum);
        self
    }

    /// Type used for coercion (unset means string)
    pub fn coercion_type(&self) -> FieldType {
        self.field_type.unwrap_or(FieldType::String)
    }

    pub fn timestamp_format_or_default(&self) -> &str {
        self.timestamp_format.as_deref().unwrap_or(TIMESTAMP_FORMAT)
    }

    fn check_structure(&self, field: &str) -> Result<(), ValidationStructureError> {
        let bounds = [self.min_value, self.max_value, self.odds_minimum];
        if bounds.iter().flatten().any(|b| !b.is_finite()) {
            return Err(ValidationStructureError::NonFiniteBound {
                field: field.to_string(),
            });
        }

        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(ValidationStructureError::InvertedRange {
                    field: field.to_string(),
                    min,
                    max,
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ValidationStructureError::InvertedLength {
                    field: field.to_string(),
                    min,
                    max,
                });
            }
        }

        if matches!(&self.allowed, Some(allowed) if allowed.is_empty()) {
            return Err(ValidationStructureError::EmptyEnum {
                field: field.to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Ordered field name → FieldSpec mapping
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: IndexMap<String, FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a field (replaces an existing spec in place)
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        self.fields.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Load a schema from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read schema file: {:?}", path.as_ref()))?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse schema JSON")
    }

    /// Reject malformed rule sets before any record is touched
    pub fn check_structure(&self) -> Result<(), ValidationStructureError> {
        self.fields
            .iter()
            .try_for_each(|(name, spec)| spec.check_structure(name))
    }

    /// Override `nullable` for the listed fields; unknown names are skipped
    pub fn apply_null_policies(&mut self, policies: &IndexMap<String, bool>) {
        for (name, nullable) in policies {
            if let Some(spec) = self.fields.get_mut(name) {
                spec.nullable = *nullable;
            }
        }
    }

    // ========================================================================
    // BUILT-IN BETTING SCHEMAS
    // ========================================================================

    /// Validation rules for raw betting records
    pub fn betting_validation() -> Self {
        Schema::new()
            .with_field(
                "event_id",
                FieldSpec::of_type(FieldType::String)
                    .required()
                    .with_length(Some(1), None),
            )
            .with_field(
                "sport",
                FieldSpec::of_type(FieldType::String)
                    .required()
                    .with_enum(SPORTS),
            )
            .with_field("event_date", FieldSpec::of_type(FieldType::String).required())
            .with_field("teams", FieldSpec::new().required())
            .with_field("odds_provider", FieldSpec::of_type(FieldType::String).required())
            .with_field("odds", FieldSpec::of_type(FieldType::Mapping).required())
            .with_field("line", FieldSpec::of_type(FieldType::Float).nullable(true))
            .with_field(
                "volume",
                FieldSpec::of_type(FieldType::Integer)
                    .required()
                    .with_range(Some(0.0), None),
            )
            .with_field("timestamp", FieldSpec::of_type(FieldType::String).required())
            .with_field("data_source", FieldSpec::of_type(FieldType::String).required())
    }

    /// Coercion rules for raw betting records
    pub fn betting_normalization() -> Self {
        Schema::new()
            .with_field("event_id", FieldSpec::of_type(FieldType::String))
            .with_field(
                "sport",
                FieldSpec::of_type(FieldType::String).with_case(StringCase::Lower),
            )
            .with_field("event_date", FieldSpec::of_type(FieldType::Timestamp))
            .with_field("teams", FieldSpec::of_type(FieldType::String))
            .with_field(
                "odds_provider",
                FieldSpec::of_type(FieldType::String).with_case(StringCase::Lower),
            )
            .with_field("odds", FieldSpec::of_type(FieldType::Mapping))
            .with_field(
                "line",
                FieldSpec::of_type(FieldType::Float).with_decimal_places(2),
            )
            .with_field("volume", FieldSpec::of_type(FieldType::Integer))
            .with_field("timestamp", FieldSpec::of_type(FieldType::Timestamp))
            .with_field(
                "data_source",
                FieldSpec::of_type(FieldType::String).with_case(StringCase::Lower),
            )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_aliases_and_fallback() {
        assert_eq!(FieldType::parse("numeric"), FieldType::Float);
        assert_eq!(FieldType::parse("INT"), FieldType::Integer);
        assert_eq!(FieldType::parse("dict"), FieldType::Mapping);
        assert_eq!(FieldType::parse("uuid"), FieldType::String);
    }

    #[test]
    fn test_schema_from_json_keeps_order_and_defaults() {
        let schema = Schema::from_json_str(
            r#"{
                "volume": {"required": true, "type": "integer", "min_value": 0},
                "sport": {"type": "string", "enum": ["football", "hockey"], "case": "lower"},
                "line": {"type": "numeric", "decimalPlaces": 2, "unknown_key": 42}
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = schema.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["volume", "sport", "line"]);

        let volume = schema.get("volume").unwrap();
        assert!(volume.required);
        assert!(volume.nullable);
        assert_eq!(volume.min_value, Some(0.0));

        let sport = schema.get("sport").unwrap();
        assert_eq!(sport.case, StringCase::Lower);
        assert_eq!(sport.allowed.as_ref().map(Vec::len), Some(2));

        assert_eq!(schema.get("line").unwrap().decimal_places, Some(2));
    }

    #[test]
    fn test_invalid_pattern_rejected_on_load() {
        let result = Schema::from_json_str(r#"{"event_id": {"pattern": "evt_("}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_anchored_at_start() {
        let pattern = Pattern::new("evt_[0-9]+").unwrap();

        assert!(pattern.is_match("evt_001"));
        assert!(pattern.is_match("evt_001_extra"));
        assert!(!pattern.is_match("x_evt_001"));
    }

    #[test]
    fn test_structure_errors() {
        let inverted = Schema::new().with_field(
            "volume",
            FieldSpec::of_type(FieldType::Integer).with_range(Some(10.0), Some(1.0)),
        );
        assert!(matches!(
            inverted.check_structure(),
            Err(ValidationStructureError::InvertedRange { .. })
        ));

        let empty_enum = Schema::new().with_field(
            "sport",
            FieldSpec::new().with_enum(Vec::<Value>::new()),
        );
        assert!(matches!(
            empty_enum.check_structure(),
            Err(ValidationStructureError::EmptyEnum { .. })
        ));

        assert!(Schema::betting_validation().check_structure().is_ok());
    }

    #[test]
    fn test_apply_null_policies() {
        let mut schema = Schema::betting_validation();
        let mut policies = IndexMap::new();
        policies.insert("line".to_string(), false);
        policies.insert("not_a_field".to_string(), true);

        schema.apply_null_policies(&policies);

        assert!(!schema.get("line").unwrap().nullable);
        assert_eq!(schema.len(), 10);
    }
}
