// Row Evaluator - one record against a whole schema
// Iteration is schema-driven: record fields unknown to the schema are ignored

use crate::rules::{validate_field, FieldError};
use crate::schema::Schema;
use crate::value::{Record, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowOutcome {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

/// Validate every schema field of `record`, in schema order
pub fn validate_row(record: &Record, schema: &Schema) -> RowOutcome {
    let mut row = RowOutcome {
        is_valid: true,
        ..RowOutcome::default()
    };

    for (field_name, spec) in schema.iter() {
        let value = record.get(field_name).unwrap_or(&Value::Null);
        let outcome = validate_field(value, field_name, spec);

        row.is_valid &= outcome.is_valid;
        row.errors.extend(outcome.errors);
        row.warnings.extend(outcome.warnings);
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use crate::value::record_from_json;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .with_field("event_id", FieldSpec::of_type(FieldType::String).required())
            .with_field(
                "sport",
                FieldSpec::of_type(FieldType::String)
                    .required()
                    .with_enum(["football", "basketball"]),
            )
            .with_field(
                "volume",
                FieldSpec::of_type(FieldType::Integer)
                    .required()
                    .with_range(Some(0.0), None),
            )
    }

    #[test]
    fn test_valid_row() {
        let record =
            record_from_json(json!({"event_id": "evt_001", "sport": "football", "volume": 1000}))
                .unwrap();

        let outcome = validate_row(&record, &schema());
        assert!(outcome.is_valid);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_invalid_row_errors_follow_schema_order() {
        let record =
            record_from_json(json!({"volume": -100, "sport": "tennis", "event_id": null}))
                .unwrap();

        let outcome = validate_row(&record, &schema());
        let fields: Vec<&str> = outcome.errors.iter().map(|e| e.field.as_str()).collect();

        assert!(!outcome.is_valid);
        assert_eq!(fields, vec!["event_id", "sport", "volume"]);
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let record = record_from_json(json!({
            "event_id": "evt_002",
            "sport": "basketball",
            "bookmaker_notes": "ignored"
        }))
        .unwrap();

        let outcome = validate_row(&record, &schema());

        // volume is absent → treated as null → required failure; extra field ignored
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].field, "volume");
    }
}
