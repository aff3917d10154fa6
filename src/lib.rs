// Outlier Quality - Core Library
// Normalization and validation of sports-betting records, used by the CLI and tests

pub mod value;        // Dynamically typed field values
pub mod errors;       // Coercion / normalization / schema errors
pub mod schema;       // Field specs and schemas
pub mod coerce;       // Field Coercer
pub mod rules;        // Field Rule Evaluator
pub mod row;          // Row Evaluator
pub mod data_quality; // Batch Aggregator
pub mod config;       // Engine configuration
pub mod loader;       // CSV / JSON record loading

// Re-export commonly used types
pub use value::{record_from_json, Record, Value, TIMESTAMP_FORMAT};
pub use errors::{CoercionError, NormalizationError, ValidationStructureError};
pub use schema::{CustomPredicate, FieldSpec, FieldType, Pattern, Schema, StringCase};
pub use coerce::{
    coerce_boolean, coerce_currency, coerce_field, coerce_integer, coerce_mapping,
    coerce_numeric, coerce_odds, coerce_string, coerce_timestamp,
};
pub use rules::{validate_field, FieldError, FieldOutcome};
pub use row::{validate_row, RowOutcome};
pub use data_quality::{
    normalize_row, DataQualityEngine, ErrorAttribution, ErrorSample, ValidationReport,
};
pub use config::EngineConfig;
pub use loader::{dedupe_records, load_records, write_records_json, written_form};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
