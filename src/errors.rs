// ⚠️ Engine errors
// Coercion failures are fatal to a normalization call; structure errors are
// fatal to a validation call. Per-record validation failures are data, not errors.

use thiserror::Error;

/// A single value could not be converted to its canonical form
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("Invalid timestamp format: {value} (expected '{format}'): {reason}")]
    TimestampFormat {
        value: String,
        format: String,
        reason: String,
    },

    #[error("Epoch value out of range for a timestamp: {value}")]
    TimestampEpoch { value: String },

    #[error("Cannot normalize timestamp of type {type_name}: {value}")]
    TimestampType {
        type_name: &'static str,
        value: String,
    },

    #[error("Cannot convert to numeric: {value}")]
    Numeric { value: String },

    #[error("Cannot convert to boolean: {value}")]
    Boolean { value: String },

    #[error("Odds value below minimum ({minimum}): {value}")]
    OddsBelowMinimum { value: f64, minimum: f64 },

    #[error("Cannot convert to mapping: {value}")]
    Mapping { value: String },
}

/// Normalization of a batch was aborted at the first failing field
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Failed to normalize field '{field}' in record {record_index}: {source}")]
pub struct NormalizationError {
    pub record_index: usize,
    pub field: String,
    pub source: CoercionError,
}

/// The schema itself is malformed; raised before any record is examined
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationStructureError {
    #[error("Field '{field}' has min_value {min} greater than max_value {max}")]
    InvertedRange { field: String, min: f64, max: f64 },

    #[error("Field '{field}' has min_length {min} greater than max_length {max}")]
    InvertedLength { field: String, min: usize, max: usize },

    #[error("Field '{field}' has a non-finite numeric bound")]
    NonFiniteBound { field: String },

    #[error("Field '{field}' has an empty enum list")]
    EmptyEnum { field: String },
}
