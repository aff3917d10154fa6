// ✅ Data Quality Engine - batch validation and normalization
// Drives the row evaluator over a batch and folds outcomes into one report

use crate::coerce::coerce_field;
use crate::errors::{CoercionError, NormalizationError, ValidationStructureError};
use crate::row::validate_row;
use crate::schema::Schema;
use crate::value::{Record, Value};
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, info, info_span, warn};

pub const DEFAULT_MAX_ERROR_SAMPLES: usize = 10;

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSample {
    pub field: String,
    pub value: Value,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub warnings: Vec<String>,
    pub errors_by_field: IndexMap<String, usize>,
    pub error_samples: Vec<ErrorSample>,
    pub max_error_samples: usize,
}

impl ValidationReport {
    pub fn new(total_records: usize, max_error_samples: usize) -> Self {
        ValidationReport {
            total_records,
            valid_records: 0,
            invalid_records: 0,
            warnings: Vec::new(),
            errors_by_field: IndexMap::new(),
            error_samples: Vec::new(),
            max_error_samples,
        }
    }

    /// Keep a sample only while under the cap
    pub fn add_error_sample(&mut self, field: &str, value: Value, error: &str) {
        if self.error_samples.len() < self.max_error_samples {
            self.error_samples.push(ErrorSample {
                field: field.to_string(),
                value,
                error: error.to_string(),
            });
        }
    }

    /// 100 × valid / total, or 0 for an empty batch
    pub fn validity_percentage(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            100.0 * self.valid_records as f64 / self.total_records as f64
        }
    }

    pub fn is_fully_valid(&self) -> bool {
        self.invalid_records == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} records valid ({:.1}%), {} invalid, {} fields with errors",
            self.valid_records,
            self.total_records,
            self.validity_percentage(),
            self.invalid_records,
            self.errors_by_field.len()
        )
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationReport", 8)?;
        state.serialize_field("totalRecords", &self.total_records)?;
        state.serialize_field("validRecords", &self.valid_records)?;
        state.serialize_field("invalidRecords", &self.invalid_records)?;
        state.serialize_field("validityPercentage", &self.validity_percentage())?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("errorsByField", &self.errors_by_field)?;
        state.serialize_field("errorSamples", &self.error_samples)?;
        state.serialize_field("maxErrorSamples", &self.max_error_samples)?;
        state.end()
    }
}

// ============================================================================
// ERROR ATTRIBUTION
// ============================================================================

/// How a row error is mapped back to a field name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAttribution {
    /// Field name carried on the error itself
    #[default]
    Structured,
    /// First single-quoted token in the message, else "unknown"
    QuotedToken,
}

/// Text convention used by older report consumers
pub fn quoted_field_name(message: &str) -> &str {
    message.split('\'').nth(1).unwrap_or("unknown")
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct DataQualityEngine {
    /// Cap on retained error samples (default: 10)
    pub max_error_samples: usize,

    pub attribution: ErrorAttribution,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            max_error_samples: DEFAULT_MAX_ERROR_SAMPLES,
            attribution: ErrorAttribution::Structured,
        }
    }

    pub fn with_max_error_samples(mut self, max: usize) -> Self {
        self.max_error_samples = max;
        self
    }

    pub fn with_attribution(mut self, attribution: ErrorAttribution) -> Self {
        self.attribution = attribution;
        self
    }

    /// Validate a batch. Only a malformed schema is an error; bad records
    /// are counted in the report.
    pub fn validate_batch(
        &self,
        records: &[Record],
        schema: &Schema,
    ) -> Result<ValidationReport, ValidationStructureError> {
        let span = info_span!("validate_batch", records = records.len(), fields = schema.len());
        let _guard = span.enter();

        if let Err(err) = schema.check_structure() {
            warn!(error = %err, "Rejecting malformed schema");
            return Err(err);
        }

        let mut report = ValidationReport::new(records.len(), self.max_error_samples);

        for (index, record) in records.iter().enumerate() {
            let row = validate_row(record, schema);

            if row.is_valid {
                report.valid_records += 1;
            } else {
                report.invalid_records += 1;
                debug!(record = index, errors = row.errors.len(), "Invalid record");

                for error in &row.errors {
                    let field = match self.attribution {
                        ErrorAttribution::Structured => error.field.as_str(),
                        ErrorAttribution::QuotedToken => quoted_field_name(&error.message),
                    };

                    *report.errors_by_field.entry(field.to_string()).or_insert(0) += 1;

                    let value = record.get(field).cloned().unwrap_or_default();
                    report.add_error_sample(field, value, &error.message);
                }
            }

            report.warnings.extend(row.warnings);
        }

        info!(
            valid = report.valid_records,
            total = report.total_records,
            "Validation complete"
        );

        Ok(report)
    }

    /// Coerce every schema field of every record. The first failure aborts
    /// the whole call; no partial output is returned.
    pub fn normalize_batch(
        &self,
        records: &[Record],
        schema: &Schema,
    ) -> Result<Vec<Record>, NormalizationError> {
        let span = info_span!("normalize_batch", records = records.len(), fields = schema.len());
        let _guard = span.enter();

        let mut normalized = Vec::with_capacity(records.len());

        for (record_index, record) in records.iter().enumerate() {
            match normalize_row(record, schema) {
                Ok(row) => normalized.push(row),
                Err((field, source)) => {
                    let err = NormalizationError {
                        record_index,
                        field,
                        source,
                    };
                    warn!(error = %err, "Normalization aborted");
                    return Err(err);
                }
            }
        }

        info!(records = normalized.len(), "Normalized records");
        Ok(normalized)
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// New record holding exactly the schema fields, in schema order
pub fn normalize_row(record: &Record, schema: &Schema) -> Result<Record, (String, CoercionError)> {
    schema
        .iter()
        .map(|(field_name, spec)| {
            let raw = record.get(field_name).unwrap_or(&Value::Null);
            coerce_field(raw, spec)
                .map(|value| (field_name.to_string(), value))
                .map_err(|err| (field_name.to_string(), err))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
