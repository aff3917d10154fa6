// 🔧 Field Coercer - raw value → canonical value
// Every function is pure: null in, null out; anything unconvertible is a CoercionError

use crate::errors::CoercionError;
use crate::schema::{FieldSpec, FieldType, StringCase, DEFAULT_DECIMAL_PLACES, DEFAULT_ODDS_MINIMUM};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];
const ODDS_DECIMAL_PLACES: u32 = 4;

// ============================================================================
// DISPATCH
// ============================================================================

/// Coerce one value according to its field spec
pub fn coerce_field(value: &Value, spec: &FieldSpec) -> Result<Value, CoercionError> {
    match spec.coercion_type() {
        FieldType::Timestamp => {
            coerce_timestamp(value, spec.timestamp_format_or_default()).map(Value::from)
        }
        FieldType::Integer => coerce_integer(value).map(Value::from),
        FieldType::Float => coerce_numeric(
            value,
            spec.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES),
        )
        .map(Value::from),
        FieldType::Boolean => coerce_boolean(value).map(Value::from),
        FieldType::Currency => coerce_currency(
            value,
            spec.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES),
        )
        .map(Value::from),
        FieldType::Odds => {
            coerce_odds(value, spec.odds_minimum.unwrap_or(DEFAULT_ODDS_MINIMUM)).map(Value::from)
        }
        FieldType::Mapping => Ok(coerce_mapping(value)?.map_or(Value::Null, Value::Mapping)),
        FieldType::String => coerce_string(value, spec.case).map(Value::from),
    }
}

// ============================================================================
// TIMESTAMP
// ============================================================================

/// Text is parsed with `format`; numbers are Unix epoch seconds in UTC
pub fn coerce_timestamp(value: &Value, format: &str) -> Result<Option<NaiveDateTime>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Timestamp(ts) => Ok(Some(*ts)),
        Value::String(text) => parse_timestamp(text, format).map(Some),
        Value::Integer(secs) => from_epoch(*secs as f64, value).map(Some),
        Value::Float(secs) => from_epoch(*secs, value).map(Some),
        other => Err(CoercionError::TimestampType {
            type_name: other.type_name(),
            value: other.to_string(),
        }),
    }
}

fn parse_timestamp(text: &str, format: &str) -> Result<NaiveDateTime, CoercionError> {
    match NaiveDateTime::parse_from_str(text, format) {
        Ok(ts) => Ok(ts),
        Err(err) => {
            // Date-only formats resolve to midnight
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(|| CoercionError::TimestampFormat {
                    value: text.to_string(),
                    format: format.to_string(),
                    reason: err.to_string(),
                })
        }
    }
}

fn from_epoch(secs: f64, raw: &Value) -> Result<NaiveDateTime, CoercionError> {
    let out_of_range = || CoercionError::TimestampEpoch {
        value: raw.to_string(),
    };

    if !secs.is_finite() {
        return Err(out_of_range());
    }

    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(out_of_range());
    }

    DateTime::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(out_of_range)
}

// ============================================================================
// NUMERIC
// ============================================================================

/// Parse as f64 and round half away from zero to `decimal_places`
pub fn coerce_numeric(value: &Value, decimal_places: u32) -> Result<Option<f64>, CoercionError> {
    Ok(parse_f64(value)?.map(|number| round_to(number, decimal_places)))
}

/// Unrounded numeric view of a value
pub fn parse_f64(value: &Value) -> Result<Option<f64>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Float(f) => Ok(Some(*f)),
        Value::Bool(b) => Ok(Some(f64::from(u8::from(*b)))),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| CoercionError::Numeric {
                value: text.clone(),
            }),
        other => Err(CoercionError::Numeric {
            value: other.to_string(),
        }),
    }
}

fn round_to(number: f64, decimal_places: u32) -> f64 {
    if !number.is_finite() {
        return number;
    }

    let factor = 10f64.powi(decimal_places.min(i32::MAX as u32) as i32);
    let scaled = number * factor;
    if !scaled.is_finite() {
        return number;
    }

    scaled.round() / factor
}

/// Whole-number coercion; fractional input is rounded
pub fn coerce_integer(value: &Value) -> Result<Option<i64>, CoercionError> {
    if let Value::Integer(i) = value {
        return Ok(Some(*i));
    }

    match coerce_numeric(value, 0)? {
        None => Ok(None),
        Some(n) if n.is_finite() && n >= i64::MIN as f64 && n < i64::MAX as f64 => {
            Ok(Some(n as i64))
        }
        Some(_) => Err(CoercionError::Numeric {
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// STRING
// ============================================================================

/// Stringify, trim, then apply the case transform
pub fn coerce_string(value: &Value, case: StringCase) -> Result<Option<String>, CoercionError> {
    if value.is_null() {
        return Ok(None);
    }

    let text = value.to_string();
    let trimmed = text.trim();

    let cased = match case {
        StringCase::Lower => trimmed.to_lowercase(),
        StringCase::Upper => trimmed.to_uppercase(),
        StringCase::Title => title_case(trimmed),
        StringCase::Original => trimmed.to_string(),
    };

    Ok(Some(cased))
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;

    for ch in text.chars() {
        if ch.is_whitespace() {
            word_start = true;
            out.push(ch);
        } else if word_start {
            out.extend(ch.to_uppercase());
            word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }

    out
}

// ============================================================================
// BOOLEAN
// ============================================================================

pub fn coerce_boolean(value: &Value) -> Result<Option<bool>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => {
            let text = other.to_string();
            match text.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(CoercionError::Boolean { value: text }),
            }
        }
    }
}

// ============================================================================
// CURRENCY & ODDS
// ============================================================================

/// Strip currency glyphs from text, then coerce as numeric
pub fn coerce_currency(value: &Value, decimal_places: u32) -> Result<Option<f64>, CoercionError> {
    match value {
        Value::String(text) => {
            let cleaned: String = text.chars().filter(|c| !CURRENCY_SYMBOLS.contains(c)).collect();
            coerce_numeric(&Value::String(cleaned), decimal_places)
        }
        other => coerce_numeric(other, decimal_places),
    }
}

/// Decimal odds at 4 places; anything below `minimum` is rejected
pub fn coerce_odds(value: &Value, minimum: f64) -> Result<Option<f64>, CoercionError> {
    match coerce_numeric(value, ODDS_DECIMAL_PLACES)? {
        None => Ok(None),
        Some(odds) if odds.is_nan() || odds < minimum => {
            Err(CoercionError::OddsBelowMinimum { value: odds, minimum })
        }
        Some(odds) => Ok(Some(odds)),
    }
}

// ============================================================================
// MAPPING
// ============================================================================

/// Mappings pass through; text holding a JSON object is parsed
pub fn coerce_mapping(value: &Value) -> Result<Option<IndexMap<String, Value>>, CoercionError> {
    match value {
        Value::Null => Ok(None),
        Value::Mapping(map) => Ok(Some(map.clone())),
        Value::String(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(object)) => Ok(Some(
                object.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
            _ => Err(CoercionError::Mapping {
                value: text.clone(),
            }),
        },
        other => Err(CoercionError::Mapping {
            value: other.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
