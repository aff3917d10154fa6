// 📂 Record Loader - CSV / JSON in, JSON out
// Cells are typed the way a dataframe reader would type them

use crate::value::{record_from_json, Record, Value};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load records from a `.csv` file, anything else is read as JSON
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let records = if is_csv {
        load_csv_records(path)?
    } else {
        load_json_records(path)?
    };

    info!(records = records.len(), path = %path.display(), "Loaded records");
    Ok(records)
}

pub fn load_csv_records(csv_path: &Path) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let mut records = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read CSV row {}", line + 1))?;

        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
            .collect();

        records.push(record);
    }

    Ok(records)
}

/// A JSON array of objects, or a single object
pub fn load_json_records(json_path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read JSON file: {:?}", json_path))?;

    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {:?}", json_path))?;

    let items = match json {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => bail!("JSON file must contain object or array of objects"),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            record_from_json(item)
                .with_context(|| format!("Item {} in {:?} is not an object", index, json_path))
        })
        .collect()
}

/// Write records as a JSON array, creating parent directories
pub fn write_records_json<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;

    info!(records = records.len(), path = %path.display(), "Wrote records");
    Ok(())
}

/// Records as they read back after `write_records_json`
///
/// Timestamps become formatted strings, everything else is unchanged.
pub fn written_form(records: &[Record]) -> Result<Vec<Record>> {
    let json = serde_json::to_value(records).context("Failed to serialize records")?;

    match json {
        serde_json::Value::Array(items) => Ok(items.into_iter().filter_map(record_from_json).collect()),
        _ => bail!("Serialized records are not an array"),
    }
}

/// Drop records whose `key` value was already seen, keeping the first.
/// Missing keys count as null, so keyless records collapse together.
pub fn dedupe_records(records: Vec<Record>, key: &str) -> Vec<Record> {
    let original_count = records.len();
    let mut seen = HashSet::new();

    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let value = record.get(key).unwrap_or(&Value::Null);
            seen.insert((value.type_name(), value.to_string()))
        })
        .collect();

    debug!(key, removed = original_count - kept.len(), "Deduplicated records");
    kept
}

fn infer_cell(cell: &str) -> Value {
    let trimmed = cell.trim();

    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Integer(int);
    }

    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::Float(float);
        }
    }

    match trimmed {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
