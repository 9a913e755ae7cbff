//! Lenient JSON loading for CRM exports.
//!
//! A bad element is logged and skipped; it never aborts the whole file.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Records that parsed, plus how many elements were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// Parse a JSON array of records, skipping elements that do not fit `T`
/// (missing fields, malformed dates, wrong types).
pub fn parse_records<T: DeserializeOwned>(json: &str) -> Result<ImportOutcome<T>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(items) = value else {
        return Err(Error::InvalidRecord("expected a JSON array of records".into()));
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("skipping record {i}: {e}");
                skipped += 1;
            }
        }
    }

    log::info!("parsed {} records, skipped {skipped}", records.len());
    Ok(ImportOutcome { records, skipped })
}

/// Read and parse a JSON export from disk.
pub fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<ImportOutcome<T>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_records(&text)
}
