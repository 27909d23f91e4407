//! Versioned JSON interchange for the entry set. Only format version 1
//! exists; anything else is rejected outright rather than partially
//! imported.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ledger::MilkEntry;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid export file: {0}")]
    Parse(String),
    #[error("unsupported export version: {0}")]
    UnsupportedVersion(u32),
    #[error("invalid entry at index {index}: {reason}")]
    Entry { index: usize, reason: String },
}

/// The on-disk envelope around an exported entry set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    #[serde(rename = "exportDate")]
    pub export_date: NaiveDate,
    #[serde(rename = "dataCount")]
    pub data_count: usize,
    pub entries: Vec<MilkEntry>,
}

/// Wraps `entries` in a version-1 envelope stamped with `exported_on`.
pub fn export_document(entries: Vec<MilkEntry>, exported_on: NaiveDate) -> ExportDocument {
    ExportDocument {
        version: FORMAT_VERSION,
        export_date: exported_on,
        data_count: entries.len(),
        entries,
    }
}

/// Serializes an export document, pretty-printed for hand inspection.
pub fn to_json(document: &ExportDocument) -> Result<String, TransferError> {
    serde_json::to_string_pretty(document).map_err(|err| TransferError::Parse(err.to_string()))
}

/// Parses an export document and returns its entries, each under a
/// freshly assigned id. Any malformed entry rejects the whole document,
/// naming the offending index; nothing is ever partially accepted.
pub fn parse_document(input: &str) -> Result<Vec<MilkEntry>, TransferError> {
    let raw: Value =
        serde_json::from_str(input).map_err(|err| TransferError::Parse(err.to_string()))?;

    let version = raw
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| TransferError::Parse("missing or non-numeric `version` field".into()))?;
    if version != u64::from(FORMAT_VERSION) {
        return Err(TransferError::UnsupportedVersion(version as u32));
    }

    let raw_entries = raw
        .get("entries")
        .and_then(Value::as_array)
        .ok_or_else(|| TransferError::Parse("missing `entries` array".into()))?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw_entry) in raw_entries.iter().enumerate() {
        let entry: MilkEntry = serde_json::from_value(raw_entry.clone())
            .map_err(|err| TransferError::Entry {
                index,
                reason: err.to_string(),
            })?;
        if !entry.quantity.is_finite() || entry.quantity < 0.0 {
            return Err(TransferError::Entry {
                index,
                reason: "quantity must be a finite, non-negative number of litres".into(),
            });
        }
        entries.push(entry.with_new_id());
    }
    Ok(entries)
}
