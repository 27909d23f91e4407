use std::path::{Path, PathBuf};

use crate::errors::StorageError;
use crate::ledger::MilkEntry;

use super::{write_atomic, EntryStorage};

/// Filesystem-backed JSON persistence for the milk entry set. The whole
/// set lives in one file; a missing file is an empty ledger.
#[derive(Debug, Clone)]
pub struct JsonEntryStorage {
    path: PathBuf,
}

impl JsonEntryStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntryStorage for JsonEntryStorage {
    fn load_entries(&self) -> Result<Vec<MilkEntry>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| StorageError::Serde(err.to_string()))
    }

    fn save_entries(&self, entries: &[MilkEntry]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|err| StorageError::Serde(err.to_string()))?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let storage = JsonEntryStorage::new(dir.path().join("entries.json"));
        assert!(storage.load_entries().unwrap().is_empty());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let storage = JsonEntryStorage::new(dir.path().join("entries.json"));
        let entry = MilkEntry::new(
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            2.0,
            false,
        )
        .unwrap();
        storage.save_entries(std::slice::from_ref(&entry)).unwrap();
        let loaded = storage.load_entries().unwrap();
        assert_eq!(loaded, vec![entry]);
    }
}
