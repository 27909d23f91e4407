//! Persistence backends for the entry ledger.

pub mod json_backend;

use std::path::{Path, PathBuf};
use std::{
    fs::{self, File},
    io::Write,
};

use crate::errors::StorageError;
use crate::ledger::MilkEntry;

pub use json_backend::JsonEntryStorage;

/// Abstraction over backends capable of durably storing the entry set.
/// Every save must be complete on disk before it returns.
pub trait EntryStorage: Send + Sync {
    fn load_entries(&self) -> Result<Vec<MilkEntry>, StorageError>;
    fn save_entries(&self, entries: &[MilkEntry]) -> Result<(), StorageError>;
}

const TMP_SUFFIX: &str = "tmp";

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to `path` via a temporary file and rename, so a fault
/// mid-write never corrupts the previous contents.
pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
