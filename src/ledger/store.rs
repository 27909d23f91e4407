use std::collections::BTreeMap;
use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use chrono::NaiveDate;
use tracing::debug;

use crate::errors::StorageError;
use crate::storage::EntryStorage;

use super::MilkEntry;

/// Durable keyed store of milk entries, one per calendar date.
///
/// Every mutation is written through the backend before the in-memory
/// state changes and before success is reported, so a caller that gets
/// `Ok` knows the data is on disk. Subscribers receive the full entry
/// set immediately on subscribing and again after every committed
/// mutation.
pub struct EntryStore {
    backend: Box<dyn EntryStorage>,
    entries: Mutex<BTreeMap<NaiveDate, MilkEntry>>,
    watchers: Mutex<Vec<Sender<Vec<MilkEntry>>>>,
}

impl EntryStore {
    /// Opens the store, loading the persisted entry set. Duplicate dates
    /// in the backend collapse to the last record seen.
    pub fn open(backend: Box<dyn EntryStorage>) -> Result<Self, StorageError> {
        let mut entries = BTreeMap::new();
        for entry in backend.load_entries()? {
            entries.insert(entry.date, entry);
        }
        Ok(Self {
            backend,
            entries: Mutex::new(entries),
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Point lookup; absence is a valid, non-error state.
    pub fn entry(&self, date: NaiveDate) -> Option<MilkEntry> {
        self.entries
            .lock()
            .expect("entry map lock poisoned")
            .get(&date)
            .cloned()
    }

    /// Snapshot of all entries, ordered by date.
    pub fn entries(&self) -> Vec<MilkEntry> {
        self.entries
            .lock()
            .expect("entry map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("entry map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces the entry for its date. The previous record,
    /// if any, is overwritten whole.
    pub fn upsert(&self, entry: MilkEntry) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("entry map lock poisoned");
        let mut next = guard.clone();
        next.insert(entry.date, entry);
        self.persist(&next)?;
        *guard = next;
        let snapshot: Vec<MilkEntry> = guard.values().cloned().collect();
        drop(guard);
        self.notify(snapshot);
        Ok(())
    }

    /// Removes the entry for `date`. Deleting an absent date is a no-op
    /// success and leaves the backend untouched.
    pub fn delete(&self, date: NaiveDate) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("entry map lock poisoned");
        if !guard.contains_key(&date) {
            return Ok(());
        }
        let mut next = guard.clone();
        next.remove(&date);
        self.persist(&next)?;
        *guard = next;
        let snapshot: Vec<MilkEntry> = guard.values().cloned().collect();
        drop(guard);
        self.notify(snapshot);
        Ok(())
    }

    /// Applies a batch of entries as a single persisted write. Used by
    /// import so a format or storage fault never leaves a partial batch
    /// behind. Returns the number of entries applied.
    pub fn upsert_many(&self, batch: Vec<MilkEntry>) -> Result<usize, StorageError> {
        let applied = batch.len();
        let mut guard = self.entries.lock().expect("entry map lock poisoned");
        let mut next = guard.clone();
        for entry in batch {
            next.insert(entry.date, entry);
        }
        self.persist(&next)?;
        *guard = next;
        let snapshot: Vec<MilkEntry> = guard.values().cloned().collect();
        drop(guard);
        self.notify(snapshot);
        Ok(applied)
    }

    /// Registers an observer. The current snapshot is delivered
    /// immediately; each committed mutation delivers a fresh one.
    pub fn subscribe(&self) -> Receiver<Vec<MilkEntry>> {
        let (tx, rx) = mpsc::channel();
        let snapshot = self.entries();
        // A receiver dropped this early just means nobody is listening.
        let _ = tx.send(snapshot);
        self.watchers
            .lock()
            .expect("watcher list lock poisoned")
            .push(tx);
        rx
    }

    fn persist(&self, state: &BTreeMap<NaiveDate, MilkEntry>) -> Result<(), StorageError> {
        let snapshot: Vec<MilkEntry> = state.values().cloned().collect();
        self.backend.save_entries(&snapshot)?;
        debug!(entries = snapshot.len(), "persisted entry set");
        Ok(())
    }

    fn notify(&self, snapshot: Vec<MilkEntry>) {
        let mut watchers = self.watchers.lock().expect("watcher list lock poisoned");
        watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
