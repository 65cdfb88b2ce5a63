//! File-backed record table.
//!
//! The whole table lives in memory behind an async mutex and is written back
//! to a single JSON file after every change. Writes go to a temporary file in
//! the same directory which is then renamed over the store file, so the file
//! on disk is always either the old or the new table.

use crate::entry::check_required;
use crate::error::{Error, Result, ValidationError};
use crate::models::{DuplicateKey, Record, RecordDraft, RecordId, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Version written to and expected in the store file.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    version: u32,
    next_id: u64,
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
struct Table {
    next_id: u64,
    records: BTreeMap<RecordId, Record>,
    by_type: BTreeMap<RecordType, BTreeSet<RecordId>>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
            by_type: BTreeMap::new(),
        }
    }
}

impl Table {
    fn from_file(file: StoreFile) -> std::result::Result<Self, String> {
        if file.version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported schema version {} (expected {SCHEMA_VERSION})",
                file.version
            ));
        }

        let mut table = Table::default();
        for record in file.records {
            if table.records.contains_key(&record.id) {
                return Err(format!("duplicate record id {}", record.id));
            }
            table.insert(record);
        }

        let max_id = table.records.keys().next_back().map_or(0, |id| id.0);
        table.next_id = file.next_id.max(max_id + 1);
        Ok(table)
    }

    fn to_file(&self) -> StoreFile {
        StoreFile {
            version: SCHEMA_VERSION,
            next_id: self.next_id,
            records: self.records.values().cloned().collect(),
        }
    }

    fn insert(&mut self, record: Record) {
        self.by_type
            .entry(record.record_type())
            .or_default()
            .insert(record.id);
        self.records.insert(record.id, record);
    }

    fn remove(&mut self, id: RecordId) -> Option<Record> {
        let record = self.records.remove(&id)?;
        if let Some(ids) = self.by_type.get_mut(&record.record_type()) {
            ids.remove(&id);
        }
        Some(record)
    }

    fn of_type(&self, record_type: RecordType) -> impl Iterator<Item = &Record> {
        self.by_type
            .get(&record_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }
}

/// The record store handle. Open it once and pass it around by reference.
#[derive(Debug)]
pub struct RecordStore {
    path: Option<PathBuf>,
    table: Mutex<Table>,
}

impl RecordStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_io(parent, "failed to create store directory", e)
            })?;
        }

        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::storage(&path, format!("failed to parse store file: {e}"))
                })?;
                Table::from_file(file).map_err(|message| Error::storage(&path, message))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No store file at {}, starting empty", path.display());
                Table::default()
            }
            Err(e) => return Err(Error::storage_io(&path, "failed to read store file", e)),
        };

        tracing::info!(
            "Opened record store {} with {} records",
            path.display(),
            table.records.len()
        );

        Ok(Self {
            path: Some(path),
            table: Mutex::new(table),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: Mutex::new(Table::default()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist a new record and return its freshly assigned id.
    pub async fn create(&self, draft: RecordDraft) -> Result<RecordId> {
        check_required(&draft.kind)?;

        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let id = RecordId(next.next_id);
        next.next_id += 1;
        next.insert(Record::from_draft(id, draft));

        self.commit(&mut table, next).await?;
        tracing::debug!("Created record {}", id);
        Ok(id)
    }

    /// Overwrite the record stored under `record.id`.
    pub async fn update(&self, record: Record) -> Result<()> {
        check_required(&record.kind)?;

        let mut table = self.table.lock().await;
        let Some(stored) = table.records.get(&record.id) else {
            return Err(Error::NotFound(record.id));
        };
        if stored.record_type() != record.record_type() {
            return Err(ValidationError::TypeChanged {
                id: record.id,
                stored: stored.record_type(),
                requested: record.record_type(),
            }
            .into());
        }

        let id = record.id;
        let mut next = table.clone();
        next.insert(record);

        self.commit(&mut table, next).await?;
        tracing::debug!("Updated record {}", id);
        Ok(())
    }

    pub async fn get(&self, id: RecordId) -> Result<Record> {
        self.table
            .lock()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    /// Every record, in ascending id order.
    pub async fn get_all(&self) -> Vec<Record> {
        self.table.lock().await.records.values().cloned().collect()
    }

    /// Records of one type, in ascending id order.
    pub async fn get_by_type(&self, record_type: RecordType) -> Vec<Record> {
        self.table
            .lock()
            .await
            .of_type(record_type)
            .cloned()
            .collect()
    }

    /// First record (lowest id) whose duplicate key equals `key`.
    pub async fn find_duplicate(&self, key: &DuplicateKey) -> Option<Record> {
        let record_type = match key {
            DuplicateKey::Email { .. } => RecordType::Email,
            DuplicateKey::Website { .. } => RecordType::Website,
        };
        self.table
            .lock()
            .await
            .of_type(record_type)
            .find(|r| r.kind.duplicate_key() == *key)
            .cloned()
    }

    /// Remove a record. Its id is not handed out again.
    pub async fn delete(&self, id: RecordId) -> Result<Record> {
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let removed = next.remove(id).ok_or(Error::NotFound(id))?;

        self.commit(&mut table, next).await?;
        tracing::debug!("Deleted record {}", id);
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Release the store at shutdown.
    pub async fn close(self) -> Result<()> {
        let table = self.table.into_inner();
        match &self.path {
            Some(path) => tracing::info!(
                "Closed record store {} ({} records)",
                path.display(),
                table.records.len()
            ),
            None => tracing::debug!("Closed in-memory record store"),
        }
        Ok(())
    }

    /// Write `next` to disk and, only if that succeeds, make it current.
    async fn commit(&self, current: &mut Table, next: Table) -> Result<()> {
        if let Some(path) = &self.path {
            let bytes = serde_json::to_vec_pretty(&next.to_file())
                .map_err(|e| Error::storage(path, format!("failed to serialize store: {e}")))?;
            let target = path.clone();
            tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
                .await
                .map_err(|e| Error::storage(path, format!("store writer failed: {e}")))??;
        }
        *current = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::storage_io(path, "failed to create temporary file", e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::storage_io(path, "failed to write store file", e))?;
    tmp.persist(path)
        .map_err(|e| Error::storage_io(path, "failed to replace store file", e.error))?;
    Ok(())
}
