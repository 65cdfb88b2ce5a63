//! Merging an imported batch of records into the store.
//!
//! Each entry of the batch is handled in order and fully written before the
//! next one is looked at:
//!
//! 1. `id` and the payload timestamps are dropped and the entry is validated
//!    like a newly added record.
//! 2. Its [`DuplicateKey`] is looked up, either in the live store or in a
//!    snapshot taken before the first entry (see [`DuplicateVisibility`]).
//! 3. No match: the entry is added with fresh timestamps.
//! 4. A field-equal match: the entry is skipped.
//! 5. A differing match: the [`ConflictResolver`] decides between replacing
//!    the stored record (keeping its id and `createdAt`) and skipping.

use crate::entry::EntryService;
use crate::error::{Error, Result, ValidationError};
use crate::models::{DuplicateKey, RawFields, Record, RecordKind, RecordType};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;

/// Keys of an imported entry that never reach the record.
const DISCARDED_KEYS: [&str; 4] = ["id", "type", "createdAt", "updatedAt"];

/// Which store state duplicate detection looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateVisibility {
    /// The current store, so entries written earlier in the same batch count.
    #[default]
    Live,
    /// The store as it was before the batch started.
    Snapshot,
}

/// What happens when a single entry of the batch is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Record the failure and carry on with the next entry.
    #[default]
    Continue,
    /// Stop at the first invalid entry. Entries already written stay.
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub visibility: DuplicateVisibility,
    pub faults: FaultPolicy,
}

/// Answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    Replace,
    Skip,
}

/// An imported entry whose key matches a stored record with different fields.
#[derive(Debug)]
pub struct Conflict<'a> {
    /// Position of the entry in the batch.
    pub index: usize,
    pub key: &'a DuplicateKey,
    pub existing: &'a Record,
    pub incoming: &'a RecordKind,
}

impl Conflict<'_> {
    /// Question to put to the user.
    pub fn message(&self) -> String {
        match self.key {
            DuplicateKey::Email { username } => {
                format!("Email entry with username \"{username}\" already exists. Replace?")
            }
            DuplicateKey::Website {
                website_name,
                username,
            } => format!(
                "Website entry with name \"{website_name}\" and username \"{username}\" already exists. Replace?"
            ),
        }
    }
}

/// Decides conflicts during an import. Awaited inside the import loop.
pub trait ConflictResolver {
    fn resolve(&mut self, conflict: &Conflict<'_>) -> impl Future<Output = ConflictDecision>;
}

/// Fixed answers for unattended imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    AlwaysReplace,
    AlwaysSkip,
}

impl ConflictResolver for ConflictPolicy {
    async fn resolve(&mut self, _conflict: &Conflict<'_>) -> ConflictDecision {
        match self {
            ConflictPolicy::AlwaysReplace => ConflictDecision::Replace,
            ConflictPolicy::AlwaysSkip => ConflictDecision::Skip,
        }
    }
}

/// An entry that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub index: usize,
    pub error: ValidationError,
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {}: {}", self.index, self.error)
    }
}

/// Outcome of a whole import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub failures: Vec<ImportFailure>,
    /// Set when [`FaultPolicy::Abort`] stopped the batch early.
    pub aborted: bool,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data imported: {} added, {} replaced, {} skipped",
            self.added, self.replaced, self.skipped
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if self.aborted {
            f.write_str(" (stopped at first invalid entry)")?;
        }
        Ok(())
    }
}

/// Check that `payload` is a JSON array of objects, without touching the store.
pub fn parse_batch(payload: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::InvalidFormat(format!("not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(Error::InvalidFormat(
            "expected a JSON array of entries".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidFormat(format!(
                "entry {index} is not an object (found {})",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merges imported batches into a store.
#[derive(Debug)]
pub struct Importer<'a> {
    store: &'a RecordStore,
    entries: &'a EntryService,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a RecordStore, entries: &'a EntryService) -> Self {
        Self {
            store,
            entries,
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse `payload` and merge it. A malformed payload fails before any write.
    pub async fn import_json<R: ConflictResolver>(
        &self,
        payload: &str,
        resolver: &mut R,
    ) -> Result<ImportSummary> {
        let batch = parse_batch(payload)?;
        self.import_batch(batch, resolver).await
    }

    /// Merge an already parsed batch.
    ///
    /// Invalid entries are handled per [`FaultPolicy`]. A storage fault ends
    /// the import with that error; entries written before it stay written.
    pub async fn import_batch<R: ConflictResolver>(
        &self,
        batch: Vec<Map<String, Value>>,
        resolver: &mut R,
    ) -> Result<ImportSummary> {
        tracing::info!(
            "Importing {} entries ({:?} duplicate visibility, {:?} on invalid entries)",
            batch.len(),
            self.options.visibility,
            self.options.faults
        );

        let snapshot = match self.options.visibility {
            DuplicateVisibility::Snapshot => Some(self.store.get_all().await),
            DuplicateVisibility::Live => None,
        };

        let mut summary = ImportSummary::default();

        for (index, entry) in batch.into_iter().enumerate() {
            let Prepared {
                mut kind,
                password_generated,
            } = match self.prepare(entry) {
                Ok(prepared) => prepared,
                Err(error) => {
                    tracing::warn!("Skipping invalid import entry {}: {}", index, error);
                    summary.failures.push(ImportFailure { index, error });
                    if self.options.faults == FaultPolicy::Abort {
                        summary.aborted = true;
                        break;
                    }
                    continue;
                }
            };

            let key = kind.duplicate_key();
            let existing = match &snapshot {
                Some(records) => records
                    .iter()
                    .find(|r| r.kind.duplicate_key() == key)
                    .cloned(),
                None => self.store.find_duplicate(&key).await,
            };

            let Some(existing) = existing else {
                let id = self.store.create(self.entries.new_draft(kind)).await?;
                tracing::debug!("Import entry {} added as record {}", index, id);
                summary.added += 1;
                continue;
            };

            // An entry without a password keeps the stored one.
            if password_generated {
                kind.set_password(existing.kind.password().to_owned());
            }

            if existing.kind == kind {
                tracing::debug!("Import entry {} is identical to record {}", index, existing.id);
                summary.skipped += 1;
                continue;
            }

            let conflict = Conflict {
                index,
                key: &key,
                existing: &existing,
                incoming: &kind,
            };
            match resolver.resolve(&conflict).await {
                ConflictDecision::Replace => {
                    let record = Record {
                        id: existing.id,
                        kind,
                        created_at: existing.created_at,
                        updated_at: self.entries.now(),
                    };
                    self.store.update(record).await?;
                    tracing::debug!("Import entry {} replaced record {}", index, existing.id);
                    summary.replaced += 1;
                }
                ConflictDecision::Skip => {
                    tracing::debug!("Import entry {} conflicts with record {}, kept stored", index, existing.id);
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!("{}", summary);
        Ok(summary)
    }

    /// Validate one imported object as a new record of its declared type.
    fn prepare(&self, entry: Map<String, Value>) -> std::result::Result<Prepared, ValidationError> {
        let record_type: RecordType = match entry.get("type") {
            Some(Value::String(tag)) => tag.parse()?,
            _ => {
                return Err(ValidationError::InvalidValue {
                    field: "type".to_string(),
                    reason: "missing or not a string".to_string(),
                })
            }
        };

        let schema = record_type.schema();
        let mut raw = RawFields::new();
        for (key, value) in entry {
            if DISCARDED_KEYS.contains(&key.as_str()) || !schema.iter().any(|s| s.key == key) {
                continue;
            }
            match value {
                Value::String(s) => {
                    raw.insert(key, s);
                }
                Value::Null => {}
                other => {
                    return Err(ValidationError::InvalidValue {
                        field: key,
                        reason: format!("expected a string, found {}", json_kind(&other)),
                    })
                }
            }
        }

        let password_generated = raw.get("password").map_or(true, |p| p.trim().is_empty());
        let kind = self.entries.build_from_input(record_type, &raw, false)?;
        Ok(Prepared {
            kind,
            password_generated,
        })
    }
}

/// An import entry ready to be reconciled.
struct Prepared {
    kind: RecordKind,
    /// The entry had no password and `kind` carries a generated one.
    password_generated: bool,
}
