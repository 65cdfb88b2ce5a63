//! Core models, record store and import handling for acctkeep.
//!
//! This crate provides the record types, the file-backed store, validation,
//! search, export and import reconciliation used by the terminal frontend.

pub mod clock;
pub mod entry;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod password;
pub mod query;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entry::EntryService;
pub use error::{Error, Result, ValidationError};
pub use import::{
    Conflict, ConflictDecision, ConflictPolicy, ConflictResolver, DuplicateVisibility,
    FaultPolicy, ImportOptions, ImportSummary, Importer,
};
pub use models::{
    DuplicateKey, EmailAccount, FieldSpec, Gender, RawFields, Record, RecordDraft, RecordId,
    RecordKind, RecordType, WebsiteAccount,
};
pub use query::Suggestions;
pub use store::RecordStore;
