//! Error types shared by the store, the entry service and the importer.

use crate::models::{RecordId, RecordType};
use std::path::PathBuf;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input did not satisfy the field rules of its record type.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing file could not be read or written.
    #[error("storage fault at {}: {message}", path.display())]
    StorageFault {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An export file could not be written.
    #[error("failed to write export to {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An import payload was not a JSON array of objects.
    #[error("invalid import format: {0}")]
    InvalidFormat(String),

    /// No record is stored under the requested id.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// Records could not be turned into JSON.
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::StorageFault {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn storage_io(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::StorageFault {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}

/// A record was rejected before it reached the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One or more required fields were empty.
    #[error("{record_type} entry is missing required field(s): {}", fields.join(", "))]
    MissingFields {
        record_type: RecordType,
        fields: Vec<&'static str>,
    },

    /// The `type` tag named neither `email` nor `website`.
    #[error("unsupported entry type \"{0}\"")]
    UnsupportedType(String),

    /// A field carried a value outside its allowed set.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// An update tried to turn a record into another type.
    #[error("record {id} is of type {stored} and cannot become {requested}")]
    TypeChanged {
        id: RecordId,
        stored: RecordType,
        requested: RecordType,
    },
}
