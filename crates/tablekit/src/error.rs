//! Error types for the mapping layer.

use crate::field::FieldKind;
use crate::handle::HandleError;
use thiserror::Error;

/// Mapping layer result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Mapping layer errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A field declared a kind outside integer/text/numeric
    #[error("Unknown field kind '{kind}' for field '{field}'")]
    UnknownFieldKind { field: String, kind: String },

    /// The primary key named by the row descriptor is not a declared field
    #[error("Primary key field not found: {0}")]
    MissingPrimaryKeyField(String),

    /// A declared field could not be read from or written to a record
    #[error("Record has no field '{field}'")]
    MissingFieldOnRecord { field: String },

    /// A record returned a value whose kind differs from the declaration
    #[error("Field '{field}' is declared {expected} but holds {found}")]
    FieldKindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    /// Failure reported by the database handle
    #[error("Database error: {0}")]
    Handle(#[from] HandleError),

    /// Malformed row descriptor document
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] serde_json::Error),
}

impl Error {
    pub fn unknown_kind(field: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnknownFieldKind {
            field: field.into(),
            kind: kind.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingFieldOnRecord {
            field: field.into(),
        }
    }

    pub fn missing_primary_key(field: impl Into<String>) -> Self {
        Self::MissingPrimaryKeyField(field.into())
    }
}
