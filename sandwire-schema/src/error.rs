//! Error types for schema construction, records and the schema store.

use crate::fingerprint::Fingerprint;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema name must not be empty")]
    EmptyName,

    #[error("field name must not be empty in '{type_name}'")]
    EmptyFieldName { type_name: String },

    #[error("duplicate field '{field}' in '{type_name}'")]
    DuplicateField { type_name: String, field: String },

    #[error("enum field '{field}' in '{type_name}' has invalid symbols")]
    InvalidEnum { type_name: String, field: String },

    #[error("default for '{type_name}.{field}' does not conform to {expected}")]
    InvalidDefault {
        type_name: String,
        field: String,
        expected: &'static str,
    },

    #[error("unknown field '{field}' in '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("field index {index} out of range for '{type_name}' ({len} fields)")]
    FieldIndexOutOfRange {
        type_name: String,
        index: usize,
        len: usize,
    },

    #[error("missing required field '{field}' in '{type_name}'")]
    MissingField { type_name: String, field: String },

    #[error("'{type_name}.{field}' expects {expected}, got {found}")]
    FieldTypeMismatch {
        type_name: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected} value, got {found}")]
    ValueMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("record is '{found}', expected '{expected}'")]
    RecordTypeMismatch { expected: String, found: String },

    #[error("schema registered under {claimed} has fingerprint {actual}")]
    FingerprintMismatch {
        claimed: Fingerprint,
        actual: Fingerprint,
    },

    #[error("unknown schema fingerprint {0}")]
    UnknownSchema(Fingerprint),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("malformed schema body: {0}")]
    Malformed(#[from] serde_json::Error),
}
