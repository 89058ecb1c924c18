//! Serialization error taxonomy.

use sandwire_schema::{Fingerprint, SchemaError};
use thiserror::Error;

pub type SerializationResult<T> = Result<T, SerializationError>;

#[derive(Debug, Error)]
pub enum SerializationError {
    /// The whitelist refused a type. Scoped to the failing call.
    #[error("type '{type_name}' is not permitted in sandbox group '{group}'")]
    Security { group: String, type_name: String },

    #[error("type '{type_name}' is not bound in sandbox group '{group}'")]
    UnknownType { group: String, type_name: String },

    /// No schema is known for the fingerprint. May succeed once the schema
    /// has been propagated.
    #[error("unknown schema fingerprint {0}")]
    UnknownSchema(Fingerprint),

    #[error("corrupt message: {0}")]
    CorruptDecoder(String),

    #[error("missing required field '{field}' in '{type_name}'")]
    MissingField { type_name: String, field: String },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(#[source] SchemaError),

    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },
}

impl SerializationError {
    /// Only unknown fingerprints are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownSchema(_))
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptDecoder(reason.into())
    }

    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch(reason.into())
    }
}

impl From<SchemaError> for SerializationError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MissingField { type_name, field } => Self::MissingField { type_name, field },
            SchemaError::UnknownSchema(fingerprint) => Self::UnknownSchema(fingerprint),
            SchemaError::Malformed(_)
            | SchemaError::FingerprintMismatch { .. }
            | SchemaError::InvalidFingerprint(_) => Self::CorruptDecoder(err.to_string()),
            SchemaError::FieldTypeMismatch { .. }
            | SchemaError::ValueMismatch { .. }
            | SchemaError::RecordTypeMismatch { .. }
            | SchemaError::UnknownField { .. }
            | SchemaError::FieldIndexOutOfRange { .. } => Self::SchemaMismatch(err.to_string()),
            SchemaError::EmptyName
            | SchemaError::EmptyFieldName { .. }
            | SchemaError::DuplicateField { .. }
            | SchemaError::InvalidEnum { .. }
            | SchemaError::InvalidDefault { .. } => Self::InvalidSchema(err),
        }
    }
}
