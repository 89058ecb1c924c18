use sandwire_schema::SchemaError;
use thiserror::Error;

pub type SandboxResult<T> = Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("type '{type_name}' is already bound in sandbox group '{group}'")]
    DuplicateClass { group: String, type_name: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error("invalid whitelist policy: {0}")]
    PolicyParse(#[from] toml::de::Error),

    #[error("invalid type pattern '{0}'")]
    InvalidPattern(String),
}
