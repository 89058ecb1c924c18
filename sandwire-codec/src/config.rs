//! Factory configuration.
//!
//! ```toml
//! [factory]
//! schema-embedding = "first-use"   # always | first-use | never
//! max-message-size = 16777216
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Maximum encoded message size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// When the writer's canonical schema travels with a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaEmbedding {
    /// Every message carries its schema.
    #[default]
    Always,
    /// Only the first message per fingerprint from this factory carries it.
    FirstUse,
    /// Never; readers must already know the schema or resolve it.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FactoryConfig {
    pub schema_embedding: SchemaEmbedding,
    pub max_message_size: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            schema_embedding: SchemaEmbedding::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl FactoryConfig {
    #[must_use]
    pub fn with_schema_embedding(mut self, embedding: SchemaEmbedding) -> Self {
        self.schema_embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Parses the `[factory]` table of a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.factory)
    }

    /// Loads configuration from a file, falling back to defaults when the
    /// file is absent or invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = ?path, "No factory config found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!(path = ?path, embedding = ?config.schema_embedding, "Loaded factory config");
                    config
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to parse factory config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read factory config, using defaults");
                Self::default()
            }
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    factory: FactoryConfig,
}
