//! Schema-driven serialization across sandbox boundaries.
//!
//! A [`SerializerFactory`] is bound to one sandbox group and one whitelist.
//! It lazily synthesizes an [`ObjectSerializer`] per type, caches it in its
//! own [`SerializerRegistry`], and encodes objects as:
//!
//! ```text
//! [C3 01] [fingerprint: 8] [flag: 1] [schema body?] [record payload]
//! ```
//!
//! Decoding resolves the writer's schema by fingerprint (embedded, local
//! store, or external resolver), checks every record type it names against
//! the whitelist, binds the top-level type in the group's class namespace
//! and resolves writer fields against the reader's declared schema.

pub mod codec;
mod config;
mod error;
mod factory;
mod registry;
mod serializer;
pub mod wire;

pub use config::{DEFAULT_MAX_MESSAGE_SIZE, FactoryConfig, SchemaEmbedding};
pub use error::{SerializationError, SerializationResult};
pub use factory::{DecodedObject, SerializerFactory, SerializerFactoryBuilder};
pub use registry::SerializerRegistry;
pub use serializer::ObjectSerializer;
