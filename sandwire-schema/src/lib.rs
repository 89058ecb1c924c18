//! Record schemas for the Sandwire serialization engine.
//!
//! Defines the types every other Sandwire crate depends on:
//! - [`Schema`]: a named, ordered list of typed fields
//! - [`Fingerprint`]: the compact identity of a schema's canonical form
//! - [`Value`] / [`Record`]: the dynamic values the codec walks
//! - [`Describable`]: implemented by application types instead of reflection
//! - [`RecordBuilder`]: partial construction with per-field presence bits
//! - [`SchemaStore`]: fingerprint to schema lookup with an optional resolver

mod builder;
mod describable;
mod error;
mod fingerprint;
mod schema;
mod store;
mod value;

pub use builder::RecordBuilder;
pub use describable::Describable;
pub use error::{SchemaError, SchemaResult};
pub use fingerprint::{FINGERPRINT_LEN, Fingerprint};
pub use schema::{FieldDescriptor, FieldType, Schema};
pub use store::{SchemaResolver, SchemaStore};
pub use value::{Record, Value};
