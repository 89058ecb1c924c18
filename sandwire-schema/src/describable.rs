use crate::error::SchemaResult;
use crate::schema::{FieldDescriptor, Schema};
use crate::value::Record;

/// Implemented by application types that may be serialized.
///
/// Replaces runtime reflection: the type states its wire name and its
/// fields in declaration order, and converts itself to and from a
/// [`Record`]. Field order must be stable across builds so fingerprints
/// stay reproducible.
pub trait Describable: Sized + Send + Sync + 'static {
    /// Fully qualified type name, e.g. `com.acme.Order`.
    const TYPE_NAME: &'static str;

    fn fields() -> Vec<FieldDescriptor>;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> SchemaResult<Self>;

    /// The validated schema of this type.
    fn schema() -> SchemaResult<Schema> {
        Schema::new(Self::TYPE_NAME, Self::fields())
    }
}
