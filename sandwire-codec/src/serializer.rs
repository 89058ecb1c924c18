use crate::codec;
use crate::error::SerializationResult;
use crate::wire::{WireReader, WireWriter};
use sandwire_sandbox::ClassBinding;
use sandwire_schema::{Fingerprint, Record, Schema};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Compiled per-type serializer, bound to one declared schema.
///
/// Immutable after synthesis and shared across threads.
pub struct ObjectSerializer {
    binding: Arc<ClassBinding>,
    fingerprint: Fingerprint,
    canonical_form: String,
}

impl ObjectSerializer {
    /// Synthesizes a serializer for a bound class.
    pub fn synthesize(binding: Arc<ClassBinding>) -> Self {
        let canonical_form = binding.schema().canonical_form();
        let fingerprint = Fingerprint::digest(&canonical_form);
        Self {
            binding,
            fingerprint,
            canonical_form,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.binding.type_name()
    }

    pub fn type_id(&self) -> TypeId {
        self.binding.type_id()
    }

    pub fn binding(&self) -> &Arc<ClassBinding> {
        &self.binding
    }

    /// The declared schema; field order is the write order.
    pub fn schema(&self) -> &Arc<Schema> {
        self.binding.schema()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Text embedded in messages that carry their schema.
    pub fn canonical_form(&self) -> &str {
        &self.canonical_form
    }

    /// Writes a record payload.
    pub fn write(&self, w: &mut WireWriter, record: &Record) -> SerializationResult<()> {
        codec::write_record(w, self.schema(), record)
    }

    /// Reads a record payload written with `writer` and resolves it against
    /// this serializer's schema.
    pub fn read(&self, r: &mut WireReader<'_>, writer: &Schema) -> SerializationResult<Record> {
        codec::read_record(r, writer, self.schema())
    }
}

impl fmt::Debug for ObjectSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSerializer")
            .field("type_name", &self.type_name())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
