//! Sandbox groups and their class namespaces.
//!
//! Classes are bound explicitly when a group is built; there is no runtime
//! loading. Once built, a group is immutable and shared as
//! `Arc<SandboxGroup>`.

use crate::error::{SandboxError, SandboxResult};
use crate::ids::SandboxGroupId;
use sandwire_schema::{Describable, Record, Schema, SchemaError, SchemaResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Constructor = fn(Record) -> SchemaResult<Box<dyn Any + Send + Sync>>;

/// A type bound into a group's namespace: its declared schema and a
/// constructor that turns a decoded record into an instance.
pub struct ClassBinding {
    type_name: &'static str,
    type_id: TypeId,
    schema: Arc<Schema>,
    construct: Constructor,
}

impl ClassBinding {
    /// Binds `T`, validating its declared schema.
    pub fn of<T: Describable>() -> SchemaResult<Self> {
        Ok(Self {
            type_name: T::TYPE_NAME,
            type_id: TypeId::of::<T>(),
            schema: Arc::new(T::schema()?),
            construct: construct::<T>,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether this binding is for `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// The schema the bound type declares, in declaration order.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Constructs an instance from a record shaped like [`Self::schema`].
    pub fn instantiate(&self, record: Record) -> SchemaResult<Box<dyn Any + Send + Sync>> {
        if record.type_name() != self.type_name {
            return Err(SchemaError::RecordTypeMismatch {
                expected: self.type_name.to_string(),
                found: record.type_name().to_string(),
            });
        }
        (self.construct)(record)
    }
}

fn construct<T: Describable>(record: Record) -> SchemaResult<Box<dyn Any + Send + Sync>> {
    Ok(Box::new(T::from_record(record)?))
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("type_name", &self.type_name)
            .field("fingerprint", &self.schema.fingerprint())
            .finish()
    }
}

/// An isolated set of loadable types.
#[derive(Debug)]
pub struct SandboxGroup {
    id: SandboxGroupId,
    name: String,
    classes: HashMap<&'static str, Arc<ClassBinding>>,
}

impl SandboxGroup {
    pub fn builder(name: impl Into<String>) -> SandboxGroupBuilder {
        SandboxGroupBuilder {
            id: SandboxGroupId::new(),
            name: name.into(),
            classes: HashMap::new(),
        }
    }

    pub fn id(&self) -> SandboxGroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks a type name up in this group's namespace.
    pub fn resolve_class(&self, type_name: &str) -> Option<Arc<ClassBinding>> {
        self.classes.get(type_name).cloned()
    }

    /// Bound type names, sorted.
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.classes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl fmt::Display for SandboxGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug)]
pub struct SandboxGroupBuilder {
    id: SandboxGroupId,
    name: String,
    classes: HashMap<&'static str, Arc<ClassBinding>>,
}

impl SandboxGroupBuilder {
    /// Uses a fixed id instead of a fresh one.
    #[must_use]
    pub fn with_id(mut self, id: SandboxGroupId) -> Self {
        self.id = id;
        self
    }

    /// Binds `T` into the namespace. A type name may be bound once.
    pub fn with_class<T: Describable>(mut self) -> SandboxResult<Self> {
        if self.classes.contains_key(T::TYPE_NAME) {
            return Err(SandboxError::DuplicateClass {
                group: self.name,
                type_name: T::TYPE_NAME.to_string(),
            });
        }
        let binding = ClassBinding::of::<T>()?;
        self.classes.insert(T::TYPE_NAME, Arc::new(binding));
        Ok(self)
    }

    pub fn build(self) -> Arc<SandboxGroup> {
        debug!(
            group = %self.name,
            id = %self.id,
            classes = self.classes.len(),
            "Sandbox group built"
        );
        Arc::new(SandboxGroup {
            id: self.id,
            name: self.name,
            classes: self.classes,
        })
    }
}
