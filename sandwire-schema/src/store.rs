//! Fingerprint to schema lookup.
//!
//! The store keeps canonical schemas keyed by fingerprint. Inserts are
//! insert-if-absent, so concurrent registrations of the same schema all
//! observe the first installed instance. Unknown fingerprints may be
//! looked up through an external [`SchemaResolver`] supplied by the
//! transport or persistence layer.

use crate::error::{SchemaError, SchemaResult};
use crate::fingerprint::Fingerprint;
use crate::schema::Schema;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Looks up schemas this process has never seen.
///
/// Called synchronously from the decoder with no timeout; the caller is
/// responsible for bounding its latency.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, fingerprint: &Fingerprint) -> Option<Schema>;
}

impl<F> SchemaResolver for F
where
    F: Fn(&Fingerprint) -> Option<Schema> + Send + Sync,
{
    fn resolve(&self, fingerprint: &Fingerprint) -> Option<Schema> {
        self(fingerprint)
    }
}

#[derive(Default)]
pub struct SchemaStore {
    schemas: RwLock<HashMap<Fingerprint, Arc<Schema>>>,
    resolver: RwLock<Option<Arc<dyn SchemaResolver>>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store backed by an external resolver.
    pub fn with_resolver(resolver: impl SchemaResolver + 'static) -> Self {
        let store = Self::new();
        store.register_external_resolver(resolver);
        store
    }

    /// Installs (or replaces) the external resolver.
    pub fn register_external_resolver(&self, resolver: impl SchemaResolver + 'static) {
        let mut slot = self.resolver.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(resolver));
    }

    pub fn has_external_resolver(&self) -> bool {
        self.resolver
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Registers a schema under its own fingerprint.
    pub fn register(&self, schema: &Schema) -> (Fingerprint, Arc<Schema>) {
        let fingerprint = schema.fingerprint();
        (fingerprint, self.install(fingerprint, schema.canonical()))
    }

    /// Inserts `schema` under `fingerprint` unless an entry already exists.
    /// Returns whichever schema is installed afterwards.
    pub fn register_local(&self, fingerprint: Fingerprint, schema: &Schema) -> SchemaResult<Arc<Schema>> {
        let actual = schema.fingerprint();
        if actual != fingerprint {
            return Err(SchemaError::FingerprintMismatch {
                claimed: fingerprint,
                actual,
            });
        }
        Ok(self.install(fingerprint, schema.canonical()))
    }

    /// Looks a schema up locally only.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Schema>> {
        self.schemas
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(fingerprint)
            .cloned()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.get(fingerprint).is_some()
    }

    pub fn len(&self) -> usize {
        self.schemas.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a fingerprint: local cache first, then the external
    /// resolver. A resolved schema is cached before it is returned.
    pub fn resolve(&self, fingerprint: &Fingerprint) -> SchemaResult<Arc<Schema>> {
        if let Some(schema) = self.get(fingerprint) {
            return Ok(schema);
        }

        let resolver = self
            .resolver
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(resolver) = resolver else {
            debug!(%fingerprint, "Unknown schema and no external resolver configured");
            return Err(SchemaError::UnknownSchema(*fingerprint));
        };

        match resolver.resolve(fingerprint) {
            Some(schema) if schema.fingerprint() == *fingerprint => {
                debug!(%fingerprint, schema = schema.name(), "Schema resolved externally");
                Ok(self.install(*fingerprint, schema.canonical()))
            }
            Some(schema) => {
                warn!(
                    %fingerprint,
                    actual = %schema.fingerprint(),
                    schema = schema.name(),
                    "External resolver returned a schema with a different fingerprint"
                );
                Err(SchemaError::UnknownSchema(*fingerprint))
            }
            None => {
                warn!(%fingerprint, "External resolver does not know schema");
                Err(SchemaError::UnknownSchema(*fingerprint))
            }
        }
    }

    fn install(&self, fingerprint: Fingerprint, schema: Schema) -> Arc<Schema> {
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(schemas.entry(fingerprint).or_insert_with(|| {
            debug!(%fingerprint, schema = schema.name(), "Schema registered");
            Arc::new(schema)
        }))
    }
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("schemas", &self.len())
            .field("external_resolver", &self.has_external_resolver())
            .finish()
    }
}
