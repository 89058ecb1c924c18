//! Per-factory serializer cache.
//!
//! Lookups take a shared read lock. On a miss the serializer is synthesized
//! outside any lock and installed with insert-if-absent; a racer that loses
//! discards its copy and returns the installed one.

use crate::error::SerializationResult;
use crate::serializer::ObjectSerializer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
pub struct SerializerRegistry {
    serializers: RwLock<HashMap<&'static str, Arc<ObjectSerializer>>>,
    synthesized: AtomicUsize,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<ObjectSerializer>> {
        self.serializers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(type_name)
            .cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    /// Returns the cached serializer for `type_name`, synthesizing one on a
    /// miss. The first installed serializer wins.
    pub fn get_or_synthesize<F>(&self, type_name: &'static str, synthesize: F) -> SerializationResult<Arc<ObjectSerializer>>
    where
        F: FnOnce() -> SerializationResult<ObjectSerializer>,
    {
        if let Some(existing) = self.get(type_name) {
            return Ok(existing);
        }

        let candidate = Arc::new(synthesize()?);
        self.synthesized.fetch_add(1, Ordering::Relaxed);

        let mut serializers = self.serializers.write().unwrap_or_else(|e| e.into_inner());
        let installed = serializers.entry(type_name).or_insert_with(|| Arc::clone(&candidate));
        if Arc::ptr_eq(installed, &candidate) {
            debug!(
                type_name,
                fingerprint = %candidate.fingerprint(),
                "Serializer synthesized"
            );
        } else {
            debug!(type_name, "Lost serializer synthesis race, using installed instance");
        }
        Ok(Arc::clone(installed))
    }

    /// Drops every cached serializer. Called on sandbox teardown.
    pub fn dispose(&self) {
        let mut serializers = self.serializers.write().unwrap_or_else(|e| e.into_inner());
        let dropped = serializers.len();
        serializers.clear();
        debug!(dropped, "Serializer registry disposed");
    }

    pub fn len(&self) -> usize {
        self.serializers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many serializers were synthesized, including discarded racers.
    pub fn synthesis_count(&self) -> usize {
        self.synthesized.load(Ordering::Relaxed)
    }
}
