//! The per-sandbox serializer factory.

use crate::codec;
use crate::config::{FactoryConfig, SchemaEmbedding};
use crate::error::{SerializationError, SerializationResult};
use crate::registry::SerializerRegistry;
use crate::serializer::ObjectSerializer;
use crate::wire::{WireReader, WireWriter};
use sandwire_sandbox::{ClassBinding, SandboxGroup, Whitelist};
use sandwire_schema::{Describable, Fingerprint, Schema, SchemaStore};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Serializes objects for one sandbox group under one whitelist.
///
/// Each factory owns its registry; disposing one factory never affects
/// another. The schema store may be shared.
pub struct SerializerFactory {
    whitelist: Arc<dyn Whitelist>,
    group: Arc<SandboxGroup>,
    store: Arc<SchemaStore>,
    registry: SerializerRegistry,
    config: FactoryConfig,
    /// Fingerprints already sent with an embedded schema.
    announced: Mutex<HashSet<Fingerprint>>,
}

impl SerializerFactory {
    /// A factory with a private schema store and default configuration.
    pub fn build(whitelist: Arc<dyn Whitelist>, group: Arc<SandboxGroup>) -> Self {
        Self::builder(whitelist, group).build()
    }

    pub fn builder(whitelist: Arc<dyn Whitelist>, group: Arc<SandboxGroup>) -> SerializerFactoryBuilder {
        SerializerFactoryBuilder {
            whitelist,
            group,
            store: None,
            config: FactoryConfig::default(),
        }
    }

    pub fn group(&self) -> &Arc<SandboxGroup> {
        &self.group
    }

    pub fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Returns the serializer for `T`, synthesizing and caching it on first
    /// use. `T` must be bound in this factory's sandbox group.
    pub fn serializer_for<T: Describable>(&self) -> SerializationResult<Arc<ObjectSerializer>> {
        let binding = self.bind(T::TYPE_NAME)?;
        if !binding.is::<T>() {
            return Err(self.unknown_type(T::TYPE_NAME));
        }
        self.serializer_for_binding(binding)
    }

    /// Encodes `value` as a single self-describing message.
    pub fn encode<T: Describable>(&self, value: &T) -> SerializationResult<Vec<u8>> {
        let serializer = self.serializer_for::<T>()?;
        let record = value.to_record();

        let fingerprint = serializer.fingerprint();
        let embedded = self.should_embed(&fingerprint).then(|| serializer.canonical_form());

        let mut w = WireWriter::with_capacity(64);
        codec::write_header(&mut w, &fingerprint, embedded);
        serializer.write(&mut w, &record)?;

        if w.len() > self.config.max_message_size {
            return Err(SerializationError::MessageTooLarge {
                size: w.len(),
                limit: self.config.max_message_size,
            });
        }
        if embedded.is_some() {
            self.mark_announced(fingerprint);
        }
        Ok(w.into_bytes())
    }

    /// Decodes a message into an instance of the type bound to the writer's
    /// type name in this factory's sandbox group.
    pub fn decode(&self, bytes: &[u8]) -> SerializationResult<DecodedObject> {
        if bytes.len() > self.config.max_message_size {
            return Err(SerializationError::corrupt(format!(
                "message of {} bytes exceeds limit of {} bytes",
                bytes.len(),
                self.config.max_message_size
            )));
        }

        let mut r = WireReader::new(bytes);
        let header = codec::read_header(&mut r)?;
        let writer = self.resolve_writer_schema(&header)?;

        for type_name in writer.schema.record_names() {
            self.admit(type_name)?;
        }
        let binding = self.bind(writer.schema.name())?;
        let serializer = self.serializer_for_binding(binding)?;

        let record = serializer.read(&mut r, &writer.schema)?;
        r.finish()?;

        let object = serializer.binding().instantiate(record)?;
        if writer.embedded {
            self.store.register_local(header.fingerprint, &writer.schema)?;
        }
        Ok(DecodedObject {
            type_name: serializer.type_name(),
            fingerprint: header.fingerprint,
            object,
        })
    }

    /// Decodes a message that must hold a `T`.
    pub fn decode_as<T: Describable>(&self, bytes: &[u8]) -> SerializationResult<T> {
        let decoded = self.decode(bytes)?;
        let type_name = decoded.type_name();
        decoded.downcast::<T>().map_err(|_| {
            SerializationError::mismatch(format!(
                "message holds '{type_name}', expected '{}'",
                T::TYPE_NAME
            ))
        })
    }

    /// Drops every cached serializer. Called when the sandbox group is torn
    /// down.
    pub fn dispose(&self) {
        self.registry.dispose();
        self.announced.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn serializer_for_binding(&self, binding: Arc<ClassBinding>) -> SerializationResult<Arc<ObjectSerializer>> {
        self.registry.get_or_synthesize(binding.type_name(), || {
            for type_name in binding.schema().record_names() {
                self.admit(type_name)?;
            }
            self.store.register(binding.schema());
            Ok(ObjectSerializer::synthesize(Arc::clone(&binding)))
        })
    }

    /// Resolves the writer's schema. An embedded schema is verified but not
    /// stored; `decode` registers it once the message has been accepted.
    fn resolve_writer_schema(&self, header: &codec::Header<'_>) -> SerializationResult<WriterSchema> {
        let Some(body) = header.schema else {
            let schema = self.store.resolve(&header.fingerprint).map_err(|e| {
                warn!(fingerprint = %header.fingerprint, group = %self.group.name(), "Unknown schema fingerprint");
                SerializationError::from(e)
            })?;
            return Ok(WriterSchema {
                schema,
                embedded: false,
            });
        };

        let schema = Schema::from_canonical_form(body)
            .map_err(|e| SerializationError::corrupt(format!("embedded schema: {e}")))?;
        let actual = schema.fingerprint();
        if actual != header.fingerprint {
            warn!(
                claimed = %header.fingerprint,
                %actual,
                schema = schema.name(),
                "Embedded schema does not match header fingerprint"
            );
            return Err(SerializationError::corrupt(format!(
                "embedded schema hashes to {actual}, header says {}",
                header.fingerprint
            )));
        }
        Ok(WriterSchema {
            schema: Arc::new(schema.canonical()),
            embedded: true,
        })
    }

    fn admit(&self, type_name: &str) -> SerializationResult<()> {
        if self.whitelist.is_permitted(&self.group, type_name) {
            return Ok(());
        }
        warn!(type_name, group = %self.group.name(), "Type rejected by whitelist");
        Err(SerializationError::Security {
            group: self.group.name().to_string(),
            type_name: type_name.to_string(),
        })
    }

    fn bind(&self, type_name: &str) -> SerializationResult<Arc<ClassBinding>> {
        self.group
            .resolve_class(type_name)
            .ok_or_else(|| self.unknown_type(type_name))
    }

    fn unknown_type(&self, type_name: &str) -> SerializationError {
        debug!(type_name, group = %self.group.name(), "Type not bound in sandbox group");
        SerializationError::UnknownType {
            group: self.group.name().to_string(),
            type_name: type_name.to_string(),
        }
    }

    fn should_embed(&self, fingerprint: &Fingerprint) -> bool {
        match self.config.schema_embedding {
            SchemaEmbedding::Always => true,
            SchemaEmbedding::Never => false,
            SchemaEmbedding::FirstUse => !self
                .announced
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(fingerprint),
        }
    }

    fn mark_announced(&self, fingerprint: Fingerprint) {
        if self.config.schema_embedding == SchemaEmbedding::FirstUse {
            self.announced
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(fingerprint);
        }
    }
}

/// A writer schema resolved for one decode.
struct WriterSchema {
    /// Canonical field order.
    schema: Arc<Schema>,
    /// Came from the message rather than the store.
    embedded: bool,
}

impl fmt::Debug for SerializerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerFactory")
            .field("group", &self.group.name())
            .field("serializers", &self.registry.len())
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

pub struct SerializerFactoryBuilder {
    whitelist: Arc<dyn Whitelist>,
    group: Arc<SandboxGroup>,
    store: Option<Arc<SchemaStore>>,
    config: FactoryConfig,
}

impl SerializerFactoryBuilder {
    /// Shares a schema store with other factories.
    #[must_use]
    pub fn with_store(mut self, store: Arc<SchemaStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SerializerFactory {
        debug!(
            group = %self.group,
            embedding = ?self.config.schema_embedding,
            max_message_size = self.config.max_message_size,
            "Serializer factory built"
        );
        SerializerFactory {
            whitelist: self.whitelist,
            group: self.group,
            store: self.store.unwrap_or_default(),
            registry: SerializerRegistry::new(),
            config: self.config,
            announced: Mutex::new(HashSet::new()),
        }
    }
}

/// A decoded instance of a type bound in the factory's sandbox group.
pub struct DecodedObject {
    type_name: &'static str,
    fingerprint: Fingerprint,
    object: Box<dyn Any + Send + Sync>,
}

impl DecodedObject {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fingerprint of the writer's schema.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.object.is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.object.downcast_ref()
    }

    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        let Self {
            type_name,
            fingerprint,
            object,
        } = self;
        object.downcast::<T>().map(|boxed| *boxed).map_err(|object| Self {
            type_name,
            fingerprint,
            object,
        })
    }

    pub fn into_inner(self) -> Box<dyn Any + Send + Sync> {
        self.object
    }
}

impl fmt::Debug for DecodedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedObject")
            .field("type_name", &self.type_name)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}
