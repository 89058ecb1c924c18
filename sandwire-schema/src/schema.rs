use crate::describable::Describable;
use crate::error::{SchemaError, SchemaResult};
use crate::fingerprint::Fingerprint;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Describes a record type: its name and its fields in declaration order.
///
/// Declaration order is the order a writer emits fields in. The canonical
/// form sorts fields by name, so two schemas that only differ in
/// declaration order share a [`Fingerprint`].
#[derive(Clone, Deserialize)]
#[serde(try_from = "SchemaBody")]
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
    fingerprint: OnceLock<Fingerprint>,
    canonical_order: OnceLock<Vec<usize>>,
}

impl Schema {
    /// Builds and validates a schema.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> SchemaResult<Self> {
        let schema = Self::unchecked(name, fields);
        schema.validate()?;
        Ok(schema)
    }

    /// Builds a schema without validating it. Nested record types are
    /// described this way and validated together with the enclosing schema.
    pub(crate) fn unchecked(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            fingerprint: OnceLock::new(),
            canonical_order: OnceLock::new(),
        }
    }

    /// Parses a schema body produced by [`Schema::canonical_form`].
    pub fn from_canonical_form(body: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a field up by name, returning its declared position.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDescriptor)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// Returns the fingerprint of the canonical form, computing it once.
    pub fn fingerprint(&self) -> Fingerprint {
        *self
            .fingerprint
            .get_or_init(|| Fingerprint::digest(&self.canonical_form()))
    }

    /// For each declared position, the index of that field in canonical
    /// (name-sorted) order.
    pub fn canonical_order(&self) -> &[usize] {
        self.canonical_order.get_or_init(|| {
            let mut sorted: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
            sorted.sort_unstable();
            self.fields
                .iter()
                .map(|f| sorted.binary_search(&f.name.as_str()).unwrap_or_default())
                .collect()
        })
    }

    /// True when declaration order already is canonical order.
    pub fn is_canonical_order(&self) -> bool {
        self.canonical_order()
            .iter()
            .enumerate()
            .all(|(position, &index)| position == index)
    }

    /// Returns this schema with fields sorted by name at every nesting level
    /// and defaults removed.
    #[must_use]
    pub fn canonical(&self) -> Schema {
        let mut fields: Vec<FieldDescriptor> = self
            .fields
            .iter()
            .map(|f| FieldDescriptor::new(f.name.clone(), f.field_type.canonical()))
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Schema::unchecked(self.name.clone(), fields)
    }

    /// Compact JSON text of the canonical schema. This is both the
    /// fingerprint input and the schema body embedded in messages.
    pub fn canonical_form(&self) -> String {
        // Plain structs with string keys always serialize.
        serde_json::to_string(&self.canonical_body()).unwrap_or_default()
    }

    /// Names of every record type reachable from this schema, this one
    /// first, depth-first, without duplicates.
    pub fn record_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_record_names(&mut names);
        names
    }

    fn collect_record_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !out.contains(&self.name.as_str()) {
            out.push(&self.name);
        }
        for field in &self.fields {
            field.field_type.collect_record_names(out);
        }
    }

    fn canonical_body(&self) -> CanonicalSchema<'_> {
        let mut fields: Vec<CanonicalField<'_>> = self
            .fields
            .iter()
            .map(|f| CanonicalField {
                name: &f.name,
                field_type: CanonicalType(&f.field_type),
            })
            .collect();
        fields.sort_by(|a, b| a.name.cmp(b.name));
        CanonicalSchema {
            fields,
            name: &self.name,
        }
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    type_name: self.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            field.field_type.validate(&self.name, &field.name)?;
            if let Some(default) = &field.default {
                if !field.field_type.accepts(default) {
                    return Err(SchemaError::InvalidDefault {
                        type_name: self.name.clone(),
                        field: field.name.clone(),
                        expected: field.field_type.type_name(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Canonical text shape. Keys are emitted in struct order, which is
/// alphabetical, independent of how `serde_json` orders its maps.
#[derive(Serialize)]
struct CanonicalSchema<'a> {
    fields: Vec<CanonicalField<'a>>,
    name: &'a str,
}

#[derive(Serialize)]
struct CanonicalField<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    field_type: CanonicalType<'a>,
}

/// Scalars are bare type names; composite types are single-key objects.
struct CanonicalType<'a>(&'a FieldType);

impl Serialize for CanonicalType<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = match self.0 {
            FieldType::Enum(_)
            | FieldType::Optional(_)
            | FieldType::List(_)
            | FieldType::Map(_)
            | FieldType::Record(_) => serializer.serialize_map(Some(1))?,
            scalar => return serializer.serialize_str(scalar.type_name()),
        };
        match self.0 {
            FieldType::Enum(symbols) => map.serialize_entry("enum", symbols)?,
            FieldType::Optional(inner) => map.serialize_entry("optional", &CanonicalType(inner))?,
            FieldType::List(item) => map.serialize_entry("list", &CanonicalType(item))?,
            FieldType::Map(item) => map.serialize_entry("map", &CanonicalType(item))?,
            FieldType::Record(schema) => map.serialize_entry("record", &schema.canonical_body())?,
            _ => {}
        }
        map.end()
    }
}

/// Wire shape of a schema body.
#[derive(Deserialize)]
struct SchemaBody {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl TryFrom<SchemaBody> for Schema {
    type Error = SchemaError;

    fn try_from(body: SchemaBody) -> Result<Self, Self::Error> {
        Schema::new(body.name, body.fields)
    }
}

/// A named, typed field of a record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Value used when a reader expects this field but the writer did not
    /// send it. Never part of the canonical form.
    #[serde(skip)]
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Required fields have no declared default and are not optional.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.field_type, FieldType::Optional(_))
    }

    /// The declared default, or none for optional fields.
    pub fn default_value(&self) -> Option<Value> {
        match (&self.default, &self.field_type) {
            (Some(value), _) => Some(value.clone()),
            (None, FieldType::Optional(_)) => Some(Value::Null),
            (None, _) => None,
        }
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn long(name: &str) -> Self {
        Self::new(name, FieldType::Long)
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn double(name: &str) -> Self {
        Self::new(name, FieldType::Double)
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn bytes(name: &str) -> Self {
        Self::new(name, FieldType::Bytes)
    }

    /// Shorthand for an enum field with fixed symbols.
    pub fn enumeration<I, S>(name: &str, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldType::enumeration(symbols))
    }

    pub fn optional(name: &str, inner: FieldType) -> Self {
        Self::new(name, FieldType::optional(inner))
    }

    pub fn list(name: &str, item: FieldType) -> Self {
        Self::new(name, FieldType::list(item))
    }

    pub fn map(name: &str, value: FieldType) -> Self {
        Self::new(name, FieldType::map(value))
    }

    /// Shorthand for a nested record of type `T`.
    pub fn record<T: Describable>(name: &str) -> Self {
        Self::new(name, FieldType::record_of::<T>())
    }
}

/// The data type of a field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Enum(Vec<String>),
    Optional(Box<FieldType>),
    List(Box<FieldType>),
    /// String-keyed map.
    Map(Box<FieldType>),
    Record(Box<Schema>),
}

impl FieldType {
    pub fn record_of<T: Describable>() -> Self {
        Self::Record(Box::new(Schema::unchecked(T::TYPE_NAME, T::fields())))
    }

    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(symbols.into_iter().map(Into::into).collect())
    }

    pub fn optional(inner: FieldType) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(item: FieldType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn map(value: FieldType) -> Self {
        Self::Map(Box::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum(_) => "enum",
            Self::Optional(_) => "optional",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    /// Whether `value` conforms to this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Optional(_), Value::Null) => true,
            (Self::Optional(inner), value) => inner.accepts(value),
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Long, Value::Long(_))
            | (Self::Float, Value::Float(_))
            | (Self::Double, Value::Double(_))
            | (Self::String, Value::String(_))
            | (Self::Bytes, Value::Bytes(_)) => true,
            (Self::Enum(symbols), Value::Enum(symbol)) => symbols.contains(symbol),
            (Self::List(item), Value::List(items)) => items.iter().all(|v| item.accepts(v)),
            (Self::Map(item), Value::Map(entries)) => entries.values().all(|v| item.accepts(v)),
            (Self::Record(schema), Value::Record(record)) => {
                record.type_name() == schema.name()
                    && schema.fields().iter().all(|f| match record.get(&f.name) {
                        Some(v) => f.field_type.accepts(v),
                        None => !f.is_required(),
                    })
            }
            _ => false,
        }
    }

    fn canonical(&self) -> FieldType {
        match self {
            Self::Optional(inner) => Self::Optional(Box::new(inner.canonical())),
            Self::List(item) => Self::List(Box::new(item.canonical())),
            Self::Map(item) => Self::Map(Box::new(item.canonical())),
            Self::Record(schema) => Self::Record(Box::new(schema.canonical())),
            other => other.clone(),
        }
    }

    fn validate(&self, type_name: &str, field: &str) -> SchemaResult<()> {
        match self {
            Self::Enum(symbols) => {
                let mut seen = HashSet::new();
                let valid = !symbols.is_empty()
                    && symbols.iter().all(|s| !s.is_empty() && seen.insert(s.as_str()));
                if valid {
                    Ok(())
                } else {
                    Err(SchemaError::InvalidEnum {
                        type_name: type_name.to_string(),
                        field: field.to_string(),
                    })
                }
            }
            Self::Optional(inner) | Self::List(inner) | Self::Map(inner) => {
                inner.validate(type_name, field)
            }
            Self::Record(schema) => schema.validate(),
            _ => Ok(()),
        }
    }

    fn collect_record_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Optional(inner) | Self::List(inner) | Self::Map(inner) => {
                inner.collect_record_names(out)
            }
            Self::Record(schema) => schema.collect_record_names(out),
            _ => {}
        }
    }
}
