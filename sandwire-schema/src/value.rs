//! Dynamic values walked by the object graph codec.

use crate::error::SchemaError;
use std::collections::BTreeMap;

/// A field value. `Null` is only valid for optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Enum symbol.
    Enum(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn enum_symbol(symbol: impl Into<String>) -> Self {
        Self::Enum(symbol.into())
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident, $kind:literal;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = SchemaError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(SchemaError::ValueMismatch {
                            expected: $kind,
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool, "bool";
    i32 => Int, "int";
    i64 => Long, "long";
    f32 => Float, "float";
    f64 => Double, "double";
    String => String, "string";
    Vec<u8> => Bytes, "bytes";
    Record => Record, "record";
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A record instance: a type name plus named field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes and returns a field value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Takes a required field and converts it.
    pub fn field<T>(&mut self, name: &str) -> Result<T, SchemaError>
    where
        T: TryFrom<Value, Error = SchemaError>,
    {
        match self.take(name) {
            None | Some(Value::Null) => Err(self.missing(name)),
            Some(value) => self.convert(name, value),
        }
    }

    /// Takes an optional field; absent and null both map to `None`.
    pub fn optional_field<T>(&mut self, name: &str) -> Result<Option<T>, SchemaError>
    where
        T: TryFrom<Value, Error = SchemaError>,
    {
        match self.take(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.convert(name, value).map(Some),
        }
    }

    /// Takes a list field and converts every item.
    pub fn list_field<T>(&mut self, name: &str) -> Result<Vec<T>, SchemaError>
    where
        T: TryFrom<Value, Error = SchemaError>,
    {
        match self.take(name) {
            Some(Value::List(items)) => items
                .into_iter()
                .map(|item| self.convert(name, item))
                .collect(),
            Some(other) => Err(self.mismatch(name, "list", other.kind())),
            None => Err(self.missing(name)),
        }
    }

    /// Takes an enum field's symbol.
    pub fn enum_field(&mut self, name: &str) -> Result<String, SchemaError> {
        match self.take(name) {
            Some(Value::Enum(symbol)) => Ok(symbol),
            Some(other) => Err(self.mismatch(name, "enum", other.kind())),
            None => Err(self.missing(name)),
        }
    }

    fn convert<T>(&self, name: &str, value: Value) -> Result<T, SchemaError>
    where
        T: TryFrom<Value, Error = SchemaError>,
    {
        T::try_from(value).map_err(|e| match e {
            SchemaError::ValueMismatch { expected, found } => self.mismatch(name, expected, found),
            other => other,
        })
    }

    fn missing(&self, name: &str) -> SchemaError {
        SchemaError::MissingField {
            type_name: self.type_name.clone(),
            field: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str, found: &'static str) -> SchemaError {
        SchemaError::FieldTypeMismatch {
            type_name: self.type_name.clone(),
            field: name.to_string(),
            expected,
            found,
        }
    }
}
