//! Partial record construction.
//!
//! A [`RecordBuilder`] holds one slot per schema field plus a presence bit.
//! Nothing is validated for completeness until [`RecordBuilder::build`],
//! which fills declared defaults and reports the first required field that
//! was never set.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use crate::value::{Record, Value};

pub struct RecordBuilder<'a> {
    schema: &'a Schema,
    slots: Vec<Option<Value>>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            slots: vec![None; schema.len()],
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Sets a field by name after checking the value against its type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> SchemaResult<&mut Self> {
        let (index, _) = self
            .schema
            .field(name)
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: self.schema.name().to_string(),
                field: name.to_string(),
            })?;
        self.set_at(index, value)
    }

    /// Sets a field by declared position.
    pub fn set_at(&mut self, index: usize, value: impl Into<Value>) -> SchemaResult<&mut Self> {
        let field = self
            .schema
            .field_at(index)
            .ok_or_else(|| SchemaError::FieldIndexOutOfRange {
                type_name: self.schema.name().to_string(),
                index,
                len: self.schema.len(),
            })?;
        let value = value.into();
        if !field.field_type.accepts(&value) {
            return Err(SchemaError::FieldTypeMismatch {
                type_name: self.schema.name().to_string(),
                field: field.name.clone(),
                expected: field.field_type.type_name(),
                found: value.kind(),
            });
        }
        self.slots[index] = Some(value);
        Ok(self)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.schema
            .field(name)
            .is_some_and(|(index, _)| self.slots[index].is_some())
    }

    /// Clears a field so `build` falls back to its default again.
    pub fn clear(&mut self, name: &str) -> &mut Self {
        if let Some((index, _)) = self.schema.field(name) {
            self.slots[index] = None;
        }
        self
    }

    /// Completes the record in declared field order.
    pub fn build(self) -> SchemaResult<Record> {
        let mut record = Record::new(self.schema.name());
        for (field, slot) in self.schema.fields().iter().zip(self.slots) {
            let value = match slot {
                Some(value) => value,
                None => field
                    .default_value()
                    .ok_or_else(|| SchemaError::MissingField {
                        type_name: self.schema.name().to_string(),
                        field: field.name.clone(),
                    })?,
            };
            record.set(field.name.clone(), value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldType};
    use pretty_assertions::assert_eq;

    fn config_schema() -> Schema {
        Schema::new(
            "net.example.Configuration",
            vec![
                FieldDescriptor::string("value"),
                FieldDescriptor::string("version").with_default("1.0"),
                FieldDescriptor::optional("comment", FieldType::String),
            ],
        )
        .unwrap()
    }

    #[test]
    fn build_fills_defaults() {
        let schema = config_schema();
        let mut builder = RecordBuilder::new(&schema);
        builder.set("value", "x=1").unwrap();
        let record = builder.build().unwrap();
        assert_eq!(
            record,
            Record::new("net.example.Configuration")
                .with("value", "x=1")
                .with("version", "1.0")
                .with("comment", Value::Null)
        );
    }

    #[test]
    fn build_reports_missing_required_field() {
        let schema = config_schema();
        let builder = RecordBuilder::new(&schema);
        let err = builder.build().unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref field, .. } if field == "value"));
    }

    #[test]
    fn set_rejects_wrong_type_and_unknown_field() {
        let schema = config_schema();
        let mut builder = RecordBuilder::new(&schema);
        assert!(matches!(
            builder.set("value", 5i64),
            Err(SchemaError::FieldTypeMismatch { .. })
        ));
        assert!(matches!(
            builder.set("nope", "x"),
            Err(SchemaError::UnknownField { .. })
        ));
        assert!(matches!(
            builder.set_at(9, "x"),
            Err(SchemaError::FieldIndexOutOfRange { index: 9, len: 3, .. })
        ));
    }

    #[test]
    fn presence_bits_track_set_and_clear() {
        let schema = config_schema();
        let mut builder = RecordBuilder::new(&schema);
        assert!(!builder.is_set("version"));
        builder.set("version", "2.0").unwrap();
        assert!(builder.is_set("version"));
        builder.clear("version");
        assert!(!builder.is_set("version"));
    }
}
