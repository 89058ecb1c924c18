//! Object graph codec.
//!
//! A record payload starts with a field-order marker:
//!
//! - `0`: values follow in the writer schema's canonical (name-sorted) order
//! - `1`: a table follows (varint count, then one varint canonical index per
//!   written field) and values follow in the writer's declared order
//!
//! Readers resolve writer fields against their own declared schema by name.
//! Fields only the writer knows are skipped; fields only the reader knows
//! take their default.

use crate::error::{SerializationError, SerializationResult};
use crate::wire::{WireReader, WireWriter};
use sandwire_schema::{FieldDescriptor, FieldType, Fingerprint, Record, Schema, Value};
use std::collections::BTreeMap;

/// Single-object encoding marker.
pub const MARKER: [u8; 2] = [0xC3, 0x01];

const FINGERPRINT_ONLY: u8 = 0;
const SCHEMA_EMBEDDED: u8 = 1;

const CANONICAL_ORDER: u8 = 0;
const FIELD_ORDER_TABLE: u8 = 1;

/// Upper bound on list capacity reserved from an untrusted count.
const PREALLOC_LIMIT: usize = 1024;

const NONE_BRANCH: u8 = 0;
const SOME_BRANCH: u8 = 1;

/// Decoded message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub fingerprint: Fingerprint,
    /// Canonical schema text, when the writer embedded it.
    pub schema: Option<&'a str>,
}

pub fn write_header(w: &mut WireWriter, fingerprint: &Fingerprint, schema: Option<&str>) {
    w.write_raw(&MARKER);
    w.write_raw(fingerprint.as_bytes());
    match schema {
        Some(body) => {
            w.write_u8(SCHEMA_EMBEDDED);
            w.write_str(body);
        }
        None => w.write_u8(FINGERPRINT_ONLY),
    }
}

pub fn read_header<'a>(r: &mut WireReader<'a>) -> SerializationResult<Header<'a>> {
    let marker = r.read_array::<2>()?;
    if marker != MARKER {
        return Err(SerializationError::corrupt(format!(
            "bad marker {:02x}{:02x}",
            marker[0], marker[1]
        )));
    }
    let fingerprint = Fingerprint::from_bytes(r.read_array()?);
    let schema = match r.read_u8()? {
        FINGERPRINT_ONLY => None,
        SCHEMA_EMBEDDED => Some(r.read_str()?),
        other => {
            return Err(SerializationError::corrupt(format!(
                "bad schema flag 0x{other:02x}"
            )));
        }
    };
    Ok(Header {
        fingerprint,
        schema,
    })
}

// ── Encoding ─────────────────────────────────────────────────────

/// Writes `record` in `schema`'s declared order. Fields absent from the
/// record fall back to their default.
pub fn write_record(w: &mut WireWriter, schema: &Schema, record: &Record) -> SerializationResult<()> {
    if record.type_name() != schema.name() {
        return Err(SerializationError::mismatch(format!(
            "record is '{}', schema is '{}'",
            record.type_name(),
            schema.name()
        )));
    }

    if schema.is_canonical_order() {
        w.write_u8(CANONICAL_ORDER);
    } else {
        w.write_u8(FIELD_ORDER_TABLE);
        w.write_len(schema.len());
        for &index in schema.canonical_order() {
            w.write_len(index);
        }
    }

    for field in schema.fields() {
        match record.get(&field.name) {
            Some(value) => write_value(w, schema, field, &field.field_type, value)?,
            None => {
                let value = field
                    .default_value()
                    .ok_or_else(|| SerializationError::MissingField {
                        type_name: schema.name().to_string(),
                        field: field.name.clone(),
                    })?;
                write_value(w, schema, field, &field.field_type, &value)?;
            }
        }
    }
    Ok(())
}

fn write_value(
    w: &mut WireWriter,
    schema: &Schema,
    field: &FieldDescriptor,
    ty: &FieldType,
    value: &Value,
) -> SerializationResult<()> {
    match (ty, value) {
        (FieldType::Optional(_), Value::Null) => w.write_u8(NONE_BRANCH),
        (FieldType::Optional(inner), value) => {
            w.write_u8(SOME_BRANCH);
            write_value(w, schema, field, inner, value)?;
        }
        (FieldType::Bool, Value::Bool(v)) => w.write_bool(*v),
        (FieldType::Int, Value::Int(v)) => w.write_i32(*v),
        (FieldType::Long, Value::Long(v)) => w.write_i64(*v),
        (FieldType::Float, Value::Float(v)) => w.write_f32(*v),
        (FieldType::Double, Value::Double(v)) => w.write_f64(*v),
        (FieldType::String, Value::String(v)) => w.write_str(v),
        (FieldType::Bytes, Value::Bytes(v)) => w.write_bytes(v),
        (FieldType::Enum(symbols), Value::Enum(symbol)) => {
            let index = symbols.iter().position(|s| s == symbol).ok_or_else(|| {
                SerializationError::mismatch(format!(
                    "'{}.{}' has no enum symbol '{symbol}'",
                    schema.name(),
                    field.name
                ))
            })?;
            w.write_len(index);
        }
        (FieldType::List(item), Value::List(items)) => {
            w.write_len(items.len());
            for v in items {
                write_value(w, schema, field, item, v)?;
            }
        }
        (FieldType::Map(item), Value::Map(entries)) => {
            w.write_len(entries.len());
            for (key, v) in entries {
                w.write_str(key);
                write_value(w, schema, field, item, v)?;
            }
        }
        (FieldType::Record(nested), Value::Record(record)) => write_record(w, nested, record)?,
        (ty, value) => {
            return Err(SerializationError::mismatch(format!(
                "'{}.{}' expects {}, got {}",
                schema.name(),
                field.name,
                ty.type_name(),
                value.kind()
            )));
        }
    }
    Ok(())
}

// ── Decoding ─────────────────────────────────────────────────────

/// Reads the field-order marker and returns, for each written position,
/// the index of the field in `writer` (canonical order).
pub fn read_field_order(r: &mut WireReader<'_>, writer: &Schema) -> SerializationResult<Vec<usize>> {
    match r.read_u8()? {
        CANONICAL_ORDER => Ok((0..writer.len()).collect()),
        FIELD_ORDER_TABLE => {
            let count = r.read_len()?;
            if count != writer.len() {
                return Err(SerializationError::corrupt(format!(
                    "field-order table for '{}' has {count} entries, schema has {}",
                    writer.name(),
                    writer.len()
                )));
            }
            let mut seen = vec![false; count];
            let mut order = Vec::with_capacity(count);
            for _ in 0..count {
                let index = read_index(r)?;
                match seen.get_mut(index) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(SerializationError::corrupt(format!(
                            "duplicate field index {index} in field-order table for '{}'",
                            writer.name()
                        )));
                    }
                    None => {
                        return Err(SerializationError::corrupt(format!(
                            "field index {index} out of bounds for '{}' ({count} fields)",
                            writer.name()
                        )));
                    }
                }
                order.push(index);
            }
            Ok(order)
        }
        other => Err(SerializationError::corrupt(format!(
            "bad field-order marker 0x{other:02x} for '{}'",
            writer.name()
        ))),
    }
}

/// Reads a record written with `writer` (a canonical schema) and resolves
/// it against `reader` (a declared schema). The result lists fields in the
/// reader's declared order.
pub fn read_record(r: &mut WireReader<'_>, writer: &Schema, reader: &Schema) -> SerializationResult<Record> {
    if writer.name() != reader.name() {
        return Err(SerializationError::mismatch(format!(
            "writer record '{}' cannot be read as '{}'",
            writer.name(),
            reader.name()
        )));
    }

    let order = read_field_order(r, writer)?;
    let mut slots: Vec<Option<Value>> = vec![None; reader.len()];

    let fast_path = if writer.fingerprint() == reader.fingerprint() {
        canonical_positions(writer, reader)
    } else {
        None
    };

    if let Some(position_of) = fast_path {
        for index in order {
            let position = position_of[index];
            let wanted = &reader.fields()[position];
            slots[position] = Some(read_resolved(
                r,
                reader,
                wanted,
                &writer.fields()[index].field_type,
                &wanted.field_type,
            )?);
        }
    } else {
        for index in order {
            let written = &writer.fields()[index];
            match reader.field(&written.name) {
                Some((position, wanted)) => {
                    slots[position] = Some(read_resolved(
                        r,
                        reader,
                        wanted,
                        &written.field_type,
                        &wanted.field_type,
                    )?);
                }
                None => skip_value(r, &written.field_type)?,
            }
        }
    }

    let mut record = Record::new(reader.name());
    for (field, slot) in reader.fields().iter().zip(slots) {
        let value = match slot {
            Some(value) => value,
            None => field
                .default_value()
                .ok_or_else(|| SerializationError::MissingField {
                    type_name: reader.name().to_string(),
                    field: field.name.clone(),
                })?,
        };
        record.set(field.name.clone(), value);
    }
    Ok(record)
}

/// Maps each canonical index of `writer` to the declared position of the
/// same field in `reader`. `None` unless both list the same field names.
fn canonical_positions(writer: &Schema, reader: &Schema) -> Option<Vec<usize>> {
    if writer.len() != reader.len() {
        return None;
    }
    let mut position_of = vec![0; reader.len()];
    for (position, &index) in reader.canonical_order().iter().enumerate() {
        let written = writer.field_at(index)?;
        if written.name != reader.fields()[position].name {
            return None;
        }
        position_of[index] = position;
    }
    Some(position_of)
}

/// Reads a value whose writer and reader types are identical.
pub fn read_value(r: &mut WireReader<'_>, ty: &FieldType) -> SerializationResult<Value> {
    Ok(match ty {
        FieldType::Bool => Value::Bool(r.read_bool()?),
        FieldType::Int => Value::Int(r.read_i32()?),
        FieldType::Long => Value::Long(r.read_i64()?),
        FieldType::Float => Value::Float(r.read_f32()?),
        FieldType::Double => Value::Double(r.read_f64()?),
        FieldType::String => Value::String(r.read_str()?.to_string()),
        FieldType::Bytes => Value::Bytes(r.read_bytes()?.to_vec()),
        FieldType::Enum(symbols) => Value::Enum(read_symbol(r, symbols)?.to_string()),
        FieldType::Optional(inner) => {
            if read_branch(r)? {
                read_value(r, inner)?
            } else {
                Value::Null
            }
        }
        FieldType::List(item) => {
            let count = r.read_len()?;
            let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
            for _ in 0..count {
                items.push(read_value(r, item)?);
            }
            Value::List(items)
        }
        FieldType::Map(item) => {
            let count = r.read_len()?;
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = r.read_str()?.to_string();
                let value = read_value(r, item)?;
                insert_entry(&mut entries, key, value)?;
            }
            Value::Map(entries)
        }
        FieldType::Record(schema) => Value::Record(read_record(r, schema, schema)?),
    })
}

/// Reads a value written as `written` and converts it to `wanted`.
fn read_resolved(
    r: &mut WireReader<'_>,
    reader: &Schema,
    field: &FieldDescriptor,
    written: &FieldType,
    wanted: &FieldType,
) -> SerializationResult<Value> {
    use FieldType as T;

    Ok(match (written, wanted) {
        (T::Optional(w), T::Optional(rd)) => {
            if read_branch(r)? {
                read_resolved(r, reader, field, w, rd)?
            } else {
                Value::Null
            }
        }
        (w, T::Optional(rd)) => read_resolved(r, reader, field, w, rd)?,

        (T::Bool, T::Bool) => Value::Bool(r.read_bool()?),
        (T::Int, T::Int) => Value::Int(r.read_i32()?),
        (T::Int, T::Long) => Value::Long(i64::from(r.read_i32()?)),
        (T::Int, T::Float) => Value::Float(r.read_i32()? as f32),
        (T::Int, T::Double) => Value::Double(f64::from(r.read_i32()?)),
        (T::Long, T::Long) => Value::Long(r.read_i64()?),
        (T::Long, T::Float) => Value::Float(r.read_i64()? as f32),
        (T::Long, T::Double) => Value::Double(r.read_i64()? as f64),
        (T::Float, T::Float) => Value::Float(r.read_f32()?),
        (T::Float, T::Double) => Value::Double(f64::from(r.read_f32()?)),
        (T::Double, T::Double) => Value::Double(r.read_f64()?),
        (T::String, T::String) => Value::String(r.read_str()?.to_string()),
        (T::Bytes, T::Bytes) => Value::Bytes(r.read_bytes()?.to_vec()),

        (T::Enum(w), T::Enum(rd)) => {
            let symbol = read_symbol(r, w)?;
            if !rd.iter().any(|s| s == symbol) {
                return Err(SerializationError::mismatch(format!(
                    "'{}.{}' has no enum symbol '{symbol}'",
                    reader.name(),
                    field.name
                )));
            }
            Value::Enum(symbol.to_string())
        }
        (T::List(w), T::List(rd)) => {
            let count = r.read_len()?;
            let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
            for _ in 0..count {
                items.push(read_resolved(r, reader, field, w, rd)?);
            }
            Value::List(items)
        }
        (T::Map(w), T::Map(rd)) => {
            let count = r.read_len()?;
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = r.read_str()?.to_string();
                let value = read_resolved(r, reader, field, w, rd)?;
                insert_entry(&mut entries, key, value)?;
            }
            Value::Map(entries)
        }
        (T::Record(w), T::Record(rd)) => Value::Record(read_record(r, w, rd)?),

        (written, wanted) => {
            return Err(SerializationError::mismatch(format!(
                "'{}.{}' was written as {} and cannot be read as {}",
                reader.name(),
                field.name,
                written.type_name(),
                wanted.type_name()
            )));
        }
    })
}

/// Reads and discards a value of type `ty`.
pub fn skip_value(r: &mut WireReader<'_>, ty: &FieldType) -> SerializationResult<()> {
    match ty {
        FieldType::Bool => {
            r.read_bool()?;
        }
        FieldType::Int => {
            r.read_i32()?;
        }
        FieldType::Long => {
            r.read_i64()?;
        }
        FieldType::Float => {
            r.read_raw(4)?;
        }
        FieldType::Double => {
            r.read_raw(8)?;
        }
        FieldType::String => {
            r.read_str()?;
        }
        FieldType::Bytes => {
            r.read_bytes()?;
        }
        FieldType::Enum(symbols) => {
            read_symbol(r, symbols)?;
        }
        FieldType::Optional(inner) => {
            if read_branch(r)? {
                skip_value(r, inner)?;
            }
        }
        FieldType::List(item) => {
            for _ in 0..r.read_len()? {
                skip_value(r, item)?;
            }
        }
        FieldType::Map(item) => {
            for _ in 0..r.read_len()? {
                r.read_str()?;
                skip_value(r, item)?;
            }
        }
        FieldType::Record(schema) => {
            for index in read_field_order(r, schema)? {
                skip_value(r, &schema.fields()[index].field_type)?;
            }
        }
    }
    Ok(())
}

fn read_branch(r: &mut WireReader<'_>) -> SerializationResult<bool> {
    match r.read_u8()? {
        NONE_BRANCH => Ok(false),
        SOME_BRANCH => Ok(true),
        other => Err(SerializationError::corrupt(format!(
            "bad optional branch 0x{other:02x} at offset {}",
            r.position() - 1
        ))),
    }
}

fn read_index(r: &mut WireReader<'_>) -> SerializationResult<usize> {
    let index = r.read_varint()?;
    usize::try_from(index)
        .map_err(|_| SerializationError::corrupt(format!("index {index} does not fit in usize")))
}

fn read_symbol<'s>(r: &mut WireReader<'_>, symbols: &'s [String]) -> SerializationResult<&'s str> {
    let index = read_index(r)?;
    symbols
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| {
            SerializationError::corrupt(format!(
                "enum index {index} out of range ({} symbols)",
                symbols.len()
            ))
        })
}

fn insert_entry(entries: &mut BTreeMap<String, Value>, key: String, value: Value) -> SerializationResult<()> {
    if entries.contains_key(&key) {
        return Err(SerializationError::corrupt(format!("duplicate map key '{key}'")));
    }
    entries.insert(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema(name: &str, fields: Vec<FieldDescriptor>) -> Schema {
        Schema::new(name, fields).unwrap()
    }

    fn encode(schema: &Schema, record: &Record) -> Vec<u8> {
        let mut w = WireWriter::new();
        write_record(&mut w, schema, record).unwrap();
        w.into_bytes()
    }

    fn decode(bytes: &[u8], writer: &Schema, reader: &Schema) -> SerializationResult<Record> {
        let mut r = WireReader::new(bytes);
        let record = read_record(&mut r, &writer.canonical(), reader)?;
        r.finish()?;
        Ok(record)
    }

    #[test]
    fn header_roundtrip() {
        let fp = Fingerprint::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
        let mut w = WireWriter::new();
        write_header(&mut w, &fp, Some("{}"));
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..2], &[0xC3, 0x01]);

        let mut r = WireReader::new(&bytes);
        let header = read_header(&mut r).unwrap();
        assert_eq!(header.fingerprint, fp);
        assert_eq!(header.schema, Some("{}"));
        r.finish().unwrap();
    }

    #[test]
    fn bad_marker_and_flag_rejected() {
        let mut bytes = vec![0xC3, 0x02];
        bytes.extend_from_slice(&[0; 9]);
        assert!(read_header(&mut WireReader::new(&bytes)).is_err());

        let mut bytes = MARKER.to_vec();
        bytes.extend_from_slice(&[0; 8]);
        bytes.push(7);
        let err = read_header(&mut WireReader::new(&bytes)).unwrap_err();
        assert!(err.to_string().contains("bad schema flag"));
    }

    #[test]
    fn canonical_declaration_writes_no_table() {
        let s = schema("t.A", vec![FieldDescriptor::int("a"), FieldDescriptor::int("b")]);
        let bytes = encode(&s, &Record::new("t.A").with("a", 1i32).with("b", 2i32));
        assert_eq!(bytes, vec![CANONICAL_ORDER, 2, 4]);
    }

    #[test]
    fn declared_order_writes_table() {
        let s = schema("t.A", vec![FieldDescriptor::int("b"), FieldDescriptor::int("a")]);
        let bytes = encode(&s, &Record::new("t.A").with("a", 1i32).with("b", 2i32));
        // table: count 2, b -> canonical 1, a -> canonical 0; then b, a
        assert_eq!(bytes, vec![FIELD_ORDER_TABLE, 2, 1, 0, 4, 2]);
        let decoded = decode(&bytes, &s, &s).unwrap();
        assert_eq!(decoded, Record::new("t.A").with("b", 2i32).with("a", 1i32));
    }

    #[test]
    fn table_errors_are_corrupt() {
        let s = schema("t.A", vec![FieldDescriptor::int("a"), FieldDescriptor::int("b")]);
        for bytes in [
            vec![FIELD_ORDER_TABLE, 2, 0, 5, 2, 4],
            vec![FIELD_ORDER_TABLE, 2, 0, 0, 2, 4],
            vec![FIELD_ORDER_TABLE, 1, 0, 2],
            vec![9, 2, 4],
        ] {
            assert!(matches!(
                decode(&bytes, &s, &s),
                Err(SerializationError::CorruptDecoder(_))
            ));
        }
    }

    #[test]
    fn canonical_positions_require_matching_layout() {
        let declared = schema("t.A", vec![FieldDescriptor::int("b"), FieldDescriptor::int("a")]);
        assert_eq!(canonical_positions(&declared.canonical(), &declared), Some(vec![1, 0]));

        let longer = schema(
            "t.A",
            vec![FieldDescriptor::int("a"), FieldDescriptor::int("b"), FieldDescriptor::int("c")],
        );
        assert_eq!(canonical_positions(&longer.canonical(), &declared), None);
        assert_eq!(canonical_positions(&declared.canonical(), &longer), None);

        let renamed = schema("t.A", vec![FieldDescriptor::int("a"), FieldDescriptor::int("z")]);
        assert_eq!(canonical_positions(&renamed.canonical(), &declared), None);
    }

    #[test]
    fn promotions() {
        let writer = schema(
            "t.P",
            vec![
                FieldDescriptor::int("i"),
                FieldDescriptor::long("l"),
                FieldDescriptor::float("f"),
                FieldDescriptor::string("s"),
            ],
        );
        let reader = schema(
            "t.P",
            vec![
                FieldDescriptor::double("i"),
                FieldDescriptor::float("l"),
                FieldDescriptor::double("f"),
                FieldDescriptor::optional("s", FieldType::String),
            ],
        );
        let bytes = encode(
            &writer,
            &Record::new("t.P")
                .with("i", 3i32)
                .with("l", 4i64)
                .with("f", 0.5f32)
                .with("s", "x"),
        );
        let decoded = decode(&bytes, &writer, &reader).unwrap();
        assert_eq!(
            decoded,
            Record::new("t.P")
                .with("i", 3.0f64)
                .with("l", 4.0f32)
                .with("f", 0.5f64)
                .with("s", "x")
        );
    }

    #[test]
    fn narrowing_is_a_mismatch() {
        let writer = schema("t.N", vec![FieldDescriptor::long("v")]);
        let reader = schema("t.N", vec![FieldDescriptor::int("v")]);
        let bytes = encode(&writer, &Record::new("t.N").with("v", 1i64));
        assert!(matches!(
            decode(&bytes, &writer, &reader),
            Err(SerializationError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn enum_symbols_checked_against_reader() {
        let writer = schema("t.E", vec![FieldDescriptor::enumeration("s", ["A", "B", "C"])]);
        let reader = schema("t.E", vec![FieldDescriptor::enumeration("s", ["C", "A"])]);
        let ok = encode(&writer, &Record::new("t.E").with("s", Value::enum_symbol("C")));
        assert_eq!(
            decode(&ok, &writer, &reader).unwrap(),
            Record::new("t.E").with("s", Value::enum_symbol("C"))
        );
        let bad = encode(&writer, &Record::new("t.E").with("s", Value::enum_symbol("B")));
        assert!(matches!(
            decode(&bad, &writer, &reader),
            Err(SerializationError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn writer_only_nested_fields_are_skipped() {
        let inner = schema(
            "t.Inner",
            vec![FieldDescriptor::string("z"), FieldDescriptor::int("y")],
        );
        let writer = schema(
            "t.Outer",
            vec![
                FieldDescriptor::new("extra", FieldType::list(FieldType::Record(Box::new(inner.clone())))),
                FieldDescriptor::map("meta", FieldType::optional(FieldType::Bytes)),
                FieldDescriptor::long("id"),
            ],
        );
        let reader = schema("t.Outer", vec![FieldDescriptor::long("id")]);
        let record = Record::new("t.Outer")
            .with(
                "extra",
                Value::list([Record::new("t.Inner").with("z", "q").with("y", 9i32)]),
            )
            .with("meta", Value::map([("k", Some(vec![1u8, 2]))]))
            .with("id", 77i64);
        let bytes = encode(&writer, &record);
        assert_eq!(
            decode(&bytes, &writer, &reader).unwrap(),
            Record::new("t.Outer").with("id", 77i64)
        );
    }

    #[test]
    fn value_type_mismatch_on_write() {
        let s = schema("t.W", vec![FieldDescriptor::int("a")]);
        let mut w = WireWriter::new();
        let err = write_record(&mut w, &s, &Record::new("t.W").with("a", "one")).unwrap_err();
        assert!(err.to_string().contains("'t.W.a' expects int, got string"));
    }

    #[test]
    fn duplicate_map_keys_are_corrupt() {
        let ty = FieldType::map(FieldType::Int);
        let mut w = WireWriter::new();
        w.write_len(2);
        w.write_str("k");
        w.write_i32(1);
        w.write_str("k");
        w.write_i32(2);
        let bytes = w.into_bytes();
        assert!(matches!(
            read_value(&mut WireReader::new(&bytes), &ty),
            Err(SerializationError::CorruptDecoder(_))
        ));
    }
}
