//! Shared fixtures for codec tests.

#![allow(dead_code)]

use sandwire_codec::{FactoryConfig, SerializerFactory};
use sandwire_sandbox::{AllWhitelist, SandboxGroup, Whitelist};
use sandwire_schema::{
    Describable, FieldDescriptor, FieldType, Record, SchemaResult, SchemaStore, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;

// ── Domain types ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub name: String,
    pub key: Vec<u8>,
}

impl Describable for Party {
    const TYPE_NAME: &'static str = "com.acme.Party";

    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::string("name"), FieldDescriptor::bytes("key")]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("name", self.name.clone())
            .with("key", self.key.clone())
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            name: record.field("name")?,
            key: record.field("key")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub quantity: i32,
    pub price: f64,
    pub discount: f32,
    pub express: bool,
    pub status: String,
    pub buyer: Party,
    pub lines: Vec<String>,
    pub attributes: BTreeMap<String, i64>,
    pub note: Option<String>,
}

impl Describable for Order {
    const TYPE_NAME: &'static str = "com.acme.Order";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::long("id"),
            FieldDescriptor::int("quantity"),
            FieldDescriptor::double("price"),
            FieldDescriptor::float("discount"),
            FieldDescriptor::bool("express"),
            FieldDescriptor::enumeration("status", ["NEW", "PAID", "SHIPPED"]),
            FieldDescriptor::record::<Party>("buyer"),
            FieldDescriptor::list("lines", FieldType::String),
            FieldDescriptor::map("attributes", FieldType::Long),
            FieldDescriptor::optional("note", FieldType::String),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("id", self.id)
            .with("quantity", self.quantity)
            .with("price", self.price)
            .with("discount", self.discount)
            .with("express", self.express)
            .with("status", Value::enum_symbol(self.status.clone()))
            .with("buyer", self.buyer.to_record())
            .with("lines", Value::list(self.lines.clone()))
            .with("attributes", Value::map(self.attributes.clone()))
            .with("note", self.note.clone())
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        let attributes = match record.take("attributes") {
            Some(Value::Map(entries)) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, i64::try_from(v)?)))
                .collect::<SchemaResult<BTreeMap<_, _>>>()?,
            _ => BTreeMap::new(),
        };
        Ok(Self {
            id: record.field("id")?,
            quantity: record.field("quantity")?,
            price: record.field("price")?,
            discount: record.field("discount")?,
            express: record.field("express")?,
            status: record.enum_field("status")?,
            buyer: Party::from_record(record.field("buyer")?)?,
            lines: record.list_field("lines")?,
            attributes,
            note: record.optional_field("note")?,
        })
    }
}

pub fn sample_order() -> Order {
    let mut attributes = BTreeMap::new();
    attributes.insert("priority".to_string(), 3);
    attributes.insert("warehouse".to_string(), -17);
    Order {
        id: 9_007_199_254_740_993,
        quantity: -4,
        price: 1234.5,
        discount: 0.25,
        express: true,
        status: "PAID".into(),
        buyer: Party {
            name: "Zoë".into(),
            key: vec![0, 1, 2, 254, 255],
        },
        lines: vec!["widget".into(), String::new(), "gadget".into()],
        attributes,
        note: Some("leave at door".into()),
    }
}

// ── Evolution fixtures: one wire name, several shapes ───────────

/// Producer version: fields declared `[a, b, c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingV1 {
    pub a: i32,
    pub b: String,
    pub c: i64,
}

impl Describable for ThingV1 {
    const TYPE_NAME: &'static str = "com.acme.Thing";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::int("a"),
            FieldDescriptor::string("b"),
            FieldDescriptor::long("c"),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("a", self.a)
            .with("b", self.b.clone())
            .with("c", self.c)
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            a: record.field("a")?,
            b: record.field("b")?,
            c: record.field("c")?,
        })
    }
}

/// Consumer version: declares `[c, a]`, drops `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingV2 {
    pub c: i64,
    pub a: i32,
}

impl Describable for ThingV2 {
    const TYPE_NAME: &'static str = "com.acme.Thing";

    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::long("c"), FieldDescriptor::int("a")]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("c", self.c)
            .with("a", self.a)
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            c: record.field("c")?,
            a: record.field("a")?,
        })
    }
}

/// Consumer version that requires a field no producer sends.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingV3 {
    pub a: i32,
    pub b: String,
    pub c: i64,
    pub d: String,
}

impl Describable for ThingV3 {
    const TYPE_NAME: &'static str = "com.acme.Thing";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::int("a"),
            FieldDescriptor::string("b"),
            FieldDescriptor::long("c"),
            FieldDescriptor::string("d"),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("a", self.a)
            .with("b", self.b.clone())
            .with("c", self.c)
            .with("d", self.d.clone())
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            a: record.field("a")?,
            b: record.field("b")?,
            c: record.field("c")?,
            d: record.field("d")?,
        })
    }
}

/// Consumer version that adds `d` with a default and an optional `e`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingV4 {
    pub a: i64,
    pub c: i64,
    pub d: String,
    pub e: Option<i32>,
}

impl Describable for ThingV4 {
    const TYPE_NAME: &'static str = "com.acme.Thing";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::long("a"),
            FieldDescriptor::long("c"),
            FieldDescriptor::string("d").with_default("unset"),
            FieldDescriptor::optional("e", FieldType::Int),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("a", self.a)
            .with("c", self.c)
            .with("d", self.d.clone())
            .with("e", self.e)
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            a: record.field("a")?,
            c: record.field("c")?,
            d: record.field("d")?,
            e: record.optional_field("e")?,
        })
    }
}

/// Same wire name as `ThingV1` but `b` changed type.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingIncompatible {
    pub a: i32,
    pub b: i64,
    pub c: i64,
}

impl Describable for ThingIncompatible {
    const TYPE_NAME: &'static str = "com.acme.Thing";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::int("a"),
            FieldDescriptor::long("b"),
            FieldDescriptor::long("c"),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("a", self.a)
            .with("b", self.b)
            .with("c", self.c)
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            a: record.field("a")?,
            b: record.field("b")?,
            c: record.field("c")?,
        })
    }
}

pub fn thing_v1() -> ThingV1 {
    ThingV1 {
        a: 1,
        b: "two".into(),
        c: 3,
    }
}

// ── Factories ────────────────────────────────────────────────────

/// Routes factory logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn order_group() -> Arc<SandboxGroup> {
    SandboxGroup::builder("orders")
        .with_class::<Order>()
        .unwrap()
        .with_class::<Party>()
        .unwrap()
        .build()
}

pub fn group_with<T: Describable>(name: &str) -> Arc<SandboxGroup> {
    SandboxGroup::builder(name).with_class::<T>().unwrap().build()
}

pub fn open_factory(group: Arc<SandboxGroup>) -> SerializerFactory {
    SerializerFactory::build(Arc::new(AllWhitelist), group)
}

pub fn factory_with(
    whitelist: Arc<dyn Whitelist>,
    group: Arc<SandboxGroup>,
    store: Arc<SchemaStore>,
    config: FactoryConfig,
) -> SerializerFactory {
    SerializerFactory::builder(whitelist, group)
        .with_store(store)
        .with_config(config)
        .build()
}
