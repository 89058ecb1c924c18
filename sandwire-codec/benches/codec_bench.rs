//! Codec benchmarks - encode, decode and evolution paths.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sandwire_codec::{FactoryConfig, SchemaEmbedding, SerializerFactory};
use sandwire_sandbox::{AllWhitelist, SandboxGroup};
use sandwire_schema::{Describable, FieldDescriptor, FieldType, Record, SchemaResult, SchemaStore, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    sensor: String,
    sequence: i64,
    celsius: f64,
    samples: Vec<i64>,
    label: Option<String>,
}

impl Describable for Reading {
    const TYPE_NAME: &'static str = "bench.Reading";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::string("sensor"),
            FieldDescriptor::long("sequence"),
            FieldDescriptor::double("celsius"),
            FieldDescriptor::list("samples", FieldType::Long),
            FieldDescriptor::optional("label", FieldType::String),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("sensor", self.sensor.clone())
            .with("sequence", self.sequence)
            .with("celsius", self.celsius)
            .with("samples", Value::list(self.samples.clone()))
            .with("label", self.label.clone())
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            sensor: record.field("sensor")?,
            sequence: record.field("sequence")?,
            celsius: record.field("celsius")?,
            samples: record.list_field("samples")?,
            label: record.optional_field("label")?,
        })
    }
}

/// Newer reader: `sequence` dropped, `unit` added with a default.
#[derive(Debug, Clone, PartialEq)]
struct ReadingV2 {
    sensor: String,
    celsius: f64,
    unit: String,
}

impl Describable for ReadingV2 {
    const TYPE_NAME: &'static str = "bench.Reading";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::string("sensor"),
            FieldDescriptor::double("celsius"),
            FieldDescriptor::string("unit").with_default("C"),
        ]
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("sensor", self.sensor.clone())
            .with("celsius", self.celsius)
            .with("unit", self.unit.clone())
    }

    fn from_record(mut record: Record) -> SchemaResult<Self> {
        Ok(Self {
            sensor: record.field("sensor")?,
            celsius: record.field("celsius")?,
            unit: record.field("unit")?,
        })
    }
}

fn reading() -> Reading {
    Reading {
        sensor: "greenhouse-north".into(),
        sequence: 42_000,
        celsius: 21.5,
        samples: (0..32).collect(),
        label: Some("calibrated".into()),
    }
}

fn factory<T: Describable>(embedding: SchemaEmbedding, store: Arc<SchemaStore>) -> SerializerFactory {
    let group = SandboxGroup::builder("bench")
        .with_class::<T>()
        .expect("bench group")
        .build();
    SerializerFactory::builder(Arc::new(AllWhitelist), group)
        .with_store(store)
        .with_config(FactoryConfig::default().with_schema_embedding(embedding))
        .build()
}

/// Benchmark encoding with and without the embedded schema.
fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let value = reading();

    for (label, embedding) in [("embedded", SchemaEmbedding::Always), ("fingerprint_only", SchemaEmbedding::Never)] {
        let factory = factory::<Reading>(embedding, Arc::new(SchemaStore::new()));
        group.bench_function(label, |b| b.iter(|| factory.encode(black_box(&value)).expect("encode")));
    }

    group.finish();
}

/// Benchmark decoding when writer and reader share a schema.
fn decode_same_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let store = Arc::new(SchemaStore::new());
    let factory = factory::<Reading>(SchemaEmbedding::Never, store);
    let bytes = factory.encode(&reading()).expect("encode");

    group.bench_function("same_schema", |b| {
        b.iter(|| factory.decode_as::<Reading>(black_box(&bytes)).expect("decode"))
    });

    group.finish();
}

/// Benchmark decoding through schema resolution by field name.
fn decode_evolved(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let store = Arc::new(SchemaStore::new());
    let writer = factory::<Reading>(SchemaEmbedding::Never, Arc::clone(&store));
    let reader = factory::<ReadingV2>(SchemaEmbedding::Never, store);
    let bytes = writer.encode(&reading()).expect("encode");

    group.bench_function("evolved_schema", |b| {
        b.iter(|| reader.decode_as::<ReadingV2>(black_box(&bytes)).expect("decode"))
    });

    group.finish();
}

/// Benchmark the cached serializer lookup.
fn serializer_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let factory = factory::<Reading>(SchemaEmbedding::Always, Arc::new(SchemaStore::new()));
    factory.serializer_for::<Reading>().expect("warm");

    group.bench_function("cached_lookup", |b| {
        b.iter(|| factory.serializer_for::<Reading>().expect("lookup"))
    });

    group.finish();
}

criterion_group!(benches, encode, decode_same_schema, decode_evolved, serializer_lookup);
criterion_main!(benches);
