//! Property-based tests for schema fingerprints.
//!
//! - Fingerprints are deterministic across repeated computations
//! - Declaration order never changes the fingerprint
//! - The canonical form always parses back to the same fingerprint

use proptest::prelude::*;
use sandwire_schema::{FieldDescriptor, FieldType, Fingerprint, Schema};
use std::collections::BTreeSet;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn scalar_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Bool),
        Just(FieldType::Int),
        Just(FieldType::Long),
        Just(FieldType::Float),
        Just(FieldType::Double),
        Just(FieldType::String),
        Just(FieldType::Bytes),
    ]
}

fn field_type() -> impl Strategy<Value = FieldType> {
    scalar_type().prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(FieldType::optional),
            inner.clone().prop_map(FieldType::list),
            inner.prop_map(FieldType::map),
        ]
    })
}

fn fields() -> impl Strategy<Value = Vec<FieldDescriptor>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 1..8).prop_flat_map(|names: BTreeSet<String>| {
        let names: Vec<String> = names.into_iter().collect();
        let len = names.len();
        prop::collection::vec(field_type(), len).prop_map(move |types| {
            names
                .iter()
                .cloned()
                .zip(types)
                .map(|(name, ty)| FieldDescriptor::new(name, ty))
                .collect()
        })
    })
}

// =============================================================================
// FINGERPRINT PROPERTIES
// =============================================================================

proptest! {
    /// Computing the fingerprint twice, from fresh schemas, gives the same value
    #[test]
    fn fingerprint_is_deterministic(fields in fields()) {
        let a = Schema::new("prop.Record", fields.clone()).unwrap();
        let b = Schema::new("prop.Record", fields).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        prop_assert_eq!(a.fingerprint(), Fingerprint::digest(&a.canonical_form()));
    }

    /// Shuffling declaration order keeps the fingerprint
    #[test]
    fn fingerprint_ignores_declaration_order(fields in fields(), seed in any::<u64>()) {
        let mut shuffled = fields.clone();
        let len = shuffled.len();
        for i in (1..len).rev() {
            let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }
        let a = Schema::new("prop.Record", fields).unwrap();
        let b = Schema::new("prop.Record", shuffled).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }

    /// The canonical form is a fixed point
    #[test]
    fn canonical_form_reparses(fields in fields()) {
        let schema = Schema::new("prop.Record", fields).unwrap();
        let parsed = Schema::from_canonical_form(&schema.canonical_form()).unwrap();
        prop_assert_eq!(parsed.fingerprint(), schema.fingerprint());
        prop_assert!(parsed.is_canonical_order());
    }
}
