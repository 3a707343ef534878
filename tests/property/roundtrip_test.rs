//! Property-based tests for the serving config text format: serializing
//! then re-parsing must preserve the entry list exactly, in order.

use fleetmodeld::core::serving_config::{parse, serialize, ConfigEntry, ModelVersionPolicy};
use proptest::prelude::*;

fn arb_policy() -> impl Strategy<Value = ModelVersionPolicy> {
    prop_oneof![
        (1u32..10).prop_map(|n| ModelVersionPolicy::Latest { num_versions: n }),
        prop::collection::vec(0u64..10_000, 1..5)
            .prop_map(|versions| ModelVersionPolicy::Specific { versions }),
    ]
}

fn arb_entry() -> impl Strategy<Value = ConfigEntry> {
    (
        "[a-zA-Z][a-zA-Z0-9_]{0,30}",
        "/models/tensorflow/[a-zA-Z][a-zA-Z0-9_/]{0,40}",
        arb_policy(),
    )
        .prop_map(|(name, base_path, model_version_policy)| ConfigEntry {
            name,
            base_path,
            model_platform: "tensorflow".to_string(),
            model_version_policy,
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn serialize_then_parse_preserves_entries_and_order(
        entries in prop::collection::vec(arb_entry(), 0..10)
    ) {
        let text = serialize(&entries);
        let parsed = parse(&text).expect("serialized output always reparses");
        prop_assert_eq!(parsed, entries);
    }

    #[test]
    fn serialize_is_deterministic_for_the_same_entries(
        entries in prop::collection::vec(arb_entry(), 0..10)
    ) {
        let first = serialize(&entries);
        let second = serialize(&entries);
        prop_assert_eq!(first, second);
    }
}
