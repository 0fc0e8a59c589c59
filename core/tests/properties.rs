//! Property tests for load placement, shuffle placement and aggregate results

mod common;

use common::*;
use proptest::prelude::*;
use rddviz_core::shuffle::{HashPartitioner, Partitioner};
use rddviz_core::{Dataset, Field, FilterCondition, KeyedReduce, MapOp, Record};
use std::collections::BTreeMap;

fn keyed_numbers() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-f]{1,2}", 0i64..1000), 0..60)
}

/// Records with optional numeric keys and values that may be the text "null".
fn sparse_records() -> impl Strategy<Value = Vec<Record>> {
    let record = (
        prop::option::of(0i64..100),
        prop::option::of(0i64..100),
    )
        .prop_map(|(key, value)| {
            let value = value.map_or_else(|| "null".to_string(), |v| v.to_string());
            match key {
                Some(key) => Record::pair(key.to_string(), value),
                None => Record::value_only(value),
            }
        });
    prop::collection::vec(record, 1..40)
}

fn filter_conditions() -> impl Strategy<Value = FilterCondition> {
    prop::sample::select(vec![
        FilterCondition::Greater,
        FilterCondition::Less,
        FilterCondition::Equal,
        FilterCondition::NotEqual,
    ])
}

fn to_records(items: &[(String, i64)]) -> Vec<Record> {
    items
        .iter()
        .map(|(k, v)| Record::pair(k.as_str(), v.to_string()))
        .collect()
}

proptest! {
    #[test]
    fn test_load_is_round_robin_by_block(
        len in 0usize..80,
        nodes in 1usize..6,
        capacity in 1usize..6,
    ) {
        let records = (0..len).map(|i| Record::value_only(i.to_string())).collect();
        let dataset = distributed(nodes, capacity, records);

        prop_assert_eq!(dataset.input_len(), len);
        for node in dataset.nodes() {
            for block in node.from_partition().blocks() {
                prop_assert!(block.len() <= capacity);
            }
            for record in node.from_partition().records() {
                let i: usize = record.value().parse().unwrap();
                prop_assert_eq!((i / capacity) % nodes, node.id());
            }
        }
    }

    #[test]
    fn test_shuffle_places_by_hash(
        items in keyed_numbers(),
        nodes in 1usize..6,
        capacity in 1usize..5,
    ) {
        let mut dataset = distributed(nodes, capacity, to_records(&items));
        let report = dataset.reduce_by_key(KeyedReduce::Count).unwrap();
        let shuffle = report.shuffle.unwrap();

        let before: usize = shuffle.pre_shuffle.iter().map(|p| p.len()).sum();
        let after: usize = shuffle.post_shuffle.iter().map(|p| p.len()).sum();
        prop_assert_eq!(before, after);

        let partitioner = HashPartitioner::new(nodes).unwrap();
        for (target, partition) in shuffle.post_shuffle.iter().enumerate() {
            for record in partition.records() {
                prop_assert_eq!(partitioner.get_partition(record.key()), target);
            }
        }
    }

    #[test]
    fn test_reduce_by_key_sum_matches_arithmetic(
        items in keyed_numbers(),
        nodes in 1usize..5,
        capacity in 1usize..5,
    ) {
        let mut expected_sums: BTreeMap<String, i64> = BTreeMap::new();
        for (key, value) in &items {
            *expected_sums.entry(key.clone()).or_default() += value;
        }
        let expected_sums: Vec<(String, String)> = expected_sums
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();

        let mut forward = distributed(nodes, capacity, to_records(&items));
        forward.reduce_by_key(KeyedReduce::Sum).unwrap();
        prop_assert_eq!(sorted_output(&forward), expected_sums.clone());

        let reversed: Vec<(String, i64)> = items.iter().rev().cloned().collect();
        let mut backward = distributed(nodes, capacity, to_records(&reversed));
        backward.reduce_by_key(KeyedReduce::Sum).unwrap();
        prop_assert_eq!(sorted_output(&backward), expected_sums);
    }

    #[test]
    fn test_filter_is_idempotent(
        records in sparse_records(),
        condition in filter_conditions(),
        on_key in any::<bool>(),
        threshold in prop_oneof![(0i64..100).prop_map(|t| t.to_string()), Just("null".to_string())],
    ) {
        prop_assume!(!condition.is_numeric() || threshold != "null");
        let field = if on_key { Field::Key } else { Field::Value };
        let filter = MapOp::filter(field, condition, threshold);
        let mut dataset = distributed(3, 2, records);
        dataset.apply_map(&filter).unwrap();
        let first = sorted_output(&dataset);
        prop_assume!(!first.is_empty());

        dataset.commit().unwrap();
        dataset.apply_map(&filter).unwrap();
        prop_assert_eq!(sorted_output(&dataset), first);
    }

    #[test]
    fn test_copy_is_deep(items in keyed_numbers()) {
        prop_assume!(!items.is_empty());
        let original = distributed(2, 3, to_records(&items));
        let snapshot = original.input_records();

        let mut copy = original.copy();
        copy.apply_map(&MapOp::Swap).unwrap();
        copy.commit().unwrap();

        prop_assert_eq!(original.input_records(), snapshot);
    }
}
