//! Common test utilities and helpers for integration tests

use rddviz_core::{
    Dataset, DistributedDataset, LocalDataset, Record, SimulationConfig, StageRecord,
};

/// Validated configuration with the given topology
#[allow(dead_code)]
pub fn config(nodes: usize, block_capacity: usize) -> SimulationConfig {
    SimulationConfig::new(nodes, block_capacity).unwrap()
}

/// Keyed records from `(key, value)` pairs
#[allow(dead_code)]
pub fn pairs(items: &[(&str, &str)]) -> Vec<Record> {
    items.iter().map(|&(k, v)| Record::pair(k, v)).collect()
}

/// One keyless record per line of text
#[allow(dead_code)]
pub fn lines(text: &[&str]) -> Vec<Record> {
    text.iter().map(|line| Record::value_only(*line)).collect()
}

#[allow(dead_code)]
pub fn distributed(nodes: usize, block_capacity: usize, records: Vec<Record>) -> DistributedDataset {
    DistributedDataset::load(config(nodes, block_capacity), records).unwrap()
}

#[allow(dead_code)]
pub fn local(records: Vec<Record>) -> LocalDataset {
    LocalDataset::load(records)
}

/// Output records as `(key, value)` pairs, sorted for order-free comparison
#[allow(dead_code)]
pub fn sorted_output<D: Dataset>(dataset: &D) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = dataset
        .current_stage_records()
        .into_iter()
        .map(|StageRecord { key, value, .. }| (key.unwrap_or_else(|| "null".to_string()), value))
        .collect();
    out.sort();
    out
}

/// Records in a node's output partition, in order
#[allow(dead_code)]
pub fn node_output(dataset: &DistributedDataset, node: usize) -> Vec<Record> {
    dataset.nodes()[node].to_partition().records().cloned().collect()
}

/// Owned `(key, value)` pairs for assertions
#[allow(dead_code)]
pub fn expected(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|&(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
