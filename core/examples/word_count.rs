//! Word count over simulated nodes
//!
//! Splits a few lines of text into words, sums the words by key across the
//! nodes, and prints where every record ended up after each stage.
//!
//! Run with `RUST_LOG=debug` to see the shuffle buckets.

use rddviz_core::{
    DistributedDataset, KeyedReduce, MapOp, Record, ReduceOp, Selection, Session,
    SimulationConfigBuilder, TraceEvent,
};
use tracing_subscriber::EnvFilter;

const TEXT: &[&str] = &[
    "the quick brown fox",
    "jumps over the lazy dog",
    "The dog sleeps",
    "the fox runs",
];

fn print_nodes(title: &str, dataset: &DistributedDataset) {
    println!("{title}");
    for node in dataset.nodes() {
        let records: Vec<String> = node.from_partition().records().map(Record::to_string).collect();
        println!("   node {}: {}", node.id(), records.join(" "));
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== rddviz: Word Count Demo ===\n");

    let config = SimulationConfigBuilder::new()
        .node_count(3)
        .block_capacity(2)
        .build()?;
    let records = TEXT.iter().map(|line| Record::value_only(*line));
    let mut session = Session::new("word-count", DistributedDataset::load(config, records)?);
    print_nodes("1. Loaded input:", session.current());

    let report = session.run(&Selection::map(MapOp::Split))?;
    println!("\n2. {} produced {} events", report.label, report.trace.len());
    session.commit()?;
    print_nodes("   Committed words:", session.current());

    let report = session.run(&Selection::reduce(ReduceOp::ReduceByKey(KeyedReduce::Sum)))?;
    let moves = report
        .trace
        .events()
        .iter()
        .filter(|event| matches!(event, TraceEvent::Shuffled { from_node, to_node, .. } if from_node != to_node))
        .count();
    println!("\n3. {} moved {} partial counts between nodes", report.label, moves);
    session.commit()?;
    print_nodes("   Word counts:", session.current());

    println!("\nStages: {}", session.stages().iter().map(|s| s.label.as_str()).collect::<Vec<_>>().join(" > "));
    Ok(())
}
