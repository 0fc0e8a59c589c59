//! Redistribution of records between nodes by key hash.

use super::partitioner::Partitioner;
use crate::rdd::{Partition, Record};
use crate::trace::{Site, Slot, Trace};
use std::cmp::Ordering;
use tracing::debug;

/// Partitions received by every node, plus the moves that produced them.
#[derive(Debug, Clone)]
pub struct ShuffleOutput {
    pub partitions: Vec<Partition>,
    pub trace: Trace,
}

/// Route every record of `inputs` to the partition chosen by `partitioner`.
///
/// Records are gathered in node order, then record order. Each target's
/// records are then stable-sorted by key (keyless first, then by UTF-16 code
/// units) before being appended, so equal keys keep their gather order.
pub fn shuffle(
    inputs: &[Partition],
    partitioner: &dyn Partitioner,
    block_capacity: Option<usize>,
) -> ShuffleOutput {
    let mut buckets: Vec<Vec<(usize, &Record)>> = vec![Vec::new(); partitioner.num_partitions()];
    for (source, partition) in inputs.iter().enumerate() {
        for record in partition.records() {
            let target = partitioner.get_partition(record.key());
            buckets[target].push((source, record));
        }
    }

    let mut trace = Trace::new();
    let mut partitions = Vec::with_capacity(buckets.len());
    for (target, mut bucket) in buckets.into_iter().enumerate() {
        bucket.sort_by(|(_, a), (_, b)| compare_keys(a.key(), b.key()));
        debug!(target, records = bucket.len(), "shuffle bucket filled");

        let mut partition = Partition::from_records(block_capacity, std::iter::empty());
        for (source, record) in bucket {
            trace.shuffled(source, target, record.clone());
            let index = partition.add_record(record.clone());
            trace.added(Site::node(target, Slot::PostShuffle), index, record.clone());
        }
        partitions.push(partition);
    }

    ShuffleOutput { partitions, trace }
}

/// Key order of a shuffled partition. Keys compare by UTF-16 code units, the
/// same order the hash partitioner reads them in.
pub fn compare_keys(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.encode_utf16().cmp(b.encode_utf16()),
    }
}
