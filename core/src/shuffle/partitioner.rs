//! Defines partitioners for distributing records in a shuffle.

use crate::traits::{EngineError, EngineResult};
use std::fmt::Debug;

/// Maps a record key to the index of the node that receives it.
pub trait Partitioner: Send + Sync + Debug {
    fn num_partitions(&self) -> usize;

    /// Target partition for `key`; always `< num_partitions()`.
    fn get_partition(&self, key: Option<&str>) -> usize;
}

/// A partitioner that uses the hash of the key to distribute records.
///
/// Keyless records all land in partition 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashPartitioner {
    num_partitions: usize,
}

impl HashPartitioner {
    pub fn new(num_partitions: usize) -> EngineResult<Self> {
        if num_partitions == 0 {
            return Err(EngineError::State(
                "Number of partitions must be positive.".to_string(),
            ));
        }
        Ok(Self { num_partitions })
    }
}

impl Partitioner for HashPartitioner {
    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn get_partition(&self, key: Option<&str>) -> usize {
        key.map_or(0, |key| key.get_partition(self.num_partitions))
    }
}

/// Types with a hash that is stable across runs and platforms.
pub trait HashPartitionable {
    fn stable_hash(&self) -> i32;

    fn get_partition(&self, num_partitions: usize) -> usize {
        non_negative_mod(self.stable_hash(), num_partitions)
    }
}

/// 31-polynomial over UTF-16 code units with wrapping 32-bit arithmetic,
/// the classic JVM string hash.
impl HashPartitionable for str {
    fn stable_hash(&self) -> i32 {
        self.encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
    }
}

impl HashPartitionable for String {
    fn stable_hash(&self) -> i32 {
        self.as_str().stable_hash()
    }
}

fn non_negative_mod(hash: i32, modulus: usize) -> usize {
    let modulus = modulus.max(1) as i64;
    i64::from(hash).rem_euclid(modulus) as usize
}
