//! Blocks and partitions.
//!
//! A [`Partition`] is an ordered run of [`Block`]s, each holding at most
//! `block_capacity` records. Record order is block order, then order within
//! the block, and every operation in the engine relies on that ordering being
//! reproducible.

use super::record::Record;
use serde::{Deserialize, Serialize};

/// A capacity-bounded, append-only run of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    records: Vec<Record>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// An ordered sequence of blocks with a shared block capacity.
///
/// `block_capacity == None` means a single block that grows without bound,
/// which is how local-mode stages are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    blocks: Vec<Block>,
    block_capacity: Option<usize>,
}

impl Partition {
    /// Create an empty partition whose blocks hold at most `block_capacity`
    /// records. A capacity of zero is treated as one.
    pub fn new(block_capacity: usize) -> Self {
        Self {
            blocks: Vec::new(),
            block_capacity: Some(block_capacity.max(1)),
        }
    }

    /// Create an empty partition backed by a single unbounded block.
    pub fn unbounded() -> Self {
        Self {
            blocks: Vec::new(),
            block_capacity: None,
        }
    }

    /// An empty partition with the same block capacity as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            blocks: Vec::new(),
            block_capacity: self.block_capacity,
        }
    }

    /// Build a partition by appending `records` in order.
    pub fn from_records(block_capacity: Option<usize>, records: impl IntoIterator<Item = Record>) -> Self {
        let mut partition = match block_capacity {
            Some(capacity) => Self::new(capacity),
            None => Self::unbounded(),
        };
        for record in records {
            partition.add_record(record);
        }
        partition
    }

    pub fn block_capacity(&self) -> Option<usize> {
        self.block_capacity
    }

    /// Append a record to the last block if it has spare capacity, otherwise
    /// open a new block. Returns the record's position in [`Self::records`].
    pub fn add_record(&mut self, record: Record) -> usize {
        let index = self.len();
        let capacity = self.block_capacity;
        match self.blocks.last_mut() {
            Some(block) if capacity.is_none_or(|cap| block.len() < cap) => {
                block.records.push(record)
            }
            _ => self.blocks.push(Block::from_records(vec![record])),
        }
        index
    }

    /// Append a whole block as-is. Used by the initial round-robin load where
    /// every chunk becomes exactly one block.
    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Remove the record at flattened position `index`.
    ///
    /// The containing block stays in place even when it becomes empty.
    pub fn remove_record(&mut self, index: usize) -> Option<Record> {
        let (block, offset) = self.locate(index)?;
        Some(self.blocks[block].records.remove(offset))
    }

    /// Remove the first record equal to `record`. Returns whether one was
    /// found.
    pub fn remove(&mut self, record: &Record) -> bool {
        let found = self.records().position(|r| r == record);
        match found {
            Some(index) => self.remove_record(index).is_some(),
            None => false,
        }
    }

    /// Replace the record at `index`, returning the previous one.
    pub fn replace_record(&mut self, index: usize, record: Record) -> Option<Record> {
        let (block, offset) = self.locate(index)?;
        Some(std::mem::replace(
            &mut self.blocks[block].records[offset],
            record,
        ))
    }

    /// Reset to zero blocks and zero records.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// All records, flattened in block order.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.blocks.iter().flat_map(|block| block.records.iter())
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        let (block, offset) = self.locate(index)?;
        self.blocks[block].records.get(offset)
    }

    /// Position of the *last* record whose key equals `key`.
    pub fn index_by_key_of(&self, key: Option<&str>) -> Option<usize> {
        let mut found = None;
        for (index, record) in self.records().enumerate() {
            if record.same_key(key) {
                found = Some(index);
            }
        }
        found
    }

    /// Record count, always the sum of the block sizes.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let mut remaining = index;
        for (block_index, block) in self.blocks.iter().enumerate() {
            if remaining < block.len() {
                return Some((block_index, remaining));
            }
            remaining -= block.len();
        }
        None
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::unbounded()
    }
}
