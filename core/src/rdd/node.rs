//! Simulated worker nodes.

use super::partition::Partition;
use super::record::Record;
use serde::{Deserialize, Serialize};

/// A simulated executor holding the input (`from`) and output (`to`)
/// partitions of the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: usize,
    from: Partition,
    to: Partition,
}

impl Node {
    pub fn new(id: usize, block_capacity: usize) -> Self {
        Self {
            id,
            from: Partition::new(block_capacity),
            to: Partition::new(block_capacity),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn from_partition(&self) -> &Partition {
        &self.from
    }

    pub fn from_partition_mut(&mut self) -> &mut Partition {
        &mut self.from
    }

    pub fn to_partition(&self) -> &Partition {
        &self.to
    }

    pub fn add_record_from(&mut self, record: Record) -> usize {
        self.from.add_record(record)
    }

    pub fn add_record_to(&mut self, record: Record) -> usize {
        self.to.add_record(record)
    }

    /// Install a freshly computed output partition, returning the old one.
    pub fn replace_to(&mut self, to: Partition) -> Partition {
        std::mem::replace(&mut self.to, to)
    }

    /// Promote `to` into `from`: the output records are re-blocked into a
    /// fresh input partition and `to` is left empty.
    pub fn overwrite_from(&mut self) {
        self.from.clear();
        for record in self.to.records() {
            self.from.add_record(record.clone());
        }
        self.to.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_from_reblocks_output() {
        let mut node = Node::new(0, 2);
        node.add_record_from(Record::pair("old", "1"));
        for i in 0..3 {
            node.add_record_to(Record::pair("new", i.to_string()));
        }

        node.overwrite_from();

        assert!(node.to_partition().is_empty());
        assert_eq!(node.from_partition().len(), 3);
        assert_eq!(node.from_partition().num_blocks(), 2);
        assert_eq!(node.from_partition().get(0), Some(&Record::pair("new", "0")));
    }
}
