//! The partitioned data model: records, blocks, partitions and nodes.

pub mod node;
pub mod partition;
pub mod record;

pub use node::Node;
pub use partition::{Block, Partition};
pub use record::{Field, NULL_TEXT, Record};
