//! Dataset topologies.
//!
//! [`DistributedDataset`] spreads records over simulated nodes and shuffles
//! between them; [`LocalDataset`] keeps one partition per committed stage
//! and tracks record provenance.

pub mod distributed;
pub mod local;

pub use distributed::DistributedDataset;
pub use local::{LocalDataset, RecordRef};
