//! rddviz Core - a step-by-step simulation of partitioned map/reduce
//!
//! Records are spread over simulated nodes in capacity-bounded blocks and
//! transformed by map, aggregate and reduce-by-key operations. Every
//! operation reports its record-level changes so each step can be replayed.

pub mod context;
pub mod dataset;
pub mod ingest;
pub mod operations;
pub mod rdd;
pub mod scheduler;
pub mod shuffle;
pub mod trace;
pub mod traits;

pub use context::{Selection, Session, StageSnapshot};
pub use dataset::{DistributedDataset, LocalDataset, RecordRef};
pub use operations::{
    Aggregate, AggregateKind, FilterCondition, KeyedReduce, MapOp, OperationParams,
    OperationReport, ReduceOp, ShuffleReport, Summary,
};
pub use rdd::{Field, Node, Partition, Record};
pub use rddviz_common::{SimulationConfig, SimulationConfigBuilder};
pub use trace::{Site, Slot, Trace, TraceEvent};
pub use traits::{Dataset, EngineError, EngineResult, StageRecord};
