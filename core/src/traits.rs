//! Core traits for the rddviz simulation engine
//!
//! This module defines the error taxonomy shared by every operation and the
//! [`Dataset`] abstraction implemented by both the distributed (multi-node)
//! and local (stage history) topologies.

use crate::operations::{MapOp, OperationParams, OperationReport, ReduceOp};
use rddviz_common::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Error types for dataset operations.
///
/// None of these leave a dataset half-updated: operations compute their whole
/// result before touching any partition.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A precondition on the data failed, e.g. a non-numeric field under a
    /// numeric comparison or aggregate.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An operation name the dispatcher does not know.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The dataset is not in a state that allows the request.
    #[error("Invalid state: {0}")]
    State(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, EngineError::State(_))
    }

    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, EngineError::InvalidOperation(_))
    }
}

/// Result type for dataset operations
pub type EngineResult<T> = Result<T, EngineError>;

/// One record of the stage under inspection, tagged with the node holding it
/// (`None` in local mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub node: Option<usize>,
    pub key: Option<String>,
    pub value: String,
}

/// A dataset that map and reduce operations can be applied to.
///
/// Operations leave their result in a pending output stage without touching
/// the input; [`Dataset::commit`] promotes the pending output so the next
/// operation reads it.
pub trait Dataset: Clone + Debug + Send + Sync {
    /// Apply a per-record operation to the current input.
    fn apply_map(&mut self, op: &MapOp) -> EngineResult<OperationReport>;

    /// Apply an aggregate to the current input.
    fn apply_reduce(&mut self, op: &ReduceOp) -> EngineResult<OperationReport>;

    /// Apply a map operation chosen by name.
    fn apply_map_named(&mut self, name: &str, params: &OperationParams) -> EngineResult<OperationReport> {
        self.apply_map(&MapOp::parse(name, params)?)
    }

    /// Apply a reduce operation chosen by name.
    fn apply_reduce_named(
        &mut self,
        name: &str,
        params: &OperationParams,
    ) -> EngineResult<OperationReport> {
        self.apply_reduce(&ReduceOp::parse(name, params)?)
    }

    /// Promote the pending output into the input of the next stage.
    ///
    /// Fails without changing anything when there is no output to promote.
    fn commit(&mut self) -> EngineResult<()>;

    /// Records of the pending output stage, in order.
    fn current_stage_records(&self) -> Vec<StageRecord>;

    /// Records of the current input stage, in order.
    fn input_records(&self) -> Vec<StageRecord>;

    /// Whether a committed non-keyed aggregate has ended the pipeline.
    fn is_exhausted(&self) -> bool;

    /// Independent deep copy, used to snapshot stages.
    fn copy(&self) -> Self {
        self.clone()
    }
}
