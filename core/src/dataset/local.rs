//! Single-partition dataset with a stage history.
//!
//! Local mode keeps every committed stage as its own unbounded partition and
//! remembers, for each record, the records of the previous stage it was
//! derived from.

use crate::operations::map::PreparedMap;
use crate::operations::reduce::{Combine, aggregate_partition, summarize};
use crate::operations::{KeyedReduce, Link, MapOp, Operation, OperationReport, ReduceOp};
use crate::rdd::{Partition, Record};
use crate::shuffle::validate_all;
use crate::trace::Site;
use crate::traits::{Dataset, EngineError, EngineResult, StageRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Address of a record within the stage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub stage: usize,
    pub index: usize,
}

impl RecordRef {
    pub fn new(stage: usize, index: usize) -> Self {
        Self { stage, index }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingStage {
    operation: Operation,
    partition: Partition,
    lineage: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDataset {
    stages: Vec<Partition>,
    labels: Vec<String>,
    parents: BTreeMap<RecordRef, Vec<RecordRef>>,
    pending: Option<PendingStage>,
    exhausted: bool,
}

impl LocalDataset {
    /// Start a history whose first stage holds `records`.
    pub fn load(records: impl IntoIterator<Item = Record>) -> Self {
        let input = Partition::from_records(None, records);
        info!(records = input.len(), "loaded local dataset");
        Self {
            stages: vec![input],
            labels: vec!["Input".to_string()],
            parents: BTreeMap::new(),
            pending: None,
            exhausted: false,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage(&self, stage: usize) -> Option<&Partition> {
        self.stages.get(stage)
    }

    pub fn stage_label(&self, stage: usize) -> Option<&str> {
        self.labels.get(stage).map(String::as_str)
    }

    /// Partition the next operation reads.
    pub fn current_input(&self) -> &Partition {
        // `stages` always holds at least the loaded input.
        &self.stages[self.stages.len() - 1]
    }

    /// Partition produced by the last operation, not yet committed.
    pub fn pending(&self) -> Option<&Partition> {
        self.pending.as_ref().map(|stage| &stage.partition)
    }

    /// Direct parents of a record, in the order they were linked.
    ///
    /// The pending stage can be queried at index `stage_count()`.
    pub fn provenance_of(&self, record: RecordRef) -> Vec<RecordRef> {
        if record.stage == self.stages.len() {
            let Some(pending) = &self.pending else {
                return Vec::new();
            };
            let parent_stage = self.stages.len() - 1;
            return pending
                .lineage
                .iter()
                .filter(|link| link.output == record.index)
                .map(|link| RecordRef::new(parent_stage, link.input))
                .collect();
        }
        self.parents.get(&record).cloned().unwrap_or_default()
    }

    /// Every ancestor of a record, nearest stage first, each listed once.
    pub fn lineage_of(&self, record: RecordRef) -> Vec<RecordRef> {
        let mut ancestors = Vec::new();
        let mut frontier = vec![record];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for parent in self.provenance_of(current) {
                    if !ancestors.contains(&parent) && !next.contains(&parent) {
                        next.push(parent);
                    }
                }
            }
            ancestors.extend(next.iter().copied());
            frontier = next;
        }
        ancestors
    }

    fn ensure_runnable(&self) -> EngineResult<()> {
        if self.exhausted {
            return Err(EngineError::State(
                "end of execution: no operation may follow an aggregation that is not by key"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn output_site(&self) -> Site {
        Site::stage(self.stages.len())
    }

    fn stage_pending(&mut self, operation: Operation, partition: Partition, lineage: Vec<Link>) {
        self.pending = Some(PendingStage {
            operation,
            partition,
            lineage,
        });
    }

    /// Keyed reduce on the single partition. No shuffle happens: one pass
    /// groups every key.
    pub fn reduce_by_key(&mut self, keyed: KeyedReduce) -> EngineResult<OperationReport> {
        self.ensure_runnable()?;
        let aggregator = keyed.aggregator();
        validate_all(aggregator.as_ref(), self.current_input().records())?;
        let out = aggregate_partition(
            aggregator.as_ref(),
            Combine::Values,
            true,
            self.current_input(),
            self.output_site(),
        )?;

        let mut report = OperationReport::new(keyed.label());
        report.trace = out.trace;
        self.stage_pending(ReduceOp::ReduceByKey(keyed).into(), out.partition, out.lineage);
        Ok(report)
    }
}

impl Dataset for LocalDataset {
    fn apply_map(&mut self, op: &MapOp) -> EngineResult<OperationReport> {
        self.ensure_runnable()?;
        info!(operation = %op.label(), stage = self.stages.len(), "applying map operation");
        let prepared = PreparedMap::new(op, self.current_input().records())?;
        let out = prepared.run(self.current_input(), self.output_site());

        let mut report = OperationReport::new(op.label());
        report.trace = out.trace;
        self.stage_pending(op.clone().into(), out.partition, out.lineage);
        Ok(report)
    }

    fn apply_reduce(&mut self, op: &ReduceOp) -> EngineResult<OperationReport> {
        let aggregate = match op {
            ReduceOp::ReduceByKey(keyed) => return self.reduce_by_key(*keyed),
            ReduceOp::Aggregate(aggregate) => aggregate,
        };
        self.ensure_runnable()?;
        info!(operation = %aggregate.label(), stage = self.stages.len(), "applying aggregate");

        let aggregator = aggregate.aggregator();
        validate_all(aggregator.as_ref(), self.current_input().records())?;
        let out = aggregate_partition(
            aggregator.as_ref(),
            Combine::Values,
            aggregate.by_key,
            self.current_input(),
            self.output_site(),
        )?;

        let mut report = OperationReport::new(aggregate.label());
        if !aggregate.by_key {
            let summary = summarize(aggregate, &[&out.partition])?;
            info!(operation = %report.label, "{summary}");
            report.summary = Some(summary);
        }
        report.trace = out.trace;
        self.stage_pending(op.clone().into(), out.partition, out.lineage);
        Ok(report)
    }

    fn commit(&mut self) -> EngineResult<()> {
        let Some(pending) = self.pending.take_if(|stage| !stage.partition.is_empty()) else {
            warn!("commit rejected: the pending stage is empty");
            return Err(EngineError::State(
                "nothing to commit: the pending stage is empty".to_string(),
            ));
        };

        let parent_stage = self.stages.len() - 1;
        let stage = self.stages.len();
        for link in &pending.lineage {
            self.parents
                .entry(RecordRef::new(stage, link.output))
                .or_default()
                .push(RecordRef::new(parent_stage, link.input));
        }
        self.exhausted = pending.operation.is_terminal();
        self.labels.push(pending.operation.label());
        info!(operation = %pending.operation.label(), stage, records = pending.partition.len(), "committed stage");
        self.stages.push(pending.partition);
        Ok(())
    }

    fn current_stage_records(&self) -> Vec<StageRecord> {
        self.pending().map(stage_records).unwrap_or_default()
    }

    fn input_records(&self) -> Vec<StageRecord> {
        stage_records(self.current_input())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

fn stage_records(partition: &Partition) -> Vec<StageRecord> {
    partition
        .records()
        .map(|record| StageRecord {
            node: None,
            key: record.key().map(str::to_string),
            value: record.value().to_string(),
        })
        .collect()
}
