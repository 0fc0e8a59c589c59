//! Multi-node dataset
//!
//! Records are spread over a fixed set of [`Node`]s. Every operation reads
//! each node's `from` partition and writes its `to` partition; keyed reduces
//! additionally move records between nodes through a hash shuffle.

use crate::operations::map::PreparedMap;
use crate::operations::reduce::{Combine, aggregate_partition, summarize};
use crate::operations::{
    Aggregate, KeyedReduce, MapOp, Operation, OperationReport, ReduceOp, ShuffleReport,
};
use crate::rdd::{Block, Node, Partition, Record};
use crate::scheduler::LocalScheduler;
use crate::shuffle::{HashPartitioner, shuffle, validate_all};
use crate::trace::{Site, Slot, Trace};
use crate::traits::{Dataset, EngineError, EngineResult, StageRecord};
use rddviz_common::SimulationConfig;
use tracing::{debug, info, warn};

/// A dataset partitioned over simulated nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedDataset {
    config: SimulationConfig,
    nodes: Vec<Node>,
    /// Operation whose result currently sits in the nodes' `to` partitions.
    pending: Option<Operation>,
    exhausted: bool,
}

impl DistributedDataset {
    /// Create a dataset with `config.node_count` empty nodes.
    pub fn new(config: SimulationConfig) -> EngineResult<Self> {
        config.validate()?;
        let nodes = (0..config.node_count)
            .map(|id| Node::new(id, config.block_capacity))
            .collect();
        Ok(Self {
            config,
            nodes,
            pending: None,
            exhausted: false,
        })
    }

    /// Create a dataset and distribute `records` over its nodes.
    ///
    /// Records are dealt out round-robin in chunks of `block_capacity`: the
    /// first chunk becomes node 0's first block, the next chunk node 1's, and
    /// so on, wrapping around until the input is exhausted.
    pub fn load(
        config: SimulationConfig,
        records: impl IntoIterator<Item = Record>,
    ) -> EngineResult<Self> {
        let mut dataset = Self::new(config)?;
        dataset.distribute(records);
        info!(
            nodes = dataset.nodes.len(),
            records = dataset.input_len(),
            block_capacity = dataset.config.block_capacity,
            "loaded distributed dataset"
        );
        Ok(dataset)
    }

    fn distribute(&mut self, records: impl IntoIterator<Item = Record>) {
        let capacity = self.config.block_capacity;
        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            for node in &mut self.nodes {
                let chunk: Vec<Record> = records.by_ref().take(capacity).collect();
                if chunk.is_empty() {
                    return;
                }
                node.from_partition_mut().push_block(Block::from_records(chunk));
            }
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Label of the operation whose output is pending.
    pub fn pending_label(&self) -> Option<String> {
        self.pending.as_ref().map(Operation::label)
    }

    pub fn input_len(&self) -> usize {
        self.nodes.iter().map(|n| n.from_partition().len()).sum()
    }

    pub fn output_len(&self) -> usize {
        self.nodes.iter().map(|n| n.to_partition().len()).sum()
    }

    fn inputs(&self) -> impl Iterator<Item = &Record> + '_ {
        self.nodes.iter().flat_map(|n| n.from_partition().records())
    }

    fn scheduler(&self) -> LocalScheduler {
        LocalScheduler::from_config(&self.config)
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

    /// Removal events for the output left by a previous operation.
    fn output_removals(&self) -> Trace {
        let mut trace = Trace::new();
        for node in &self.nodes {
            for (index, record) in node.to_partition().records().enumerate() {
                trace.removed(Site::node(node.id(), Slot::To), index, record.clone());
            }
        }
        trace
    }

    fn install(&mut self, outputs: Vec<Partition>, op: Operation) {
        for (node, output) in self.nodes.iter_mut().zip(outputs) {
            node.replace_to(output);
        }
        self.pending = Some(op);
    }

    fn aggregate(&mut self, aggregate: &Aggregate) -> EngineResult<OperationReport> {
        let aggregator = aggregate.aggregator();
        validate_all(aggregator.as_ref(), self.inputs())?;

        let outputs = self.scheduler().execute_tasks(&self.nodes, |_, node| {
            aggregate_partition(
                aggregator.as_ref(),
                Combine::Values,
                aggregate.by_key,
                node.from_partition(),
                Site::node(node.id(), Slot::To),
            )
        })?;

        let summary = if aggregate.by_key {
            None
        } else {
            let partials: Vec<&Partition> = outputs.iter().map(|out| &out.partition).collect();
            Some(summarize(aggregate, &partials)?)
        };

        let mut report = OperationReport::new(aggregate.label());
        report.trace.extend(self.output_removals());
        let mut partitions = Vec::with_capacity(outputs.len());
        for out in outputs {
            report.trace.extend(out.trace);
            partitions.push(out.partition);
        }
        if let Some(summary) = &summary {
            info!(operation = %report.label, "{summary}");
        }
        report.summary = summary;
        self.install(partitions, ReduceOp::Aggregate(*aggregate).into());
        Ok(report)
    }

    /// Keyed reduce across nodes.
    ///
    /// 1. Each node aggregates its own input by key.
    /// 2. The partial aggregates are shuffled so every key lands on the node
    ///    its hash selects, sorted by key.
    /// 3. Each node merges the partials it received into its output.
    ///
    /// The nodes' inputs are not modified.
    pub fn reduce_by_key(&mut self, keyed: KeyedReduce) -> EngineResult<OperationReport> {
        self.ensure_runnable()?;
        let label = keyed.label();
        info!(operation = %label, nodes = self.nodes.len(), "running reduce by key");

        let aggregator = keyed.aggregator();
        validate_all(aggregator.as_ref(), self.inputs())?;
        let scheduler = self.scheduler();

        let partials = scheduler.execute_tasks(&self.nodes, |_, node| {
            aggregate_partition(
                aggregator.as_ref(),
                Combine::Values,
                true,
                node.from_partition(),
                Site::node(node.id(), Slot::PreShuffle),
            )
        })?;

        let partitioner = HashPartitioner::new(self.nodes.len())?;
        let mut trace = self.output_removals();
        let mut pre_shuffle = Vec::with_capacity(partials.len());
        for partial in partials {
            trace.extend(partial.trace);
            pre_shuffle.push(partial.partition);
        }
        let exchange = shuffle(
            &pre_shuffle,
            &partitioner,
            Some(self.config.block_capacity),
        );
        trace.extend(exchange.trace);
        debug!(
            moved = pre_shuffle.iter().map(Partition::len).sum::<usize>(),
            "shuffle complete"
        );

        let finals = scheduler.execute_tasks(&exchange.partitions, |id, received| {
            aggregate_partition(
                aggregator.as_ref(),
                Combine::Combiners,
                true,
                received,
                Site::node(id, Slot::To),
            )
        })?;

        let mut outputs = Vec::with_capacity(finals.len());
        for out in finals {
            trace.extend(out.trace);
            outputs.push(out.partition);
        }
        self.install(outputs, ReduceOp::ReduceByKey(keyed).into());

        let mut report = OperationReport::new(label);
        report.trace = trace;
        report.shuffle = Some(ShuffleReport {
            pre_shuffle,
            post_shuffle: exchange.partitions,
        });
        Ok(report)
    }
}

impl Dataset for DistributedDataset {
    fn apply_map(&mut self, op: &MapOp) -> EngineResult<OperationReport> {
        self.ensure_runnable()?;
        let label = op.label();
        info!(operation = %label, nodes = self.nodes.len(), "applying map operation");

        let prepared = PreparedMap::new(op, self.inputs())?;
        let outputs = self.scheduler().execute_tasks(&self.nodes, |_, node| {
            Ok(prepared.run(node.from_partition(), Site::node(node.id(), Slot::To)))
        })?;

        let mut report = OperationReport::new(label);
        report.trace.extend(self.output_removals());
        let mut partitions = Vec::with_capacity(outputs.len());
        for out in outputs {
            report.trace.extend(out.trace);
            partitions.push(out.partition);
        }
        self.install(partitions, op.clone().into());
        Ok(report)
    }

    fn apply_reduce(&mut self, op: &ReduceOp) -> EngineResult<OperationReport> {
        match op {
            ReduceOp::ReduceByKey(keyed) => self.reduce_by_key(*keyed),
            ReduceOp::Aggregate(aggregate) => {
                self.ensure_runnable()?;
                info!(operation = %aggregate.label(), nodes = self.nodes.len(), "applying aggregate");
                self.aggregate(aggregate)
            }
        }
    }

    fn commit(&mut self) -> EngineResult<()> {
        if self.nodes.iter().all(|node| node.to_partition().is_empty()) {
            warn!("commit rejected: every node's output is empty");
            return Err(EngineError::State(
                "nothing to commit: every node's output is empty".to_string(),
            ));
        }
        for node in &mut self.nodes {
            node.overwrite_from();
        }
        if let Some(op) = self.pending.take() {
            self.exhausted = op.is_terminal();
            info!(operation = %op.label(), records = self.input_len(), "committed stage");
        }
        Ok(())
    }

    fn current_stage_records(&self) -> Vec<StageRecord> {
        stage_records(&self.nodes, Node::to_partition)
    }

    fn input_records(&self) -> Vec<StageRecord> {
        stage_records(&self.nodes, Node::from_partition)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

fn stage_records(nodes: &[Node], side: fn(&Node) -> &Partition) -> Vec<StageRecord> {
    nodes
        .iter()
        .flat_map(|node| {
            side(node).records().map(move |record| StageRecord {
                node: Some(node.id()),
                key: record.key().map(str::to_string),
                value: record.value().to_string(),
            })
        })
        .collect()
}
