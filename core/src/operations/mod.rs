//! Operation descriptors and the results they produce.
//!
//! Operations are plain data: a [`MapOp`] transforms each record on its own,
//! a [`ReduceOp`] aggregates a whole partition. Both can be built directly or
//! parsed from their display names, which is how interactive front ends pick
//! them.

pub mod map;
pub mod numeric;
pub mod reduce;

use crate::rdd::{Field, Partition};
use crate::shuffle::aggregator::{
    Aggregator, CountAggregator, ExtremumAggregator, GroupByKeyAggregator, SumAggregator,
};
use crate::trace::Trace;
use crate::traits::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use reduce::Summary;

/// Comparison used by the filter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterCondition {
    Greater,
    Less,
    Equal,
    NotEqual,
}

impl FilterCondition {
    /// `>` and `<` compare numerically, the others compare text.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FilterCondition::Greater | FilterCondition::Less)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            FilterCondition::Greater => ">",
            FilterCondition::Less => "<",
            FilterCondition::Equal => "=",
            FilterCondition::NotEqual => "!=",
        }
    }
}

impl FromStr for FilterCondition {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(FilterCondition::Greater),
            "<" => Ok(FilterCondition::Less),
            "=" | "==" => Ok(FilterCondition::Equal),
            "!=" => Ok(FilterCondition::NotEqual),
            other => Err(EngineError::InvalidOperation(format!(
                "unknown filter condition '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Keep the records whose `field` satisfies `condition` against `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: Field,
    pub condition: FilterCondition,
    pub threshold: String,
}

impl Filter {
    pub fn new(field: Field, condition: FilterCondition, threshold: impl Into<String>) -> Self {
        Self {
            field,
            condition,
            threshold: threshold.into(),
        }
    }
}

/// Per-record transformations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapOp {
    /// Exchange key and value.
    Swap,
    Filter(Filter),
    /// One `(word, "1")` record per whitespace-separated token of the value.
    Split,
    /// One `("a, b", "1")` record per unordered pair of distinct tokens in a
    /// comma-separated value.
    FlatMapToPair,
}

impl MapOp {
    pub fn filter(field: Field, condition: FilterCondition, threshold: impl Into<String>) -> Self {
        MapOp::Filter(Filter::new(field, condition, threshold))
    }

    pub fn label(&self) -> String {
        match self {
            MapOp::Swap => "Swap".to_string(),
            MapOp::Filter(filter) => match filter.field {
                Field::Key => "FilterOnKey".to_string(),
                Field::Value => "FilterOnValue".to_string(),
            },
            MapOp::Split => "Split".to_string(),
            MapOp::FlatMapToPair => "FlatMapToPair".to_string(),
        }
    }

    /// Resolve a map operation from its display name.
    pub fn parse(name: &str, params: &OperationParams) -> EngineResult<Self> {
        match name.trim() {
            "Swap" => Ok(MapOp::Swap),
            "Split" => Ok(MapOp::Split),
            "FlatMapToPair" => Ok(MapOp::FlatMapToPair),
            "FilterOnKey" => Ok(MapOp::Filter(params.filter_on(Field::Key)?)),
            "FilterOnValue" => Ok(MapOp::Filter(params.filter_on(Field::Value)?)),
            other => Err(EngineError::InvalidOperation(format!(
                "unknown map operation '{other}'"
            ))),
        }
    }
}

/// Aggregates computed over a whole partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    Count,
    /// Sum in `f64`, or in `i64` when `integer` is set.
    Sum { integer: bool },
    Min,
    Max,
}

/// An aggregate over `field`, either per key or over the whole partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub field: Field,
    pub by_key: bool,
}

impl Aggregate {
    pub fn new(kind: AggregateKind, field: Field, by_key: bool) -> Self {
        Self {
            kind,
            field,
            by_key,
        }
    }

    pub fn count() -> Self {
        Self::new(AggregateKind::Count, Field::Value, false)
    }

    pub fn sum(field: Field) -> Self {
        Self::new(AggregateKind::Sum { integer: false }, field, false)
    }

    pub fn min(field: Field) -> Self {
        Self::new(AggregateKind::Min, field, false)
    }

    pub fn max(field: Field) -> Self {
        Self::new(AggregateKind::Max, field, false)
    }

    pub fn per_key(mut self) -> Self {
        self.by_key = true;
        self
    }

    pub fn aggregator(&self) -> Box<dyn Aggregator> {
        match self.kind {
            AggregateKind::Count => Box::new(CountAggregator),
            AggregateKind::Sum { integer } => Box::new(SumAggregator::new(self.field, integer)),
            AggregateKind::Min => Box::new(ExtremumAggregator::min(self.field)),
            AggregateKind::Max => Box::new(ExtremumAggregator::max(self.field)),
        }
    }

    pub fn label(&self) -> String {
        let suffix = match self.field {
            Field::Key => "OnKey",
            Field::Value => "OnValue",
        };
        let base = match self.kind {
            AggregateKind::Count => return "Count".to_string(),
            AggregateKind::Sum { .. } => "Sum",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
        };
        format!("{base}{suffix}")
    }
}

/// Aggregates available to reduce-by-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyedReduce {
    Count,
    Sum,
    Min,
    Max,
    GroupByKey,
}

impl KeyedReduce {
    pub const ALL: [KeyedReduce; 5] = [
        KeyedReduce::Count,
        KeyedReduce::Sum,
        KeyedReduce::Min,
        KeyedReduce::Max,
        KeyedReduce::GroupByKey,
    ];

    /// Short name used when the aggregate is named on its own.
    pub fn short_name(&self) -> &'static str {
        match self {
            KeyedReduce::Count => "count",
            KeyedReduce::Sum => "sum",
            KeyedReduce::Min => "min",
            KeyedReduce::Max => "max",
            KeyedReduce::GroupByKey => "groupByKey",
        }
    }

    /// Aggregator for the node-local pass. The merge pass after the shuffle
    /// folds the partial results with [`Aggregator::merge_combiners`].
    pub fn aggregator(&self) -> Box<dyn Aggregator> {
        match self {
            KeyedReduce::Count => Box::new(CountAggregator),
            KeyedReduce::Sum => Box::new(SumAggregator::new(Field::Value, false)),
            KeyedReduce::Min => Box::new(ExtremumAggregator::min(Field::Value)),
            KeyedReduce::Max => Box::new(ExtremumAggregator::max(Field::Value)),
            KeyedReduce::GroupByKey => Box::new(GroupByKeyAggregator),
        }
    }

    pub fn label(&self) -> String {
        match self {
            KeyedReduce::GroupByKey => "GroupByKey".to_string(),
            KeyedReduce::Count => "RBK + Count".to_string(),
            KeyedReduce::Sum => "RBK + Sum".to_string(),
            KeyedReduce::Min => "RBK + Min".to_string(),
            KeyedReduce::Max => "RBK + Max".to_string(),
        }
    }
}

impl FromStr for KeyedReduce {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyedReduce::ALL
            .into_iter()
            .find(|kind| kind.short_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                EngineError::InvalidOperation(format!("unknown keyed aggregate '{}'", s.trim()))
            })
    }
}

/// Whole-partition operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceOp {
    Aggregate(Aggregate),
    /// Node-local aggregate, shuffle by key hash, then merge.
    ReduceByKey(KeyedReduce),
}

impl ReduceOp {
    pub fn label(&self) -> String {
        match self {
            ReduceOp::Aggregate(aggregate) => aggregate.label(),
            ReduceOp::ReduceByKey(keyed) => keyed.label(),
        }
    }

    /// A non-keyed aggregate collapses each partition to one record and ends
    /// the pipeline once committed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReduceOp::Aggregate(aggregate) if !aggregate.by_key)
    }

    /// Resolve a reduce operation from its display name.
    pub fn parse(name: &str, params: &OperationParams) -> EngineResult<Self> {
        let name = name.trim();
        if let Some(rest) = name.strip_prefix("ReduceByKey") {
            let kind = rest.trim_start().trim_start_matches('+');
            return Ok(ReduceOp::ReduceByKey(kind.parse()?));
        }

        match name {
            "Count" => {
                return Ok(ReduceOp::Aggregate(Aggregate::new(
                    AggregateKind::Count,
                    Field::Value,
                    params.by_key,
                )));
            }
            "GroupByKey" => return Ok(ReduceOp::ReduceByKey(KeyedReduce::GroupByKey)),
            _ => {}
        }

        let unknown = || EngineError::InvalidOperation(format!("unknown reduce operation '{name}'"));
        let (base, field) = if let Some(base) = name.strip_suffix("OnKey") {
            (base, Field::Key)
        } else if let Some(base) = name.strip_suffix("OnValue") {
            (base, Field::Value)
        } else {
            return Err(unknown());
        };
        let kind = match base {
            "Sum" => AggregateKind::Sum {
                integer: params.integer,
            },
            "Min" => AggregateKind::Min,
            "Max" => AggregateKind::Max,
            _ => return Err(unknown()),
        };
        Ok(ReduceOp::Aggregate(Aggregate::new(kind, field, params.by_key)))
    }
}

/// Either kind of operation, as stored alongside a pending stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Map(MapOp),
    Reduce(ReduceOp),
}

impl Operation {
    pub fn label(&self) -> String {
        match self {
            Operation::Map(op) => op.label(),
            Operation::Reduce(op) => op.label(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Operation::Reduce(op) if op.is_terminal())
    }
}

impl From<MapOp> for Operation {
    fn from(op: MapOp) -> Self {
        Operation::Map(op)
    }
}

impl From<ReduceOp> for Operation {
    fn from(op: ReduceOp) -> Self {
        Operation::Reduce(op)
    }
}

/// Extra arguments for operations resolved by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    pub condition: Option<String>,
    pub threshold: Option<String>,
    /// Sum in integer arithmetic.
    pub integer: bool,
    /// Aggregate per key instead of over the whole partition.
    pub by_key: bool,
}

impl OperationParams {
    pub fn filter(condition: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            threshold: Some(threshold.into()),
            ..Self::default()
        }
    }

    fn filter_on(&self, field: Field) -> EngineResult<Filter> {
        let condition = self
            .condition
            .as_deref()
            .ok_or_else(|| EngineError::InvalidOperation("filter needs a condition".to_string()))?
            .parse()?;
        let threshold = self
            .threshold
            .clone()
            .ok_or_else(|| EngineError::InvalidOperation("filter needs a threshold".to_string()))?;
        Ok(Filter::new(field, condition, threshold))
    }
}

/// Intermediate partitions of a reduce-by-key, one per node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleReport {
    /// Node-local aggregate of each node, before records left the node.
    pub pre_shuffle: Vec<Partition>,
    /// Records each node received from the exchange.
    pub post_shuffle: Vec<Partition>,
}

/// What an operation produced besides the new output partitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationReport {
    pub label: String,
    pub trace: Trace,
    /// Global result of a non-keyed aggregate.
    pub summary: Option<Summary>,
    pub shuffle: Option<ShuffleReport>,
}

impl OperationReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Output record `output` was derived (at least partly) from input record
/// `input` of the same pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub input: usize,
    pub output: usize,
}

/// Result of running one operation over one partition.
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub partition: Partition,
    pub trace: Trace,
    pub lineage: Vec<Link>,
}

impl PassOutput {
    pub(crate) fn empty_like(input: &Partition) -> Self {
        Self {
            partition: input.empty_like(),
            trace: Trace::new(),
            lineage: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_operations() {
        let params = OperationParams::filter(">", "5");
        assert_eq!(MapOp::parse("Swap", &params).unwrap(), MapOp::Swap);
        assert_eq!(
            MapOp::parse("FilterOnValue", &params).unwrap(),
            MapOp::filter(Field::Value, FilterCondition::Greater, "5")
        );
        assert_eq!(MapOp::parse("FlatMapToPair", &params).unwrap().label(), "FlatMapToPair");

        let err = MapOp::parse("Explode", &params).unwrap_err();
        assert!(err.is_invalid_operation());

        let err = MapOp::parse("FilterOnKey", &OperationParams::default()).unwrap_err();
        assert!(err.is_invalid_operation());
    }

    #[test]
    fn test_parse_reduce_operations() {
        let params = OperationParams::default();
        assert_eq!(
            ReduceOp::parse("Count", &params).unwrap(),
            ReduceOp::Aggregate(Aggregate::count())
        );
        assert_eq!(
            ReduceOp::parse("MinOnKey", &params).unwrap(),
            ReduceOp::Aggregate(Aggregate::min(Field::Key))
        );
        assert_eq!(
            ReduceOp::parse("SumOnValue", &params).unwrap(),
            ReduceOp::Aggregate(Aggregate::sum(Field::Value))
        );
        assert_eq!(
            ReduceOp::parse("ReduceByKey + Sum", &params).unwrap(),
            ReduceOp::ReduceByKey(KeyedReduce::Sum)
        );
        assert_eq!(
            ReduceOp::parse("GroupByKey", &params).unwrap(),
            ReduceOp::ReduceByKey(KeyedReduce::GroupByKey)
        );

        for bogus in ["Average", "Sum", "ReduceByKey + Median", "OnKey"] {
            assert!(ReduceOp::parse(bogus, &params).unwrap_err().is_invalid_operation(), "{bogus}");
        }
    }

    #[test]
    fn test_integer_sum_and_keyed_params() {
        let params = OperationParams {
            integer: true,
            by_key: true,
            ..OperationParams::default()
        };
        let op = ReduceOp::parse("SumOnValue", &params).unwrap();
        assert_eq!(
            op,
            ReduceOp::Aggregate(Aggregate::new(AggregateKind::Sum { integer: true }, Field::Value, true))
        );
        assert!(!op.is_terminal());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ReduceOp::ReduceByKey(KeyedReduce::Count).label(), "RBK + Count");
        assert_eq!(ReduceOp::ReduceByKey(KeyedReduce::GroupByKey).label(), "GroupByKey");
        assert_eq!(ReduceOp::Aggregate(Aggregate::max(Field::Key)).label(), "MaxOnKey");
        assert_eq!(MapOp::filter(Field::Key, FilterCondition::Equal, "a").label(), "FilterOnKey");
    }

    #[test]
    fn test_terminal_operations() {
        assert!(Operation::from(ReduceOp::Aggregate(Aggregate::count())).is_terminal());
        assert!(!Operation::from(ReduceOp::ReduceByKey(KeyedReduce::Max)).is_terminal());
        assert!(!Operation::from(MapOp::Split).is_terminal());
    }

    #[test]
    fn test_keyed_reduce_short_names() {
        for kind in KeyedReduce::ALL {
            assert_eq!(kind.short_name().parse::<KeyedReduce>().unwrap(), kind);
        }
        assert!("median".parse::<KeyedReduce>().is_err());
    }
}
