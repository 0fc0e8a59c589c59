//! Defines the Aggregator trait for combining records in reduce operations.

use crate::operations::numeric::{add_float, add_integer, ensure_numeric, float_operand};
use crate::rdd::{Field, Record};
use crate::traits::EngineResult;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Aggregator trait for folding the records of a group into one record.
///
/// The node-local pass seeds a group with [`Aggregator::create_combiner`] and
/// folds the rest with [`Aggregator::merge_value`]. The merge pass after a
/// shuffle folds already-combined records with
/// [`Aggregator::merge_combiners`].
pub trait Aggregator: Send + Sync + Debug {
    /// Check every input record before any combining starts.
    fn validate(&self, records: &mut dyn Iterator<Item = &Record>) -> EngineResult<()>;

    /// Create a combiner from the first record of a group. `keyed` tells
    /// whether groups are formed per key or over the whole partition.
    fn create_combiner(&self, record: &Record, keyed: bool) -> EngineResult<Record>;

    /// Merge a new input record into an existing combiner.
    fn merge_value(&self, combiner: &Record, record: &Record) -> EngineResult<Record>;

    /// Merge two combiners.
    fn merge_combiners(&self, c1: &Record, c2: &Record) -> EngineResult<Record>;
}

fn group_key(record: &Record, keyed: bool) -> Option<String> {
    if keyed { record.key().map(str::to_string) } else { None }
}

/// Counts the records of each group.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountAggregator;

impl Aggregator for CountAggregator {
    fn validate(&self, _records: &mut dyn Iterator<Item = &Record>) -> EngineResult<()> {
        Ok(())
    }

    fn create_combiner(&self, record: &Record, keyed: bool) -> EngineResult<Record> {
        Ok(Record::new(group_key(record, keyed), "1"))
    }

    fn merge_value(&self, combiner: &Record, _record: &Record) -> EngineResult<Record> {
        Ok(combiner.with_value(add_integer(combiner.value(), "1")?))
    }

    fn merge_combiners(&self, c1: &Record, c2: &Record) -> EngineResult<Record> {
        Ok(c1.with_value(add_integer(c1.value(), c2.value())?))
    }
}

/// Sums a numeric field.
///
/// The first record of a group keeps its field text as-is; later additions
/// render the running total.
#[derive(Clone, Copy, Debug)]
pub struct SumAggregator {
    field: Field,
    integer: bool,
}

impl SumAggregator {
    pub fn new(field: Field, integer: bool) -> Self {
        Self { field, integer }
    }

    fn add(&self, left: &str, right: &str) -> EngineResult<String> {
        if self.integer {
            add_integer(left, right)
        } else {
            add_float(left, right)
        }
    }

    fn operand<'a>(&self, record: &'a Record) -> &'a str {
        // Presence is checked by `validate`.
        record.field(self.field).unwrap_or_default()
    }
}

impl Aggregator for SumAggregator {
    fn validate(&self, records: &mut dyn Iterator<Item = &Record>) -> EngineResult<()> {
        ensure_numeric(records, self.field, self.integer)
    }

    fn create_combiner(&self, record: &Record, keyed: bool) -> EngineResult<Record> {
        Ok(Record::new(group_key(record, keyed), self.operand(record)))
    }

    fn merge_value(&self, combiner: &Record, record: &Record) -> EngineResult<Record> {
        Ok(combiner.with_value(self.add(combiner.value(), self.operand(record))?))
    }

    fn merge_combiners(&self, c1: &Record, c2: &Record) -> EngineResult<Record> {
        Ok(c1.with_value(self.add(c1.value(), c2.value())?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Keeps the whole record holding the smallest or largest value of a field.
///
/// Ties keep the earlier record.
#[derive(Clone, Copy, Debug)]
pub struct ExtremumAggregator {
    field: Field,
    extremum: Extremum,
}

impl ExtremumAggregator {
    pub fn min(field: Field) -> Self {
        Self {
            field,
            extremum: Extremum::Min,
        }
    }

    pub fn max(field: Field) -> Self {
        Self {
            field,
            extremum: Extremum::Max,
        }
    }

    pub fn extremum(&self) -> Extremum {
        self.extremum
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Whether `candidate` strictly beats `current`.
    pub fn beats(&self, candidate: &Record, current: &Record) -> EngineResult<bool> {
        let candidate = float_operand(candidate.field(self.field).unwrap_or_default())?;
        let current = float_operand(current.field(self.field).unwrap_or_default())?;
        Ok(match self.extremum {
            Extremum::Min => candidate < current,
            Extremum::Max => candidate > current,
        })
    }

    fn pick(&self, current: &Record, candidate: &Record) -> EngineResult<Record> {
        if self.beats(candidate, current)? {
            Ok(candidate.clone())
        } else {
            Ok(current.clone())
        }
    }
}

impl Aggregator for ExtremumAggregator {
    fn validate(&self, records: &mut dyn Iterator<Item = &Record>) -> EngineResult<()> {
        ensure_numeric(records, self.field, false)
    }

    fn create_combiner(&self, record: &Record, _keyed: bool) -> EngineResult<Record> {
        Ok(record.clone())
    }

    fn merge_value(&self, combiner: &Record, record: &Record) -> EngineResult<Record> {
        self.pick(combiner, record)
    }

    fn merge_combiners(&self, c1: &Record, c2: &Record) -> EngineResult<Record> {
        self.pick(c1, c2)
    }
}

/// Collects the distinct values of each key into a sorted `[a, b]` list.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroupByKeyAggregator;

impl GroupByKeyAggregator {
    /// Members of a value, which is either a rendered group or a plain value.
    pub fn members(value: &str) -> BTreeSet<String> {
        let inner = value
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(value);
        inner.split(", ").map(str::to_string).collect()
    }

    pub fn render(members: &BTreeSet<String>) -> String {
        let joined: Vec<&str> = members.iter().map(String::as_str).collect();
        format!("[{}]", joined.join(", "))
    }

    fn union(left: &str, right: &str) -> String {
        let mut members = Self::members(left);
        members.extend(Self::members(right));
        Self::render(&members)
    }
}

impl Aggregator for GroupByKeyAggregator {
    fn validate(&self, _records: &mut dyn Iterator<Item = &Record>) -> EngineResult<()> {
        Ok(())
    }

    fn create_combiner(&self, record: &Record, keyed: bool) -> EngineResult<Record> {
        Ok(Record::new(
            group_key(record, keyed),
            Self::render(&Self::members(record.value())),
        ))
    }

    fn merge_value(&self, combiner: &Record, record: &Record) -> EngineResult<Record> {
        Ok(combiner.with_value(Self::union(combiner.value(), record.value())))
    }

    fn merge_combiners(&self, c1: &Record, c2: &Record) -> EngineResult<Record> {
        Ok(c1.with_value(Self::union(c1.value(), c2.value())))
    }
}

/// Run the aggregator's input checks over `records`.
pub fn validate_all<'a>(
    aggregator: &dyn Aggregator,
    mut records: impl Iterator<Item = &'a Record>,
) -> EngineResult<()> {
    aggregator.validate(&mut records)
}
