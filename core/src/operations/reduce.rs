//! Aggregation passes over a single partition, and the global summary of a
//! non-keyed aggregate.

use super::numeric::{float_operand, format_float, integer_operand};
use super::{Aggregate, AggregateKind, Link, PassOutput};
use crate::rdd::{NULL_TEXT, Partition, Record};
use crate::shuffle::aggregator::{Aggregator, ExtremumAggregator};
use crate::trace::Site;
use crate::traits::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a pass folds into each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Raw input records, folded with `merge_value`.
    Values,
    /// Output of an earlier pass, folded with `merge_combiners`.
    Combiners,
}

/// Fold `input` into one record per key (`by_key`) or a single record.
///
/// Groups appear in order of first occurrence. Every input record is linked
/// to the output record it was folded into.
pub fn aggregate_partition(
    aggregator: &dyn Aggregator,
    combine: Combine,
    by_key: bool,
    input: &Partition,
    site: Site,
) -> EngineResult<PassOutput> {
    let mut out = PassOutput::empty_like(input);
    for (input_index, record) in input.records().enumerate() {
        let slot = if by_key {
            out.partition.index_by_key_of(record.key())
        } else if out.partition.is_empty() {
            None
        } else {
            Some(0)
        };

        let output = match slot {
            None => {
                let seed = match combine {
                    Combine::Values => aggregator.create_combiner(record, by_key)?,
                    Combine::Combiners => record.clone(),
                };
                let index = out.partition.add_record(seed.clone());
                out.trace.added(site, index, seed);
                index
            }
            Some(index) => {
                let current = out.partition.get(index).cloned().ok_or_else(|| {
                    EngineError::State(format!("aggregate slot {index} is missing"))
                })?;
                let merged = match combine {
                    Combine::Values => aggregator.merge_value(&current, record)?,
                    Combine::Combiners => aggregator.merge_combiners(&current, record)?,
                };
                out.partition.replace_record(index, merged.clone());
                out.trace.updated(site, index, current, merged);
                index
            }
        };
        out.lineage.push(Link {
            input: input_index,
            output,
        });
    }
    Ok(out)
}

/// Global result of a non-keyed aggregate, combined across every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub description: String,
    pub value: String,
    /// The record holding the minimum or maximum.
    pub witness: Option<Record>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.value)?;
        if let Some(witness) = &self.witness {
            write!(f, "\nrecord: {witness}")?;
        }
        Ok(())
    }
}

/// Combine the per-node results of a non-keyed aggregate.
///
/// `outputs` holds at most one record per node; empty nodes contribute
/// nothing.
pub fn summarize(aggregate: &Aggregate, outputs: &[&Partition]) -> EngineResult<Summary> {
    let partials = outputs.iter().flat_map(|partition| partition.records());
    match aggregate.kind {
        AggregateKind::Count => {
            let mut total: i64 = 0;
            for partial in partials {
                total = checked_add(total, integer_operand(partial.value())?)?;
            }
            Ok(plain("The overall count is", total.to_string()))
        }
        AggregateKind::Sum { integer: true } => {
            let mut total: i64 = 0;
            for partial in partials {
                total = checked_add(total, integer_operand(partial.value())?)?;
            }
            Ok(plain("The overall sum is", total.to_string()))
        }
        AggregateKind::Sum { integer: false } => {
            let mut total = 0.0;
            for partial in partials {
                total += float_operand(partial.value())?;
            }
            Ok(plain("The overall sum is", format_float(total)))
        }
        AggregateKind::Min | AggregateKind::Max => {
            let (description, aggregator) = match aggregate.kind {
                AggregateKind::Min => ("The minimum value is", ExtremumAggregator::min(aggregate.field)),
                _ => ("The maximum value is", ExtremumAggregator::max(aggregate.field)),
            };
            let mut best: Option<Record> = None;
            for partial in partials {
                best = Some(match best {
                    None => partial.clone(),
                    Some(current) => aggregator.merge_combiners(&current, partial)?,
                });
            }
            let value = best
                .as_ref()
                .and_then(|record| record.field(aggregate.field))
                .unwrap_or(NULL_TEXT)
                .to_string();
            Ok(Summary {
                description: description.to_string(),
                value,
                witness: best,
            })
        }
    }
}

fn plain(description: &str, value: String) -> Summary {
    Summary {
        description: description.to_string(),
        value,
        witness: None,
    }
}

fn checked_add(left: i64, right: i64) -> EngineResult<i64> {
    left.checked_add(right)
        .ok_or_else(|| EngineError::Validation(format!("integer overflow adding {left} and {right}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdd::Field;
    use crate::shuffle::aggregator::{CountAggregator, SumAggregator};
    use crate::trace::{Slot, TraceEvent};

    fn partition(records: Vec<Record>) -> Partition {
        Partition::from_records(Some(2), records)
    }

    #[test]
    fn test_keyed_count_in_first_occurrence_order() {
        let input = partition(vec![
            Record::pair("b", "x"),
            Record::pair("a", "x"),
            Record::pair("b", "y"),
        ]);
        let out = aggregate_partition(&CountAggregator, Combine::Values, true, &input, Site::stage(1))
            .unwrap();

        let records: Vec<&Record> = out.partition.records().collect();
        assert_eq!(records, vec![&Record::pair("b", "2"), &Record::pair("a", "1")]);
        assert_eq!(
            out.lineage,
            vec![
                Link { input: 0, output: 0 },
                Link { input: 1, output: 1 },
                Link { input: 2, output: 0 },
            ]
        );
        assert!(matches!(out.trace.events()[2], TraceEvent::Updated { index: 0, .. }));
    }

    #[test]
    fn test_non_keyed_sum_collapses_partition() {
        let input = partition(vec![Record::pair("a", "1"), Record::pair("b", "2"), Record::pair("c", "3")]);
        let agg = SumAggregator::new(Field::Value, false);
        let out = aggregate_partition(&agg, Combine::Values, false, &input, Site::node(0, Slot::To))
            .unwrap();
        assert_eq!(out.partition.len(), 1);
        assert_eq!(out.partition.get(0), Some(&Record::value_only("6")));
        assert_eq!(out.lineage.len(), 3);
    }

    #[test]
    fn test_merge_combiners_pass() {
        let input = partition(vec![Record::pair("a", "2"), Record::pair("a", "3"), Record::pair("b", "1")]);
        let out = aggregate_partition(&CountAggregator, Combine::Combiners, true, &input, Site::stage(0))
            .unwrap();
        let records: Vec<&Record> = out.partition.records().collect();
        assert_eq!(records, vec![&Record::pair("a", "5"), &Record::pair("b", "1")]);
    }

    #[test]
    fn test_empty_partition_produces_nothing() {
        let input = Partition::new(4);
        let out = aggregate_partition(&CountAggregator, Combine::Values, false, &input, Site::stage(0))
            .unwrap();
        assert!(out.partition.is_empty());
        assert!(out.trace.is_empty());
    }

    #[test]
    fn test_summaries() {
        let a = partition(vec![Record::value_only("3")]);
        let b = partition(vec![Record::value_only("4")]);
        let empty = Partition::new(2);

        let count = summarize(&Aggregate::count(), &[&a, &empty, &b]).unwrap();
        assert_eq!(count.to_string(), "The overall count is: 7");

        let sum = summarize(&Aggregate::sum(Field::Value), &[&a, &b]).unwrap();
        assert_eq!(sum.value, "7");

        let x = partition(vec![Record::pair("x", "2.5")]);
        let y = partition(vec![Record::pair("y", "9")]);
        let max = summarize(&Aggregate::max(Field::Value), &[&x, &y]).unwrap();
        assert_eq!(max.value, "9");
        assert_eq!(max.witness, Some(Record::pair("y", "9")));

        let none = summarize(&Aggregate::min(Field::Value), &[&empty]).unwrap();
        assert_eq!(none.value, "null");
        assert_eq!(none.witness, None);
        assert_eq!(none.description, "The minimum value is");
    }
}
