//! Per-record transformations.

use super::numeric::parse_float;
use super::{Filter, FilterCondition, Link, MapOp, PassOutput};
use crate::rdd::{Field, NULL_TEXT, Partition, Record};
use crate::trace::Site;
use crate::traits::{EngineError, EngineResult};
use std::collections::BTreeSet;

/// Separator between the tokens of a FlatMapToPair value and of a rendered
/// pair key.
pub const PAIR_SEPARATOR: &str = ", ";

/// A map operation validated against its whole input, ready to run on any
/// of the input's partitions.
#[derive(Debug, Clone)]
pub struct PreparedMap {
    op: MapOp,
    threshold: Option<f64>,
}

impl PreparedMap {
    /// Validate `op` against every input record.
    ///
    /// Numeric filters need a numeric threshold and a numeric field in every
    /// record that has the field. Records lacking the field are left to the
    /// filter itself.
    pub fn new<'a>(op: &MapOp, records: impl Iterator<Item = &'a Record>) -> EngineResult<Self> {
        let threshold = match op {
            MapOp::Filter(filter) if filter.condition.is_numeric() => {
                Some(validate_numeric_filter(filter, records)?)
            }
            _ => None,
        };
        Ok(Self {
            op: op.clone(),
            threshold,
        })
    }

    pub fn op(&self) -> &MapOp {
        &self.op
    }

    /// Records produced from one input record.
    pub fn apply(&self, record: &Record) -> Vec<Record> {
        match &self.op {
            MapOp::Swap => vec![swap(record)],
            MapOp::Filter(filter) => {
                if keep(filter, self.threshold, record) {
                    vec![record.clone()]
                } else {
                    Vec::new()
                }
            }
            MapOp::Split => split(record),
            MapOp::FlatMapToPair => flat_map_to_pair(record),
        }
    }

    /// Run over a whole partition, appending outputs in input order.
    pub fn run(&self, input: &Partition, site: Site) -> PassOutput {
        let mut out = PassOutput::empty_like(input);
        for (input_index, record) in input.records().enumerate() {
            for produced in self.apply(record) {
                let index = out.partition.add_record(produced.clone());
                out.trace.added(site, index, produced);
                out.lineage.push(Link {
                    input: input_index,
                    output: index,
                });
            }
        }
        out
    }
}

fn validate_numeric_filter<'a>(
    filter: &Filter,
    records: impl Iterator<Item = &'a Record>,
) -> EngineResult<f64> {
    let threshold = parse_float(&filter.threshold).ok_or_else(|| {
        EngineError::Validation(format!(
            "filter threshold '{}' must be a number for '{}'",
            filter.threshold, filter.condition
        ))
    })?;
    for record in records {
        let Some(text) = filter_operand(record, filter.field) else {
            continue;
        };
        if parse_float(text).is_none() {
            return Err(EngineError::Validation(format!(
                "values must be numbers: {} of record {} is '{}'",
                filter.field, record, text
            )));
        }
    }
    Ok(threshold)
}

/// The filtered field, with `"null"` read as absent.
fn filter_operand(record: &Record, field: Field) -> Option<&str> {
    record.field(field).filter(|text| *text != NULL_TEXT)
}

fn keep(filter: &Filter, threshold: Option<f64>, record: &Record) -> bool {
    let threshold = threshold.unwrap_or(f64::NAN);
    match (filter_operand(record, filter.field), filter.condition) {
        // A missing or "null" field orders below every number and equals nothing.
        (None, FilterCondition::Greater | FilterCondition::Equal) => false,
        (None, FilterCondition::Less | FilterCondition::NotEqual) => true,
        (Some(text), FilterCondition::Equal) => text == filter.threshold,
        (Some(text), FilterCondition::NotEqual) => text != filter.threshold,
        (Some(text), FilterCondition::Greater) => parse_float(text).is_some_and(|v| v > threshold),
        (Some(text), FilterCondition::Less) => parse_float(text).is_some_and(|v| v < threshold),
    }
}

/// Exchange key and value. A keyless record gets a `"null"` value.
pub fn swap(record: &Record) -> Record {
    Record::pair(record.value(), record.key().unwrap_or(NULL_TEXT))
}

/// One `(token, "1")` record per whitespace-separated token of the value,
/// lowercased.
pub fn split(record: &Record) -> Vec<Record> {
    record
        .value()
        .split_whitespace()
        .map(|token| Record::pair(token.trim().to_lowercase(), "1"))
        .collect()
}

/// One `("a, b", "1")` record per unordered pair of distinct tokens of the
/// value, in sorted token order.
pub fn flat_map_to_pair(record: &Record) -> Vec<Record> {
    let tokens: Vec<&str> = record
        .value()
        .split(PAIR_SEPARATOR)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut pairs = Vec::new();
    for (i, first) in tokens.iter().enumerate() {
        for second in &tokens[i + 1..] {
            pairs.push(Record::pair(format!("{first}{PAIR_SEPARATOR}{second}"), "1"));
        }
    }
    pairs
}
