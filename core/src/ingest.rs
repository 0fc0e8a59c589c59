//! Dataset sources: delimited text files and random generation.

use crate::rdd::Record;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rddviz_common::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A delimited text file with one record per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimitedSource {
    pub path: PathBuf,
    pub delimiter: String,
    /// 1-based key column; 0 reads no key.
    pub key_column: usize,
    /// 1-based value column.
    pub value_column: usize,
    /// Stop after this many lines.
    pub row_limit: Option<usize>,
}

impl DelimitedSource {
    /// Two comma-separated columns: key then value.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: ",".to_string(),
            key_column: 1,
            value_column: 2,
            row_limit: None,
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn columns(mut self, key_column: usize, value_column: usize) -> Self {
        self.key_column = key_column;
        self.value_column = value_column;
        self
    }

    pub fn row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }
}

/// Read records from a delimited file.
///
/// A line without the delimiter becomes a keyless record holding the whole
/// line.
pub fn read_delimited(source: &DelimitedSource) -> Result<Vec<Record>> {
    if source.value_column == 0 {
        return Err(CommonError::configuration_error("value_column is 1-based"));
    }
    if source.delimiter.is_empty() {
        return Err(CommonError::configuration_error("delimiter must not be empty"));
    }

    let file = File::open(&source.path).map_err(|e| {
        CommonError::io_error_with_source(format!("opening {}", source.path.display()), e)
    })?;
    let limit = source.row_limit.unwrap_or(usize::MAX);

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().take(limit).enumerate() {
        let line = line?;
        let columns: Vec<&str> = line.split(source.delimiter.as_str()).collect();
        if columns.len() < 2 {
            records.push(Record::value_only(line.as_str()));
            continue;
        }

        let column = |index: usize| {
            columns.get(index - 1).copied().ok_or_else(|| {
                CommonError::parse_error(format!(
                    "line {}: column {} out of range ({} columns)",
                    number + 1,
                    index,
                    columns.len()
                ))
            })
        };
        let key = match source.key_column {
            0 => None,
            index => Some(column(index)?.to_string()),
        };
        records.push(Record::new(key, column(source.value_column)?));
    }

    info!(path = %source.path.display(), records = records.len(), "read delimited dataset");
    Ok(records)
}

/// Kind of generated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// 3 to 6 ASCII letters.
    String,
    /// Integer in `0..500`.
    Integer,
    /// One-decimal float in `0..500`.
    Double,
    /// No key. Only meaningful for keys.
    Absent,
}

impl FromStr for FieldKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "String" => Ok(FieldKind::String),
            "Integer" => Ok(FieldKind::Integer),
            "Double" => Ok(FieldKind::Double),
            "-" | "" => Ok(FieldKind::Absent),
            other => Err(CommonError::parse_error(format!("unknown field kind '{other}'"))),
        }
    }
}

/// Parameters of a generated dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSource {
    pub key: FieldKind,
    pub value: FieldKind,
    pub size: usize,
    /// Fixed seed for reproducible datasets.
    pub seed: Option<u64>,
}

impl RandomSource {
    pub fn new(key: FieldKind, value: FieldKind, size: usize) -> Self {
        Self {
            key,
            value,
            size,
            seed: None,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Generate `source.size` random records.
pub fn random_pairs(source: &RandomSource) -> Result<Vec<Record>> {
    if source.value == FieldKind::Absent {
        return Err(CommonError::configuration_error("generated values cannot be absent"));
    }
    let mut rng = match source.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    debug!(size = source.size, seed = ?source.seed, "generating random dataset");

    let records = (0..source.size)
        .map(|_| {
            let key = generate(&mut rng, source.key);
            let value = generate(&mut rng, source.value).unwrap_or_default();
            Record::new(key, value)
        })
        .collect();
    Ok(records)
}

fn generate(rng: &mut StdRng, kind: FieldKind) -> Option<String> {
    match kind {
        FieldKind::String => {
            let len = rng.gen_range(3..7);
            Some(
                (0..len)
                    .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
                    .collect(),
            )
        }
        FieldKind::Integer => Some(rng.gen_range(0..500).to_string()),
        FieldKind::Double => Some(format!("{:.1}", rng.gen_range(0.0..500.0))),
        FieldKind::Absent => None,
    }
}
