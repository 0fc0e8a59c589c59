//! Session - stage-by-stage driver for a dataset
//!
//! A session owns the working dataset plus a snapshot of every committed
//! stage. Navigating to an earlier snapshot and committing from there
//! discards the stages that followed it.

use crate::operations::{MapOp, OperationParams, OperationReport, ReduceOp};
use crate::traits::{Dataset, EngineError, EngineResult};
use tracing::{info, warn};

/// Marker for "no operation selected" when resolving operations by name.
pub const NO_OPERATION: &str = "-";

/// The operations picked for the next run. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub map: Option<MapOp>,
    pub reduce: Option<ReduceOp>,
}

impl Selection {
    pub fn map(op: MapOp) -> Self {
        Self {
            map: Some(op),
            reduce: None,
        }
    }

    pub fn reduce(op: ReduceOp) -> Self {
        Self {
            map: None,
            reduce: Some(op),
        }
    }

    /// Resolve a selection from operation names; empty or `"-"` means none.
    pub fn from_names(map: &str, reduce: &str, params: &OperationParams) -> EngineResult<Self> {
        fn chosen(name: &str) -> Option<&str> {
            let name = name.trim();
            (!name.is_empty() && name != NO_OPERATION).then_some(name)
        }
        Ok(Self {
            map: chosen(map).map(|name| MapOp::parse(name, params)).transpose()?,
            reduce: chosen(reduce)
                .map(|name| ReduceOp::parse(name, params))
                .transpose()?,
        })
    }
}

/// A committed stage: its label and a deep copy of the dataset at that point.
#[derive(Debug, Clone)]
pub struct StageSnapshot<D> {
    pub label: String,
    pub dataset: D,
}

/// Session manages a dataset through a sequence of committed stages
#[derive(Debug)]
pub struct Session<D: Dataset> {
    app_name: String,
    current: D,
    stages: Vec<StageSnapshot<D>>,
    selected: usize,
    pending_label: Option<String>,
}

impl<D: Dataset> Session<D> {
    /// Create a session whose first stage is `dataset`.
    pub fn new(app_name: impl Into<String>, dataset: D) -> Self {
        let app_name = app_name.into();
        info!(app = %app_name, "session started");
        Self {
            app_name,
            stages: vec![StageSnapshot {
                label: "Input".to_string(),
                dataset: dataset.copy(),
            }],
            current: dataset,
            selected: 0,
            pending_label: None,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The working dataset, including any uncommitted output.
    pub fn current(&self) -> &D {
        &self.current
    }

    pub fn stages(&self) -> &[StageSnapshot<D>] {
        &self.stages
    }

    /// Index of the stage the working dataset was derived from.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Label of the run awaiting commit.
    pub fn pending_label(&self) -> Option<&str> {
        self.pending_label.as_deref()
    }

    /// Run the selected operation against the working dataset.
    pub fn run(&mut self, selection: &Selection) -> EngineResult<OperationReport> {
        let result = match (&selection.map, &selection.reduce) {
            (Some(map), None) => self.current.apply_map(map),
            (None, Some(reduce)) => self.current.apply_reduce(reduce),
            (Some(_), Some(_)) => Err(EngineError::State(
                "select either a map or a reduce operation, not both".to_string(),
            )),
            (None, None) => Err(EngineError::State(
                "select a map or a reduce operation".to_string(),
            )),
        };
        match result {
            Ok(report) => {
                self.pending_label = Some(report.label.clone());
                Ok(report)
            }
            Err(e) => {
                warn!(app = %self.app_name, "run rejected: {e}");
                Err(e)
            }
        }
    }

    /// Commit the last run as a new stage after the selected one.
    pub fn commit(&mut self) -> EngineResult<&StageSnapshot<D>> {
        self.current.commit()?;
        let label = self
            .pending_label
            .take()
            .unwrap_or_else(|| format!("Stage {}", self.selected + 1));

        self.stages.truncate(self.selected + 1);
        self.stages.push(StageSnapshot {
            label,
            dataset: self.current.copy(),
        });
        self.selected = self.stages.len() - 1;
        info!(app = %self.app_name, stage = self.selected, "stage committed");
        Ok(&self.stages[self.selected])
    }

    /// Make stage `index` the working dataset, dropping any uncommitted run.
    pub fn navigate(&mut self, index: usize) -> EngineResult<&D> {
        let Some(stage) = self.stages.get(index) else {
            return Err(EngineError::State(format!(
                "stage {index} does not exist ({} stages)",
                self.stages.len()
            )));
        };
        self.current = stage.dataset.copy();
        self.selected = index;
        self.pending_label = None;
        info!(app = %self.app_name, stage = index, label = %stage.label, "navigated");
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LocalDataset;
    use crate::operations::{Aggregate, KeyedReduce};
    use crate::rdd::Record;

    fn session() -> Session<LocalDataset> {
        let dataset = LocalDataset::load(vec![Record::value_only("x y"), Record::value_only("y")]);
        Session::new("test", dataset)
    }

    #[test]
    fn test_selection_requires_exactly_one() {
        let mut session = session();
        let both = Selection {
            map: Some(MapOp::Split),
            reduce: Some(ReduceOp::Aggregate(Aggregate::count())),
        };
        assert!(session.run(&both).unwrap_err().is_state());
        assert!(session.run(&Selection::default()).unwrap_err().is_state());
    }

    #[test]
    fn test_from_names() {
        let params = OperationParams::default();
        let selection = Selection::from_names("Split", "-", &params).unwrap();
        assert_eq!(selection, Selection::map(MapOp::Split));

        let selection = Selection::from_names("", "ReduceByKey + Count", &params).unwrap();
        assert_eq!(selection, Selection::reduce(ReduceOp::ReduceByKey(KeyedReduce::Count)));

        assert!(Selection::from_names("Bogus", "-", &params).is_err());
    }

    #[test]
    fn test_commit_and_navigate() {
        let mut session = session();
        session.run(&Selection::map(MapOp::Split)).unwrap();
        let stage = session.commit().unwrap();
        assert_eq!(stage.label, "Split");

        session
            .run(&Selection::reduce(ReduceOp::ReduceByKey(KeyedReduce::Count)))
            .unwrap();
        session.commit().unwrap();
        assert_eq!(session.stages().len(), 3);
        assert_eq!(session.stages()[2].label, "RBK + Count");

        // Branch from the first stage: later stages are discarded.
        session.navigate(1).unwrap();
        session.run(&Selection::map(MapOp::Swap)).unwrap();
        session.commit().unwrap();
        let labels: Vec<&str> = session.stages().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Input", "Split", "Swap"]);

        assert!(session.navigate(7).unwrap_err().is_state());
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut session = session();
        session.run(&Selection::map(MapOp::Split)).unwrap();
        session.commit().unwrap();
        session.run(&Selection::map(MapOp::Swap)).unwrap();

        assert!(session.stages()[1].dataset.pending().is_none());
        assert!(session.current().pending().is_some());
    }
}
