//! Local Task Scheduler
//!
//! Executes per-node work either in node order on the calling thread or in
//! parallel on Rayon's thread pool. Results always come back in node order,
//! so both modes produce identical datasets.

use crate::traits::EngineResult;
use rayon::prelude::*;
use rddviz_common::SimulationConfig;
use tracing::debug;

/// LocalScheduler runs one task per node
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler {
    parallel: bool,
}

impl LocalScheduler {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.parallel_nodes)
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Run `task` once per input, passing the input's index.
    ///
    /// The first failing task's error is returned and all results are
    /// discarded.
    pub fn execute_tasks<I, T, F>(&self, inputs: &[I], task: F) -> EngineResult<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(usize, &I) -> EngineResult<T> + Send + Sync,
    {
        debug!(tasks = inputs.len(), parallel = self.parallel, "executing node tasks");
        if self.parallel {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| task(index, input))
                .collect()
        } else {
            inputs
                .iter()
                .enumerate()
                .map(|(index, input)| task(index, input))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EngineError;

    #[test]
    fn test_results_in_input_order() {
        let inputs: Vec<usize> = (0..16).collect();
        for scheduler in [LocalScheduler::new(false), LocalScheduler::new(true)] {
            let results = scheduler
                .execute_tasks(&inputs, |index, value| Ok(index * 10 + value))
                .unwrap();
            let expected: Vec<usize> = (0..16).map(|i| i * 11).collect();
            assert_eq!(results, expected);
        }
    }

    #[test]
    fn test_error_propagates() {
        let inputs = vec![1, 2, 3];
        let scheduler = LocalScheduler::new(true);
        let result: EngineResult<Vec<i32>> = scheduler.execute_tasks(&inputs, |_, value| {
            if *value == 2 {
                Err(EngineError::Validation("two".to_string()))
            } else {
                Ok(*value)
            }
        });
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_from_config() {
        let config = rddviz_common::SimulationConfigBuilder::new().parallel_nodes(true).build().unwrap();
        assert!(LocalScheduler::from_config(&config).is_parallel());
        assert!(!LocalScheduler::default().is_parallel());
    }
}
