//! Execution strategy for independent pipeline work

use crate::error::Result;
use rayon::prelude::*;

/// How independent units of work (the tiers) are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Map `f` over `0..n` and collect the results in index order.
    pub fn map<T, F>(&self, n: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        Ok(match self {
            ProcessingMode::Sequential => (0..n).map(f).collect(),
            ProcessingMode::Parallel => (0..n).into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(*threads).build()?;
                pool.install(|| (0..n).into_par_iter().map(f).collect())
            }
        })
    }

    /// Like [`map`](Self::map) for fallible work; the first error in index
    /// order wins.
    pub fn try_map<T, F>(&self, n: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        self.map(n, f)?.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CorridorError;

    #[test]
    fn test_modes_agree() {
        let square = |i: usize| i * i;
        let expected: Vec<usize> = (0..50).map(square).collect();
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            assert_eq!(mode.map(50, square).unwrap(), expected);
        }
    }

    #[test]
    fn test_try_map_reports_first_error() {
        let result: Result<Vec<usize>> = ProcessingMode::Parallel.try_map(10, |i| {
            if i >= 3 {
                Err(CorridorError::InvalidNetwork(format!("unit {}", i)))
            } else {
                Ok(i)
            }
        });
        match result {
            Err(CorridorError::InvalidNetwork(msg)) => assert_eq!(msg, "unit 3"),
            other => panic!("unexpected {:?}", other.map(|v| v.len())),
        }
    }
}
