//! Sequence-dependent setup times.
//!
//! When the setup time on a machine depends on which job was processed
//! before, each machine carries a square matrix indexed by
//! (predecessor job, successor job). The first job on a machine follows
//! the idle "start" state and incurs no setup.
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use serde::{Deserialize, Serialize};

/// Setup-time matrix of a single machine.
///
/// `get(pred, succ)` is the changeover time when `succ` immediately
/// follows `pred`. Diagonal entries are never used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupMatrix {
    times: Vec<Vec<i64>>,
}

impl SetupMatrix {
    /// Creates a matrix from `times[pred][succ]` rows.
    pub fn new(times: Vec<Vec<i64>>) -> Self {
        Self { times }
    }

    /// Creates an all-zero matrix for `jobs` jobs.
    pub fn zeros(jobs: usize) -> Self {
        Self {
            times: vec![vec![0; jobs]; jobs],
        }
    }

    /// Setup time when `succ` immediately follows `pred`.
    ///
    /// Out-of-range indices count as zero.
    pub fn get(&self, pred: usize, succ: usize) -> i64 {
        self.times
            .get(pred)
            .and_then(|row| row.get(succ))
            .copied()
            .unwrap_or(0)
    }

    /// Number of jobs covered (rows).
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Largest setup time into `succ` from any other job.
    pub fn max_incoming(&self, succ: usize) -> i64 {
        (0..self.size())
            .filter(|&pred| pred != succ)
            .map(|pred| self.get(pred, succ))
            .max()
            .unwrap_or(0)
    }

    /// Largest off-diagonal entry.
    pub fn max(&self) -> i64 {
        (0..self.size())
            .map(|succ| self.max_incoming(succ))
            .max()
            .unwrap_or(0)
    }

    /// Smallest entry (off-diagonal included), 0 for an empty matrix.
    pub fn min(&self) -> i64 {
        self.times
            .iter()
            .flat_map(|row| row.iter().copied())
            .min()
            .unwrap_or(0)
    }

    /// Raw rows.
    pub fn rows(&self) -> &[Vec<i64>] {
        &self.times
    }
}

/// Setup matrices indexed by machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupTimes {
    matrices: Vec<SetupMatrix>,
}

impl SetupTimes {
    /// Creates a collection, one matrix per machine in machine order.
    pub fn new(matrices: Vec<SetupMatrix>) -> Self {
        Self { matrices }
    }

    /// Setup time on `machine` between `pred` and `succ`.
    ///
    /// Returns 0 if no matrix exists for the machine.
    pub fn get(&self, machine: usize, pred: usize, succ: usize) -> i64 {
        self.matrices
            .get(machine)
            .map(|m| m.get(pred, succ))
            .unwrap_or(0)
    }

    /// Matrix of one machine.
    pub fn matrix(&self, machine: usize) -> Option<&SetupMatrix> {
        self.matrices.get(machine)
    }

    /// All matrices in machine order.
    pub fn matrices(&self) -> &[SetupMatrix] {
        &self.matrices
    }

    /// Largest setup time over all machines.
    pub fn max(&self) -> i64 {
        self.matrices.iter().map(SetupMatrix::max).max().unwrap_or(0)
    }

    /// Number of matrices.
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}
