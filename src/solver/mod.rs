//! Solver boundary.
//!
//! Models are handed to opaque consumers through two traits, one per
//! model family. Other engines plug in by implementing them; the crate
//! ships one consumer per family:
//!
//! - [`GoodLpSolver`]: exact MILP through `good_lp` and `microlp`
//! - [`SimpleCpSolver`]: greedy list placement, feasible only

#[cfg(test)]
mod enumerative;
mod greedy;
mod lp;

#[cfg(test)]
pub(crate) use enumerative::EnumerativeSolver;
pub use greedy::SimpleCpSolver;
pub use lp::GoodLpSolver;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::cp::CpModel;
use crate::error::SolverError;
use crate::mip::LinearModel;

/// Status reported by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible solution found, optimality not proven.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// The time budget ran out before any solution was found.
    Timeout,
    /// The solver rejected the model as malformed.
    ModelInvalid,
}

/// Answer of a linear solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value, when a solution was found.
    pub objective_value: Option<f64>,
    /// Variable values by name.
    pub values: HashMap<String, f64>,
    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
}

impl LinearSolution {
    /// Creates a solution without values.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: HashMap::new(),
            solve_time_ms: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Value of the variable named `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Placement of one interval variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSolution {
    /// Start time.
    pub start: i64,
    /// End time.
    pub end: i64,
    /// Whether the interval is present (optional intervals may be absent).
    pub is_present: bool,
}

impl IntervalSolution {
    /// A present interval.
    pub fn present(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            is_present: true,
        }
    }

    /// An absent optional interval.
    pub fn absent() -> Self {
        Self {
            start: 0,
            end: 0,
            is_present: false,
        }
    }
}

/// Answer of a CP solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value, when a solution was found.
    pub objective_value: Option<f64>,
    /// Interval placements by name.
    pub intervals: HashMap<String, IntervalSolution>,
    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
}

impl CpSolution {
    /// Creates a solution without placements.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            intervals: HashMap::new(),
            solve_time_ms: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Latest end over present intervals.
    pub fn max_end(&self) -> i64 {
        self.intervals
            .values()
            .filter(|s| s.is_present)
            .map(|s| s.end)
            .max()
            .unwrap_or(0)
    }
}

/// A consumer of linear models.
pub trait LinearSolver {
    /// Solves `model` within the limits of `config`.
    ///
    /// # Errors
    ///
    /// [`SolverError`] when the solver cannot be reached or cannot
    /// handle the model. Infeasibility and timeouts are statuses, not
    /// errors.
    fn solve(&self, model: &LinearModel, config: &SolverConfig)
        -> Result<LinearSolution, SolverError>;
}

/// A consumer of interval (CP) models.
pub trait CpSolver {
    /// Solves `model` within the limits of `config`.
    ///
    /// # Errors
    ///
    /// [`SolverError`] when the solver cannot be reached or cannot
    /// handle the model.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Result<CpSolution, SolverError>;
}

/// A solver that is never available.
///
/// Stands in for an external engine that is not installed or licensed.
#[derive(Debug, Clone, Default)]
pub struct UnavailableSolver {
    reason: String,
}

impl UnavailableSolver {
    /// Creates a solver failing with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl LinearSolver for UnavailableSolver {
    fn solve(&self, _: &LinearModel, _: &SolverConfig) -> Result<LinearSolution, SolverError> {
        Err(SolverError::Unavailable(self.reason.clone()))
    }
}

impl CpSolver for UnavailableSolver {
    fn solve(&self, _: &CpModel, _: &SolverConfig) -> Result<CpSolution, SolverError> {
        Err(SolverError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_solution() {
        let mut s = LinearSolution::empty(SolverStatus::Feasible);
        s.values.insert("Cmax".into(), 8.0);
        assert!(s.is_solution_found());
        assert_eq!(s.value("Cmax"), Some(8.0));
        assert_eq!(s.value("x"), None);
        assert!(!LinearSolution::empty(SolverStatus::Timeout).is_solution_found());
    }

    #[test]
    fn test_max_end_skips_absent() {
        let mut s = CpSolution::empty(SolverStatus::Feasible);
        s.intervals.insert("a".into(), IntervalSolution::present(0, 50));
        s.intervals.insert("b".into(), IntervalSolution::present(10, 80));
        s.intervals.insert(
            "c".into(),
            IntervalSolution {
                start: 0,
                end: 100,
                is_present: false,
            },
        );
        assert_eq!(s.max_end(), 80);
    }

    #[test]
    fn test_unavailable_solver() {
        let solver = UnavailableSolver::new("no license");
        let model = LinearModel::new("m");
        let err = LinearSolver::solve(&solver, &model, &SolverConfig::default()).unwrap_err();
        assert_eq!(err, SolverError::Unavailable("no license".into()));
    }
}
