//! Turning solver answers into scheduling outcomes.
//!
//! The three "no schedule" cases stay distinct: the instance has no
//! schedule at all (`Infeasible`), the budget ran out first
//! (`NoSolutionInBudget`), or no solver could be reached
//! (`SolverUnavailable`). A `ModelInvalid` answer means the formulation
//! itself is broken and is reported as an error instead.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cp::CpModel;
use crate::error::{ScheduleError, SolverError};
use crate::models::Schedule;
use crate::solver::{CpSolution, LinearSolution, SolverStatus};

/// Result of solving one formulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Proven optimal schedule.
    Optimal { makespan: f64 },
    /// Schedule found without an optimality proof.
    Feasible { makespan: f64 },
    /// The instance admits no schedule.
    Infeasible,
    /// The time budget ran out before any schedule was found.
    NoSolutionInBudget,
    /// The solver could not be used.
    SolverUnavailable { reason: String },
}

impl Outcome {
    /// Makespan of the schedule found, if any.
    pub fn makespan(&self) -> Option<f64> {
        match self {
            Self::Optimal { makespan } | Self::Feasible { makespan } => Some(*makespan),
            _ => None,
        }
    }

    /// Whether a schedule was found.
    pub fn is_solution(&self) -> bool {
        self.makespan().is_some()
    }
}

/// An outcome together with the decoded schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solved {
    /// Solve outcome.
    pub outcome: Outcome,
    /// Decoded schedule, present when the outcome carries one.
    pub schedule: Option<Schedule>,
}

impl Solved {
    /// The answer when the solver could not be used.
    pub fn unavailable(err: SolverError) -> Self {
        Self {
            outcome: from_solver_error(&err),
            schedule: None,
        }
    }
}

/// Maps a solver boundary failure to an outcome.
pub fn from_solver_error(err: &SolverError) -> Outcome {
    warn!(event = "solver_unavailable", reason = %err);
    Outcome::SolverUnavailable {
        reason: err.to_string(),
    }
}

/// Extracts the outcome of a linear solve; `makespan` names the
/// makespan variable.
pub fn outcome(solution: &LinearSolution, makespan: &str) -> Result<Outcome, ScheduleError> {
    let value = || {
        solution
            .value(makespan)
            .or(solution.objective_value)
            .ok_or_else(|| {
                ScheduleError::Formulation(format!(
                    "solver reported a solution without a value for {makespan}"
                ))
            })
    };
    let outcome = match solution.status {
        SolverStatus::Optimal => Outcome::Optimal { makespan: value()? },
        SolverStatus::Feasible => Outcome::Feasible { makespan: value()? },
        SolverStatus::Infeasible => Outcome::Infeasible,
        SolverStatus::Timeout => Outcome::NoSolutionInBudget,
        SolverStatus::ModelInvalid => {
            return Err(ScheduleError::Formulation(
                "solver rejected the linear model".into(),
            ))
        }
    };
    info!(
        event = "outcome_extracted",
        status = ?solution.status,
        makespan = outcome.makespan(),
        solve_time_ms = solution.solve_time_ms,
    );
    Ok(outcome)
}

/// Extracts the outcome of an interval-model solve. The makespan is the
/// model objective evaluated on the placements.
pub fn cp_outcome(model: &CpModel, solution: &CpSolution) -> Result<Outcome, ScheduleError> {
    let value = || {
        model
            .objective_value(solution)
            .map(|v| v as f64)
            .or(solution.objective_value)
            .ok_or_else(|| {
                ScheduleError::Formulation(format!(
                    "solver reported a solution for {} without placements",
                    model.name
                ))
            })
    };
    let outcome = match solution.status {
        SolverStatus::Optimal => Outcome::Optimal { makespan: value()? },
        SolverStatus::Feasible => Outcome::Feasible { makespan: value()? },
        SolverStatus::Infeasible => Outcome::Infeasible,
        SolverStatus::Timeout => Outcome::NoSolutionInBudget,
        SolverStatus::ModelInvalid => {
            return Err(ScheduleError::Formulation(format!(
                "solver rejected the interval model {}",
                model.name
            )))
        }
    };
    info!(
        event = "outcome_extracted",
        status = ?solution.status,
        makespan = outcome.makespan(),
        solve_time_ms = solution.solve_time_ms,
    );
    Ok(outcome)
}
