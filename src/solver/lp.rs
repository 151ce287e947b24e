//! Linear solver backed by `good_lp`.
//!
//! Translates a [`LinearModel`] variable by variable and row by row into
//! a `good_lp` problem and solves it with the pure-Rust `microlp`
//! backend (simplex with branch and bound on integer variables).
//!
//! The backend runs single-threaded until the search completes, so
//! `thread_count` and `time_limit_secs` are not enforced here.

use std::time::Instant;

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable as LpVariable,
};
use tracing::{debug, info};

use super::{LinearSolution, LinearSolver, SolverStatus};
use crate::config::{SolverConfig, Verbosity};
use crate::error::SolverError;
use crate::mip::{LinearModel, Sense, VarId, VarKind};

/// Exact MILP consumer over `good_lp`.
///
/// # Examples
///
/// ```
/// use u_formulate::config::SolverConfig;
/// use u_formulate::mip::ScheduleMipBuilder;
/// use u_formulate::models::Instance;
/// use u_formulate::solver::{GoodLpSolver, LinearSolver, SolverStatus};
///
/// let instance = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
/// let formulation = ScheduleMipBuilder::new(&instance).build().unwrap();
///
/// let solution = GoodLpSolver::new()
///     .solve(&formulation.model, &SolverConfig::default())
///     .unwrap();
/// assert_eq!(solution.status, SolverStatus::Optimal);
/// assert!((solution.objective_value.unwrap() - 8.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    /// Creates the solver.
    pub fn new() -> Self {
        Self
    }
}

impl LinearSolver for GoodLpSolver {
    fn solve(
        &self,
        model: &LinearModel,
        config: &SolverConfig,
    ) -> Result<LinearSolution, SolverError> {
        let started = Instant::now();
        if model.validate().is_err() {
            return Ok(LinearSolution::empty(SolverStatus::ModelInvalid));
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<LpVariable> = model
            .variables()
            .iter()
            .map(|var| {
                let definition = match var.kind {
                    VarKind::Binary => variable().binary(),
                    VarKind::Continuous => match var.upper {
                        Some(upper) => variable().min(var.lower).max(upper),
                        None => variable().min(var.lower),
                    },
                };
                vars.add(definition.name(var.name.clone()))
            })
            .collect();

        let expression = |terms: &[(VarId, f64)]| -> Expression {
            terms.iter().map(|&(v, c)| c * handles[v.index()]).sum()
        };

        let mut problem = vars.minimise(expression(model.objective())).using(microlp);
        for row in model.constraints() {
            let lhs = expression(&row.terms);
            problem.add_constraint(match row.sense {
                Sense::Le => constraint::leq(lhs, row.rhs),
                Sense::Eq => constraint::eq(lhs, row.rhs),
                Sense::Ge => constraint::geq(lhs, row.rhs),
            });
        }

        let mut solution = match problem.solve() {
            Ok(found) => {
                let values: Vec<f64> = model
                    .variables()
                    .iter()
                    .zip(&handles)
                    .map(|(var, &handle)| {
                        let value = found.value(handle);
                        // branch and bound leaves integers within a tolerance
                        if var.is_binary() {
                            value.round()
                        } else {
                            value
                        }
                    })
                    .collect();
                let mut solution = LinearSolution::empty(SolverStatus::Optimal);
                solution.objective_value = Some(model.objective_value(&values));
                solution.values = model
                    .variables()
                    .iter()
                    .zip(values)
                    .map(|(var, value)| (var.name.clone(), value))
                    .collect();
                solution
            }
            Err(ResolutionError::Infeasible) => LinearSolution::empty(SolverStatus::Infeasible),
            Err(ResolutionError::Unbounded) => {
                return Err(SolverError::Unsupported(format!(
                    "objective of {} is unbounded",
                    model.name
                )))
            }
            Err(err) => return Err(SolverError::Unsupported(err.to_string())),
        };
        solution.solve_time_ms = started.elapsed().as_millis() as u64;

        debug!(
            event = "lp_solve_finished",
            model = %model.name,
            variables = model.variable_count(),
            binaries = model.binary_count(),
            constraints = model.constraint_count(),
            status = ?solution.status,
            solve_time_ms = solution.solve_time_ms,
        );
        if config.verbosity == Verbosity::Normal {
            info!(
                event = "lp_solve_finished",
                model = %model.name,
                status = ?solution.status,
                objective = solution.objective_value,
            );
        }
        Ok(solution)
    }
}
