//! Exhaustive solver for tiny linear models, used to cross-check
//! [`GoodLpSolver`](super::GoodLpSolver) in tests.
//!
//! Enumerates every 0/1 assignment of the binary variables. Once the
//! binaries are fixed, every row of a scheduling formulation reduces to
//! a bound (`c ≥ r`, `c ≤ r`), a difference (`c_u − c_v ≥ r`) or a
//! constant check, so the continuous part is a difference-constraint
//! system. Its least solution is found by a longest-path pass
//! (Bellman-Ford from a zero-valued source); a positive cycle means the
//! fixed assignment is infeasible. With non-negative objective weights
//! on continuous variables, the least solution is also the cheapest.
//!
//! # Complexity
//! O(2^b · I · E) for b binaries, I = continuous variables + 1,
//! E = rows + bounds.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use super::{LinearSolution, LinearSolver, SolverStatus};
use crate::config::{SolverConfig, Verbosity};
use crate::error::SolverError;
use crate::mip::{LinearModel, Sense};

const EPS: f64 = 1e-9;

/// Largest binary count accepted by default (about one million assignments).
pub const DEFAULT_MAX_BINARIES: usize = 20;

/// Exact solver enumerating binary assignments.
#[derive(Debug, Clone)]
pub struct EnumerativeSolver {
    max_binaries: usize,
}

impl EnumerativeSolver {
    /// Creates a solver with the default binary cap.
    pub fn new() -> Self {
        Self {
            max_binaries: DEFAULT_MAX_BINARIES,
        }
    }

    /// Sets the largest number of binary variables accepted.
    pub fn with_max_binaries(mut self, max_binaries: usize) -> Self {
        self.max_binaries = max_binaries.min(63);
        self
    }
}

impl Default for EnumerativeSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver for EnumerativeSolver {
    fn solve(
        &self,
        model: &LinearModel,
        config: &SolverConfig,
    ) -> Result<LinearSolution, SolverError> {
        let started = Instant::now();
        if model.validate().is_err() {
            return Ok(LinearSolution::empty(SolverStatus::ModelInvalid));
        }

        let binaries: Vec<usize> = model
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_binary())
            .map(|(i, _)| i)
            .collect();
        if binaries.len() > self.max_binaries {
            return Err(SolverError::Unsupported(format!(
                "{} binary variables exceed the enumeration limit of {}",
                binaries.len(),
                self.max_binaries
            )));
        }

        let system = DifferenceSystem::compile(model)?;
        let limit = config.time_limit();

        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut complete = true;
        let mut explored = 0_u64;

        for mask in 0..(1_u64 << binaries.len()) {
            if started.elapsed() >= limit {
                complete = false;
                break;
            }
            explored += 1;

            let mut values = vec![0.0; model.variable_count()];
            for (bit, &var) in binaries.iter().enumerate() {
                if (mask >> bit) & 1 == 1 {
                    values[var] = 1.0;
                }
            }
            if !system.assign_continuous(&mut values) {
                continue;
            }

            let objective = model.objective_value(&values);
            if best.as_ref().map_or(true, |(b, _)| objective < b - EPS) {
                best = Some((objective, values));
            }
        }

        let status = match (complete, best.is_some()) {
            (true, true) => SolverStatus::Optimal,
            (true, false) => SolverStatus::Infeasible,
            (false, true) => SolverStatus::Feasible,
            (false, false) => SolverStatus::Timeout,
        };
        let solve_time_ms = started.elapsed().as_millis() as u64;

        debug!(
            event = "enumeration_finished",
            binaries = binaries.len(),
            explored,
            status = ?status,
            solve_time_ms,
        );
        if config.verbosity == Verbosity::Normal {
            info!(
                event = "enumeration_finished",
                binaries = binaries.len(),
                explored,
                status = ?status,
                objective = best.as_ref().map(|(b, _)| *b),
            );
        }

        let mut solution = LinearSolution::empty(status);
        solution.solve_time_ms = solve_time_ms;
        if let Some((objective, values)) = best {
            solution.objective_value = Some(objective);
            solution.values = model
                .variables()
                .iter()
                .zip(values)
                .map(|(var, value)| (var.name.clone(), value))
                .collect();
        }
        Ok(solution)
    }
}

/// Continuous part of a normalized `≥` row.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// No continuous terms.
    Constant,
    /// `coef · u ≥ r`
    Single { node: usize, coef: f64 },
    /// `coef · (plus − minus) ≥ r`, `coef > 0`
    Pair { plus: usize, minus: usize, coef: f64 },
}

/// A row normalized to `≥`, with its binary part kept separately.
#[derive(Debug, Clone)]
struct Row {
    binary: Vec<(usize, f64)>,
    shape: Shape,
    rhs: f64,
}

/// Longest-path edge: `dist[to] ≥ dist[from] + weight`.
type Edge = (usize, usize, f64);

/// Difference-constraint view of a model. Node 0 is the zero source,
/// continuous variables are nodes 1..
#[derive(Debug)]
struct DifferenceSystem {
    rows: Vec<Row>,
    bounds: Vec<Edge>,
    node_var: Vec<usize>,
}

impl DifferenceSystem {
    fn compile(model: &LinearModel) -> Result<Self, SolverError> {
        let vars = model.variables();
        let mut node_of = vec![None; vars.len()];
        let mut node_var = vec![usize::MAX];
        let mut bounds = Vec::new();

        for (i, var) in vars.iter().enumerate() {
            if var.is_binary() {
                continue;
            }
            let node = node_var.len();
            node_of[i] = Some(node);
            node_var.push(i);
            bounds.push((0, node, var.lower));
            if let Some(upper) = var.upper {
                bounds.push((node, 0, -upper));
            }
        }

        if let Some(&(v, _)) = model
            .objective()
            .iter()
            .find(|&&(v, c)| c < 0.0 && node_of[v.index()].is_some())
        {
            return Err(SolverError::Unsupported(format!(
                "negative objective weight on continuous variable {}",
                vars[v.index()].name
            )));
        }

        let mut rows = Vec::new();
        for constraint in model.constraints() {
            let signs: &[f64] = match constraint.sense {
                Sense::Ge => &[1.0],
                Sense::Le => &[-1.0],
                Sense::Eq => &[1.0, -1.0],
            };
            for &sign in signs {
                let mut binary = Vec::new();
                let mut continuous: BTreeMap<usize, f64> = BTreeMap::new();
                for &(v, c) in &constraint.terms {
                    match node_of[v.index()] {
                        Some(node) => *continuous.entry(node).or_insert(0.0) += sign * c,
                        None => binary.push((v.index(), sign * c)),
                    }
                }
                continuous.retain(|_, c| c.abs() > EPS);

                let terms: Vec<(usize, f64)> = continuous.into_iter().collect();
                let shape = match terms.as_slice() {
                    [] => Shape::Constant,
                    [(node, coef)] => Shape::Single {
                        node: *node,
                        coef: *coef,
                    },
                    [(n1, a), (n2, b)] if (a + b).abs() <= EPS * a.abs().max(1.0) => {
                        if *a > 0.0 {
                            Shape::Pair {
                                plus: *n1,
                                minus: *n2,
                                coef: *a,
                            }
                        } else {
                            Shape::Pair {
                                plus: *n2,
                                minus: *n1,
                                coef: *b,
                            }
                        }
                    }
                    _ => {
                        return Err(SolverError::Unsupported(format!(
                            "row {} is not a difference constraint",
                            constraint.name
                        )))
                    }
                };
                rows.push(Row {
                    binary,
                    shape,
                    rhs: sign * constraint.rhs,
                });
            }
        }

        Ok(Self {
            rows,
            bounds,
            node_var,
        })
    }

    /// Fills the continuous entries of `values` with the least solution
    /// for the binaries already set. Returns `false` if infeasible.
    fn assign_continuous(&self, values: &mut [f64]) -> bool {
        let mut edges = self.bounds.clone();
        for row in &self.rows {
            let fixed: f64 = row.binary.iter().map(|&(v, c)| c * values[v]).sum();
            let r = row.rhs - fixed;
            match row.shape {
                Shape::Constant => {
                    if r > EPS {
                        return false;
                    }
                }
                Shape::Single { node, coef } if coef > 0.0 => edges.push((0, node, r / coef)),
                Shape::Single { node, coef } => edges.push((node, 0, -(r / coef))),
                Shape::Pair { plus, minus, coef } => edges.push((minus, plus, r / coef)),
            }
        }

        let Some(dist) = longest_paths(self.node_var.len(), &edges) else {
            return false;
        };
        for (node, &var) in self.node_var.iter().enumerate().skip(1) {
            values[var] = dist[node];
        }
        true
    }
}

/// Least potentials with `dist[0] = 0`; `None` on a positive cycle or
/// when the source would have to move.
fn longest_paths(nodes: usize, edges: &[Edge]) -> Option<Vec<f64>> {
    let mut dist = vec![f64::NEG_INFINITY; nodes];
    dist[0] = 0.0;

    for _ in 0..nodes {
        let mut changed = false;
        for &(from, to, weight) in edges {
            if dist[from] == f64::NEG_INFINITY {
                continue;
            }
            let candidate = dist[from] + weight;
            if candidate > dist[to] + EPS {
                if to == 0 {
                    return None;
                }
                dist[to] = candidate;
                changed = true;
            }
        }
        if !changed {
            return Some(dist);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::{LinearConstraint, Variable};
    use std::time::Duration;

    #[test]
    fn test_longest_paths() {
        // b ≥ a + 3, a ≥ 2
        let dist = longest_paths(3, &[(0, 1, 0.0), (0, 2, 0.0), (1, 2, 3.0), (0, 1, 2.0)]).unwrap();
        assert_eq!(dist, vec![0.0, 2.0, 5.0]);
    }

    #[test]
    fn test_positive_cycle() {
        // b ≥ a + 1, a ≥ b + 1
        assert!(longest_paths(3, &[(0, 1, 0.0), (1, 2, 1.0), (2, 1, 1.0)]).is_none());
    }

    #[test]
    fn test_upper_bound_violation() {
        // a ≥ 5, a ≤ 3
        assert!(longest_paths(2, &[(0, 1, 5.0), (1, 0, -3.0)]).is_none());
    }

    #[test]
    fn test_either_or() {
        // c ≥ 4 − 10x, c ≥ 2 + 10x − 10; minimize c + x
        let mut model = LinearModel::new("either");
        let x = model.add_variable(Variable::binary("x"));
        let c = model.add_variable(Variable::continuous("c"));
        model.add_constraint(LinearConstraint::new(
            "a",
            vec![(c, 1.0), (x, 10.0)],
            Sense::Ge,
            4.0,
        ));
        model.add_constraint(LinearConstraint::new(
            "b",
            vec![(c, 1.0), (x, -10.0)],
            Sense::Ge,
            -8.0,
        ));
        model.set_objective(vec![(c, 1.0), (x, 1.0)]);

        let solution = EnumerativeSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.value("x"), Some(1.0));
        assert_eq!(solution.value("c"), Some(2.0));
        assert_eq!(solution.objective_value, Some(3.0));
    }

    #[test]
    fn test_equality_and_le_rows() {
        let mut model = LinearModel::new("eq");
        let x = model.add_variable(Variable::binary("x"));
        let y = model.add_variable(Variable::binary("y"));
        let c = model.add_variable(Variable::continuous("c"));
        model.add_constraint(LinearConstraint::new(
            "one",
            vec![(x, 1.0), (y, 1.0)],
            Sense::Eq,
            1.0,
        ));
        model.add_constraint(LinearConstraint::new(
            "cap",
            vec![(c, 1.0), (y, 5.0)],
            Sense::Le,
            4.0,
        ));
        model.add_constraint(LinearConstraint::new(
            "floor",
            vec![(c, 1.0), (x, -3.0)],
            Sense::Ge,
            0.0,
        ));
        model.set_objective(vec![(c, 1.0)]);

        let solution = EnumerativeSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        // y = 1 forces c ≤ −1
        assert_eq!(solution.value("x"), Some(1.0));
        assert_eq!(solution.value("c"), Some(3.0));
    }

    #[test]
    fn test_infeasible() {
        let mut model = LinearModel::new("inf");
        let c = model.add_variable(Variable::continuous("c"));
        model.add_constraint(LinearConstraint::new("lo", vec![(c, 1.0)], Sense::Ge, 5.0));
        model.add_constraint(LinearConstraint::new("hi", vec![(c, 1.0)], Sense::Le, 3.0));

        let solution = EnumerativeSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolverStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_timeout_without_incumbent() {
        let mut model = LinearModel::new("t");
        model.add_variable(Variable::binary("x"));
        let config = SolverConfig::default().with_time_limit(Duration::ZERO);

        let solution = EnumerativeSolver::new().solve(&model, &config).unwrap();
        assert_eq!(solution.status, SolverStatus::Timeout);
    }

    #[test]
    fn test_binary_cap() {
        let mut model = LinearModel::new("big");
        for i in 0..4 {
            model.add_variable(Variable::binary(format!("x{i}")));
        }
        let result = EnumerativeSolver::new()
            .with_max_binaries(3)
            .solve(&model, &SolverConfig::default());
        assert!(matches!(result, Err(SolverError::Unsupported(_))));
    }

    #[test]
    fn test_rejects_general_rows() {
        let mut model = LinearModel::new("general");
        let a = model.add_variable(Variable::continuous("a"));
        let b = model.add_variable(Variable::continuous("b"));
        model.add_constraint(LinearConstraint::new(
            "r",
            vec![(a, 1.0), (b, 2.0)],
            Sense::Ge,
            1.0,
        ));
        let result = EnumerativeSolver::new().solve(&model, &SolverConfig::default());
        assert!(matches!(result, Err(SolverError::Unsupported(_))));
    }

    #[test]
    fn test_invalid_model() {
        let mut model = LinearModel::new("bad");
        model.add_variable(Variable::binary("x"));
        model.add_variable(Variable::binary("x"));
        let solution = EnumerativeSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolverStatus::ModelInvalid);
    }
}
