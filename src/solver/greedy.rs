//! Greedy reference solver for interval models.
//!
//! Places mandatory intervals one by one in model order, each as early
//! as its placed predecessors and its resources allow. Resources are
//! append-only: an interval on a no-overlap set starts after the last
//! interval placed there plus the transition time, and on a cumulative
//! set it takes the earliest free capacity lanes. For an alternative,
//! the admissible candidate finishing first wins.
//!
//! This is a list-scheduling heuristic, not a search: a completed
//! placement is reported as `Feasible`. When no remaining interval can
//! be placed (for instance on a precedence cycle) the solver cannot tell
//! an infeasible model from its own limits, so it returns
//! [`SolverError::Unsupported`] instead of a status.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use super::{CpSolution, CpSolver, IntervalSolution, SolverStatus};
use crate::config::SolverConfig;
use crate::cp::{Constraint, CpModel, IntervalVar};
use crate::error::SolverError;
use crate::models::SetupMatrix;

/// Greedy list-scheduling consumer of interval models.
#[derive(Debug, Clone, Default)]
pub struct SimpleCpSolver;

impl SimpleCpSolver {
    /// Creates the solver.
    pub fn new() -> Self {
        Self
    }
}

/// Resource state of one no-overlap or cumulative constraint.
enum Resource<'m> {
    Disjunctive {
        positions: HashMap<&'m str, usize>,
        transitions: Option<&'m SetupMatrix>,
        last: Option<(usize, i64)>,
    },
    Cumulative {
        demands: HashMap<&'m str, i64>,
        lanes: Vec<i64>,
    },
}

impl Resource<'_> {
    /// Earliest start for `name` on this resource.
    fn ready(&self, name: &str) -> i64 {
        match self {
            Self::Disjunctive {
                positions,
                transitions,
                last,
            } => match (last, positions.get(name)) {
                (Some((prev, end)), Some(&pos)) => {
                    end + transitions.map_or(0, |t| t.get(*prev, pos))
                }
                _ => 0,
            },
            Self::Cumulative { demands, lanes } => {
                let demand = demands.get(name).copied().unwrap_or(0).max(0) as usize;
                if demand == 0 {
                    return 0;
                }
                let mut free = lanes.clone();
                free.sort_unstable();
                free.get(demand - 1).copied().unwrap_or(i64::MAX)
            }
        }
    }

    /// Records `name` as placed on `[start, end)`.
    fn commit(&mut self, name: &str, end: i64) {
        match self {
            Self::Disjunctive {
                positions, last, ..
            } => {
                if let Some(&pos) = positions.get(name) {
                    *last = Some((pos, end));
                }
            }
            Self::Cumulative { demands, lanes } => {
                let demand = demands.get(name).copied().unwrap_or(0).max(0) as usize;
                let mut order: Vec<usize> = (0..lanes.len()).collect();
                order.sort_by_key(|&i| lanes[i]);
                for &i in order.iter().take(demand) {
                    lanes[i] = end;
                }
            }
        }
    }
}

/// Working state of one greedy run.
struct Placement<'m> {
    model: &'m CpModel,
    resources: Vec<Resource<'m>>,
    membership: HashMap<&'m str, Vec<usize>>,
    predecessors: HashMap<&'m str, Vec<(&'m str, i64)>>,
    alternatives: HashMap<&'m str, &'m [String]>,
    links: HashMap<&'m str, Vec<&'m str>>,
    presence: HashMap<&'m str, bool>,
    placed: HashMap<String, IntervalSolution>,
}

impl<'m> Placement<'m> {
    fn new(model: &'m CpModel) -> Self {
        let mut state = Self {
            model,
            resources: Vec::new(),
            membership: HashMap::new(),
            predecessors: HashMap::new(),
            alternatives: HashMap::new(),
            links: HashMap::new(),
            presence: HashMap::new(),
            placed: HashMap::new(),
        };

        for constraint in model.constraints() {
            match constraint {
                Constraint::NoOverlap {
                    intervals,
                    transitions,
                } => {
                    let positions = intervals
                        .iter()
                        .enumerate()
                        .map(|(i, n)| (n.as_str(), i))
                        .collect();
                    state.add_resource(
                        intervals,
                        Resource::Disjunctive {
                            positions,
                            transitions: transitions.as_ref(),
                            last: None,
                        },
                    );
                }
                Constraint::Cumulative {
                    intervals,
                    demands,
                    capacity,
                } => {
                    let demands = intervals
                        .iter()
                        .map(String::as_str)
                        .zip(demands.iter().copied())
                        .collect();
                    let lanes = vec![0; (*capacity).max(0) as usize];
                    state.add_resource(intervals, Resource::Cumulative { demands, lanes });
                }
                Constraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    state
                        .predecessors
                        .entry(after.as_str())
                        .or_default()
                        .push((before.as_str(), *min_delay));
                }
                Constraint::Alternative { main, alternatives } => {
                    state
                        .alternatives
                        .insert(main.as_str(), alternatives.as_slice());
                }
                Constraint::SamePresence {
                    interval1,
                    interval2,
                } => {
                    state
                        .links
                        .entry(interval1.as_str())
                        .or_default()
                        .push(interval2.as_str());
                    state
                        .links
                        .entry(interval2.as_str())
                        .or_default()
                        .push(interval1.as_str());
                }
                // satisfied by placing in a consistent order
                Constraint::SameSequence { .. } => {}
            }
        }
        state
    }

    fn add_resource(&mut self, intervals: &'m [String], resource: Resource<'m>) {
        let id = self.resources.len();
        self.resources.push(resource);
        for name in intervals {
            self.membership.entry(name.as_str()).or_default().push(id);
        }
    }

    /// Earliest start allowed by predecessors; `None` if one is pending.
    fn release(&self, var: &IntervalVar) -> Option<i64> {
        let mut start = var.start.min;
        for &(before, delay) in self.predecessors.get(var.name.as_str()).into_iter().flatten() {
            match self.placed.get(before) {
                Some(s) if s.is_present => start = start.max(s.end + delay),
                Some(_) => {}
                None if self.presence.get(before) == Some(&false) => {}
                None => return None,
            }
        }
        Some(start)
    }

    fn resource_ready(&self, name: &str) -> i64 {
        self.membership
            .get(name)
            .into_iter()
            .flatten()
            .map(|&r| self.resources[r].ready(name))
            .max()
            .unwrap_or(0)
    }

    fn commit(&mut self, name: &'m str, start: i64, end: i64) {
        if let Some(ids) = self.membership.get(name) {
            for &r in ids {
                self.resources[r].commit(name, end);
            }
        }
        self.placed
            .insert(name.to_string(), IntervalSolution::present(start, end));
        self.set_presence(name, true);
    }

    fn set_presence(&mut self, name: &'m str, present: bool) {
        self.presence.insert(name, present);
        if let Some(linked) = self.links.get(name).cloned() {
            for other in linked {
                if !self.presence.contains_key(other) {
                    self.set_presence(other, present);
                }
            }
        }
    }

    /// Places `var`; returns `Ok(false)` if a predecessor is still pending.
    fn place(&mut self, var: &'m IntervalVar) -> Result<bool, SolverError> {
        let Some(release) = self.release(var) else {
            return Ok(false);
        };

        let Some(&candidates) = self.alternatives.get(var.name.as_str()) else {
            let start = release.max(self.resource_ready(&var.name));
            self.commit(&var.name, start, start + var.size.min);
            return Ok(true);
        };

        let admissible: Vec<&'m IntervalVar> = candidates
            .iter()
            .filter(|n| self.presence.get(n.as_str()) != Some(&false))
            .filter_map(|n| self.model.interval(n))
            .collect();
        let forced: Vec<&'m IntervalVar> = admissible
            .iter()
            .copied()
            .filter(|c| self.presence.get(c.name.as_str()) == Some(&true))
            .collect();
        let pool = if forced.is_empty() { admissible } else { forced };

        let best = pool
            .into_iter()
            .map(|c| {
                let start = release.max(c.start.min).max(self.resource_ready(&c.name));
                (start + c.size.min, start, c)
            })
            .min_by_key(|&(end, _, _)| end);
        let Some((end, start, chosen)) = best else {
            return Err(SolverError::Unsupported(format!(
                "no admissible candidate for alternative {}",
                var.name
            )));
        };

        for name in candidates {
            if name != &chosen.name && !self.presence.contains_key(name.as_str()) {
                self.set_presence(name.as_str(), false);
            }
        }
        self.commit(&chosen.name, start, end);
        self.commit(&var.name, start, end);
        Ok(true)
    }
}

impl CpSolver for SimpleCpSolver {
    fn solve(&self, model: &CpModel, _config: &SolverConfig) -> Result<CpSolution, SolverError> {
        let started = Instant::now();
        if model.validate().is_err() {
            return Ok(CpSolution::empty(SolverStatus::ModelInvalid));
        }

        let mut state = Placement::new(model);
        let mut remaining: Vec<&IntervalVar> =
            model.intervals().iter().filter(|v| !v.is_optional).collect();

        while !remaining.is_empty() {
            let before = remaining.len();
            let mut blocked = Vec::new();
            for var in remaining {
                if !state.place(var)? {
                    blocked.push(var);
                }
            }
            if blocked.len() == before {
                debug!(event = "greedy_cp_stuck", blocked = blocked.len());
                return Err(SolverError::Unsupported(format!(
                    "greedy placement is blocked on {} intervals",
                    blocked.len()
                )));
            }
            remaining = blocked;
        }

        let mut intervals = state.placed;
        for var in model.intervals() {
            intervals
                .entry(var.name.clone())
                .or_insert_with(IntervalSolution::absent);
        }

        let mut solution = CpSolution::empty(SolverStatus::Feasible);
        solution.intervals = intervals;
        solution.objective_value = model.objective_value(&solution).map(|v| v as f64);
        solution.solve_time_ms = started.elapsed().as_millis() as u64;

        debug!(
            event = "greedy_cp_finished",
            intervals = model.interval_count(),
            objective = solution.objective_value,
            solve_time_ms = solution.solve_time_ms,
        );
        Ok(solution)
    }
}
