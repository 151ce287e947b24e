//! Interval encoding of scheduling instances.
//!
//! Every operation becomes an interval. Operations with a choice of
//! machine get one optional child interval per eligible machine tied
//! to the operation by an `Alternative`. Each machine gets a single
//! `NoOverlap` over the intervals that may use it, so the number of
//! disjunctive constraints grows with the number of machines rather
//! than with the number of job pairs.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::model::{CpModel, Objective};
use super::variables::IntervalVar;
use crate::config::SolverConfig;
use crate::error::ScheduleError;
use crate::extract::{self, Solved};
use crate::models::{
    AssignmentScope, Instance, ProblemKind, Schedule, ScheduledOperation, SetupMatrix,
};
use crate::solver::{CpSolution, CpSolver};

/// How machine choice is encoded for hybrid flow shops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridEncoding {
    /// One optional interval per stage machine, `NoOverlap` per machine.
    #[default]
    Alternative,
    /// One interval per stage, `Cumulative` with capacity = machines at
    /// the stage. Machines are assigned when decoding.
    Cumulative,
}

/// Interval name of operation `op` of `job`.
pub fn operation_name(job: usize, op: usize) -> String {
    format!("op_{job}_{op}")
}

/// Interval name of operation `op` of `job` on `machine`.
pub fn option_name(job: usize, op: usize, machine: usize) -> String {
    format!("op_{job}_{op}_m{machine}")
}

/// Builds an interval model from a scheduling instance.
///
/// # Example
/// ```
/// use u_formulate::config::SolverConfig;
/// use u_formulate::cp::ScheduleCpBuilder;
/// use u_formulate::models::Instance;
/// use u_formulate::solver::SimpleCpSolver;
///
/// let instance = Instance::flexible_job_shop(2, vec![
///     vec![vec![3, 5], vec![0, 4]],
///     vec![vec![2, 2]],
/// ]).unwrap();
/// let builder = ScheduleCpBuilder::new(&instance);
/// let model = builder.build().unwrap();
/// assert_eq!(model.no_overlap_count(), 2);
///
/// let solved = builder.solve(&SimpleCpSolver::new(), &SolverConfig::default()).unwrap();
/// assert!(solved.schedule.unwrap().is_feasible(&instance));
/// ```
pub struct ScheduleCpBuilder<'a> {
    instance: &'a Instance,
    hybrid: HybridEncoding,
}

impl<'a> ScheduleCpBuilder<'a> {
    /// Creates a builder.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            hybrid: HybridEncoding::default(),
        }
    }

    /// Chooses the hybrid flow shop encoding.
    pub fn with_hybrid_encoding(mut self, encoding: HybridEncoding) -> Self {
        self.hybrid = encoding;
        self
    }

    fn uses_cumulative(&self) -> bool {
        self.hybrid == HybridEncoding::Cumulative
            && self.instance.kind() == ProblemKind::HybridFlowShop
    }

    /// Whether operation `(job, op)` is encoded with per-machine children.
    fn has_children(&self, job: usize, op: usize) -> bool {
        !self.uses_cumulative()
            && self
                .instance
                .operation(job, op)
                .is_some_and(|o| o.options.len() > 1)
    }

    /// Builds the interval model.
    ///
    /// Creates:
    /// - an interval per operation, plus optional children and an
    ///   `Alternative` where the machine is a decision
    /// - `Precedence` along every route
    /// - `SamePresence` between consecutive stages of a job for
    ///   per-job (factory) assignment
    /// - `NoOverlap` per machine, with transition times for setup
    ///   variants, or `Cumulative` per stage
    /// - `SameSequence` between consecutive stages for setup variants
    /// - `MinimizeMaxEnd` over the last operation of every job
    pub fn build(&self) -> Result<CpModel, ScheduleError> {
        let instance = self.instance;
        let caps = instance.capabilities();
        let horizon = instance.horizon();
        let mut model = CpModel::new(format!("{}_cp", instance.kind().name()), horizon);

        // machine -> (job, interval) in insertion order
        let mut machine_intervals: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
        let mut last_ops = Vec::with_capacity(instance.job_count());

        for (j, job) in instance.jobs().iter().enumerate() {
            for (k, op) in job.operations.iter().enumerate() {
                let name = operation_name(j, k);

                if self.has_children(j, k) {
                    let min = op.options.iter().map(|o| o.duration).min().unwrap_or(0);
                    let max = op.max_duration();
                    model.add_interval(
                        IntervalVar::within(name.clone(), min, horizon).with_size_range(min, max),
                    );
                    let mut children = Vec::with_capacity(op.options.len());
                    for option in &op.options {
                        let child = option_name(j, k, option.machine);
                        model.add_interval(
                            IntervalVar::within(child.clone(), option.duration, horizon)
                                .as_optional(),
                        );
                        machine_intervals
                            .entry(option.machine)
                            .or_default()
                            .push((j, child.clone()));
                        children.push(child);
                    }
                    model.add_alternative(name.clone(), children);
                } else {
                    model.add_interval(IntervalVar::within(name.clone(), op.max_duration(), horizon));
                    if !self.uses_cumulative() {
                        if let Some(option) = op.options.first() {
                            machine_intervals
                                .entry(option.machine)
                                .or_default()
                                .push((j, name.clone()));
                        }
                    }
                }

                if k > 0 {
                    model.add_precedence(operation_name(j, k - 1), name.clone(), 0);
                    if caps.assignment == AssignmentScope::PerJob {
                        self.link_factories(&mut model, j, k);
                    }
                }
            }
            if let Some(last) = job.operations.len().checked_sub(1) {
                last_ops.push(operation_name(j, last));
            }
        }

        if self.uses_cumulative() {
            for stage in 0..instance.stage_count() {
                let capacity = instance
                    .machines()
                    .iter()
                    .filter(|m| m.stage == stage)
                    .count() as i64;
                let intervals: Vec<String> = (0..instance.job_count())
                    .filter(|&j| instance.operation(j, stage).is_some())
                    .map(|j| operation_name(j, stage))
                    .collect();
                let demands = vec![1; intervals.len()];
                model.add_cumulative(intervals, demands, capacity);
            }
        }

        for (&machine, entries) in &machine_intervals {
            let names: Vec<String> = entries.iter().map(|(_, n)| n.clone()).collect();
            if caps.sequence_dependent_setup {
                let transitions = SetupMatrix::new(
                    entries
                        .iter()
                        .map(|&(a, _)| {
                            entries
                                .iter()
                                .map(|&(b, _)| instance.setup_time(machine, a, b))
                                .collect()
                        })
                        .collect(),
                );
                model.add_no_overlap_with_transitions(names, transitions);
            } else if names.len() > 1 {
                model.add_no_overlap(names);
            }
        }

        if caps.sequence_dependent_setup {
            let stage_lists: Vec<Vec<String>> = machine_intervals
                .values()
                .map(|entries| entries.iter().map(|(_, n)| n.clone()).collect())
                .collect();
            for pair in stage_lists.windows(2) {
                model.add_same_sequence(pair[0].clone(), pair[1].clone());
            }
        }

        model.set_objective(Objective::MinimizeMaxEnd {
            intervals: last_ops,
        });
        model.validate()?;

        info!(
            event = "cp_model_built",
            kind = instance.kind().name(),
            intervals = model.interval_count(),
            constraints = model.constraint_count(),
            no_overlaps = model.no_overlap_count(),
            horizon,
        );
        Ok(model)
    }

    /// Ties the factory choice of `(job, op)` to that of `(job, op - 1)`.
    fn link_factories(&self, model: &mut CpModel, job: usize, op: usize) {
        let (Some(prev), Some(cur)) = (
            self.instance.operation(job, op - 1),
            self.instance.operation(job, op),
        ) else {
            return;
        };
        if !self.has_children(job, op) || !self.has_children(job, op - 1) {
            return;
        }
        let group_of = |m: usize| self.instance.machines().get(m).and_then(|m| m.group);
        for option in &cur.options {
            let Some(group) = group_of(option.machine) else {
                continue;
            };
            if let Some(before) = prev
                .options
                .iter()
                .find(|o| group_of(o.machine) == Some(group))
            {
                model.add_same_presence(
                    option_name(job, op - 1, before.machine),
                    option_name(job, op, option.machine),
                );
            }
        }
    }

    /// Builds the model, hands it to `solver` and reads the answer back.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Formulation`] if the model fails validation or
    /// the solver reports it as invalid. Solver failures become
    /// [`Outcome::SolverUnavailable`](crate::extract::Outcome).
    pub fn solve<S: CpSolver + ?Sized>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> Result<Solved, ScheduleError> {
        let model = self.build()?;
        let solution = match solver.solve(&model, config) {
            Ok(solution) => solution,
            Err(err) => return Ok(Solved::unavailable(err)),
        };
        let outcome = extract::cp_outcome(&model, &solution)?;
        let schedule = self.decode_schedule(&solution);
        Ok(Solved { outcome, schedule })
    }

    /// Decodes a CP solution into a [`Schedule`].
    ///
    /// Returns `None` when the solution holds no feasible placement or
    /// misses an operation.
    pub fn decode_schedule(&self, solution: &CpSolution) -> Option<Schedule> {
        if !solution.is_solution_found() {
            return None;
        }
        let instance = self.instance;
        let mut schedule = Schedule::new();
        // (stage, job, op) of operations whose machine is still open
        let mut pooled = Vec::new();

        for (j, job) in instance.jobs().iter().enumerate() {
            for (k, op) in job.operations.iter().enumerate() {
                let placed = solution
                    .intervals
                    .get(&operation_name(j, k))
                    .filter(|s| s.is_present)?;

                let machine = if self.has_children(j, k) {
                    op.options
                        .iter()
                        .map(|o| o.machine)
                        .find(|&m| {
                            solution
                                .intervals
                                .get(&option_name(j, k, m))
                                .is_some_and(|s| s.is_present)
                        })?
                } else if self.uses_cumulative() && op.options.len() > 1 {
                    pooled.push((k, j, placed.start));
                    usize::MAX
                } else {
                    op.options.first()?.machine
                };

                schedule.add(ScheduledOperation::new(
                    j,
                    k,
                    machine,
                    placed.start as f64,
                    placed.end as f64,
                ));
            }
        }

        if !pooled.is_empty() {
            self.assign_pooled(&mut schedule, pooled);
        }
        Some(schedule)
    }

    /// Assigns machines to cumulative-encoded operations: by start time,
    /// each takes the first stage machine already free.
    fn assign_pooled(&self, schedule: &mut Schedule, mut pooled: Vec<(usize, usize, i64)>) {
        pooled.sort_by_key(|&(stage, job, start)| (stage, start, job));
        let mut free_at: HashMap<usize, f64> = HashMap::new();

        for (stage, job, _) in pooled {
            let Some(entry) = schedule
                .operations
                .iter_mut()
                .find(|o| o.job == job && o.operation == stage)
            else {
                continue;
            };
            let Some(op) = self.instance.operation(job, stage) else {
                continue;
            };
            let candidates = op.options.iter().map(|o| o.machine);
            let chosen = candidates
                .clone()
                .find(|m| free_at.get(m).map_or(true, |&t| t <= entry.start))
                .or_else(|| {
                    candidates.min_by(|a, b| {
                        let ta = free_at.get(a).copied().unwrap_or(0.0);
                        let tb = free_at.get(b).copied().unwrap_or(0.0);
                        ta.total_cmp(&tb)
                    })
                });
            if let Some(machine) = chosen {
                entry.machine = machine;
                free_at.insert(machine, entry.end);
            }
        }
    }
}
