//! Mixed-integer formulation of scheduling instances.
//!
//! A [`VariableCatalog`] enumerates the decision variables an instance
//! needs; the constraint [`families`] turn the instance and catalog into
//! rows; [`ScheduleMipBuilder`] assembles both into a [`LinearModel`]
//! minimizing the makespan variable `Cmax`.
//!
//! Which variables and rows appear is decided by the instance's
//! [`Capabilities`](crate::models::Capabilities), so all seven problem
//! kinds share one assembler.
//!
//! # Reference
//! - Manne (1960), "On the job-shop scheduling problem"
//! - Pan (1997), "A study of integer programming formulations for
//!   scheduling problems"

pub mod catalog;
pub mod families;
mod model;

pub use catalog::{OrderPair, Predecessor, VarKey, VariableCatalog};
pub use model::{
    LinearConstraint, LinearModel, ModelViolation, Sense, VarId, VarKind, Variable,
};

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::SolverConfig;
use crate::error::ScheduleError;
use crate::extract::{self, Solved};
use crate::models::{AssignmentScope, Instance, MakespanLink, Schedule, ScheduledOperation};
use crate::solver::{LinearSolution, LinearSolver};

/// Threshold above which a binary value counts as 1.
const BINARY_THRESHOLD: f64 = 0.5;

/// Builds the linear model of a scheduling instance.
///
/// # Examples
///
/// ```
/// use u_formulate::mip::ScheduleMipBuilder;
/// use u_formulate::models::Instance;
///
/// let instance = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
/// let formulation = ScheduleMipBuilder::new(&instance).build().unwrap();
///
/// // two order variables, four completions, Cmax
/// assert_eq!(formulation.model.binary_count(), 2);
/// assert_eq!(formulation.model.variable_count(), 7);
/// assert_eq!(formulation.big_m, 15.0);
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleMipBuilder<'a> {
    instance: &'a Instance,
    big_m: Option<f64>,
}

impl<'a> ScheduleMipBuilder<'a> {
    /// Creates a builder using the instance-derived big-M.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            big_m: None,
        }
    }

    /// Overrides the big-M constant.
    ///
    /// Values below [`Instance::big_m`] are accepted but may cut off
    /// feasible schedules.
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        let derived = self.instance.big_m() as f64;
        if big_m < derived {
            warn!(
                event = "big_m_below_bound",
                big_m,
                derived,
                "big-M override is smaller than the instance bound"
            );
        }
        self.big_m = Some(big_m);
        self
    }

    /// Assembles the model.
    pub fn build(&self) -> Result<MipFormulation<'a>, ScheduleError> {
        let instance = self.instance;
        let big_m = self.big_m.unwrap_or(instance.big_m() as f64);
        let catalog = VariableCatalog::for_instance(instance);

        let mut model = LinearModel::new(format!("{}_mip", instance.kind().name()));
        for var in catalog.variables() {
            model.add_variable(var);
        }
        model.add_constraints(families::assignment(instance, &catalog, big_m));
        model.add_constraints(families::routing(instance, &catalog, big_m));
        model.add_constraints(families::disjunction(instance, &catalog, big_m));
        model.add_constraints(families::sequencing(instance, &catalog, big_m));
        model.add_constraints(families::makespan(instance, &catalog, big_m));
        model.set_objective(vec![(catalog.makespan(), 1.0)]);
        model.validate()?;

        info!(
            event = "mip_model_built",
            kind = instance.kind().name(),
            variables = model.variable_count(),
            binaries = model.binary_count(),
            constraints = model.constraint_count(),
            big_m,
        );

        Ok(MipFormulation {
            model,
            catalog,
            big_m,
            instance,
        })
    }
}

/// An assembled linear model together with its variable catalog.
#[derive(Debug, Clone)]
pub struct MipFormulation<'a> {
    /// The linear model.
    pub model: LinearModel,
    /// Variable enumeration used by the model.
    pub catalog: VariableCatalog,
    /// Big-M constant used in the relaxed rows.
    pub big_m: f64,
    instance: &'a Instance,
}

impl MipFormulation<'_> {
    /// Solves the model and decodes the schedule.
    ///
    /// A solver that cannot be used yields
    /// [`Outcome::SolverUnavailable`](crate::extract::Outcome) rather than
    /// an error.
    pub fn solve<S: LinearSolver + ?Sized>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> Result<Solved, ScheduleError> {
        let solution = match solver.solve(&self.model, config) {
            Ok(solution) => solution,
            Err(err) => return Ok(Solved::unavailable(err)),
        };
        let makespan = VarKey::Makespan.to_string();
        let outcome = extract::outcome(&solution, &makespan)?;
        let schedule = self.decode_schedule(&solution);
        Ok(Solved { outcome, schedule })
    }

    /// Reconstructs the schedule encoded by `solution`.
    ///
    /// Returns `None` when the solution carries no schedule or misses a
    /// value the decoding needs.
    pub fn decode_schedule(&self, solution: &LinearSolution) -> Option<Schedule> {
        if !solution.is_solution_found() {
            return None;
        }
        let caps = self.instance.capabilities();
        let mut schedule = Schedule::new();

        if caps.makespan == MakespanLink::MachineLoad {
            let mut free_at: BTreeMap<usize, f64> = BTreeMap::new();
            for (j, job) in self.instance.jobs().iter().enumerate() {
                for (k, _) in job.operations.iter().enumerate() {
                    let (machine, duration) = self.chosen_option(solution, j, k)?;
                    let start = free_at.get(&machine).copied().unwrap_or(0.0);
                    let end = start + duration;
                    free_at.insert(machine, end);
                    schedule.add(ScheduledOperation::new(j, k, machine, start, end));
                }
            }
            return Some(schedule);
        }

        for (j, job) in self.instance.jobs().iter().enumerate() {
            for k in 0..job.operations.len() {
                let (machine, duration) = self.chosen_option(solution, j, k)?;
                let end = self.value(solution, self.catalog.completion(j, k)?)?;
                schedule.add(ScheduledOperation::new(j, k, machine, end - duration, end));
            }
        }
        Some(schedule)
    }

    fn value(&self, solution: &LinearSolution, id: VarId) -> Option<f64> {
        self.model
            .variable(id)
            .and_then(|var| solution.value(&var.name))
    }

    fn is_set(&self, solution: &LinearSolution, id: Option<VarId>) -> bool {
        id.and_then(|id| self.value(solution, id))
            .is_some_and(|v| v > BINARY_THRESHOLD)
    }

    /// Machine and processing time selected for operation `(job, op)`.
    fn chosen_option(&self, solution: &LinearSolution, job: usize, op: usize) -> Option<(usize, f64)> {
        let operation = self.instance.operation(job, op)?;
        let option = match self.instance.capabilities().assignment {
            AssignmentScope::PerOperation => operation.options.iter().find(|o| {
                self.is_set(solution, self.catalog.operation_assign(job, op, o.machine))
            })?,
            AssignmentScope::PerJob => {
                let group = (0..self.instance.group_count())
                    .find(|&f| self.is_set(solution, self.catalog.job_assign(job, f)))?;
                operation.options.iter().find(|o| {
                    self.instance
                        .machines()
                        .get(o.machine)
                        .is_some_and(|m| m.group == Some(group))
                })?
            }
            AssignmentScope::None => operation.options.first()?,
        };
        Some((option.machine, option.duration as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Outcome;
    use crate::models::ProblemKind;
    use crate::solver::{
        EnumerativeSolver, GoodLpSolver, LinearSolver, SolverStatus, UnavailableSolver,
    };
    use proptest::prelude::*;
    use std::collections::HashMap;

    const TOL: f64 = 1e-6;

    fn two_by_two() -> Instance {
        Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap()
    }

    /// Values of a fixed permutation schedule of the 2×2 flow shop.
    fn sequence_values(a_first: bool) -> HashMap<String, f64> {
        let (c, x) = if a_first {
            ([("c_0_0", 3.0), ("c_0_1", 5.0), ("c_1_0", 5.0), ("c_1_1", 9.0)], 1.0)
        } else {
            ([("c_0_0", 5.0), ("c_0_1", 8.0), ("c_1_0", 2.0), ("c_1_1", 6.0)], 0.0)
        };
        let mut values: HashMap<String, f64> =
            c.iter().map(|&(n, v)| (n.to_string(), v)).collect();
        values.insert("x_0_0_1_0".into(), x);
        values.insert("x_0_1_1_1".into(), x);
        values.insert("Cmax".into(), if a_first { 9.0 } else { 8.0 });
        values
    }

    fn solve(instance: &Instance) -> Solved {
        ScheduleMipBuilder::new(instance)
            .build()
            .unwrap()
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap()
    }

    fn assert_optimal(outcome: &Outcome, expected: f64) {
        match outcome {
            Outcome::Optimal { makespan } => {
                assert!((makespan - expected).abs() < TOL, "makespan {makespan}, expected {expected}")
            }
            other => panic!("expected an optimal outcome, got {other:?}"),
        }
    }

    /// Dense values of an optimal solver answer.
    fn solver_values(formulation: &MipFormulation<'_>) -> Vec<f64> {
        let solution = GoodLpSolver::new()
            .solve(&formulation.model, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        formulation.model.dense_values(&solution.values)
    }

    /// Shortest permutation schedule of a flow shop.
    fn best_permutation(processing: &[Vec<i64>]) -> i64 {
        fn visit(order: &mut [usize], k: usize, processing: &[Vec<i64>], best: &mut i64) {
            if k == order.len() {
                let mut done = vec![0_i64; processing[0].len()];
                for &j in order.iter() {
                    let mut ready = 0;
                    for (i, slot) in done.iter_mut().enumerate() {
                        *slot = (*slot).max(ready) + processing[j][i];
                        ready = *slot;
                    }
                }
                *best = (*best).min(done.last().copied().unwrap_or(0));
                return;
            }
            for i in k..order.len() {
                order.swap(k, i);
                visit(order, k + 1, processing, best);
                order.swap(k, i);
            }
        }
        let mut order: Vec<usize> = (0..processing.len()).collect();
        let mut best = i64::MAX;
        visit(&mut order, 0, processing, &mut best);
        best
    }

    #[test]
    fn test_two_by_two_sequences() {
        let inst = two_by_two();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        let model = &formulation.model;

        let a_first = model.dense_values(&sequence_values(true));
        assert!(model.check(&a_first, TOL).is_empty());
        assert_eq!(model.objective_value(&a_first), 9.0);

        let b_first = model.dense_values(&sequence_values(false));
        assert!(model.check(&b_first, TOL).is_empty());
        assert_eq!(model.objective_value(&b_first), 8.0);
    }

    #[test]
    fn test_makespan_below_schedule_is_rejected() {
        let inst = two_by_two();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        let mut values = sequence_values(false);
        values.insert("Cmax".into(), 7.0);
        let violations = formulation
            .model
            .check(&formulation.model.dense_values(&values), TOL);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "cmax_0");
    }

    #[test]
    fn test_overlap_is_rejected() {
        let inst = two_by_two();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        // both jobs on machine 0 during [0, 3) and [0, 2)
        let mut values = sequence_values(true);
        values.insert("c_1_0".into(), 2.0);
        let violations = formulation
            .model
            .check(&formulation.model.dense_values(&values), TOL);
        assert!(violations.iter().any(|v| v.name.starts_with("disj_0_0_1_0")));
    }

    #[test]
    fn test_two_by_two_optimum() {
        let inst = two_by_two();
        let solved = solve(&inst);
        assert_optimal(&solved.outcome, 8.0);

        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert!((schedule.makespan() - 8.0).abs() < TOL);
        assert_eq!(schedule.sequence(0), vec![1, 0]);
    }

    #[test]
    fn test_single_job() {
        let inst = Instance::flow_shop(vec![vec![3, 2, 5]]).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        assert_eq!(formulation.model.binary_count(), 0);

        let solved = solve(&inst);
        assert_optimal(&solved.outcome, 10.0);
    }

    #[test]
    fn test_five_by_three_flow_shop() {
        let processing = vec![
            vec![2, 5, 1],
            vec![3, 4, 2],
            vec![1, 6, 3],
            vec![4, 2, 5],
            vec![2, 3, 2],
        ];
        let inst = Instance::flow_shop(processing.clone()).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        assert_eq!(formulation.model.binary_count(), 30);

        let solved = formulation
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();
        // permutation schedules are optimal up to three stages
        assert_optimal(&solved.outcome, best_permutation(&processing) as f64);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert_eq!(schedule.len(), 15);
    }

    #[test]
    fn test_order_variable_count() {
        let processing = vec![vec![1, 2, 3]; 4];
        let inst = Instance::flow_shop(processing).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        // C(4, 2) pairs on each of three machines
        assert_eq!(formulation.model.binary_count(), 18);
        assert_eq!(formulation.model.constraints_with_prefix("disj_").count(), 36);
    }

    #[test]
    fn test_row_families_present() {
        let inst = Instance::hybrid_flow_shop(vec![2, 1], vec![vec![3, 2], vec![3, 2]]).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        let model = &formulation.model;
        assert_eq!(model.constraints_with_prefix("assign_").count(), 4);
        assert_eq!(model.constraints_with_prefix("route_").count(), 4);
        assert_eq!(model.constraints_with_prefix("cmax_").count(), 2);
        for row in model.constraints_with_prefix("assign_") {
            assert_eq!(row.sense, Sense::Eq);
            assert_eq!(row.rhs, 1.0);
        }
    }

    #[test]
    fn test_gated_disjunctions_select_one_side() {
        let instances = [
            Instance::hybrid_flow_shop(vec![2, 1], vec![vec![3, 2], vec![3, 2], vec![1, 4]])
                .unwrap(),
            Instance::flexible_job_shop(
                2,
                vec![vec![vec![2, 4], vec![3, 0]], vec![vec![3, 3], vec![0, 2]]],
            )
            .unwrap(),
            Instance::distributed_flow_shop(2, vec![vec![2, 3], vec![4, 1], vec![3, 3]]).unwrap(),
        ];

        for inst in &instances {
            let formulation = ScheduleMipBuilder::new(inst).build().unwrap();
            let model = &formulation.model;
            let catalog = &formulation.catalog;
            let big_m = formulation.big_m;
            let values = solver_values(&formulation);
            let value = |id: VarId| values[id.index()];
            let kind = inst.kind().name();

            assert!(model.check(&values, TOL).is_empty(), "{kind}");
            assert!(model.constraints_with_prefix("assign_").count() > 0);
            for row in model.constraints_with_prefix("assign_") {
                assert!((row.activity(&values) - 1.0).abs() < TOL, "{kind} {}", row.name);
            }

            for pair in catalog.order_pairs() {
                let (a, b) = (pair.first, pair.second);
                let x = value(pair.var);
                let c_a = value(catalog.completion(a.0, a.1).unwrap());
                let c_b = value(catalog.completion(b.0, b.1).unwrap());
                let op_a = inst.operation(a.0, a.1).unwrap();
                let op_b = inst.operation(b.0, b.1).unwrap();

                for &m in &pair.machines {
                    let p_a = op_a.duration_on(m).unwrap() as f64;
                    let p_b = op_b.duration_on(m).unwrap() as f64;
                    let closed = catalog
                        .gates(inst, a.0, a.1, m)
                        .into_iter()
                        .chain(catalog.gates(inst, b.0, b.1, m))
                        .filter(|&g| value(g) < BINARY_THRESHOLD)
                        .count() as f64;
                    let relax_ab = big_m * (1.0 - x + closed);
                    let relax_ba = big_m * (x + closed);

                    // each row is its disjunct plus the big-M relaxation
                    let base = format!("disj_{}_{}_{}_{}_m{m}", a.0, a.1, b.0, b.1);
                    let row = |side: &str| {
                        let name = format!("{base}_{side}");
                        model
                            .constraints()
                            .iter()
                            .find(|r| r.name == name)
                            .unwrap_or_else(|| panic!("missing row {name}"))
                    };
                    let ab_gap = c_b - c_a - p_b;
                    let ba_gap = c_a - c_b - p_a;
                    assert!((row("ab").slack(&values) - (ab_gap + relax_ab)).abs() < TOL);
                    assert!((row("ba").slack(&values) - (ba_gap + relax_ba)).abs() < TOL);

                    if closed == 0.0 {
                        // both operations run on m: one side binds, the other
                        // is relaxed by exactly M and its disjunct is violated
                        let (held, other, other_relax) = if x > BINARY_THRESHOLD {
                            (ab_gap, ba_gap, relax_ba)
                        } else {
                            (ba_gap, ab_gap, relax_ab)
                        };
                        assert!(held >= -TOL, "{kind} {base}");
                        assert!(other < -TOL, "{kind} {base}");
                        assert!((other_relax - big_m).abs() < TOL);
                    } else {
                        assert!(relax_ab >= big_m - TOL && relax_ba >= big_m - TOL);
                    }
                }
            }
        }
    }

    #[test]
    fn test_big_m_override() {
        let inst = two_by_two();
        let formulation = ScheduleMipBuilder::new(&inst)
            .with_big_m(1000.0)
            .build()
            .unwrap();
        assert_eq!(formulation.big_m, 1000.0);
        let x = formulation.catalog.order_pairs()[0].var;
        let row = formulation
            .model
            .constraints()
            .iter()
            .find(|r| r.name == "disj_0_0_1_0_m0_ab")
            .unwrap();
        assert_eq!(row.coefficient(x), -1000.0);

        // a small override is accepted
        let small = ScheduleMipBuilder::new(&inst).with_big_m(1.0).build();
        assert!(small.is_ok());
    }

    #[test]
    fn test_solver_unavailable() {
        let inst = two_by_two();
        let solved = ScheduleMipBuilder::new(&inst)
            .build()
            .unwrap()
            .solve(&UnavailableSolver::new("no license"), &SolverConfig::default())
            .unwrap();
        assert_eq!(
            solved.outcome,
            Outcome::SolverUnavailable {
                reason: "solver unavailable: no license".into()
            }
        );
        assert!(solved.schedule.is_none());
    }

    #[test]
    fn test_decode_requires_solution() {
        let inst = two_by_two();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        let empty = LinearSolution::empty(SolverStatus::Infeasible);
        assert!(formulation.decode_schedule(&empty).is_none());
    }

    #[test]
    fn test_parallel_machine() {
        let inst = Instance::identical_parallel_machine(vec![4, 4, 4], 2).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        assert_eq!(formulation.model.constraints_with_prefix("load_").count(), 2);
        assert_eq!(formulation.model.constraints_with_prefix("disj_").count(), 0);

        let solved = solve(&inst);
        assert_optimal(&solved.outcome, 8.0);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert!((schedule.makespan() - 8.0).abs() < TOL);
    }

    #[test]
    fn test_distributed_flow_shop() {
        let inst =
            Instance::distributed_flow_shop(2, vec![vec![2, 3], vec![4, 1], vec![3, 3]]).unwrap();
        let solved = solve(&inst);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert!(matches!(solved.outcome, Outcome::Optimal { .. }));
        // the longest job alone is a lower bound
        assert!(schedule.makespan() >= 6.0 - TOL);
    }

    #[test]
    fn test_hybrid_flow_shop() {
        let inst = Instance::hybrid_flow_shop(vec![2, 1], vec![vec![3, 2], vec![3, 2]]).unwrap();
        let solved = solve(&inst);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        // both jobs start in parallel at stage 0, then queue at stage 1
        assert_optimal(&solved.outcome, 7.0);
    }

    #[test]
    fn test_job_shop() {
        let inst =
            Instance::job_shop(vec![vec![3, 2], vec![2, 4]], vec![vec![0, 1], vec![1, 0]]).unwrap();
        let solved = solve(&inst);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert_optimal(&solved.outcome, 7.0);
    }

    #[test]
    fn test_flexible_job_shop() {
        let inst = Instance::flexible_job_shop(
            2,
            vec![vec![vec![2, 4], vec![3, 0]], vec![vec![3, 3], vec![0, 2]]],
        )
        .unwrap();
        let solved = solve(&inst);
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert_eq!(inst.kind(), ProblemKind::FlexibleJobShop);
    }

    #[test]
    fn test_setup_flow_shop() {
        let inst = Instance::setup_flow_shop(
            vec![vec![2, 3], vec![1, 2], vec![3, 1]],
            vec![
                vec![vec![0, 1, 2], vec![1, 0, 1], vec![2, 1, 0]],
                vec![vec![0, 3, 1], vec![1, 0, 2], vec![1, 1, 0]],
            ],
        )
        .unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
        assert_eq!(formulation.model.constraints_with_prefix("disj_").count(), 0);

        let solved = formulation
            .solve(&GoodLpSolver::new(), &SolverConfig::default())
            .unwrap();
        let schedule = solved.schedule.unwrap();
        assert!(schedule.is_feasible(&inst));
        assert_eq!(schedule.sequence(0), schedule.sequence(1));

        let exact = formulation
            .solve(&EnumerativeSolver::new(), &SolverConfig::default())
            .unwrap();
        let (lp, enumerated) = (solved.outcome.makespan(), exact.outcome.makespan());
        assert!((lp.unwrap() - enumerated.unwrap()).abs() < TOL);
    }

    #[test]
    fn test_detached_cycle_is_infeasible() {
        // zero processing and zero setups: completions alone cannot break
        // a cycle 1 → 2 → 1 that bypasses the start token
        let inst = Instance::setup_flow_shop(vec![vec![0]; 3], vec![vec![vec![0; 3]; 3]]).unwrap();
        let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();

        let cycle: HashMap<String, f64> = ["z_start_0", "z_1_2", "z_2_1"]
            .iter()
            .map(|n| (n.to_string(), 1.0))
            .collect();
        let violations = formulation
            .model
            .check(&formulation.model.dense_values(&cycle), TOL);
        assert!(!violations.is_empty());
        assert!(violations.iter().all(|v| v.name.starts_with("rank_")));

        let mut forced = formulation.model.clone();
        for name in ["z_1_2", "z_2_1"] {
            let z = forced.var_id(name).unwrap();
            forced.add_constraint(LinearConstraint::new(
                format!("fix_{name}"),
                vec![(z, 1.0)],
                Sense::Eq,
                1.0,
            ));
        }
        let solution = GoodLpSolver::new()
            .solve(&forced, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolverStatus::Infeasible);

        assert_optimal(&solve(&inst).outcome, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_flow_shop_optimum_is_feasible(
            processing in prop::collection::vec(prop::collection::vec(1i64..6, 2), 1..4)
        ) {
            let inst = Instance::flow_shop(processing.clone()).unwrap();
            let formulation = ScheduleMipBuilder::new(&inst).build().unwrap();
            let solved = formulation.solve(&GoodLpSolver::new(), &SolverConfig::default()).unwrap();
            let makespan = solved.outcome.makespan().unwrap();
            let schedule = solved.schedule.unwrap();

            prop_assert!(schedule.is_feasible(&inst));
            prop_assert!((schedule.makespan() - makespan).abs() < TOL);

            let longest_job = processing.iter().map(|row| row.iter().sum::<i64>()).max().unwrap();
            let heaviest_machine = (0..2).map(|i| processing.iter().map(|row| row[i]).sum::<i64>()).max().unwrap();
            prop_assert!(makespan >= longest_job.max(heaviest_machine) as f64 - TOL);
            prop_assert!(makespan <= inst.horizon() as f64 + TOL);

            let exact = formulation.solve(&EnumerativeSolver::new(), &SolverConfig::default()).unwrap();
            prop_assert!((exact.outcome.makespan().unwrap() - makespan).abs() < TOL);
            prop_assert!((best_permutation(&processing) as f64 - makespan).abs() < TOL);
        }
    }
}
