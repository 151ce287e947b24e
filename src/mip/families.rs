//! Constraint families.
//!
//! Each family is a pure function of the instance, the catalog and the
//! big-M constant. Families a variant does not use return no rows, so
//! the assembler can apply all of them unconditionally.
//!
//! # Big-M disjunctions
//!
//! For an order variable `x` between operations `a` and `b` that share
//! machine `m`, with gate set `G` (the assignment variables that place
//! both operations on `m`):
//!
//! ```text
//! a before b:  c_b − c_a − M·x − M·ΣG ≥ p_b − M(1 + |G|)
//! b before a:  c_a − c_b + M·x − M·ΣG ≥ p_a − M·|G|
//! ```
//!
//! Both rows bind only when every gate is 1; `x` then selects which one.
//!
//! # Reference
//! Manne (1960), "On the job-shop scheduling problem";
//! Naderi & Ruiz (2010), "The distributed permutation flowshop
//! scheduling problem"

use super::catalog::{Predecessor, VarKey, VariableCatalog};
use super::model::{LinearConstraint, Sense, VarId};
use crate::models::{AssignmentScope, Instance, MakespanLink};

/// Exactly one machine per operation, or one factory per job.
pub fn assignment(
    instance: &Instance,
    catalog: &VariableCatalog,
    _big_m: f64,
) -> Vec<LinearConstraint> {
    let jobs = instance.jobs();
    match instance.capabilities().assignment {
        AssignmentScope::None => Vec::new(),
        AssignmentScope::PerOperation => jobs
            .iter()
            .enumerate()
            .flat_map(|(j, job)| {
                job.operations.iter().enumerate().map(move |(k, op)| {
                    let terms = op
                        .options
                        .iter()
                        .filter_map(|o| catalog.operation_assign(j, k, o.machine))
                        .map(|v| (v, 1.0))
                        .collect();
                    LinearConstraint::new(format!("assign_{j}_{k}"), terms, Sense::Eq, 1.0)
                })
            })
            .collect(),
        AssignmentScope::PerJob => (0..jobs.len())
            .map(|j| {
                let terms = (0..instance.group_count())
                    .filter_map(|f| catalog.job_assign(j, f))
                    .map(|v| (v, 1.0))
                    .collect();
                LinearConstraint::new(format!("assign_{j}"), terms, Sense::Eq, 1.0)
            })
            .collect(),
    }
}

/// Completion chaining along each job's route.
///
/// `c_{j,0} ≥ p` and `c_{j,k} − c_{j,k−1} ≥ p`. When the processing
/// time depends on the machine, `p` becomes `Σ_m p_m·y_{j,k,m}`.
pub fn routing(
    instance: &Instance,
    catalog: &VariableCatalog,
    _big_m: f64,
) -> Vec<LinearConstraint> {
    let dependent = instance.capabilities().resource_dependent_duration;
    let mut rows = Vec::new();

    for (j, job) in instance.jobs().iter().enumerate() {
        for (k, op) in job.operations.iter().enumerate() {
            let Some(c) = catalog.completion(j, k) else {
                continue;
            };
            let mut terms = vec![(c, 1.0)];
            if k > 0 {
                if let Some(prev) = catalog.completion(j, k - 1) {
                    terms.push((prev, -1.0));
                }
            }

            let rhs = if dependent {
                terms.extend(op.options.iter().filter_map(|o| {
                    catalog
                        .operation_assign(j, k, o.machine)
                        .map(|y| (y, -(o.duration as f64)))
                }));
                0.0
            } else {
                op.max_duration() as f64
            };
            rows.push(LinearConstraint::new(
                format!("route_{j}_{k}"),
                terms,
                Sense::Ge,
                rhs,
            ));
        }
    }
    rows
}

/// Big-M machine conflict pairs, one pair per order variable and
/// shared machine.
pub fn disjunction(
    instance: &Instance,
    catalog: &VariableCatalog,
    big_m: f64,
) -> Vec<LinearConstraint> {
    let mut rows = Vec::new();

    for pair in catalog.order_pairs() {
        let (a, b) = (pair.first, pair.second);
        let (Some(c_a), Some(c_b)) = (catalog.completion(a.0, a.1), catalog.completion(b.0, b.1))
        else {
            continue;
        };
        let (Some(op_a), Some(op_b)) = (instance.operation(a.0, a.1), instance.operation(b.0, b.1))
        else {
            continue;
        };

        for &m in &pair.machines {
            let (Some(p_a), Some(p_b)) = (op_a.duration_on(m), op_b.duration_on(m)) else {
                continue;
            };
            let gates: Vec<VarId> = catalog
                .gates(instance, a.0, a.1, m)
                .into_iter()
                .chain(catalog.gates(instance, b.0, b.1, m))
                .collect();
            let g = gates.len() as f64;
            let gate_terms = gates.iter().map(|&v| (v, -big_m));
            let base = format!("disj_{}_{}_{}_{}_m{m}", a.0, a.1, b.0, b.1);

            let mut forward = vec![(c_b, 1.0), (c_a, -1.0), (pair.var, -big_m)];
            forward.extend(gate_terms.clone());
            rows.push(LinearConstraint::new(
                format!("{base}_ab"),
                forward,
                Sense::Ge,
                p_b as f64 - big_m * (1.0 + g),
            ));

            let mut backward = vec![(c_a, 1.0), (c_b, -1.0), (pair.var, big_m)];
            backward.extend(gate_terms);
            rows.push(LinearConstraint::new(
                format!("{base}_ba"),
                backward,
                Sense::Ge,
                p_a as f64 - big_m * g,
            ));
        }
    }
    rows
}

/// Successor-arc sequencing with sequence-dependent setups.
///
/// Every job has exactly one predecessor (a job or the start token),
/// precedes at most one job, and the start token precedes exactly one
/// job. An active arc `p → s` forces
/// `c_{s,i} − c_{p,i} ≥ p_{s,i} + setup_i(p, s)` on every stage; the
/// start token has zero processing and causes no setup.
///
/// The completion arcs only exclude cycles of positive length. Rank rows
/// `u_s − u_p − n·z_{p,s} ≥ 1 − n` exclude the rest, so every job is
/// reached from the start token even when processing and setups are 0.
pub fn sequencing(
    instance: &Instance,
    catalog: &VariableCatalog,
    big_m: f64,
) -> Vec<LinearConstraint> {
    if !instance.capabilities().sequence_dependent_setup {
        return Vec::new();
    }
    let n = instance.job_count();
    let stages = instance.stage_count();
    let mut rows = Vec::new();

    let arc = |pred: Predecessor, succ: usize| catalog.successor(pred, succ);
    let unit = |v: Option<VarId>| v.map(|v| (v, 1.0));

    for s in 0..n {
        let terms = std::iter::once(arc(Predecessor::Start, s))
            .chain((0..n).filter(|&p| p != s).map(|p| arc(Predecessor::Job(p), s)))
            .filter_map(unit)
            .collect();
        rows.push(LinearConstraint::new(format!("pred_{s}"), terms, Sense::Eq, 1.0));
    }
    for p in 0..n {
        let terms = (0..n)
            .filter(|&s| s != p)
            .filter_map(|s| unit(arc(Predecessor::Job(p), s)))
            .collect();
        rows.push(LinearConstraint::new(format!("succ_{p}"), terms, Sense::Le, 1.0));
    }
    let terms = (0..n)
        .filter_map(|s| unit(arc(Predecessor::Start, s)))
        .collect();
    rows.push(LinearConstraint::new("start_succ", terms, Sense::Eq, 1.0));

    for i in 1..stages {
        let (Some(cur), Some(prev)) = (
            catalog.get(VarKey::StartCompletion { stage: i }),
            catalog.get(VarKey::StartCompletion { stage: i - 1 }),
        ) else {
            continue;
        };
        rows.push(LinearConstraint::new(
            format!("start_chain_{i}"),
            vec![(cur, 1.0), (prev, -1.0)],
            Sense::Ge,
            0.0,
        ));
    }

    let chain = n as f64;
    for p in 0..n {
        for s in (0..n).filter(|&s| s != p) {
            let (Some(z), Some(u_p), Some(u_s)) =
                (arc(Predecessor::Job(p), s), catalog.rank(p), catalog.rank(s))
            else {
                continue;
            };
            rows.push(LinearConstraint::new(
                format!("rank_{p}_{s}"),
                vec![(u_s, 1.0), (u_p, -1.0), (z, -chain)],
                Sense::Ge,
                1.0 - chain,
            ));
        }
    }

    let preds = std::iter::once(Predecessor::Start).chain((0..n).map(Predecessor::Job));
    for pred in preds {
        for s in 0..n {
            let Some(z) = arc(pred, s) else {
                continue;
            };
            for i in 0..stages {
                let Some(op) = instance.operation(s, i) else {
                    continue;
                };
                let Some(machine) = op.options.first().map(|o| o.machine) else {
                    continue;
                };
                let (c_pred, setup, label) = match pred {
                    Predecessor::Start => (
                        catalog.get(VarKey::StartCompletion { stage: i }),
                        0,
                        "start".to_string(),
                    ),
                    Predecessor::Job(p) => (
                        catalog.completion(p, i),
                        instance.setup_time(machine, p, s),
                        p.to_string(),
                    ),
                };
                let (Some(c_pred), Some(c_succ)) = (c_pred, catalog.completion(s, i)) else {
                    continue;
                };
                rows.push(LinearConstraint::new(
                    format!("arc_{label}_{s}_{i}"),
                    vec![(c_succ, 1.0), (c_pred, -1.0), (z, -big_m)],
                    Sense::Ge,
                    (op.max_duration() + setup) as f64 - big_m,
                ));
            }
        }
    }
    rows
}

/// Lower bounds on the makespan variable.
///
/// `Cmax ≥ c_{j,last}` per job, or `Cmax ≥ Σ p·y` per machine when the
/// makespan is linked to machine loads.
pub fn makespan(
    instance: &Instance,
    catalog: &VariableCatalog,
    _big_m: f64,
) -> Vec<LinearConstraint> {
    let cmax = catalog.makespan();
    match instance.capabilities().makespan {
        MakespanLink::Completion => instance
            .jobs()
            .iter()
            .enumerate()
            .filter_map(|(j, job)| {
                let last = job.operations.len().checked_sub(1)?;
                let c = catalog.completion(j, last)?;
                Some(LinearConstraint::new(
                    format!("cmax_{j}"),
                    vec![(cmax, 1.0), (c, -1.0)],
                    Sense::Ge,
                    0.0,
                ))
            })
            .collect(),
        MakespanLink::MachineLoad => (0..instance.machine_count())
            .map(|m| {
                let mut terms = vec![(cmax, 1.0)];
                for (j, job) in instance.jobs().iter().enumerate() {
                    for (k, op) in job.operations.iter().enumerate() {
                        if let (Some(p), Some(y)) =
                            (op.duration_on(m), catalog.operation_assign(j, k, m))
                        {
                            terms.push((y, -(p as f64)));
                        }
                    }
                }
                LinearConstraint::new(format!("load_{m}"), terms, Sense::Ge, 0.0)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(rows: &'a [LinearConstraint], name: &str) -> &'a LinearConstraint {
        rows.iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("missing row {name}"))
    }

    #[test]
    fn test_assignment_rows() {
        let inst = Instance::hybrid_flow_shop(vec![2, 3], vec![vec![1, 2]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let rows = assignment(&inst, &catalog, 10.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].terms.len(), 3);
        assert_eq!(rows[1].sense, Sense::Eq);
        assert_eq!(rows[1].rhs, 1.0);

        let dist = Instance::distributed_flow_shop(3, vec![vec![1], vec![2]]).unwrap();
        let catalog = VariableCatalog::for_instance(&dist);
        let rows = assignment(&dist, &catalog, 10.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "assign_0");
        assert_eq!(rows[0].terms.len(), 3);
    }

    #[test]
    fn test_routing_constant_durations() {
        let inst = Instance::flow_shop(vec![vec![3, 2]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let rows = routing(&inst, &catalog, 10.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].terms.len(), 1);
        assert_eq!(rows[0].rhs, 3.0);
        assert_eq!(rows[1].terms.len(), 2);
        assert_eq!(rows[1].rhs, 2.0);
    }

    #[test]
    fn test_routing_machine_dependent_durations() {
        let inst = Instance::flexible_job_shop(2, vec![vec![vec![3, 5], vec![0, 4]]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let rows = routing(&inst, &catalog, 10.0);

        let first = row(&rows, "route_0_0");
        assert_eq!(first.rhs, 0.0);
        let y1 = catalog.operation_assign(0, 0, 1).unwrap();
        assert_eq!(first.coefficient(y1), -5.0);

        let second = row(&rows, "route_0_1");
        // c_0_1, c_0_0, y_0_1_1
        assert_eq!(second.terms.len(), 3);
    }

    #[test]
    fn test_disjunction_without_gates() {
        let inst = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let m = 15.0;
        let rows = disjunction(&inst, &catalog, m);
        assert_eq!(rows.len(), 4);

        let ab = row(&rows, "disj_0_0_1_0_m0_ab");
        assert_eq!(ab.terms.len(), 3);
        assert_eq!(ab.rhs, 2.0 - m);
        let ba = row(&rows, "disj_0_0_1_0_m0_ba");
        assert_eq!(ba.rhs, 3.0);
        let x = catalog.order_pairs()[0].var;
        assert_eq!(ba.coefficient(x), m);
    }

    #[test]
    fn test_disjunction_with_gates() {
        let inst = Instance::hybrid_flow_shop(vec![2], vec![vec![4], vec![6]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let m = 100.0;
        let rows = disjunction(&inst, &catalog, m);
        // one order var, two shared machines
        assert_eq!(rows.len(), 4);

        let ab = row(&rows, "disj_0_0_1_0_m1_ab");
        assert_eq!(ab.terms.len(), 5);
        assert_eq!(ab.rhs, 6.0 - 3.0 * m);
        let ba = row(&rows, "disj_0_0_1_0_m1_ba");
        assert_eq!(ba.rhs, 4.0 - 2.0 * m);
        let gate = catalog.operation_assign(1, 0, 1).unwrap();
        assert_eq!(ba.coefficient(gate), -m);
    }

    #[test]
    fn test_sequencing_rows() {
        let inst = Instance::setup_flow_shop(
            vec![vec![1, 2], vec![3, 4]],
            vec![vec![vec![0, 5], vec![6, 0]], vec![vec![0, 7], vec![8, 0]]],
        )
        .unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let m = 50.0;
        let rows = sequencing(&inst, &catalog, m);

        assert_eq!(row(&rows, "pred_0").terms.len(), 2);
        assert_eq!(row(&rows, "succ_1").sense, Sense::Le);
        assert_eq!(row(&rows, "start_succ").terms.len(), 2);
        assert_eq!(row(&rows, "start_chain_1").terms.len(), 2);

        // job 0 → job 1 on stage 1: p = 4, setup = 7
        assert_eq!(row(&rows, "arc_0_1_1").rhs, 11.0 - m);
        // no setup from the start token
        assert_eq!(row(&rows, "arc_start_1_0").rhs, 3.0 - m);
        // 2 start arcs + 2 job arcs, 2 stages each
        assert_eq!(rows.iter().filter(|r| r.name.starts_with("arc_")).count(), 8);

        let rank = row(&rows, "rank_0_1");
        assert_eq!(rank.rhs, -1.0);
        assert_eq!(rank.coefficient(catalog.rank(1).unwrap()), 1.0);
        assert_eq!(rank.coefficient(catalog.successor(Predecessor::Job(0), 1).unwrap()), -2.0);
        assert_eq!(rows.iter().filter(|r| r.name.starts_with("rank_")).count(), 2);
    }

    #[test]
    fn test_sequencing_skipped_without_setups() {
        let inst = Instance::flow_shop(vec![vec![1], vec![2]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        assert!(sequencing(&inst, &catalog, 10.0).is_empty());
    }

    #[test]
    fn test_makespan_rows() {
        let inst = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
        let catalog = VariableCatalog::for_instance(&inst);
        let rows = makespan(&inst, &catalog, 10.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].terms,
            vec![(catalog.makespan(), 1.0), (catalog.completion(1, 1).unwrap(), -1.0)]
        );

        let pm = Instance::parallel_machine(vec![vec![4, 5], vec![6, 7]]).unwrap();
        let catalog = VariableCatalog::for_instance(&pm);
        let rows = makespan(&pm, &catalog, 10.0);
        assert_eq!(rows.len(), 2);
        let y = catalog.operation_assign(1, 0, 1).unwrap();
        assert_eq!(row(&rows, "load_1").coefficient(y), -7.0);
    }
}
