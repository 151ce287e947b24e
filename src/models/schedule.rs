//! Schedule (decoded solution) model.
//!
//! A schedule places every operation on one machine during one time
//! interval. It is reconstructed from a solver's answer on request and
//! can be checked against the instance it solves, independently of the
//! model that produced it.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Instance, ProblemKind};

/// A complete schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Placed operations.
    pub operations: Vec<ScheduledOperation>,
}

/// An operation placed on a machine and in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    /// Job index.
    pub job: usize,
    /// Position in the job's route.
    pub operation: usize,
    /// Machine index.
    pub machine: usize,
    /// Start time.
    pub start: f64,
    /// End (completion) time.
    pub end: f64,
}

impl ScheduledOperation {
    /// Creates a placed operation.
    pub fn new(job: usize, operation: usize, machine: usize, start: f64, end: f64) -> Self {
        Self {
            job,
            operation,
            machine,
            start,
            end,
        }
    }

    /// Processing duration (end - start).
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A constraint violation found by [`Schedule::violations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// An operation of the instance is not placed, or placed twice.
    MissingOperation,
    /// An operation runs on a machine it is not eligible for.
    IneligibleMachine,
    /// The placed interval does not match the processing time.
    WrongDuration,
    /// An operation starts before its route predecessor ends.
    PrecedenceViolation,
    /// Two operations overlap on one machine (setups included).
    Overlap,
    /// A job's operations are spread over several factories.
    FactorySplit,
    /// Machines process jobs in different orders in a permutation variant.
    SequenceMismatch,
}

const TOLERANCE: f64 = 1e-6;

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placed operation.
    pub fn add(&mut self, operation: ScheduledOperation) {
        self.operations.push(operation);
    }

    /// Number of placed operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Makespan: latest end time over all operations.
    pub fn makespan(&self) -> f64 {
        self.operations.iter().map(|o| o.end).fold(0.0, f64::max)
    }

    /// Completion time of a job (end of its latest operation).
    pub fn job_completion(&self, job: usize) -> Option<f64> {
        self.operations
            .iter()
            .filter(|o| o.job == job)
            .map(|o| o.end)
            .reduce(f64::max)
    }

    /// Operations of a job, in route order.
    pub fn for_job(&self, job: usize) -> Vec<&ScheduledOperation> {
        let mut ops: Vec<_> = self.operations.iter().filter(|o| o.job == job).collect();
        ops.sort_by_key(|o| o.operation);
        ops
    }

    /// Operations on a machine, by start time.
    pub fn for_machine(&self, machine: usize) -> Vec<&ScheduledOperation> {
        let mut ops: Vec<_> = self
            .operations
            .iter()
            .filter(|o| o.machine == machine)
            .collect();
        ops.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.job.cmp(&b.job)));
        ops
    }

    /// Job order on a machine.
    pub fn sequence(&self, machine: usize) -> Vec<usize> {
        self.for_machine(machine).iter().map(|o| o.job).collect()
    }

    /// Checks this schedule against the scheduling semantics of `instance`.
    ///
    /// Verifies completeness, eligibility, durations, route precedence,
    /// machine exclusivity including setup times, factory consistency
    /// and, for permutation variants, identical job order on all machines.
    pub fn violations(&self, instance: &Instance) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut push = |violation_type, message: String| {
            violations.push(Violation {
                violation_type,
                message,
            })
        };

        let mut placed: HashMap<(usize, usize), &ScheduledOperation> = HashMap::new();
        for op in &self.operations {
            if placed.insert((op.job, op.operation), op).is_some() {
                push(
                    ViolationType::MissingOperation,
                    format!("operation {} of job {} placed twice", op.operation, op.job),
                );
            }
        }

        for (j, job) in instance.jobs().iter().enumerate() {
            let mut previous_end = 0.0_f64;
            for (k, operation) in job.operations.iter().enumerate() {
                let Some(placed_op) = placed.get(&(j, k)) else {
                    push(
                        ViolationType::MissingOperation,
                        format!("operation {k} of job {j} is not scheduled"),
                    );
                    continue;
                };

                match operation.duration_on(placed_op.machine) {
                    None => push(
                        ViolationType::IneligibleMachine,
                        format!(
                            "operation {k} of job {j} runs on ineligible machine {}",
                            placed_op.machine
                        ),
                    ),
                    Some(d) if (placed_op.duration() - d as f64).abs() > TOLERANCE => push(
                        ViolationType::WrongDuration,
                        format!(
                            "operation {k} of job {j} lasts {}, expected {d}",
                            placed_op.duration()
                        ),
                    ),
                    Some(_) => {}
                }

                if placed_op.start + TOLERANCE < previous_end || placed_op.start < -TOLERANCE {
                    push(
                        ViolationType::PrecedenceViolation,
                        format!(
                            "operation {k} of job {j} starts at {} before {previous_end}",
                            placed_op.start
                        ),
                    );
                }
                previous_end = placed_op.end;
            }

            let groups: Vec<_> = self
                .for_job(j)
                .iter()
                .filter_map(|o| instance.machines().get(o.machine).and_then(|m| m.group))
                .collect();
            if groups.windows(2).any(|w| w[0] != w[1]) {
                push(
                    ViolationType::FactorySplit,
                    format!("job {j} is processed in several factories"),
                );
            }
        }

        for machine in 0..instance.machine_count() {
            let ops = self.for_machine(machine);
            for pair in ops.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let setup = instance.setup_time(machine, a.job, b.job) as f64;
                if b.start + TOLERANCE < a.end + setup {
                    push(
                        ViolationType::Overlap,
                        format!(
                            "machine {machine}: job {} starts at {} before job {} is free at {}",
                            b.job,
                            b.start,
                            a.job,
                            a.end + setup
                        ),
                    );
                }
            }
        }

        if instance.kind() == ProblemKind::SetupFlowShop && instance.machine_count() > 1 {
            let first = self.sequence(0);
            for machine in 1..instance.machine_count() {
                if self.sequence(machine) != first {
                    push(
                        ViolationType::SequenceMismatch,
                        format!("machine {machine} processes jobs in a different order"),
                    );
                }
            }
        }

        violations
    }

    /// Whether the schedule satisfies every constraint of `instance`.
    pub fn is_feasible(&self, instance: &Instance) -> bool {
        self.violations(instance).is_empty()
    }
}
