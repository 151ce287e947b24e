//! Input validation for scheduling instances.
//!
//! Checks structural integrity of raw instance data before it is
//! normalized into an [`Instance`]. Detects:
//! - Empty instances and zero resource counts
//! - Ragged or mis-sized processing-time and setup-time tables
//! - Negative processing or setup times
//! - Routes that leave the stage range or are not permutations
//! - Operations without any eligible machine
//! - Machine layouts that disagree with the declared problem kind
//! - Processing and setup times whose sums overflow `i64`
//!
//! Every check reports all problems it finds instead of stopping at the
//! first one, so a malformed file can be fixed in one pass.
//!
//! [`Instance`]: crate::models::Instance

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{AssignmentScope, Instance, MakespanLink, Routing};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// The instance has no jobs or no stages.
    EmptyInstance,
    /// A machine, factory, or stage count is zero.
    InvalidResourceCount,
    /// A table's shape disagrees with the declared counts.
    DimensionMismatch,
    /// A processing or setup time is negative.
    NegativeTime,
    /// A route references a stage outside the declared range or repeats one.
    InvalidRoute,
    /// An operation has no machine with positive processing time.
    NoEligibleMachine,
    /// A normalized operation references an unknown machine.
    InvalidMachineReference,
    /// The machine layout does not have the shape the problem kind declares.
    KindMismatch,
    /// The scheduling horizon or big-M constant exceeds `i64`.
    TimeOverflow,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Collects validation errors across several checks.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ValidationError::new(kind, message));
    }

    pub(crate) fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Checks a `rows × cols` processing-time table.
///
/// Returns the column count taken from the first row, or `None` when the
/// table is empty.
pub(crate) fn check_time_table(
    errors: &mut Collector,
    table: &str,
    rows: &[Vec<i64>],
    expected_cols: Option<usize>,
) -> Option<usize> {
    if rows.is_empty() {
        errors.push(
            ValidationErrorKind::EmptyInstance,
            format!("{table}: instance has no jobs"),
        );
        return None;
    }

    let cols = expected_cols.unwrap_or(rows[0].len());
    if cols == 0 {
        errors.push(
            ValidationErrorKind::EmptyInstance,
            format!("{table}: instance has no stages"),
        );
        return None;
    }

    for (j, row) in rows.iter().enumerate() {
        if row.len() != cols {
            errors.push(
                ValidationErrorKind::DimensionMismatch,
                format!("{table}: job {j} has {} entries, expected {cols}", row.len()),
            );
        }
        for (i, &t) in row.iter().enumerate() {
            if t < 0 {
                errors.push(
                    ValidationErrorKind::NegativeTime,
                    format!("{table}: negative time {t} for job {j} at position {i}"),
                );
            }
        }
    }

    Some(cols)
}

/// Checks that a resource count is positive.
pub(crate) fn check_count(errors: &mut Collector, what: &str, count: usize) {
    if count == 0 {
        errors.push(
            ValidationErrorKind::InvalidResourceCount,
            format!("{what} must be at least 1"),
        );
    }
}

/// Checks job routes: one permutation of `0..stage_count` per job.
pub(crate) fn check_routes(
    errors: &mut Collector,
    routes: &[Vec<usize>],
    job_count: usize,
    stage_count: usize,
) {
    if routes.len() != job_count {
        errors.push(
            ValidationErrorKind::DimensionMismatch,
            format!("routes given for {} jobs, expected {job_count}", routes.len()),
        );
    }

    for (j, route) in routes.iter().enumerate() {
        if route.len() != stage_count {
            errors.push(
                ValidationErrorKind::DimensionMismatch,
                format!(
                    "route of job {j} has {} positions, expected {stage_count}",
                    route.len()
                ),
            );
        }

        let mut seen = HashSet::new();
        for &stage in route {
            if stage >= stage_count {
                errors.push(
                    ValidationErrorKind::InvalidRoute,
                    format!("route of job {j} references stage {stage}, only {stage_count} exist"),
                );
            } else if !seen.insert(stage) {
                errors.push(
                    ValidationErrorKind::InvalidRoute,
                    format!("route of job {j} visits stage {stage} more than once"),
                );
            }
        }
    }
}

/// Checks a flexible job-shop table `p[job][op][machine]` (0 = ineligible).
pub(crate) fn check_flexible_table(
    errors: &mut Collector,
    table: &[Vec<Vec<i64>>],
    machine_count: usize,
) {
    if table.is_empty() {
        errors.push(ValidationErrorKind::EmptyInstance, "instance has no jobs");
        return;
    }

    for (j, ops) in table.iter().enumerate() {
        if ops.is_empty() {
            errors.push(
                ValidationErrorKind::EmptyInstance,
                format!("job {j} has no operations"),
            );
        }
        for (k, row) in ops.iter().enumerate() {
            if row.len() != machine_count {
                errors.push(
                    ValidationErrorKind::DimensionMismatch,
                    format!(
                        "operation {k} of job {j} has {} machine entries, expected {machine_count}",
                        row.len()
                    ),
                );
            }
            if row.iter().any(|&t| t < 0) {
                errors.push(
                    ValidationErrorKind::NegativeTime,
                    format!("operation {k} of job {j} has a negative processing time"),
                );
            }
            if !row.iter().any(|&t| t > 0) {
                errors.push(
                    ValidationErrorKind::NoEligibleMachine,
                    format!("operation {k} of job {j} has no eligible machine"),
                );
            }
        }
    }
}

/// Checks setup tables `s[stage][pred][succ]`.
pub(crate) fn check_setup_tables(
    errors: &mut Collector,
    setups: &[Vec<Vec<i64>>],
    stage_count: usize,
    job_count: usize,
) {
    if setups.len() != stage_count {
        errors.push(
            ValidationErrorKind::DimensionMismatch,
            format!(
                "setup times given for {} stages, expected {stage_count}",
                setups.len()
            ),
        );
    }

    for (i, matrix) in setups.iter().enumerate() {
        if matrix.len() != job_count {
            errors.push(
                ValidationErrorKind::DimensionMismatch,
                format!(
                    "setup matrix of stage {i} has {} rows, expected {job_count}",
                    matrix.len()
                ),
            );
        }
        for (from, row) in matrix.iter().enumerate() {
            if row.len() != job_count {
                errors.push(
                    ValidationErrorKind::DimensionMismatch,
                    format!(
                        "setup row {from} of stage {i} has {} entries, expected {job_count}",
                        row.len()
                    ),
                );
            }
            if row.iter().any(|&t| t < 0) {
                errors.push(
                    ValidationErrorKind::NegativeTime,
                    format!("setup row {from} of stage {i} has a negative time"),
                );
            }
        }
    }
}

/// Validates an already normalized instance.
///
/// Every constructor ends here, and so does deserialization.
///
/// Checks:
/// 1. At least one job, every job has at least one operation
/// 2. Every operation has at least one machine option
/// 3. Every option references an existing machine, at most once
/// 4. All durations and setup times are non-negative
/// 5. Setup matrices, when present, match machine and job counts
/// 6. Machines, routes and options have the layout of the declared kind
/// 7. The horizon and big-M constant fit in `i64`
pub fn validate_instance(instance: &Instance) -> ValidationResult {
    let mut errors = Collector::new();
    let machine_count = instance.machine_count();

    if instance.job_count() == 0 {
        errors.push(ValidationErrorKind::EmptyInstance, "instance has no jobs");
    }

    for (j, job) in instance.jobs().iter().enumerate() {
        if job.operations.is_empty() {
            errors.push(
                ValidationErrorKind::EmptyInstance,
                format!("job {j} has no operations"),
            );
        }
        for (k, op) in job.operations.iter().enumerate() {
            if op.options.is_empty() {
                errors.push(
                    ValidationErrorKind::NoEligibleMachine,
                    format!("operation {k} of job {j} has no eligible machine"),
                );
            }
            let mut seen = HashSet::new();
            for option in &op.options {
                if option.machine >= machine_count {
                    errors.push(
                        ValidationErrorKind::InvalidMachineReference,
                        format!(
                            "operation {k} of job {j} references unknown machine {}",
                            option.machine
                        ),
                    );
                } else if !seen.insert(option.machine) {
                    errors.push(
                        ValidationErrorKind::InvalidMachineReference,
                        format!(
                            "operation {k} of job {j} lists machine {} twice",
                            option.machine
                        ),
                    );
                }
                if option.duration < 0 {
                    errors.push(
                        ValidationErrorKind::NegativeTime,
                        format!("operation {k} of job {j} has a negative duration"),
                    );
                }
            }
        }
    }

    if let Some(setups) = instance.setups() {
        if setups.len() != machine_count {
            errors.push(
                ValidationErrorKind::DimensionMismatch,
                format!(
                    "setup times given for {} machines, expected {machine_count}",
                    setups.len()
                ),
            );
        }
        for (m, matrix) in setups.matrices().iter().enumerate() {
            if matrix.size() != instance.job_count() {
                errors.push(
                    ValidationErrorKind::DimensionMismatch,
                    format!(
                        "setup matrix of machine {m} covers {} jobs, expected {}",
                        matrix.size(),
                        instance.job_count()
                    ),
                );
            }
            if matrix.min() < 0 {
                errors.push(
                    ValidationErrorKind::NegativeTime,
                    format!("setup matrix of machine {m} has a negative time"),
                );
            }
        }
    }

    check_kind_structure(&mut errors, instance);

    if instance.checked_big_m().is_none() {
        errors.push(
            ValidationErrorKind::TimeOverflow,
            "sum of processing and setup times overflows the time range",
        );
    }

    errors.finish()
}

/// Checks that the normalized layout matches `instance.kind()`.
fn check_kind_structure(errors: &mut Collector, instance: &Instance) {
    let kind = instance.kind();
    let caps = kind.capabilities();
    let stages = instance.stage_count();
    let groups = instance.group_count();
    let mut mismatch = |message: String| {
        errors.push(
            ValidationErrorKind::KindMismatch,
            format!("{}: {message}", kind.name()),
        );
    };

    for (m, machine) in instance.machines().iter().enumerate() {
        if machine.stage >= stages {
            mismatch(format!("machine {m} is on stage {}, only {stages} exist", machine.stage));
        }
        match (caps.assignment, machine.group) {
            (AssignmentScope::PerJob, Some(g)) if g < groups => {}
            (AssignmentScope::PerJob, _) => {
                mismatch(format!("machine {m} belongs to no valid factory"));
            }
            (_, Some(_)) => mismatch(format!("machine {m} belongs to a factory")),
            (_, None) => {}
        }
    }
    if caps.assignment != AssignmentScope::PerJob && groups != 1 {
        mismatch(format!("{groups} factories declared"));
    }

    if instance.setups().is_some() != caps.sequence_dependent_setup {
        mismatch(if caps.sequence_dependent_setup {
            "setup times are missing".to_string()
        } else {
            "setup times are not supported".to_string()
        });
    }

    let machine_stage = |machine: usize| instance.machines().get(machine).map(|m| m.stage);

    for (j, job) in instance.jobs().iter().enumerate() {
        let ops = job.operations.len();
        match (caps.makespan, caps.routing) {
            (MakespanLink::MachineLoad, _) if ops != 1 => {
                mismatch(format!("job {j} has {ops} operations, expected 1"));
            }
            (MakespanLink::Completion, Routing::Fixed) if ops != stages => {
                mismatch(format!("job {j} has {ops} operations, expected {stages}"));
            }
            _ => {}
        }

        let mut visited = HashSet::new();
        for (k, op) in job.operations.iter().enumerate() {
            if op.options.is_empty() {
                continue;
            }
            if caps.assignment == AssignmentScope::None && op.options.len() != 1 {
                mismatch(format!(
                    "operation {k} of job {j} lists {} machines, expected 1",
                    op.options.len()
                ));
            }
            if !caps.resource_dependent_duration && op.uniform_duration().is_none() {
                mismatch(format!("operation {k} of job {j} has machine-dependent durations"));
            }

            if caps.makespan == MakespanLink::Completion && caps.routing == Routing::Fixed {
                let off_stage = op
                    .options
                    .iter()
                    .any(|o| machine_stage(o.machine).is_some_and(|stage| stage != k));
                if off_stage {
                    mismatch(format!("operation {k} of job {j} leaves stage {k}"));
                }
            }

            if caps.assignment == AssignmentScope::PerJob {
                let factories: HashSet<Option<usize>> = op
                    .options
                    .iter()
                    .filter_map(|o| instance.machines().get(o.machine))
                    .map(|m| m.group)
                    .collect();
                if factories.len() != op.options.len() || op.options.len() != groups {
                    mismatch(format!(
                        "operation {k} of job {j} needs one machine in each of {groups} factories"
                    ));
                }
            }

            if caps.routing == Routing::PerJob && caps.assignment == AssignmentScope::None {
                for option in &op.options {
                    if !visited.insert(option.machine) {
                        mismatch(format!("job {j} visits machine {} twice", option.machine));
                    }
                }
            }
        }

        if caps.routing == Routing::PerJob
            && caps.assignment == AssignmentScope::None
            && ops != stages
        {
            mismatch(format!("job {j} has {ops} operations, expected {stages}"));
        }
    }
}
