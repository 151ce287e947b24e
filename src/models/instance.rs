//! Scheduling instance model.
//!
//! Every supported problem variant is normalized into the same shape:
//! jobs made of operations in route order, each operation listing the
//! machines that may process it together with the processing time on
//! that machine. Variant-specific structure (factories, machines per
//! stage, job-specific routes, setup matrices) is folded into that shape
//! by the constructors, and what remains variant-specific is described by
//! a [`Capabilities`] descriptor.
//!
//! # Variants
//!
//! | Kind | Resources | Route | Duration |
//! |------|-----------|-------|----------|
//! | `FlowShop` | one machine per stage | fixed | per stage |
//! | `DistributedFlowShop` | one line per factory | fixed | per stage |
//! | `HybridFlowShop` | parallel machines per stage | fixed | per stage |
//! | `JobShop` | one machine per stage | per job | per stage |
//! | `FlexibleJobShop` | eligible machines per operation | per job | per machine |
//! | `ParallelMachine` | any machine | single operation | per machine |
//! | `SetupFlowShop` | one machine per stage | fixed | per stage + setups |
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};

use super::setup::{SetupMatrix, SetupTimes};
use crate::error::InstanceError;
use crate::validation::{self, Collector};

/// Scheduling problem variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemKind {
    /// Permutation-free flow shop, one machine per stage.
    FlowShop,
    /// Flow shop replicated over identical factories; each job is
    /// processed entirely in one factory.
    DistributedFlowShop,
    /// Flow shop with identical parallel machines at each stage.
    HybridFlowShop,
    /// Each job visits every machine once in its own order.
    JobShop,
    /// Job shop where each operation chooses among eligible machines.
    FlexibleJobShop,
    /// Single-operation jobs on unrelated parallel machines.
    ParallelMachine,
    /// Permutation flow shop with sequence-dependent setup times.
    SetupFlowShop,
}

impl ProblemKind {
    /// All variants.
    pub fn all() -> [ProblemKind; 7] {
        [
            Self::FlowShop,
            Self::DistributedFlowShop,
            Self::HybridFlowShop,
            Self::JobShop,
            Self::FlexibleJobShop,
            Self::ParallelMachine,
            Self::SetupFlowShop,
        ]
    }

    /// Short lowercase name, used in model names and log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlowShop => "fsp",
            Self::DistributedFlowShop => "dfsp",
            Self::HybridFlowShop => "hfsp",
            Self::JobShop => "jsp",
            Self::FlexibleJobShop => "fjsp",
            Self::ParallelMachine => "pmsp",
            Self::SetupFlowShop => "sdst_fsp",
        }
    }

    /// Structural descriptor that drives the formulation compilers.
    pub fn capabilities(&self) -> Capabilities {
        use AssignmentScope as A;
        use MakespanLink as L;
        use Routing as R;

        let (multi, routing, dependent, setups, assignment, makespan) = match self {
            Self::FlowShop => (false, R::Fixed, false, false, A::None, L::Completion),
            Self::DistributedFlowShop => (true, R::Fixed, false, false, A::PerJob, L::Completion),
            Self::HybridFlowShop => (true, R::Fixed, false, false, A::PerOperation, L::Completion),
            Self::JobShop => (false, R::PerJob, false, false, A::None, L::Completion),
            Self::FlexibleJobShop => {
                (true, R::PerJob, true, false, A::PerOperation, L::Completion)
            }
            Self::ParallelMachine => {
                (true, R::Fixed, true, false, A::PerOperation, L::MachineLoad)
            }
            Self::SetupFlowShop => (false, R::Fixed, false, true, A::None, L::Completion),
        };

        Capabilities {
            multiple_resources_per_stage: multi,
            routing,
            resource_dependent_duration: dependent,
            sequence_dependent_setup: setups,
            assignment,
            makespan,
        }
    }
}

/// How a job's operations are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Routing {
    /// Every job visits the stages in index order.
    Fixed,
    /// Each job has its own route.
    PerJob,
}

/// Which decision selects a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentScope {
    /// Every operation has exactly one machine.
    None,
    /// Each operation chooses one of its eligible machines.
    PerOperation,
    /// Each job chooses one machine group (factory) for all its operations.
    PerJob,
}

/// How the makespan is bounded from below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MakespanLink {
    /// `Cmax ≥` completion of each job's last operation.
    Completion,
    /// `Cmax ≥` total load of each machine. Only valid for
    /// single-operation jobs without setups.
    MachineLoad,
}

/// Capability descriptor of a problem variant.
///
/// One generic compiler reads these flags instead of keeping a separate
/// formulation per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// More than one machine can process an operation.
    pub multiple_resources_per_stage: bool,
    /// Fixed or job-specific routes.
    pub routing: Routing,
    /// Processing time depends on the chosen machine.
    pub resource_dependent_duration: bool,
    /// Setup times depend on the job sequence.
    pub sequence_dependent_setup: bool,
    /// Assignment decision scope.
    pub assignment: AssignmentScope,
    /// Makespan linking family.
    pub makespan: MakespanLink,
}

/// A disjunctive resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Stage this machine belongs to (the machine itself for job shops).
    pub stage: usize,
    /// Factory, for distributed variants.
    pub group: Option<usize>,
}

/// A machine that may process an operation, with its processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineOption {
    /// Machine index.
    pub machine: usize,
    /// Processing time on that machine.
    pub duration: i64,
}

/// One step of a job's route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Eligible machines, in machine order.
    pub options: Vec<MachineOption>,
}

impl Operation {
    /// Creates an operation with a single machine.
    pub fn fixed(machine: usize, duration: i64) -> Self {
        Self {
            options: vec![MachineOption { machine, duration }],
        }
    }

    /// Processing time on `machine`, if eligible.
    pub fn duration_on(&self, machine: usize) -> Option<i64> {
        self.options
            .iter()
            .find(|o| o.machine == machine)
            .map(|o| o.duration)
    }

    /// Position of `machine` within `options`.
    pub fn option_index(&self, machine: usize) -> Option<usize> {
        self.options.iter().position(|o| o.machine == machine)
    }

    /// Largest processing time over eligible machines.
    pub fn max_duration(&self) -> i64 {
        self.options.iter().map(|o| o.duration).max().unwrap_or(0)
    }

    /// The processing time if it is the same on every eligible machine.
    pub fn uniform_duration(&self) -> Option<i64> {
        let first = self.options.first()?.duration;
        self.options
            .iter()
            .all(|o| o.duration == first)
            .then_some(first)
    }

    /// Whether `machine` is eligible.
    pub fn is_eligible(&self, machine: usize) -> bool {
        self.duration_on(machine).is_some()
    }
}

/// A job: operations in route order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Operations in processing order.
    pub operations: Vec<Operation>,
}

impl Job {
    /// Sum of the largest processing time of each operation, saturating
    /// at `i64::MAX`.
    pub fn max_total_duration(&self) -> i64 {
        self.checked_total_duration().unwrap_or(i64::MAX)
    }

    /// Sum of the largest processing time of each operation, `None` on
    /// overflow.
    pub fn checked_total_duration(&self) -> Option<i64> {
        self.operations
            .iter()
            .try_fold(0_i64, |total, op| total.checked_add(op.max_duration()))
    }

    /// Number of operations.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

/// A validated scheduling instance. Immutable once constructed.
///
/// # Examples
///
/// ```
/// use u_formulate::models::{Instance, ProblemKind};
///
/// let instance = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
/// assert_eq!(instance.kind(), ProblemKind::FlowShop);
/// assert_eq!(instance.job_count(), 2);
/// assert_eq!(instance.stage_count(), 2);
///
/// // A route that leaves the stage range is rejected up front.
/// assert!(Instance::job_shop(vec![vec![1, 1]], vec![vec![0, 2]]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InstanceData")]
pub struct Instance {
    kind: ProblemKind,
    stage_count: usize,
    group_count: usize,
    machines: Vec<Machine>,
    jobs: Vec<Job>,
    setups: Option<SetupTimes>,
}

/// Unvalidated mirror of [`Instance`] used for deserialization.
#[derive(Deserialize)]
struct InstanceData {
    kind: ProblemKind,
    stage_count: usize,
    group_count: usize,
    machines: Vec<Machine>,
    jobs: Vec<Job>,
    setups: Option<SetupTimes>,
}

impl TryFrom<InstanceData> for Instance {
    type Error = InstanceError;

    fn try_from(data: InstanceData) -> Result<Self, Self::Error> {
        Instance {
            kind: data.kind,
            stage_count: data.stage_count,
            group_count: data.group_count,
            machines: data.machines,
            jobs: data.jobs,
            setups: data.setups,
        }
        .validated()
    }
}

impl Instance {
    /// Flow shop: `p[job][stage]`.
    pub fn flow_shop(processing: Vec<Vec<i64>>) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        let stages = validation::check_time_table(&mut errors, "processing times", &processing, None);
        errors.finish().map_err(InstanceError::Invalid)?;
        let stages = stages.unwrap_or(0);

        Self::serial(ProblemKind::FlowShop, stages, &processing, None).validated()
    }

    /// Distributed flow shop: `factory_count` identical factories, `p[job][stage]`.
    pub fn distributed_flow_shop(
        factory_count: usize,
        processing: Vec<Vec<i64>>,
    ) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        validation::check_count(&mut errors, "factory count", factory_count);
        let stages = validation::check_time_table(&mut errors, "processing times", &processing, None);
        errors.finish().map_err(InstanceError::Invalid)?;
        let stages = stages.unwrap_or(0);

        // machine f * stages + i is stage i of factory f
        let machines = (0..factory_count)
            .flat_map(|f| {
                (0..stages).map(move |i| Machine {
                    stage: i,
                    group: Some(f),
                })
            })
            .collect();

        let jobs = processing
            .iter()
            .map(|row| Job {
                operations: row
                    .iter()
                    .enumerate()
                    .map(|(i, &duration)| Operation {
                        options: (0..factory_count)
                            .map(|f| MachineOption {
                                machine: f * stages + i,
                                duration,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            kind: ProblemKind::DistributedFlowShop,
            stage_count: stages,
            group_count: factory_count,
            machines,
            jobs,
            setups: None,
        }
        .validated()
    }

    /// Hybrid flow shop: `machines_per_stage[stage]` identical machines, `p[job][stage]`.
    pub fn hybrid_flow_shop(
        machines_per_stage: Vec<usize>,
        processing: Vec<Vec<i64>>,
    ) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        let stages = machines_per_stage.len();
        for (i, &count) in machines_per_stage.iter().enumerate() {
            validation::check_count(&mut errors, &format!("machine count of stage {i}"), count);
        }
        validation::check_time_table(
            &mut errors,
            "processing times",
            &processing,
            Some(stages),
        );
        errors.finish().map_err(InstanceError::Invalid)?;

        let mut machines = Vec::new();
        let mut stage_machines = Vec::with_capacity(stages);
        for (i, &count) in machines_per_stage.iter().enumerate() {
            stage_machines.push((machines.len()..machines.len() + count).collect::<Vec<_>>());
            machines.extend((0..count).map(|_| Machine {
                stage: i,
                group: None,
            }));
        }

        let jobs = processing
            .iter()
            .map(|row| Job {
                operations: row
                    .iter()
                    .zip(&stage_machines)
                    .map(|(&duration, ms)| Operation {
                        options: ms
                            .iter()
                            .map(|&machine| MachineOption { machine, duration })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            kind: ProblemKind::HybridFlowShop,
            stage_count: stages,
            group_count: 1,
            machines,
            jobs,
            setups: None,
        }
        .validated()
    }

    /// Job shop: `p[job][position]` and `routes[job][position]` = machine (0-based).
    pub fn job_shop(
        processing: Vec<Vec<i64>>,
        routes: Vec<Vec<usize>>,
    ) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        let stages = validation::check_time_table(&mut errors, "processing times", &processing, None);
        if let Some(stages) = stages {
            validation::check_routes(&mut errors, &routes, processing.len(), stages);
        }
        errors.finish().map_err(InstanceError::Invalid)?;
        let stages = stages.unwrap_or(0);

        let jobs = processing
            .iter()
            .zip(&routes)
            .map(|(row, route)| Job {
                operations: row
                    .iter()
                    .zip(route)
                    .map(|(&duration, &machine)| Operation::fixed(machine, duration))
                    .collect(),
            })
            .collect();

        Self {
            kind: ProblemKind::JobShop,
            stage_count: stages,
            group_count: 1,
            machines: Self::single_machines(stages),
            jobs,
            setups: None,
        }
        .validated()
    }

    /// Flexible job shop: `p[job][operation][machine]`, 0 = ineligible.
    pub fn flexible_job_shop(
        machine_count: usize,
        processing: Vec<Vec<Vec<i64>>>,
    ) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        validation::check_count(&mut errors, "machine count", machine_count);
        validation::check_flexible_table(&mut errors, &processing, machine_count);
        errors.finish().map_err(InstanceError::Invalid)?;

        let jobs = processing
            .iter()
            .map(|ops| Job {
                operations: ops
                    .iter()
                    .map(|row| Operation {
                        options: row
                            .iter()
                            .enumerate()
                            .filter(|&(_, &t)| t > 0)
                            .map(|(machine, &duration)| MachineOption { machine, duration })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            kind: ProblemKind::FlexibleJobShop,
            stage_count: machine_count,
            group_count: 1,
            machines: Self::single_machines(machine_count),
            jobs,
            setups: None,
        }
        .validated()
    }

    /// Unrelated parallel machines: `p[job][machine]`.
    pub fn parallel_machine(processing: Vec<Vec<i64>>) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        let machine_count =
            validation::check_time_table(&mut errors, "processing times", &processing, None);
        errors.finish().map_err(InstanceError::Invalid)?;
        let machine_count = machine_count.unwrap_or(0);

        let jobs = processing
            .iter()
            .map(|row| Job {
                operations: vec![Operation {
                    options: row
                        .iter()
                        .enumerate()
                        .map(|(machine, &duration)| MachineOption { machine, duration })
                        .collect(),
                }],
            })
            .collect();

        Self {
            kind: ProblemKind::ParallelMachine,
            stage_count: machine_count,
            group_count: 1,
            machines: Self::single_machines(machine_count),
            jobs,
            setups: None,
        }
        .validated()
    }

    /// Identical parallel machines: one duration per job.
    pub fn identical_parallel_machine(
        durations: Vec<i64>,
        machine_count: usize,
    ) -> Result<Self, InstanceError> {
        let processing = durations
            .into_iter()
            .map(|d| vec![d; machine_count])
            .collect();
        Self::parallel_machine(processing)
    }

    /// Permutation flow shop with setups: `p[job][stage]`, `setups[stage][pred][succ]`.
    pub fn setup_flow_shop(
        processing: Vec<Vec<i64>>,
        setups: Vec<Vec<Vec<i64>>>,
    ) -> Result<Self, InstanceError> {
        let mut errors = Collector::new();
        let stages = validation::check_time_table(&mut errors, "processing times", &processing, None);
        if let Some(stages) = stages {
            validation::check_setup_tables(&mut errors, &setups, stages, processing.len());
        }
        errors.finish().map_err(InstanceError::Invalid)?;
        let stages = stages.unwrap_or(0);

        let setups = SetupTimes::new(setups.into_iter().map(SetupMatrix::new).collect());
        Self::serial(
            ProblemKind::SetupFlowShop,
            stages,
            &processing,
            Some(setups),
        )
        .validated()
    }

    fn serial(
        kind: ProblemKind,
        stages: usize,
        processing: &[Vec<i64>],
        setups: Option<SetupTimes>,
    ) -> Self {
        let jobs = processing
            .iter()
            .map(|row| Job {
                operations: row
                    .iter()
                    .enumerate()
                    .map(|(i, &duration)| Operation::fixed(i, duration))
                    .collect(),
            })
            .collect();

        Self {
            kind,
            stage_count: stages,
            group_count: 1,
            machines: Self::single_machines(stages),
            jobs,
            setups,
        }
    }

    /// Runs the checks every instance passes, however it was built.
    fn validated(self) -> Result<Self, InstanceError> {
        validation::validate_instance(&self).map_err(InstanceError::Invalid)?;
        Ok(self)
    }

    fn single_machines(count: usize) -> Vec<Machine> {
        (0..count)
            .map(|stage| Machine { stage, group: None })
            .collect()
    }

    /// Problem variant.
    pub fn kind(&self) -> ProblemKind {
        self.kind
    }

    /// Capability descriptor of the variant.
    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Number of jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of stages (machines for job-shop and parallel-machine variants).
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Number of factories (1 unless distributed).
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of disjunctive resources.
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    /// All machines.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// All jobs.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Operation `op` of job `job`.
    pub fn operation(&self, job: usize, op: usize) -> Option<&Operation> {
        self.jobs.get(job).and_then(|j| j.operations.get(op))
    }

    /// Setup matrices, for setup variants.
    pub fn setups(&self) -> Option<&SetupTimes> {
        self.setups.as_ref()
    }

    /// Setup time on `machine` between two jobs (0 without setups).
    pub fn setup_time(&self, machine: usize, pred: usize, succ: usize) -> i64 {
        self.setups
            .as_ref()
            .map(|s| s.get(machine, pred, succ))
            .unwrap_or(0)
    }

    /// Upper bound on any completion time of a semi-active schedule.
    ///
    /// Processing every operation one after another on its slowest
    /// machine, plus the largest incoming setup for every job on every
    /// machine, never leaves idle time a semi-active schedule would
    /// need, so no optimal schedule finishes later.
    ///
    /// Saturates at `i64::MAX`; validated instances never reach it.
    pub fn horizon(&self) -> i64 {
        self.checked_horizon().unwrap_or(i64::MAX)
    }

    /// [`horizon`](Self::horizon), `None` when the sum overflows.
    pub fn checked_horizon(&self) -> Option<i64> {
        let processing = self
            .jobs
            .iter()
            .try_fold(0_i64, |total, job| total.checked_add(job.checked_total_duration()?))?;
        let setups = match &self.setups {
            Some(setups) => setups.matrices().iter().try_fold(0_i64, |total, m| {
                (0..m.size()).try_fold(total, |total, j| total.checked_add(m.max_incoming(j)))
            })?,
            None => 0,
        };
        processing.checked_add(setups)
    }

    /// Largest processing time of any operation on any machine.
    pub fn max_duration(&self) -> i64 {
        self.jobs
            .iter()
            .flat_map(|j| j.operations.iter())
            .map(Operation::max_duration)
            .max()
            .unwrap_or(0)
    }

    /// Instance-derived big-M constant.
    ///
    /// A relaxed disjunction row requires `c_b − c_a ≥ p + s − M`. With
    /// both completions in `[0, horizon]` the left side is at least
    /// `−horizon`, so `M = horizon + max duration + max setup` keeps
    /// every relaxed row slack without admitting anything more.
    ///
    /// Saturates at `i64::MAX`; validated instances never reach it.
    pub fn big_m(&self) -> i64 {
        self.checked_big_m().unwrap_or(i64::MAX)
    }

    /// [`big_m`](Self::big_m), `None` when the sum overflows.
    pub fn checked_big_m(&self) -> Option<i64> {
        let max_setup = self.setups.as_ref().map(SetupTimes::max).unwrap_or(0);
        self.checked_horizon()?
            .checked_add(self.max_duration())?
            .checked_add(max_setup)
    }
}
