//! Random instance generation.
//!
//! Produces reproducible benchmark instances of every problem kind from
//! a [`GeneratorConfig`]. Functions are generic over the random source;
//! [`seeded`] wraps them with a seeded `StdRng`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InstanceError;
use crate::models::{Instance, ProblemKind};

/// Size and value ranges of generated instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of jobs.
    pub jobs: usize,
    /// Stages (flow variants) or machines (job-shop and parallel variants).
    pub stages: usize,
    /// Largest number of machines per stage in hybrid flow shops.
    pub max_machines_per_stage: usize,
    /// Factories in distributed flow shops.
    pub factories: usize,
    /// Smallest processing time.
    pub min_duration: i64,
    /// Largest processing time.
    pub max_duration: i64,
    /// Largest setup time.
    pub max_setup: i64,
    /// Probability that a machine is eligible for a flexible operation.
    pub eligibility: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            stages: 3,
            max_machines_per_stage: 3,
            factories: 2,
            min_duration: 1,
            max_duration: 10,
            max_setup: 5,
            eligibility: 0.6,
        }
    }
}

impl GeneratorConfig {
    /// Creates a configuration with `jobs` jobs and `stages` stages.
    pub fn new(jobs: usize, stages: usize) -> Self {
        Self {
            jobs,
            stages,
            ..Self::default()
        }
    }

    fn duration<R: Rng>(&self, rng: &mut R) -> i64 {
        let lo = self.min_duration.max(0);
        rng.random_range(lo..=self.max_duration.max(lo))
    }

    fn times<R: Rng>(&self, rng: &mut R, cols: usize) -> Vec<i64> {
        (0..cols).map(|_| self.duration(rng)).collect()
    }

    fn table<R: Rng>(&self, rng: &mut R, rows: usize, cols: usize) -> Vec<Vec<i64>> {
        (0..rows).map(|_| self.times(rng, cols)).collect()
    }
}

/// Generates a random instance of `kind`.
pub fn random_instance<R: Rng>(
    kind: ProblemKind,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Instance, InstanceError> {
    let n = config.jobs;
    let g = config.stages;

    let instance = match kind {
        ProblemKind::FlowShop => Instance::flow_shop(config.table(rng, n, g))?,
        ProblemKind::DistributedFlowShop => {
            Instance::distributed_flow_shop(config.factories, config.table(rng, n, g))?
        }
        ProblemKind::HybridFlowShop => {
            let widest = config.max_machines_per_stage.max(1);
            let machines = (0..g).map(|_| rng.random_range(1..=widest)).collect();
            Instance::hybrid_flow_shop(machines, config.table(rng, n, g))?
        }
        ProblemKind::JobShop => {
            let processing = config.table(rng, n, g);
            let routes = (0..n)
                .map(|_| {
                    let mut route: Vec<usize> = (0..g).collect();
                    route.shuffle(rng);
                    route
                })
                .collect();
            Instance::job_shop(processing, routes)?
        }
        ProblemKind::FlexibleJobShop => {
            let processing = (0..n)
                .map(|_| (0..g).map(|_| flexible_row(config, rng)).collect())
                .collect();
            Instance::flexible_job_shop(g, processing)?
        }
        ProblemKind::ParallelMachine => Instance::parallel_machine(config.table(rng, n, g))?,
        ProblemKind::SetupFlowShop => {
            let processing = config.table(rng, n, g);
            let setups = (0..g).map(|_| setup_matrix(config, rng)).collect();
            Instance::setup_flow_shop(processing, setups)?
        }
    };

    debug!(
        event = "instance_generated",
        kind = kind.name(),
        jobs = instance.job_count(),
        machines = instance.machine_count(),
    );
    Ok(instance)
}

/// Generates a random instance from a fixed seed.
///
/// # Examples
///
/// ```
/// use u_formulate::generate::{seeded, GeneratorConfig};
/// use u_formulate::models::ProblemKind;
///
/// let config = GeneratorConfig::new(5, 3);
/// let a = seeded(ProblemKind::JobShop, &config, 7).unwrap();
/// let b = seeded(ProblemKind::JobShop, &config, 7).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.job_count(), 5);
/// ```
pub fn seeded(
    kind: ProblemKind,
    config: &GeneratorConfig,
    seed: u64,
) -> Result<Instance, InstanceError> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_instance(kind, config, &mut rng)
}

/// A flexible operation row with at least one eligible machine.
fn flexible_row<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Vec<i64> {
    let lo = config.min_duration.max(1);
    let hi = config.max_duration.max(lo);
    let mut row: Vec<i64> = (0..config.stages)
        .map(|_| {
            if rng.random_bool(config.eligibility.clamp(0.0, 1.0)) {
                rng.random_range(lo..=hi)
            } else {
                0
            }
        })
        .collect();
    if !row.is_empty() && row.iter().all(|&t| t == 0) {
        let m = rng.random_range(0..row.len());
        row[m] = rng.random_range(lo..=hi);
    }
    row
}

fn setup_matrix<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Vec<Vec<i64>> {
    let n = config.jobs;
    let hi = config.max_setup.max(0);
    (0..n)
        .map(|a| {
            (0..n)
                .map(|b| if a == b { 0 } else { rng.random_range(0..=hi) })
                .collect()
        })
        .collect()
}
