//! Variable catalog.
//!
//! Enumerates every decision variable an instance needs, in a stable
//! order (assignment, order, successor, completion, start-token
//! completion, rank, makespan), and maps typed keys to model ids.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{VarId, Variable};
use crate::models::{AssignmentScope, Instance, MakespanLink};

/// Predecessor in a successor arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predecessor {
    /// The synthetic start token.
    Start,
    /// A real job.
    Job(usize),
}

/// Typed key of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKey {
    /// Operation `op` of `job` runs on `machine`.
    OperationAssign { job: usize, op: usize, machine: usize },
    /// `job` is processed in factory `group`.
    JobAssign { job: usize, group: usize },
    /// Operation `first` precedes operation `second` on their shared machine.
    Order {
        first: (usize, usize),
        second: (usize, usize),
    },
    /// `succ` immediately follows `pred` on every machine.
    Successor { pred: Predecessor, succ: usize },
    /// Completion time of operation `op` of `job`.
    Completion { job: usize, op: usize },
    /// Completion time of the start token at `stage`.
    StartCompletion { stage: usize },
    /// Position of `job` in the successor chain.
    Rank { job: usize },
    /// Makespan.
    Makespan,
}

impl VarKey {
    /// Builds the model variable for this key.
    pub fn variable(&self) -> Variable {
        match self {
            Self::OperationAssign { .. }
            | Self::JobAssign { .. }
            | Self::Order { .. }
            | Self::Successor { .. } => Variable::binary(self.to_string()),
            Self::Completion { .. }
            | Self::StartCompletion { .. }
            | Self::Rank { .. }
            | Self::Makespan => Variable::continuous(self.to_string()),
        }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OperationAssign { job, op, machine } => write!(f, "y_{job}_{op}_{machine}"),
            Self::JobAssign { job, group } => write!(f, "q_{job}_{group}"),
            Self::Order {
                first: (j1, k1),
                second: (j2, k2),
            } => write!(f, "x_{j1}_{k1}_{j2}_{k2}"),
            Self::Successor {
                pred: Predecessor::Start,
                succ,
            } => write!(f, "z_start_{succ}"),
            Self::Successor {
                pred: Predecessor::Job(p),
                succ,
            } => write!(f, "z_{p}_{succ}"),
            Self::Completion { job, op } => write!(f, "c_{job}_{op}"),
            Self::StartCompletion { stage } => write!(f, "c_start_{stage}"),
            Self::Rank { job } => write!(f, "u_{job}"),
            Self::Makespan => f.write_str("Cmax"),
        }
    }
}

/// An order variable together with the machines its two operations share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPair {
    /// The order variable.
    pub var: VarId,
    /// `(job, op)` of the operation that precedes when `var = 1`.
    pub first: (usize, usize),
    /// `(job, op)` of the other operation.
    pub second: (usize, usize),
    /// Machines eligible for both operations, ascending.
    pub machines: Vec<usize>,
}

/// Deterministic variable enumeration for one instance.
#[derive(Debug, Clone)]
pub struct VariableCatalog {
    keys: Vec<VarKey>,
    index: HashMap<VarKey, VarId>,
    order_pairs: Vec<OrderPair>,
    assignment: AssignmentScope,
}

impl VariableCatalog {
    /// Enumerates the variables `instance` needs.
    pub fn for_instance(instance: &Instance) -> Self {
        let caps = instance.capabilities();
        let mut catalog = Self {
            keys: Vec::new(),
            index: HashMap::new(),
            order_pairs: Vec::new(),
            assignment: caps.assignment,
        };
        let jobs = instance.jobs();

        match caps.assignment {
            AssignmentScope::PerOperation => {
                for (j, job) in jobs.iter().enumerate() {
                    for (k, op) in job.operations.iter().enumerate() {
                        for option in &op.options {
                            catalog.push(VarKey::OperationAssign {
                                job: j,
                                op: k,
                                machine: option.machine,
                            });
                        }
                    }
                }
            }
            AssignmentScope::PerJob => {
                for j in 0..jobs.len() {
                    for group in 0..instance.group_count() {
                        catalog.push(VarKey::JobAssign { job: j, group });
                    }
                }
            }
            AssignmentScope::None => {}
        }

        // Sequencing is expressed by successor arcs for setup variants and
        // is absent when the makespan is bounded by machine loads.
        let pairwise =
            !caps.sequence_dependent_setup && caps.makespan == MakespanLink::Completion;
        if pairwise {
            let ops: Vec<(usize, usize)> = jobs
                .iter()
                .enumerate()
                .flat_map(|(j, job)| (0..job.operations.len()).map(move |k| (j, k)))
                .collect();
            for (a, &first) in ops.iter().enumerate() {
                for &second in &ops[a + 1..] {
                    if first.0 == second.0 {
                        continue;
                    }
                    let machines = shared_machines(instance, first, second);
                    if machines.is_empty() {
                        continue;
                    }
                    let var = catalog.push(VarKey::Order { first, second });
                    catalog.order_pairs.push(OrderPair {
                        var,
                        first,
                        second,
                        machines,
                    });
                }
            }
        }

        if caps.sequence_dependent_setup {
            for succ in 0..jobs.len() {
                catalog.push(VarKey::Successor {
                    pred: Predecessor::Start,
                    succ,
                });
            }
            for pred in 0..jobs.len() {
                for succ in (0..jobs.len()).filter(|&s| s != pred) {
                    catalog.push(VarKey::Successor {
                        pred: Predecessor::Job(pred),
                        succ,
                    });
                }
            }
        }

        if caps.makespan == MakespanLink::Completion {
            for (j, job) in jobs.iter().enumerate() {
                for k in 0..job.operations.len() {
                    catalog.push(VarKey::Completion { job: j, op: k });
                }
            }
        }

        if caps.sequence_dependent_setup {
            for stage in 0..instance.stage_count() {
                catalog.push(VarKey::StartCompletion { stage });
            }
            for job in 0..jobs.len() {
                catalog.push(VarKey::Rank { job });
            }
        }

        catalog.push(VarKey::Makespan);
        catalog
    }

    fn push(&mut self, key: VarKey) -> VarId {
        let id = VarId(self.keys.len());
        self.keys.push(key);
        self.index.insert(key, id);
        id
    }

    /// Keys in id order.
    pub fn keys(&self) -> &[VarKey] {
        &self.keys
    }

    /// Model variables in id order.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.keys.iter().map(VarKey::variable)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the catalog is empty (never, the makespan always exists).
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Id of `key`.
    pub fn get(&self, key: VarKey) -> Option<VarId> {
        self.index.get(&key).copied()
    }

    /// Key of `id`.
    pub fn key(&self, id: VarId) -> Option<VarKey> {
        self.keys.get(id.index()).copied()
    }

    /// Id of the makespan variable.
    pub fn makespan(&self) -> VarId {
        // pushed last in `for_instance`
        VarId(self.keys.len().saturating_sub(1))
    }

    /// Id of the completion variable of `(job, op)`.
    pub fn completion(&self, job: usize, op: usize) -> Option<VarId> {
        self.get(VarKey::Completion { job, op })
    }

    /// Id of the assignment variable placing `(job, op)` on `machine`.
    pub fn operation_assign(&self, job: usize, op: usize, machine: usize) -> Option<VarId> {
        self.get(VarKey::OperationAssign { job, op, machine })
    }

    /// Id of the factory assignment variable of `job`.
    pub fn job_assign(&self, job: usize, group: usize) -> Option<VarId> {
        self.get(VarKey::JobAssign { job, group })
    }

    /// Id of the successor arc `pred → succ`.
    pub fn successor(&self, pred: Predecessor, succ: usize) -> Option<VarId> {
        self.get(VarKey::Successor { pred, succ })
    }

    /// Id of the rank variable of `job`.
    pub fn rank(&self, job: usize) -> Option<VarId> {
        self.get(VarKey::Rank { job })
    }

    /// Order variables with their shared machines.
    pub fn order_pairs(&self) -> &[OrderPair] {
        &self.order_pairs
    }

    /// Number of variables of each key class, in catalog order.
    pub fn count_where(&self, predicate: impl Fn(&VarKey) -> bool) -> usize {
        self.keys.iter().filter(|k| predicate(k)).count()
    }

    /// Gate variables: the assignment variables that must all be 1 for
    /// `(job, op)` to run on `machine`.
    ///
    /// Empty when the machine is fixed by the instance.
    pub fn gates(&self, instance: &Instance, job: usize, op: usize, machine: usize) -> Vec<VarId> {
        match self.assignment {
            AssignmentScope::None => Vec::new(),
            AssignmentScope::PerOperation => {
                self.operation_assign(job, op, machine).into_iter().collect()
            }
            AssignmentScope::PerJob => instance
                .machines()
                .get(machine)
                .and_then(|m| m.group)
                .and_then(|group| self.job_assign(job, group))
                .into_iter()
                .collect(),
        }
    }
}

/// Machines eligible for both operations.
fn shared_machines(instance: &Instance, a: (usize, usize), b: (usize, usize)) -> Vec<usize> {
    let (Some(op_a), Some(op_b)) = (instance.operation(a.0, a.1), instance.operation(b.0, b.1))
    else {
        return Vec::new();
    };
    let mut machines: Vec<usize> = op_a
        .options
        .iter()
        .map(|o| o.machine)
        .filter(|&m| op_b.is_eligible(m))
        .collect();
    machines.sort_unstable();
    machines
}
