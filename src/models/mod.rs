//! Scheduling domain models.
//!
//! Instances of the seven supported shop problems, the capability
//! descriptor that tells the formulation layer which variables and
//! constraints a problem needs, and decoded schedules.
//!
//! # Problem kinds
//!
//! | Kind | Resources | Routing | Machine choice |
//! |------|-----------|---------|----------------|
//! | FlowShop | one per stage | fixed | none |
//! | DistributedFlowShop | one per stage per factory | fixed | factory per job |
//! | HybridFlowShop | several per stage | fixed | machine per operation |
//! | JobShop | one per machine | per job | none |
//! | FlexibleJobShop | one per machine | per job | machine per operation |
//! | ParallelMachine | one per machine | single operation | machine per job |
//! | SetupFlowShop | one per stage | fixed, common permutation | none |

mod instance;
mod schedule;
mod setup;

pub use instance::{
    AssignmentScope, Capabilities, Instance, Job, Machine, MachineOption, MakespanLink,
    Operation, ProblemKind, Routing,
};
pub use schedule::{Schedule, ScheduledOperation, Violation, ViolationType};
pub use setup::{SetupMatrix, SetupTimes};
