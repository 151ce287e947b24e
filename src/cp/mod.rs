//! Interval (CP) formulation of scheduling instances.
//!
//! Every operation becomes an interval variable. Machine choice is an
//! `Alternative` over optional per-machine intervals, machine capacity
//! is `NoOverlap` (with transition times when setups apply), and the
//! objective minimizes the latest end of the last operations.
//!
//! The model is solver-independent: any [`CpSolver`](crate::solver::CpSolver)
//! can consume it.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod encoder;
mod model;
mod variables;

pub use encoder::{operation_name, option_name, HybridEncoding, ScheduleCpBuilder};
pub use model::{Constraint, CpModel, Objective};
pub use variables::{Bounds, IntervalVar};
