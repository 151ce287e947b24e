//! Scheduling formulation compiler for the U-Engine ecosystem.
//!
//! Turns shop-scheduling instances into solver-ready models. One
//! capability descriptor per problem kind drives a single generic
//! compiler, so flow shops, distributed and hybrid flow shops, job
//! shops, flexible job shops, parallel machines and flow shops with
//! sequence-dependent setups share the same code path.
//!
//! # Modules
//!
//! - **`models`**: `Instance`, `ProblemKind`, `Capabilities`, `Schedule`
//! - **`mip`**: variable catalog, constraint families, `ScheduleMipBuilder`
//! - **`cp`**: interval model and `ScheduleCpBuilder`
//! - **`solver`**: solver traits, the `good_lp` MILP adapter and a greedy CP solver
//! - **`extract`**: `Outcome` and schedule decoding
//! - **`io`** / **`generate`**: instance text formats and random instances
//! - **`config`**, **`error`**, **`validation`**: ambient plumbing
//!
//! # Example
//!
//! ```
//! use u_formulate::config::SolverConfig;
//! use u_formulate::extract::Outcome;
//! use u_formulate::mip::ScheduleMipBuilder;
//! use u_formulate::models::Instance;
//! use u_formulate::solver::GoodLpSolver;
//!
//! let instance = Instance::flow_shop(vec![vec![3, 2], vec![2, 4]]).unwrap();
//! let solved = ScheduleMipBuilder::new(&instance)
//!     .build()
//!     .unwrap()
//!     .solve(&GoodLpSolver::new(), &SolverConfig::default())
//!     .unwrap();
//! assert!(matches!(solved.outcome, Outcome::Optimal { .. }));
//! assert!((solved.outcome.makespan().unwrap() - 8.0).abs() < 1e-6);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Pan (1997), "A study of integer programming formulations for
//!   scheduling problems"
//! - Naderi & Ruiz (2010), "The distributed permutation flowshop
//!   scheduling problem"

pub mod config;
pub mod cp;
pub mod error;
pub mod extract;
pub mod generate;
pub mod io;
pub mod mip;
pub mod models;
pub mod solver;
pub mod validation;
