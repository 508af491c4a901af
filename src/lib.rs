//! PDPT Solver Library
//!
//! MILP formulations for the Pickup and Delivery Problem with Transfers
//! (PDPT) and its time-windowed variant (PDPTWT): a fleet of capacitated
//! vehicles runs between depots to satisfy pickup/delivery requests, and
//! loads may be handed between vehicles at transfer stations.
//!
//! # Features
//!
//! - Immutable network model (nodes, complete arc set, vehicles, requests)
//! - Three alternative formulations (Rais, Lyu, Sampaio) emitting the same
//!   network into different variable/constraint sets
//! - Declarative optimization model with normalized solver results,
//!   backed by Gurobi when built with the `gurobi` feature
//! - Instance parsing, synthetic instance generation, CSV result logging
//!   and aggregation
//!
//! # Example
//!
//! ```no_run
//! use pdpt_solver::formulations::{lyu, FormulationConfig};
//! use pdpt_solver::instance::Instance;
//!
//! let instance = Instance::from_file("PDPT-R5-K2-T1-Q100-6.txt", false).unwrap();
//! let config = FormulationConfig::default();
//!
//! let mut model = lyu::build(
//!     &instance.graph,
//!     &instance.vehicles,
//!     &instance.requests,
//!     &config,
//! ).unwrap();
//!
//! model.optimize(config.time_limit).unwrap();
//! println!("{}", model.result().unwrap());
//! ```

pub mod formulations;
pub mod generator;
pub mod instance;
pub mod model;
pub mod network;
pub mod report;

pub use instance::Instance;
pub use model::{Model, SolveResult, SolverStatus};
pub use network::{Graph, Node, NodeKind, Request, Vehicle};
