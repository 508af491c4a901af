//! Transportation network entities for the PDPT.
//!
//! All types here are immutable value objects created once at instance-load
//! time. The formulation builders only ever read them and use the `index`
//! fields to key solver variables.

pub mod graph;
pub mod request;
pub mod vehicle;

pub use graph::{Arc, Graph, Node, NodeKind};
pub use request::Request;
pub use vehicle::Vehicle;
