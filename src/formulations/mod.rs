//! MILP formulation builders for the PDPT and PDPTWT.
//!
//! Three alternative formulations of the same transportation network, each
//! named after the research work it reproduces. All of them share the
//! route/flow variable families, the travel-cost objective and a set of
//! common constraint families (see [`families`]); they differ in how they
//! eliminate sub-tours and synchronize transfers:
//!
//! - [`rais`]: explicit precedence/visit-order variables with Big-M
//!   sequencing; time windows only in the optional valid-inequalities
//!   block.
//! - [`lyu`]: no precedence variables; sub-tours are eliminated implicitly
//!   through arrival/departure time propagation with tight,
//!   instance-derived Big-M bounds.
//! - [`sampaio`]: closed-loop depots (origin and destination coincide) and
//!   time-window machinery like Lyu's; transfers may hand a request from a
//!   vehicle to itself.

pub mod families;
pub mod lyu;
pub mod rais;
pub mod sampaio;

/// Build-time configuration shared by the three builders.
///
/// Each flag is consulted once while the model is being constructed; no
/// branching happens after the model has been emitted.
#[derive(Debug, Clone)]
pub struct FormulationConfig {
    /// Emit the extended valid-inequalities/time-window block where it is
    /// optional (Rais, Sampaio). Lyu carries the block unconditionally and
    /// ignores the flag.
    pub vi: bool,
    /// Allow a vehicle to hand a request off to itself at a transfer
    /// station. Only consulted by the Sampaio builder, which permits this
    /// on purpose; Rais and Lyu always pair distinct vehicles.
    pub allow_self_handoff: bool,
    /// Solver time limit in seconds.
    pub time_limit: f64,
}

impl Default for FormulationConfig {
    fn default() -> Self {
        FormulationConfig { vi: false, allow_self_handoff: true, time_limit: 3600.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::line_instance;
    use super::*;
    use crate::network::{Node, NodeKind, Request, Vehicle};

    #[test]
    fn test_build_fails_fast_on_dangling_request() {
        let (graph, vehicles, _) = line_instance();

        // request whose endpoints never made it into the graph
        let p = Node::new(90, NodeKind::Pickup, (0, 0), 0.0, 100.0).unwrap();
        let d = Node::new(91, NodeKind::Delivery, (1, 0), 0.0, 100.0).unwrap();
        let requests = vec![Request::new(0, &p, &d, 5).unwrap()];

        let config = FormulationConfig::default();
        assert!(rais::build(&graph, &vehicles, &requests, &config).is_err());
        assert!(lyu::build(&graph, &vehicles, &requests, &config).is_err());
        assert!(sampaio::build(&graph, &vehicles, &requests, &config).is_err());
    }

    #[test]
    fn test_build_fails_fast_on_duplicate_vehicle_index() {
        let (graph, vehicles, requests) = line_instance();

        let origin = graph.node(vehicles[0].origin).unwrap();
        let dest = graph.node(vehicles[0].dest).unwrap();
        let duplicate = Vehicle::new(vehicles[0].index, origin, dest, 50, 1.0).unwrap();
        let mut vehicles = vehicles;
        vehicles.push(duplicate);

        let config = FormulationConfig::default();
        assert!(lyu::build(&graph, &vehicles, &requests, &config).is_err());
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built toy networks shared by the builder tests.

    use crate::network::{Graph, Node, NodeKind, Request, Vehicle};

    fn node(index: usize, kind: NodeKind, x: i64, y: i64) -> Node {
        Node::new(index, kind, (x, y), 0.0, 1000.0).unwrap()
    }

    /// One vehicle, one request, no transfer stations. Depots, pickup and
    /// delivery on a straight line with arc costs 10, 5 and 10, so the
    /// optimal route costs exactly 25.
    pub fn line_instance() -> (Graph, Vec<Vehicle>, Vec<Request>) {
        let o = node(0, NodeKind::OriginDepot, 0, 0);
        let p = node(1, NodeKind::Pickup, 10, 0);
        let d = node(2, NodeKind::Delivery, 15, 0);
        let e = node(3, NodeKind::DestinationDepot, 25, 0);

        let vehicles = vec![Vehicle::new(0, &o, &e, 100, 1.0).unwrap()];
        let requests = vec![Request::new(0, &p, &d, 10).unwrap()];
        let graph = Graph::complete(vec![o, p, d, e]).unwrap();
        (graph, vehicles, requests)
    }

    /// Two vehicles, two requests and one transfer station.
    pub fn transfer_instance() -> (Graph, Vec<Vehicle>, Vec<Request>) {
        let o1 = node(0, NodeKind::OriginDepot, 0, 0);
        let o2 = node(1, NodeKind::OriginDepot, 0, 10);
        let e1 = node(2, NodeKind::DestinationDepot, 40, 0);
        let e2 = node(3, NodeKind::DestinationDepot, 40, 10);
        let p1 = node(4, NodeKind::Pickup, 10, 0);
        let d1 = node(5, NodeKind::Delivery, 30, 10);
        let p2 = node(6, NodeKind::Pickup, 10, 10);
        let d2 = node(7, NodeKind::Delivery, 30, 0);
        let t = node(8, NodeKind::TransferStation, 20, 5);

        let vehicles = vec![
            Vehicle::new(0, &o1, &e1, 100, 1.0).unwrap(),
            Vehicle::new(1, &o2, &e2, 100, 1.0).unwrap(),
        ];
        let requests = vec![
            Request::new(0, &p1, &d1, 10).unwrap(),
            Request::new(1, &p2, &d2, 10).unwrap(),
        ];
        let graph = Graph::complete(vec![o1, o2, e1, e2, p1, d1, p2, d2, t]).unwrap();
        (graph, vehicles, requests)
    }

    /// One vehicle of capacity 5 and two requests of load 3 each; any arc
    /// carrying both requests on that vehicle exceeds the capacity.
    pub fn tight_capacity_instance() -> (Graph, Vec<Vehicle>, Vec<Request>) {
        let o = node(0, NodeKind::OriginDepot, 0, 0);
        let e = node(1, NodeKind::DestinationDepot, 30, 0);
        let p1 = node(2, NodeKind::Pickup, 10, 0);
        let d1 = node(3, NodeKind::Delivery, 20, 0);
        let p2 = node(4, NodeKind::Pickup, 10, 5);
        let d2 = node(5, NodeKind::Delivery, 20, 5);

        let vehicles = vec![Vehicle::new(0, &o, &e, 5, 1.0).unwrap()];
        let requests = vec![
            Request::new(0, &p1, &d1, 3).unwrap(),
            Request::new(1, &p2, &d2, 3).unwrap(),
        ];
        let graph = Graph::complete(vec![o, e, p1, d1, p2, d2]).unwrap();
        (graph, vehicles, requests)
    }

    /// Closed-loop variant for the Sampaio builder: one depot node serving
    /// as both origin and destination, one request and one station.
    pub fn loop_instance() -> (Graph, Vec<Vehicle>, Vec<Request>) {
        let o1 = node(0, NodeKind::OriginDepot, 0, 0);
        let o2 = node(1, NodeKind::OriginDepot, 0, 10);
        let p = node(2, NodeKind::Pickup, 10, 0);
        let d = node(3, NodeKind::Delivery, 15, 0);
        let t = node(4, NodeKind::TransferStation, 5, 5);

        let vehicles = vec![
            Vehicle::new(0, &o1, &o1, 100, 1.0).unwrap(),
            Vehicle::new(1, &o2, &o2, 100, 1.0).unwrap(),
        ];
        let requests = vec![Request::new(0, &p, &d, 10).unwrap()];
        let graph = Graph::complete(vec![o1, o2, p, d, t]).unwrap();
        (graph, vehicles, requests)
    }
}
