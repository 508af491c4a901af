//! Capacitated vehicles.

use super::graph::{Node, NodeKind};

/// A vehicle running from its origin depot to its destination depot.
///
/// The Sampaio formulation routes each vehicle on a closed loop, in which
/// case `origin` and `dest` are the same origin-depot node. That is a
/// formulation-level convention, so the constructor accepts it.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub index: usize,
    /// Index of the origin depot node.
    pub origin: usize,
    /// Index of the destination depot node.
    pub dest: usize,
    pub capacity: u32,
    /// Scalar multiplier on arc cost for this vehicle.
    pub travel_unit_cost: f64,
}

impl Vehicle {
    pub fn new(
        index: usize,
        origin: &Node,
        dest: &Node,
        capacity: u32,
        travel_unit_cost: f64,
    ) -> Result<Self, String> {
        if origin.kind != NodeKind::OriginDepot {
            return Err(format!("vehicle {}: node {} is not an origin depot", index, origin.index));
        }
        if dest.index != origin.index && dest.kind != NodeKind::DestinationDepot {
            return Err(format!(
                "vehicle {}: node {} is not a destination depot",
                index, dest.index
            ));
        }
        if capacity == 0 {
            return Err(format!("vehicle {}: capacity must be positive", index));
        }
        if travel_unit_cost <= 0.0 {
            return Err(format!("vehicle {}: travel unit cost must be positive", index));
        }
        Ok(Vehicle { index, origin: origin.index, dest: dest.index, capacity, travel_unit_cost })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize, kind: NodeKind) -> Node {
        Node::new(index, kind, (0, 0), 0.0, 100.0).unwrap()
    }

    #[test]
    fn test_valid_vehicle() {
        let o = node(0, NodeKind::OriginDepot);
        let e = node(1, NodeKind::DestinationDepot);
        let k = Vehicle::new(0, &o, &e, 100, 1.0).unwrap();
        assert_eq!(k.origin, 0);
        assert_eq!(k.dest, 1);
    }

    #[test]
    fn test_closed_loop_vehicle_allowed() {
        let o = node(0, NodeKind::OriginDepot);
        let k = Vehicle::new(0, &o, &o, 100, 1.0).unwrap();
        assert_eq!(k.origin, k.dest);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let o = node(0, NodeKind::OriginDepot);
        let e = node(1, NodeKind::DestinationDepot);
        assert!(Vehicle::new(0, &o, &e, 0, 1.0).is_err());
    }

    #[test]
    fn test_wrong_depot_kind_rejected() {
        let o = node(0, NodeKind::OriginDepot);
        let p = node(1, NodeKind::Pickup);
        assert!(Vehicle::new(0, &p, &o, 100, 1.0).is_err());
    }
}
