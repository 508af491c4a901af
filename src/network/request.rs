//! Pickup/delivery requests.

use super::graph::{Node, NodeKind};

/// A demand to move `load` units from a pickup node to a delivery node.
///
/// Each request owns exactly one pickup node and one delivery node; nodes
/// are not shared across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub index: usize,
    /// Index of the pickup node.
    pub pickup: usize,
    /// Index of the delivery node.
    pub destination: usize,
    pub load: u32,
}

impl Request {
    pub fn new(index: usize, pickup: &Node, destination: &Node, load: u32) -> Result<Self, String> {
        if pickup.index == destination.index {
            return Err(format!("request {}: pickup equals destination", index));
        }
        if pickup.kind != NodeKind::Pickup {
            return Err(format!("request {}: node {} is not a pickup node", index, pickup.index));
        }
        if destination.kind != NodeKind::Delivery {
            return Err(format!(
                "request {}: node {} is not a delivery node",
                index, destination.index
            ));
        }
        if load == 0 {
            return Err(format!("request {}: load must be positive", index));
        }
        Ok(Request { index, pickup: pickup.index, destination: destination.index, load })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize, kind: NodeKind) -> Node {
        Node::new(index, kind, (0, 0), 0.0, 100.0).unwrap()
    }

    #[test]
    fn test_valid_request() {
        let p = node(1, NodeKind::Pickup);
        let d = node(2, NodeKind::Delivery);
        let r = Request::new(0, &p, &d, 5).unwrap();
        assert_eq!(r.pickup, 1);
        assert_eq!(r.destination, 2);
    }

    #[test]
    fn test_zero_load_rejected() {
        let p = node(1, NodeKind::Pickup);
        let d = node(2, NodeKind::Delivery);
        assert!(Request::new(0, &p, &d, 0).is_err());
    }

    #[test]
    fn test_wrong_node_kinds_rejected() {
        let p = node(1, NodeKind::Pickup);
        let d = node(2, NodeKind::Delivery);
        assert!(Request::new(0, &d, &p, 5).is_err());
    }
}
