//! Lyu formulation of the PDPT/PDPTWT.
//!
//! No precedence or visit-order variables: sub-tours are ruled out
//! implicitly by propagating arrival/departure times along traversed arcs.
//! The depot-exclusivity, transfer-visit and time-window families that are
//! optional in the Rais builder are part of the core model here, and every
//! Big-M bound is instance-derived and tight — substituting a generic
//! large constant changes solver performance, so the bounds are computed
//! exactly as `max(0, L_i + cost - E_j)` for travel-time propagation and
//! as the station window width for transfer synchronization.

use crate::model::{ConstrSense, LinExpr, Model, VarKey};
use crate::network::{Graph, NodeKind, Request, Vehicle};

use super::families;
use super::FormulationConfig;

/// The `vi` and `allow_self_handoff` flags of the configuration are not
/// consulted: the valid-inequalities block is unconditional here, and
/// handoffs always pair distinct vehicles.
pub fn build(
    graph: &Graph,
    vehicles: &[Vehicle],
    requests: &[Request],
    _config: &FormulationConfig,
) -> Result<Model, String> {
    let mut vehicles: Vec<&Vehicle> = vehicles.iter().collect();
    vehicles.sort_by_key(|k| k.index);
    let mut requests: Vec<&Request> = requests.iter().collect();
    requests.sort_by_key(|r| r.index);
    families::validate(graph, &vehicles, &requests)?;

    let mut model = Model::new("Lyu");

    let x = families::route_vars(&mut model, graph, &vehicles)?;
    let y = families::flow_vars(&mut model, graph, &vehicles, &requests)?;
    let s = families::handoff_vars(&mut model, graph, &vehicles, &requests, false)?;
    let (a, b) = families::time_vars(&mut model, graph, &vehicles)?;

    families::travel_cost_objective(&mut model, graph, &vehicles, &x);

    families::request_flow_endpoints(&mut model, graph, &vehicles, &requests, &y);
    families::couple_flow_to_route(&mut model, graph, &vehicles, &requests, &y, &x);
    families::capacity(&mut model, graph, &vehicles, &requests, &y, &x);
    families::request_flow_balance(&mut model, graph, &vehicles, &requests, &y);

    families::transfer_pairing(&mut model, graph, &vehicles, &requests, &y, &s, false);
    families::single_dispatch(&mut model, graph, &vehicles, &x, ConstrSense::Eq);

    // route flow balance at pickup, delivery and transfer nodes
    for k in &vehicles {
        for i in graph.nodes() {
            if !matches!(i.kind, NodeKind::Pickup | NodeKind::Delivery | NodeKind::TransferStation)
            {
                continue;
            }
            let mut expr = LinExpr::new();
            for arc in graph.arcs_from(i.index) {
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
            }
            for arc in graph.arcs_into(i.index) {
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], -1.0);
            }
            model.add_constr("route_balance", expr, ConstrSense::Eq, 0.0);
        }
    }

    families::depot_exclusivity(&mut model, graph, &vehicles, &x);
    families::single_transfer_visit(&mut model, graph, &vehicles, &x);
    families::visit_each_stop_once(&mut model, graph, &vehicles, &x);
    families::forbid_flow_into_pickups(&mut model, graph, &vehicles, &requests, &y);
    families::forbid_flow_at_foreign_depots(&mut model, graph, &vehicles, &requests, &y);
    families::transfer_time_sync(&mut model, graph, &vehicles, &requests, &s, &a, &b, false);
    families::travel_time_propagation(&mut model, graph, &vehicles, &x, &a, &b);
    families::time_window_bounds(&mut model, graph, &vehicles, &a, &b);

    log::debug!("Lyu: {} variables, {} constraints", model.num_vars(), model.num_constrs());
    Ok(model)
}
