//! Sampaio formulation of the PDPTWT.
//!
//! Each vehicle's origin and destination depot are the *same* node, so a
//! route is a closed loop. Request flow is therefore explicitly forbidden
//! on arcs touching an origin depot and on arcs ending at a request's own
//! pickup (a request cannot be "delivered before being picked up" through
//! the depot). Time windows and transfer synchronization mirror the Lyu
//! machinery, with one deliberate relaxation: a vehicle may hand a request
//! off to itself at a station. The published model permits this even
//! though the other formulations pair distinct vehicles only; it is kept
//! configurable through [`FormulationConfig::allow_self_handoff`] instead
//! of being silently aligned.

use crate::model::{ConstrSense, LinExpr, Model, VarKey};
use crate::network::{Graph, NodeKind, Request, Vehicle};

use super::families;
use super::FormulationConfig;

pub fn build(
    graph: &Graph,
    vehicles: &[Vehicle],
    requests: &[Request],
    config: &FormulationConfig,
) -> Result<Model, String> {
    let mut vehicles: Vec<&Vehicle> = vehicles.iter().collect();
    vehicles.sort_by_key(|k| k.index);
    let mut requests: Vec<&Request> = requests.iter().collect();
    requests.sort_by_key(|r| r.index);
    families::validate(graph, &vehicles, &requests)?;

    let mut model = Model::new("Sampaio");
    let allow_self = config.allow_self_handoff;

    let x = families::route_vars(&mut model, graph, &vehicles)?;
    let y = families::flow_vars(&mut model, graph, &vehicles, &requests)?;
    let s = families::handoff_vars(&mut model, graph, &vehicles, &requests, allow_self)?;
    let (a, b) = families::time_vars(&mut model, graph, &vehicles)?;

    families::travel_cost_objective(&mut model, graph, &vehicles, &x);

    // a vehicle may stay at its depot, hence at most one dispatch
    families::single_dispatch(&mut model, graph, &vehicles, &x, ConstrSense::Le);

    families::request_flow_endpoints(&mut model, graph, &vehicles, &requests, &y);
    families::couple_flow_to_route(&mut model, graph, &vehicles, &requests, &y, &x);
    families::capacity(&mut model, graph, &vehicles, &requests, &y, &x);
    families::request_flow_balance(&mut model, graph, &vehicles, &requests, &y);

    families::travel_time_propagation(&mut model, graph, &vehicles, &x, &a, &b);
    families::transfer_pairing(&mut model, graph, &vehicles, &requests, &y, &s, allow_self);
    families::transfer_time_sync(&mut model, graph, &vehicles, &requests, &s, &a, &b, allow_self);

    // route flow balance at every node; with the extended block the depot
    // nodes are covered by the depot-exclusivity equalities instead
    for k in &vehicles {
        for i in graph.nodes() {
            if config.vi && (i.index == k.origin || i.index == k.dest) {
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

    // both arrival and departure are boxed by the node time window
    for k in &vehicles {
        for i in graph.nodes() {
            let mut expr = LinExpr::new();
            expr.push(b[&VarKey::departure(i.index, k.index)], 1.0);
            model.add_constr("departure_open", expr, ConstrSense::Ge, i.earliest_time);

            let mut expr = LinExpr::new();
            expr.push(b[&VarKey::departure(i.index, k.index)], 1.0);
            model.add_constr("departure_close", expr, ConstrSense::Le, i.latest_time);

            let mut expr = LinExpr::new();
            expr.push(a[&VarKey::arrival(i.index, k.index)], 1.0);
            model.add_constr("arrival_open", expr, ConstrSense::Ge, i.earliest_time);

            let mut expr = LinExpr::new();
            expr.push(a[&VarKey::arrival(i.index, k.index)], 1.0);
            model.add_constr("arrival_close", expr, ConstrSense::Le, i.latest_time);
        }
    }

    // never depart before arriving, except at the vehicle's own depot
    // where the closing arc re-enters after the opening departure
    for i in graph.nodes() {
        for k in &vehicles {
            if i.index == k.origin {
                continue;
            }
            let mut expr = LinExpr::new();
            expr.push(a[&VarKey::arrival(i.index, k.index)], 1.0);
            expr.push(b[&VarKey::departure(i.index, k.index)], -1.0);
            model.add_constr("dwell", expr, ConstrSense::Le, 0.0);
        }
    }

    // request flow never touches an origin depot
    for k in &vehicles {
        for r in &requests {
            for arc in graph.arcs() {
                let (src, dst) = graph.endpoints(arc);
                if src.kind == NodeKind::OriginDepot {
                    let mut expr = LinExpr::new();
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                    model.add_constr("no_flow_from_depot", expr, ConstrSense::Eq, 0.0);
                } else if dst.kind == NodeKind::OriginDepot {
                    let mut expr = LinExpr::new();
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                    model.add_constr("no_flow_into_depot", expr, ConstrSense::Eq, 0.0);
                }
            }
        }
    }

    // request flow never arrives at its own pickup
    for k in &vehicles {
        for r in &requests {
            for arc in graph.arcs_into(r.pickup) {
                let mut expr = LinExpr::new();
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                model.add_constr("no_arrival_at_pickup", expr, ConstrSense::Eq, 0.0);
            }
        }
    }

    if config.vi {
        families::depot_exclusivity(&mut model, graph, &vehicles, &x);
        families::single_transfer_visit(&mut model, graph, &vehicles, &x);
        families::visit_each_stop_once(&mut model, graph, &vehicles, &x);
        families::forbid_flow_into_pickups(&mut model, graph, &vehicles, &requests, &y);
        families::forbid_flow_at_foreign_depots(&mut model, graph, &vehicles, &requests, &y);
    }

    log::debug!(
        "Sampaio: {} variables, {} constraints (vi={}, self handoff={})",
        model.num_vars(),
        model.num_constrs(),
        config.vi,
        allow_self
    );
    Ok(model)
}
