//! Constraint families shared by the formulation builders.
//!
//! Most constraint code recurs across the three builders with small
//! index-set differences, so each family lives here once, parameterized by
//! the sets it ranges over and, where relevant, its Big-M bound or
//! inclusion predicate. A builder is then a declarative composition of
//! family calls plus its own distinctive families.
//!
//! Every function iterates nodes, arcs, vehicles and requests in the
//! deterministic order the callers establish (sorted by index), so
//! repeated builds emit identical models.

use std::collections::HashMap;

use crate::model::{ConstrSense, LinExpr, Model, VarId, VarKey};
use crate::network::{Graph, Request, Vehicle};

/// Sparse map from a composite variable key to its handle.
pub type VarMap = HashMap<VarKey, VarId>;

/// Fails fast on malformed input before any variable is declared.
pub fn validate(graph: &Graph, vehicles: &[&Vehicle], requests: &[&Request]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for k in vehicles {
        if !seen.insert(k.index) {
            return Err(format!("duplicate vehicle index {}", k.index));
        }
        if graph.node(k.origin).is_none() {
            return Err(format!("vehicle {}: origin node {} not in graph", k.index, k.origin));
        }
        if graph.node(k.dest).is_none() {
            return Err(format!("vehicle {}: destination node {} not in graph", k.index, k.dest));
        }
    }

    let mut seen = std::collections::HashSet::new();
    for r in requests {
        if !seen.insert(r.index) {
            return Err(format!("duplicate request index {}", r.index));
        }
        if graph.node(r.pickup).is_none() {
            return Err(format!("request {}: pickup node {} not in graph", r.index, r.pickup));
        }
        if graph.node(r.destination).is_none() {
            return Err(format!(
                "request {}: delivery node {} not in graph",
                r.index, r.destination
            ));
        }
    }
    Ok(())
}

/// x[i,j,k] = 1 if vehicle k travels through arc (i,j).
pub fn route_vars(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
) -> Result<VarMap, String> {
    let keys = graph
        .arcs()
        .iter()
        .flat_map(|arc| vehicles.iter().map(move |k| VarKey::route(arc.src, arc.dst, k.index)))
        .collect::<Vec<_>>();
    model.add_binary_vars(keys)
}

/// y[i,j,k,r] = 1 if request r is transported by vehicle k through arc (i,j).
pub fn flow_vars(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
) -> Result<VarMap, String> {
    let mut keys = Vec::with_capacity(graph.arcs().len() * vehicles.len() * requests.len());
    for arc in graph.arcs() {
        for k in vehicles {
            for r in requests {
                keys.push(VarKey::flow(arc.src, arc.dst, k.index, r.index));
            }
        }
    }
    model.add_binary_vars(keys)
}

/// s[t,r,k1,k2] = 1 if request r is handed from vehicle k1 to vehicle k2 at
/// transfer station t. The diagonal (k1 = k2) is only declared when
/// self-handoffs are allowed.
pub fn handoff_vars(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    allow_self: bool,
) -> Result<VarMap, String> {
    let mut keys = Vec::new();
    for t in graph.transfer_stations() {
        for r in requests {
            for k1 in vehicles {
                for k2 in vehicles {
                    if k2.index == k1.index && !allow_self {
                        continue;
                    }
                    keys.push(VarKey::handoff(t.index, r.index, k1.index, k2.index));
                }
            }
        }
    }
    model.add_binary_vars(keys)
}

/// Arrival and departure time variables a[i,k], b[i,k].
pub fn time_vars(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
) -> Result<(VarMap, VarMap), String> {
    let arrival_keys = graph
        .nodes()
        .iter()
        .flat_map(|n| vehicles.iter().map(move |k| VarKey::arrival(n.index, k.index)))
        .collect::<Vec<_>>();
    let a = model.add_continuous_vars(arrival_keys, 0.0, f64::INFINITY)?;

    let departure_keys = graph
        .nodes()
        .iter()
        .flat_map(|n| vehicles.iter().map(move |k| VarKey::departure(n.index, k.index)))
        .collect::<Vec<_>>();
    let b = model.add_continuous_vars(departure_keys, 0.0, f64::INFINITY)?;
    Ok((a, b))
}

/// Minimize total travel cost over all traversed arcs.
pub fn travel_cost_objective(model: &mut Model, graph: &Graph, vehicles: &[&Vehicle], x: &VarMap) {
    let mut objective = LinExpr::new();
    for arc in graph.arcs() {
        for k in vehicles {
            objective.push(
                x[&VarKey::route(arc.src, arc.dst, k.index)],
                arc.cost * k.travel_unit_cost,
            );
        }
    }
    model.set_objective(objective);
}

/// Request endpoint and transfer-station flow conservation: each request
/// leaves its pickup exactly once and reaches its delivery exactly once
/// (summed over vehicles), and at every transfer station its inflow equals
/// its outflow, which permits a transfer without losing or creating load.
pub fn request_flow_endpoints(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
) {
    for r in requests {
        let mut expr = LinExpr::new();
        for k in vehicles {
            for arc in graph.arcs_from(r.pickup) {
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
            }
        }
        model.add_constr("pickup_out", expr, ConstrSense::Eq, 1.0);
    }

    for r in requests {
        let mut expr = LinExpr::new();
        for k in vehicles {
            for arc in graph.arcs_into(r.destination) {
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
            }
        }
        model.add_constr("delivery_in", expr, ConstrSense::Eq, 1.0);
    }

    for r in requests {
        for t in graph.transfer_stations() {
            let mut expr = LinExpr::new();
            for k in vehicles {
                for arc in graph.arcs_from(t.index) {
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                }
                for arc in graph.arcs_into(t.index) {
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], -1.0);
                }
            }
            model.add_constr("transfer_balance", expr, ConstrSense::Eq, 0.0);
        }
    }
}

/// Per-vehicle request flow balance at every node other than transfer
/// stations and the request's own pickup/delivery: no stray visits.
pub fn request_flow_balance(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
) {
    for k in vehicles {
        for r in requests {
            for i in graph.nodes() {
                if i.is_transfer() || i.index == r.pickup || i.index == r.destination {
                    continue;
                }
                let mut expr = LinExpr::new();
                for arc in graph.arcs_from(i.index) {
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                }
                for arc in graph.arcs_into(i.index) {
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], -1.0);
                }
                model.add_constr("flow_balance", expr, ConstrSense::Eq, 0.0);
            }
        }
    }
}

/// y[i,j,k,r] <= x[i,j,k]: a request only rides arcs its vehicle traverses.
pub fn couple_flow_to_route(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
    x: &VarMap,
) {
    for arc in graph.arcs() {
        for k in vehicles {
            for r in requests {
                let mut expr = LinExpr::new();
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], -1.0);
                model.add_constr("flow_on_route", expr, ConstrSense::Le, 0.0);
            }
        }
    }
}

/// Loads riding an arc-vehicle pair must fit the vehicle capacity (and are
/// zero when the vehicle does not traverse the arc).
pub fn capacity(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
    x: &VarMap,
) {
    for arc in graph.arcs() {
        for k in vehicles {
            let mut expr = LinExpr::new();
            for r in requests {
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], r.load as f64);
            }
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], -(k.capacity as f64));
            model.add_constr("capacity", expr, ConstrSense::Le, 0.0);
        }
    }
}

/// Each vehicle leaves its origin depot on the given number of arcs
/// (exactly one, or at most one in the closed-loop convention).
pub fn single_dispatch(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    x: &VarMap,
    sense: ConstrSense,
) {
    for k in vehicles {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_from(k.origin) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
        }
        model.add_constr("dispatch", expr, sense, 1.0);
    }
}

/// Transfer pairing: if k1 is the vehicle bringing request r into station t
/// and k2 the one carrying it onward, the handoff indicator must be 1.
/// Couples the load-flow variables of two different vehicles through one
/// binary, which is what allows mid-route replanning.
pub fn transfer_pairing(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
    s: &VarMap,
    allow_self: bool,
) {
    for r in requests {
        for t in graph.transfer_stations() {
            for k1 in vehicles {
                for k2 in vehicles {
                    if k1.index == k2.index && !allow_self {
                        continue;
                    }
                    let mut expr = LinExpr::new();
                    for arc in graph.arcs_into(t.index) {
                        expr.push(y[&VarKey::flow(arc.src, arc.dst, k1.index, r.index)], 1.0);
                    }
                    for arc in graph.arcs_from(t.index) {
                        expr.push(y[&VarKey::flow(arc.src, arc.dst, k2.index, r.index)], 1.0);
                    }
                    expr.push(s[&VarKey::handoff(t.index, r.index, k1.index, k2.index)], -1.0);
                    model.add_constr("handoff_pairing", expr, ConstrSense::Le, 1.0);
                }
            }
        }
    }
}

/// A handoff forces the drop-off to happen no later than the onward
/// pickup: a[t,k1] - b[t,k2] <= M (1 - s). The bound is the station's
/// time-window width.
pub fn transfer_time_sync(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    s: &VarMap,
    a: &VarMap,
    b: &VarMap,
    allow_self: bool,
) {
    for r in requests {
        for t in graph.transfer_stations() {
            let big_m = t.latest_time - t.earliest_time;
            for k1 in vehicles {
                for k2 in vehicles {
                    if k1.index == k2.index && !allow_self {
                        continue;
                    }
                    let mut expr = LinExpr::new();
                    expr.push(a[&VarKey::arrival(t.index, k1.index)], 1.0);
                    expr.push(b[&VarKey::departure(t.index, k2.index)], -1.0);
                    expr.push(s[&VarKey::handoff(t.index, r.index, k1.index, k2.index)], big_m);
                    model.add_constr("handoff_sync", expr, ConstrSense::Le, big_m);
                }
            }
        }
    }
}

/// Travel-time propagation along traversed arcs:
/// b[i,k] + cost(i,j) - a[j,k] <= M (1 - x[i,j,k]) with the tight,
/// instance-derived bound M = max(0, L_i + cost - E_j).
pub fn travel_time_propagation(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    x: &VarMap,
    a: &VarMap,
    b: &VarMap,
) {
    for arc in graph.arcs() {
        let (src, dst) = graph.endpoints(arc);
        let big_m = (src.latest_time + arc.cost - dst.earliest_time).max(0.0);
        for k in vehicles {
            let mut expr = LinExpr::new();
            expr.push(b[&VarKey::departure(arc.src, k.index)], 1.0);
            expr.push(a[&VarKey::arrival(arc.dst, k.index)], -1.0);
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], big_m);
            model.add_constr("travel_time", expr, ConstrSense::Le, big_m - arc.cost);
        }
    }
}

/// Time-window bounds: arrive no earlier than the window opens, depart no
/// later than it closes, and never depart before arriving.
pub fn time_window_bounds(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    a: &VarMap,
    b: &VarMap,
) {
    for i in graph.nodes() {
        for k in vehicles {
            let mut expr = LinExpr::new();
            expr.push(a[&VarKey::arrival(i.index, k.index)], 1.0);
            model.add_constr("arrival_open", expr, ConstrSense::Ge, i.earliest_time);

            let mut expr = LinExpr::new();
            expr.push(b[&VarKey::departure(i.index, k.index)], 1.0);
            model.add_constr("departure_close", expr, ConstrSense::Le, i.latest_time);
        }
    }

    for i in graph.nodes() {
        for k in vehicles {
            let mut expr = LinExpr::new();
            expr.push(a[&VarKey::arrival(i.index, k.index)], 1.0);
            expr.push(b[&VarKey::departure(i.index, k.index)], -1.0);
            model.add_constr("dwell", expr, ConstrSense::Le, 0.0);
        }
    }
}

/// Depot exclusivity: a vehicle never re-enters its own origin, never
/// leaves any depot that is not its own origin, and enters its own
/// destination exactly once without leaving it again.
pub fn depot_exclusivity(model: &mut Model, graph: &Graph, vehicles: &[&Vehicle], x: &VarMap) {
    for k in vehicles {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_into(k.origin) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
        }
        model.add_constr("origin_in", expr, ConstrSense::Eq, 0.0);
    }

    for k in vehicles {
        for i in graph.depots() {
            if i.index == k.origin {
                continue;
            }
            let mut expr = LinExpr::new();
            for arc in graph.arcs_from(i.index) {
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
            }
            model.add_constr("foreign_depot_out", expr, ConstrSense::Eq, 0.0);
        }
    }

    for k in vehicles {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_into(k.dest) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
        }
        model.add_constr("dest_in", expr, ConstrSense::Eq, 1.0);
    }

    for k in vehicles {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_from(k.dest) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
        }
        model.add_constr("dest_out", expr, ConstrSense::Eq, 0.0);
    }
}

/// Each transfer station is visited by a vehicle at most once.
pub fn single_transfer_visit(model: &mut Model, graph: &Graph, vehicles: &[&Vehicle], x: &VarMap) {
    for k in vehicles {
        for t in graph.transfer_stations() {
            let mut expr = LinExpr::new();
            for arc in graph.arcs_from(t.index) {
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
            }
            model.add_constr("transfer_visit", expr, ConstrSense::Le, 1.0);
        }
    }
}

/// Each pickup or delivery node is visited by exactly one vehicle in total.
pub fn visit_each_stop_once(model: &mut Model, graph: &Graph, vehicles: &[&Vehicle], x: &VarMap) {
    for i in graph.nodes() {
        if i.is_transfer() || i.is_depot() {
            continue;
        }
        let mut expr = LinExpr::new();
        for arc in graph.arcs_from(i.index) {
            for k in vehicles {
                expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
            }
        }
        model.add_constr("stop_visit", expr, ConstrSense::Eq, 1.0);
    }
}

/// No request flow may arrive at the request's own pickup node.
pub fn forbid_flow_into_pickups(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
) {
    for r in requests {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_into(r.pickup) {
            for k in vehicles {
                expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
            }
        }
        model.add_constr("no_flow_into_pickup", expr, ConstrSense::Eq, 0.0);
    }
}

/// No request flow may leave a depot that is not the vehicle's own origin
/// or destination.
pub fn forbid_flow_at_foreign_depots(
    model: &mut Model,
    graph: &Graph,
    vehicles: &[&Vehicle],
    requests: &[&Request],
    y: &VarMap,
) {
    for r in requests {
        for k in vehicles {
            for i in graph.depots() {
                if i.index == k.origin || i.index == k.dest {
                    continue;
                }
                let mut expr = LinExpr::new();
                for arc in graph.arcs_from(i.index) {
                    expr.push(y[&VarKey::flow(arc.src, arc.dst, k.index, r.index)], 1.0);
                }
                model.add_constr("no_flow_from_foreign_depot", expr, ConstrSense::Eq, 0.0);
            }
        }
    }
}
