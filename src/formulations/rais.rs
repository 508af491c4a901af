//! Rais formulation of the PDPT.
//!
//! Sub-tours are eliminated explicitly through a per-vehicle precedence
//! relation z[i,j,k] (a total order over node pairs) together with a
//! continuous visit-order variable e[i,k] linked to the route variables by
//! Big-M sequencing, with M = |nodes|. The optional valid-inequalities
//! block adds depot exclusivity, single transfer visits, exactly-once stop
//! visits and the arrival/departure time-window machinery.

use crate::model::{ConstrSense, LinExpr, Model, VarKey};
use crate::network::{Graph, Request, Vehicle};

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

    let mut model = Model::new("Rais");
    let big_m = graph.num_nodes() as f64;

    let x = families::route_vars(&mut model, graph, &vehicles)?;
    let y = families::flow_vars(&mut model, graph, &vehicles, &requests)?;

    // z[i,j,k] = 1 if node i precedes node j in the route of vehicle k
    let mut z_keys = Vec::new();
    for i in graph.nodes() {
        for j in graph.nodes() {
            if i.index == j.index {
                continue;
            }
            for k in &vehicles {
                z_keys.push(VarKey::precedence(i.index, j.index, k.index));
            }
        }
    }
    let z = model.add_binary_vars(z_keys)?;

    // e[i,k]: visit position of node i in the route of vehicle k
    let mut e_keys = Vec::new();
    for i in graph.nodes() {
        for k in &vehicles {
            e_keys.push(VarKey::visit_order(i.index, k.index));
        }
    }
    let e = model.add_continuous_vars(e_keys, 0.0, f64::INFINITY)?;

    let s = families::handoff_vars(&mut model, graph, &vehicles, &requests, false)?;

    families::travel_cost_objective(&mut model, graph, &vehicles, &x);

    // a vehicle leaves its origin as often as it reaches its destination
    for k in &vehicles {
        let mut expr = LinExpr::new();
        for arc in graph.arcs_from(k.origin) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
        }
        for arc in graph.arcs_into(k.dest) {
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], -1.0);
        }
        model.add_constr("depot_flow_match", expr, ConstrSense::Eq, 0.0);
    }

    // route flow balance everywhere but the vehicle's own depots
    for k in &vehicles {
        for i in graph.nodes() {
            if i.index == k.origin || i.index == k.dest {
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

    families::request_flow_endpoints(&mut model, graph, &vehicles, &requests, &y);
    families::couple_flow_to_route(&mut model, graph, &vehicles, &requests, &y, &x);
    families::capacity(&mut model, graph, &vehicles, &requests, &y, &x);
    families::request_flow_balance(&mut model, graph, &vehicles, &requests, &y);

    // using an arc implies the precedence order agrees with it
    for arc in graph.arcs() {
        for k in &vehicles {
            let mut expr = LinExpr::new();
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], 1.0);
            expr.push(z[&VarKey::precedence(arc.src, arc.dst, k.index)], -1.0);
            model.add_constr("route_precedence", expr, ConstrSense::Le, 0.0);
        }
    }

    // the precedence relation is antisymmetric
    for arc in graph.arcs() {
        for k in &vehicles {
            let mut expr = LinExpr::new();
            expr.push(z[&VarKey::precedence(arc.src, arc.dst, k.index)], 1.0);
            expr.push(z[&VarKey::precedence(arc.dst, arc.src, k.index)], 1.0);
            model.add_constr("precedence_antisym", expr, ConstrSense::Eq, 1.0);
        }
    }

    // no 3-cycles in the precedence relation
    for i in graph.nodes() {
        for j in graph.nodes() {
            for l in graph.nodes() {
                if i.index == j.index || i.index == l.index || j.index == l.index {
                    continue;
                }
                for k in &vehicles {
                    let mut expr = LinExpr::new();
                    expr.push(z[&VarKey::precedence(i.index, j.index, k.index)], 1.0);
                    expr.push(z[&VarKey::precedence(j.index, l.index, k.index)], 1.0);
                    expr.push(z[&VarKey::precedence(l.index, i.index, k.index)], 1.0);
                    model.add_constr("precedence_triangle", expr, ConstrSense::Le, 2.0);
                }
            }
        }
    }

    // e[i,k] + 1 - e[j,k] <= M (1 - x[i,j,k])
    for arc in graph.arcs() {
        for k in &vehicles {
            let mut expr = LinExpr::new();
            expr.push(e[&VarKey::visit_order(arc.src, k.index)], 1.0);
            expr.push(e[&VarKey::visit_order(arc.dst, k.index)], -1.0);
            expr.push(x[&VarKey::route(arc.src, arc.dst, k.index)], big_m);
            model.add_constr("visit_order", expr, ConstrSense::Le, big_m - 1.0);
        }
    }

    families::transfer_pairing(&mut model, graph, &vehicles, &requests, &y, &s, false);

    // e[t,k1] - e[t,k2] <= M (1 - s[t,r,k1,k2]): the delivering vehicle
    // reaches the station no later than the receiving one
    for r in &requests {
        for t in graph.transfer_stations() {
            for k1 in &vehicles {
                for k2 in &vehicles {
                    if k1.index == k2.index {
                        continue;
                    }
                    let mut expr = LinExpr::new();
                    expr.push(e[&VarKey::visit_order(t.index, k1.index)], 1.0);
                    expr.push(e[&VarKey::visit_order(t.index, k2.index)], -1.0);
                    expr.push(s[&VarKey::handoff(t.index, r.index, k1.index, k2.index)], big_m);
                    model.add_constr("handoff_order", expr, ConstrSense::Le, big_m);
                }
            }
        }
    }

    families::single_dispatch(&mut model, graph, &vehicles, &x, ConstrSense::Eq);

    if config.vi {
        let (a, b) = families::time_vars(&mut model, graph, &vehicles)?;
        families::depot_exclusivity(&mut model, graph, &vehicles, &x);
        families::single_transfer_visit(&mut model, graph, &vehicles, &x);
        families::visit_each_stop_once(&mut model, graph, &vehicles, &x);
        families::forbid_flow_into_pickups(&mut model, graph, &vehicles, &requests, &y);
        families::forbid_flow_at_foreign_depots(&mut model, graph, &vehicles, &requests, &y);
        families::transfer_time_sync(&mut model, graph, &vehicles, &requests, &s, &a, &b, false);
        families::travel_time_propagation(&mut model, graph, &vehicles, &x, &a, &b);
        families::time_window_bounds(&mut model, graph, &vehicles, &a, &b);
    }

    log::debug!(
        "Rais: {} variables, {} constraints (vi={})",
        model.num_vars(),
        model.num_constrs(),
        config.vi
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::fixtures::{line_instance, transfer_instance};
    use super::*;
    use crate::model::VarKind;

    #[test]
    fn test_pickup_out_flow_shape() {
        let (graph, vehicles, requests) = transfer_instance();
        let model = build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();

        let n = graph.num_nodes();
        for r in &requests {
            // one y per vehicle for every arc leaving the pickup
            let declared = model
                .var_defs()
                .iter()
                .filter(|def| {
                    matches!(def.key, VarKey::Flow { i, r: req, .. } if i == r.pickup && req == r.index)
                })
                .count();
            assert_eq!(declared, vehicles.len() * (n - 1));

            let constr = model.constrs_labeled("pickup_out").nth(r.index).unwrap();
            assert_eq!(constr.sense, ConstrSense::Eq);
            assert_eq!(constr.rhs, 1.0);
            assert_eq!(constr.expr.terms().len(), declared);
            assert!(constr.expr.terms().iter().all(|&(_, c)| c == 1.0));
        }
    }

    #[test]
    fn test_flow_on_route_count() {
        let (graph, vehicles, requests) = transfer_instance();
        let model = build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();
        assert_eq!(
            model.constrs_labeled("flow_on_route").count(),
            graph.arcs().len() * vehicles.len() * requests.len()
        );
    }

    #[test]
    fn test_precedence_antisymmetry() {
        let (graph, vehicles, requests) = line_instance();
        let model = build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();

        let z_ij = model.var(&VarKey::precedence(1, 2, 0)).unwrap();
        let z_ji = model.var(&VarKey::precedence(2, 1, 0)).unwrap();
        let constr = model
            .constrs_labeled("precedence_antisym")
            .find(|c| {
                c.expr.terms().iter().any(|&(v, _)| v == z_ij)
                    && c.expr.terms().iter().any(|&(v, _)| v == z_ji)
            })
            .unwrap();

        // neither or both orders violates the relation; exactly one is fine
        let mut assignment = HashMap::new();
        assert!(!constr.satisfied_by(&assignment));
        assignment.insert(z_ij, 1.0);
        assignment.insert(z_ji, 1.0);
        assert!(!constr.satisfied_by(&assignment));
        assignment.insert(z_ji, 0.0);
        assert!(constr.satisfied_by(&assignment));
    }

    #[test]
    fn test_visit_order_vars_are_continuous() {
        let (graph, vehicles, requests) = line_instance();
        let model = build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();
        for def in model.var_defs() {
            if matches!(def.key, VarKey::VisitOrder { .. }) {
                assert_eq!(def.kind, VarKind::Continuous);
                assert_eq!(def.lb, 0.0);
            }
        }
    }

    #[test]
    fn test_vi_adds_time_block() {
        let (graph, vehicles, requests) = transfer_instance();
        let base = build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();
        let vi = build(
            &graph,
            &vehicles,
            &requests,
            &FormulationConfig { vi: true, ..FormulationConfig::default() },
        )
        .unwrap();

        let time_vars = vi
            .var_defs()
            .iter()
            .filter(|def| matches!(def.key, VarKey::Arrival { .. } | VarKey::Departure { .. }))
            .count();
        assert_eq!(time_vars, 2 * graph.num_nodes() * vehicles.len());
        assert!(base.var(&VarKey::arrival(0, 0)).is_none());
        assert!(vi.num_constrs() > base.num_constrs());
        assert!(vi.constrs_labeled("travel_time").count() > 0);
    }

    #[test]
    fn test_construction_is_deterministic() {
        let (graph, vehicles, requests) = transfer_instance();
        let config = FormulationConfig { vi: true, ..FormulationConfig::default() };
        let first = build(&graph, &vehicles, &requests, &config).unwrap();
        let second = build(&graph, &vehicles, &requests, &config).unwrap();

        assert_eq!(first.num_vars(), second.num_vars());
        assert_eq!(first.num_constrs(), second.num_constrs());
        assert_eq!(first.objective(), second.objective());
        for (c1, c2) in first.constrs().iter().zip(second.constrs().iter()) {
            assert_eq!(c1.expr.terms(), c2.expr.terms());
            assert_eq!(c1.label, c2.label);
        }
    }

    #[cfg(feature = "gurobi")]
    #[test]
    fn test_straight_line_optimum() {
        use crate::model::SolverStatus;

        let (graph, vehicles, requests) = line_instance();
        let mut model =
            build(&graph, &vehicles, &requests, &FormulationConfig::default()).unwrap();
        model.optimize(60.0).unwrap();

        let result = model.result().unwrap();
        assert_eq!(result.status, SolverStatus::Optimal);
        assert_eq!(result.objective, 25.0);
    }
}
