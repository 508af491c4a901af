//! Gurobi backend for the abstract optimization model.
//!
//! Translates the declarative model into a Gurobi model through the `grb`
//! crate, runs the optimization and reads back the normalized result
//! tuple. Only compiled with the `gurobi` feature.

use std::collections::HashMap;

use grb::prelude::*;

use super::status::SolverStatus;
use super::{ConstrSense, SolveResult, VarKind};

/// Decimal precision of the reported objective, for reproducible
/// comparison across runs.
fn round7(value: f64) -> f64 {
    (value * 1e7).round() / 1e7
}

pub(super) fn solve(model: &super::Model, time_limit: f64) -> Result<SolveResult, String> {
    let env = Env::new("").map_err(|e| format!("failed to create Gurobi environment: {}", e))?;

    let mut grb_model = Model::with_env(model.name(), env)
        .map_err(|e| format!("failed to create model: {}", e))?;

    grb_model
        .set_param(param::OutputFlag, 0)
        .map_err(|e| format!("failed to set output flag: {}", e))?;
    grb_model
        .set_param(param::TimeLimit, time_limit)
        .map_err(|e| format!("failed to set time limit: {}", e))?;

    // Objective coefficients are attached directly to the variables.
    let mut obj_coefs: HashMap<super::VarId, f64> = HashMap::new();
    if let Some(objective) = model.objective() {
        for &(var, coef) in objective.terms() {
            *obj_coefs.entry(var).or_insert(0.0) += coef;
        }
    }

    let mut vars: Vec<Var> = Vec::with_capacity(model.num_vars());
    for (idx, def) in model.var_defs().iter().enumerate() {
        let vtype = match def.kind {
            VarKind::Binary => VarType::Binary,
            VarKind::Continuous => VarType::Continuous,
        };
        let obj = obj_coefs.get(&super::VarId(idx)).copied().unwrap_or(0.0);
        let var = grb_model
            .add_var(&def.key.to_string(), vtype, obj, def.lb, def.ub, std::iter::empty())
            .map_err(|e| format!("failed to add variable {}: {}", def.key, e))?;
        vars.push(var);
    }

    grb_model.update().map_err(|e| format!("failed to update model: {}", e))?;

    for (idx, constr) in model.constrs().iter().enumerate() {
        let lhs: Expr = constr
            .expr
            .terms()
            .iter()
            .map(|&(var, coef)| coef * Expr::from(vars[var.index()]))
            .grb_sum();
        let name = format!("{}_{}", constr.label, idx);
        let result = match constr.sense {
            ConstrSense::Le => grb_model.add_constr(&name, c!(lhs <= constr.rhs)),
            ConstrSense::Eq => grb_model.add_constr(&name, c!(lhs == constr.rhs)),
            ConstrSense::Ge => grb_model.add_constr(&name, c!(lhs >= constr.rhs)),
        };
        result.map_err(|e| format!("failed to add constraint {}: {}", name, e))?;
    }

    grb_model
        .update()
        .map_err(|e| format!("failed to update model before optimization: {}", e))?;

    grb_model
        .optimize()
        .map_err(|e| format!("optimization failed: {}", e))?;

    let code = grb_model
        .status()
        .map_err(|e| format!("failed to query solver status: {}", e))? as i32;
    let status = SolverStatus::from_code(code)?;

    // No incumbent (e.g. infeasible, or the limit hit before a solution):
    // the attribute queries fail and the objective is reported as infinite.
    let objective = grb_model
        .get_attr(attr::ObjVal)
        .map(round7)
        .unwrap_or(f64::INFINITY);
    let gap = grb_model.get_attr(attr::MIPGap).unwrap_or(f64::INFINITY);
    let runtime = grb_model.get_attr(attr::Runtime).unwrap_or(0.0);

    Ok(SolveResult { status, objective, gap, runtime })
}
