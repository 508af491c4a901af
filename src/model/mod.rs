//! Abstract optimization model.
//!
//! A [`Model`] is a declarative store of decision variables, linear
//! constraints and one minimization objective. The formulation builders
//! populate it through pure bookkeeping calls; [`Model::optimize`] is the
//! only operation that touches the external solver backend. Variables are
//! addressed by a composite [`VarKey`], and key uniqueness is enforced at
//! declaration time.

mod status;

#[cfg(feature = "gurobi")]
mod gurobi;

pub use status::SolverStatus;

use std::collections::HashMap;
use std::fmt;

/// Tolerance used when evaluating constraints under a fixed assignment.
const FEASIBILITY_EPS: f64 = 1e-6;

/// Kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

/// Sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrSense {
    Le,
    Eq,
    Ge,
}

/// Opaque handle to a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Composite key of a decision variable in the sparse variable map.
///
/// Index fields are the raw entity indices: `i`/`j`/`t` are node indices,
/// `k`/`k1`/`k2` vehicle indices and `r` request indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKey {
    /// x[i,j,k]: vehicle k travels through arc (i,j).
    Route { i: usize, j: usize, k: usize },
    /// y[i,j,k,r]: request r is transported by vehicle k through arc (i,j).
    Flow { i: usize, j: usize, k: usize, r: usize },
    /// z[i,j,k]: node i precedes node j in the route of vehicle k.
    Precedence { i: usize, j: usize, k: usize },
    /// e[i,k]: visit position of node i in the route of vehicle k.
    VisitOrder { i: usize, k: usize },
    /// s[t,r,k1,k2]: request r is handed from k1 to k2 at station t.
    Handoff { t: usize, r: usize, k1: usize, k2: usize },
    /// a[i,k]: arrival time of vehicle k at node i.
    Arrival { i: usize, k: usize },
    /// b[i,k]: departure time of vehicle k at node i.
    Departure { i: usize, k: usize },
}

impl VarKey {
    pub fn route(i: usize, j: usize, k: usize) -> Self {
        VarKey::Route { i, j, k }
    }

    pub fn flow(i: usize, j: usize, k: usize, r: usize) -> Self {
        VarKey::Flow { i, j, k, r }
    }

    pub fn precedence(i: usize, j: usize, k: usize) -> Self {
        VarKey::Precedence { i, j, k }
    }

    pub fn visit_order(i: usize, k: usize) -> Self {
        VarKey::VisitOrder { i, k }
    }

    pub fn handoff(t: usize, r: usize, k1: usize, k2: usize) -> Self {
        VarKey::Handoff { t, r, k1, k2 }
    }

    pub fn arrival(i: usize, k: usize) -> Self {
        VarKey::Arrival { i, k }
    }

    pub fn departure(i: usize, k: usize) -> Self {
        VarKey::Departure { i, k }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            VarKey::Route { i, j, k } => write!(f, "x_{}_{}_{}", i, j, k),
            VarKey::Flow { i, j, k, r } => write!(f, "y_{}_{}_{}_{}", i, j, k, r),
            VarKey::Precedence { i, j, k } => write!(f, "z_{}_{}_{}", i, j, k),
            VarKey::VisitOrder { i, k } => write!(f, "e_{}_{}", i, k),
            VarKey::Handoff { t, r, k1, k2 } => write!(f, "s_{}_{}_{}_{}", t, r, k1, k2),
            VarKey::Arrival { i, k } => write!(f, "a_{}_{}", i, k),
            VarKey::Departure { i, k } => write!(f, "b_{}_{}", i, k),
        }
    }
}

/// Definition of a declared variable.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub key: VarKey,
    pub kind: VarKind,
    pub lb: f64,
    pub ub: f64,
}

/// A linear expression over declared variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        LinExpr { terms: Vec::new() }
    }

    pub fn push(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    /// Unit-coefficient sum over a set of variables.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        LinExpr { terms: vars.into_iter().map(|v| (v, 1.0)).collect() }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// Value of the expression under an assignment; unassigned variables
    /// count as 0.
    pub fn value(&self, assignment: &HashMap<VarId, f64>) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * assignment.get(v).copied().unwrap_or(0.0))
            .sum()
    }
}

/// One linear constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub expr: LinExpr,
    pub sense: ConstrSense,
    pub rhs: f64,
    /// Informational label, used for provenance and diagnostics only.
    pub label: String,
}

impl Constraint {
    pub fn satisfied_by(&self, assignment: &HashMap<VarId, f64>) -> bool {
        let lhs = self.expr.value(assignment);
        match self.sense {
            ConstrSense::Le => lhs <= self.rhs + FEASIBILITY_EPS,
            ConstrSense::Eq => (lhs - self.rhs).abs() <= FEASIBILITY_EPS,
            ConstrSense::Ge => lhs >= self.rhs - FEASIBILITY_EPS,
        }
    }
}

/// Normalized result of a solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: SolverStatus,
    /// Objective value rounded to 7 decimals; infinite when the solver has
    /// no incumbent.
    pub objective: f64,
    /// Relative optimality gap, 0 when proven optimal.
    pub gap: f64,
    /// Wall-clock solve time in seconds.
    pub runtime: f64,
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.status, self.objective, self.gap, self.runtime
        )
    }
}

/// Declarative optimization model consumed by the solver backend.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vars: Vec<VarDef>,
    keys: HashMap<VarKey, VarId>,
    constrs: Vec<Constraint>,
    objective: Option<LinExpr>,
    result: Option<SolveResult>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Model {
            name: name.to_string(),
            vars: Vec::new(),
            keys: HashMap::new(),
            constrs: Vec::new(),
            objective: None,
            result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers one variable. Duplicate keys are a hard error.
    pub fn add_var(
        &mut self,
        key: VarKey,
        kind: VarKind,
        lb: f64,
        ub: f64,
    ) -> Result<VarId, String> {
        if self.keys.contains_key(&key) {
            return Err(format!("duplicate variable key {}", key));
        }
        let id = VarId(self.vars.len());
        self.vars.push(VarDef { key, kind, lb, ub });
        self.keys.insert(key, id);
        Ok(id)
    }

    /// Registers a family of binary variables with bounds [0, 1] and hands
    /// back the key-to-handle map for it.
    pub fn add_binary_vars<I>(&mut self, keys: I) -> Result<HashMap<VarKey, VarId>, String>
    where
        I: IntoIterator<Item = VarKey>,
    {
        let mut map = HashMap::new();
        for key in keys {
            let id = self.add_var(key, VarKind::Binary, 0.0, 1.0)?;
            map.insert(key, id);
        }
        Ok(map)
    }

    /// Registers a family of continuous variables with the given bounds.
    pub fn add_continuous_vars<I>(
        &mut self,
        keys: I,
        lb: f64,
        ub: f64,
    ) -> Result<HashMap<VarKey, VarId>, String>
    where
        I: IntoIterator<Item = VarKey>,
    {
        let mut map = HashMap::new();
        for key in keys {
            let id = self.add_var(key, VarKind::Continuous, lb, ub)?;
            map.insert(key, id);
        }
        Ok(map)
    }

    /// Registers one linear constraint over previously declared variables.
    pub fn add_constr(&mut self, label: &str, expr: LinExpr, sense: ConstrSense, rhs: f64) {
        self.constrs.push(Constraint { expr, sense, rhs, label: label.to_string() });
    }

    /// Sets the minimization objective. Exactly one call per model.
    pub fn set_objective(&mut self, expr: LinExpr) {
        debug_assert!(self.objective.is_none(), "objective set twice");
        self.objective = Some(expr);
    }

    pub fn var(&self, key: &VarKey) -> Option<VarId> {
        self.keys.get(key).copied()
    }

    pub fn var_defs(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constrs(&self) -> &[Constraint] {
        &self.constrs
    }

    pub fn constrs_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Constraint> {
        self.constrs.iter().filter(move |c| c.label == label)
    }

    pub fn objective(&self) -> Option<&LinExpr> {
        self.objective.as_ref()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constrs(&self) -> usize {
        self.constrs.len()
    }

    /// Constraints violated by a (partial) assignment; unassigned variables
    /// are taken as 0. Diagnostic counterpart of a solver's IIS dump.
    pub fn violated_constraints(&self, assignment: &HashMap<VarId, f64>) -> Vec<&Constraint> {
        self.constrs.iter().filter(|c| !c.satisfied_by(assignment)).collect()
    }

    /// Invokes the external solver backend, blocking until it reports a
    /// terminal or limit-triggered state, and stores the normalized result.
    #[cfg(feature = "gurobi")]
    pub fn optimize(&mut self, time_limit: f64) -> Result<(), String> {
        let result = gurobi::solve(self, time_limit)?;
        log::debug!("model {}: solved with status {}", self.name, result.status);
        self.result = Some(result);
        Ok(())
    }

    #[cfg(not(feature = "gurobi"))]
    pub fn optimize(&mut self, _time_limit: f64) -> Result<(), String> {
        Err("built without the `gurobi` feature; rebuild with --features gurobi".to_string())
    }

    /// Result of the last [`Model::optimize`] call, if any.
    pub fn result(&self) -> Option<&SolveResult> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_rejected() {
        let mut model = Model::new("test");
        model.add_var(VarKey::route(0, 1, 0), VarKind::Binary, 0.0, 1.0).unwrap();
        let err = model.add_var(VarKey::route(0, 1, 0), VarKind::Binary, 0.0, 1.0);
        assert!(err.is_err());
        assert_eq!(model.num_vars(), 1);
    }

    #[test]
    fn test_binary_family_bounds() {
        let mut model = Model::new("test");
        let map = model
            .add_binary_vars([VarKey::route(0, 1, 0), VarKey::route(1, 0, 0)])
            .unwrap();
        assert_eq!(map.len(), 2);
        for def in model.var_defs() {
            assert_eq!(def.kind, VarKind::Binary);
            assert_eq!(def.lb, 0.0);
            assert_eq!(def.ub, 1.0);
        }
    }

    #[test]
    fn test_lookup_by_key() {
        let mut model = Model::new("test");
        let id = model.add_var(VarKey::arrival(3, 1), VarKind::Continuous, 0.0, f64::INFINITY).unwrap();
        assert_eq!(model.var(&VarKey::arrival(3, 1)), Some(id));
        assert_eq!(model.var(&VarKey::arrival(3, 2)), None);
    }

    #[test]
    fn test_violated_constraints() {
        let mut model = Model::new("test");
        let x = model.add_var(VarKey::route(0, 1, 0), VarKind::Binary, 0.0, 1.0).unwrap();
        let y = model.add_var(VarKey::route(1, 0, 0), VarKind::Binary, 0.0, 1.0).unwrap();

        let mut expr = LinExpr::new();
        expr.push(x, 1.0);
        expr.push(y, 1.0);
        model.add_constr("one_of", expr, ConstrSense::Eq, 1.0);

        // Both zero (defaulted) violates; exactly one satisfies.
        assert_eq!(model.violated_constraints(&HashMap::new()).len(), 1);

        let mut assignment = HashMap::new();
        assignment.insert(x, 1.0);
        assert!(model.violated_constraints(&assignment).is_empty());

        assignment.insert(y, 1.0);
        assert_eq!(model.violated_constraints(&assignment).len(), 1);
    }

    #[test]
    fn test_optimize_without_backend_errors() {
        if cfg!(feature = "gurobi") {
            return;
        }
        let mut model = Model::new("test");
        assert!(model.optimize(10.0).is_err());
        assert!(model.result().is_none());
    }
}
