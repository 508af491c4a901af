//! Normalization of backend solver status codes.
//!
//! The backend reports a numeric status; downstream reporting works with a
//! closed set of symbolic keywords. An unknown code is a hard error: a new
//! backend status has to be added to the table explicitly, never coerced
//! into a catch-all bucket, because the aggregation step assumes the status
//! set is closed.

use std::fmt;
use std::str::FromStr;

/// Symbolic, backend-independent solver status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    Loaded,
    Optimal,
    Infeasible,
    InfOrUnbd,
    Unbounded,
    Cutoff,
    IterationLimit,
    NodeLimit,
    TimeLimit,
    SolutionLimit,
    Interrupted,
    Numeric,
    Suboptimal,
    Inprogress,
    UserObjLimit,
    WorkLimit,
    MemLimit,
}

impl SolverStatus {
    /// Maps a numeric backend status code to its keyword.
    pub fn from_code(code: i32) -> Result<Self, String> {
        use SolverStatus::*;
        match code {
            1 => Ok(Loaded),
            2 => Ok(Optimal),
            3 => Ok(Infeasible),
            4 => Ok(InfOrUnbd),
            5 => Ok(Unbounded),
            6 => Ok(Cutoff),
            7 => Ok(IterationLimit),
            8 => Ok(NodeLimit),
            9 => Ok(TimeLimit),
            10 => Ok(SolutionLimit),
            11 => Ok(Interrupted),
            12 => Ok(Numeric),
            13 => Ok(Suboptimal),
            14 => Ok(Inprogress),
            15 => Ok(UserObjLimit),
            16 => Ok(WorkLimit),
            17 => Ok(MemLimit),
            other => Err(format!("unknown solver status code: {}", other)),
        }
    }

    pub fn as_keyword(&self) -> &'static str {
        use SolverStatus::*;
        match self {
            Loaded => "LOADED",
            Optimal => "OPTIMAL",
            Infeasible => "INFEASIBLE",
            InfOrUnbd => "INF_OR_UNBD",
            Unbounded => "UNBOUNDED",
            Cutoff => "CUTOFF",
            IterationLimit => "ITERATION_LIMIT",
            NodeLimit => "NODE_LIMIT",
            TimeLimit => "TIME_LIMIT",
            SolutionLimit => "SOLUTION_LIMIT",
            Interrupted => "INTERRUPTED",
            Numeric => "NUMERIC",
            Suboptimal => "SUBOPTIMAL",
            Inprogress => "INPROGRESS",
            UserObjLimit => "USER_OBJ_LIMIT",
            WorkLimit => "WORK_LIMIT",
            MemLimit => "MEM_LIMIT",
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_keyword())
    }
}

impl FromStr for SolverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SolverStatus::*;
        match s {
            "LOADED" => Ok(Loaded),
            "OPTIMAL" => Ok(Optimal),
            "INFEASIBLE" => Ok(Infeasible),
            "INF_OR_UNBD" => Ok(InfOrUnbd),
            "UNBOUNDED" => Ok(Unbounded),
            "CUTOFF" => Ok(Cutoff),
            "ITERATION_LIMIT" => Ok(IterationLimit),
            "NODE_LIMIT" => Ok(NodeLimit),
            "TIME_LIMIT" => Ok(TimeLimit),
            "SOLUTION_LIMIT" => Ok(SolutionLimit),
            "INTERRUPTED" => Ok(Interrupted),
            "NUMERIC" => Ok(Numeric),
            "SUBOPTIMAL" => Ok(Suboptimal),
            "INPROGRESS" => Ok(Inprogress),
            "USER_OBJ_LIMIT" => Ok(UserObjLimit),
            "WORK_LIMIT" => Ok(WorkLimit),
            "MEM_LIMIT" => Ok(MemLimit),
            other => Err(format!("unknown solver status keyword: {}", other)),
        }
    }
}
