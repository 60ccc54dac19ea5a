//! Solver backends for dispatching assembled problems
//!
//! Each backend consumes a [`Problem`](crate::optimize::problem::Problem) and
//! returns a [`ProblemSolution`](crate::optimize::ProblemSolution). Solver
//! infeasibility and unboundedness are reported through the solution status,
//! not as errors.

pub mod microlp;
#[cfg(feature = "scip")]
pub mod scip;

use indexmap::IndexMap;
use thiserror::Error;

use crate::configuration::{Solver, CONFIGURATION};
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

/// Interface all solver backends implement
pub trait SolverBackend {
    /// Solve the given problem, returning the solution
    ///
    /// # Errors
    /// Returns a [`SolverError`] only for backend failures; an infeasible or
    /// unbounded problem is a successfully determined outcome and is reported
    /// through [`ProblemSolution::status`]
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;

    /// Solve the given problem, hinting the solver with a candidate integer
    /// assignment keyed by variable id
    ///
    /// Backends without warm start support ignore the hint.
    fn solve_with_hint(
        &self,
        problem: &Problem,
        _hint: &IndexMap<String, f64>,
    ) -> Result<ProblemSolution, SolverError> {
        self.solve(problem)
    }
}

/// Get the backend for a specific solver selection
pub fn backend_for(solver: Solver) -> Result<Box<dyn SolverBackend>, SolverError> {
    match solver {
        Solver::Microlp => Ok(Box::new(microlp::MicrolpSolver)),
        Solver::Scip => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "scip")] {
                    Ok(Box::new(scip::RusscipSolver))
                } else {
                    Err(SolverError::BackendUnavailable {
                        backend: "scip".to_string(),
                    })
                }
            }
        }
    }
}

/// Get the backend selected in the global configuration
pub fn default_backend() -> Result<Box<dyn SolverBackend>, SolverError> {
    let solver = CONFIGURATION.read().unwrap().solver;
    backend_for(solver)
}

/// Errors arising from solver backends
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// The requested backend was not compiled in
    #[error("Solver backend {backend} is not available, enable the matching feature")]
    BackendUnavailable { backend: String },
    /// A constraint or objective referenced a variable the backend doesn't know
    #[error("Problem referenced variable {variable} which has no backend column")]
    UnknownVariable { variable: String },
    /// The backend reported an internal failure
    #[error("Solver backend failed: {0}")]
    Backend(String),
}
