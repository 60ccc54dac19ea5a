//! Process wide defaults for model construction and solving
use std::sync::{LazyLock, RwLock};

/// Global configuration instance
///
/// # Note:
/// Callers may adjust these defaults at startup, but they must be treated as
/// immutable while any solve is in flight. Per-call settings belong in the
/// explicit options types instead.
pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

pub struct Configuration {
    /// Default lower flux bound for new reactions
    pub lower_bound: f64,
    /// Default upper flux bound for new reactions
    pub upper_bound: f64,
    /// Feasibility tolerance used when comparing solver output to bounds
    pub tolerance: f64,
    /// Which solver backend to dispatch problems to
    pub solver: Solver,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: Solver::Microlp,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Solver {
    /// Use the microlp simplex/branch-and-bound solver
    Microlp,
    /// Use the SCIP Mixed Integer Solver, requires the scip feature to be enabled
    Scip,
}
