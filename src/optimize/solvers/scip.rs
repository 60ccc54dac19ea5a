//! Implements a solver interface for Russcip
//!
//! Requires the `scip` feature and a SCIP installation. Used for large mixed
//! integer problems where microlp's branch and bound becomes the bottleneck.
use russcip::prelude::*;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{SolverBackend, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

use indexmap::IndexMap;

pub struct RusscipSolver;

impl SolverBackend for RusscipSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let sense = match problem.objective().sense() {
            ObjectiveSense::Maximize => ObjSense::Maximize,
            ObjectiveSense::Minimize => ObjSense::Minimize,
        };
        let mut model = Model::new()
            .hide_output()
            .include_default_plugins()
            .create_prob("strainrs")
            .set_obj_sense(sense);

        // Accumulate objective coefficients per variable
        let mut objective_coefficients: IndexMap<&str, f64> = IndexMap::new();
        for term in problem.objective().terms() {
            *objective_coefficients
                .entry(term.variable.as_str())
                .or_insert(0.0) += term.coefficient;
        }

        let mut columns = IndexMap::new();
        for (id, var) in problem.variables() {
            let coefficient = objective_coefficients.get(id.as_str()).copied().unwrap_or(0.0);
            let var_type = match var.variable_type {
                VariableType::Continuous => VarType::Continuous,
                VariableType::Integer => VarType::Integer,
                VariableType::Binary => VarType::Binary,
            };
            let column = model.add_var(var.lower_bound, var.upper_bound, coefficient, id, var_type);
            columns.insert(id.as_str(), column);
        }

        for constraint in problem.constraints().values() {
            let (terms, lhs, rhs, id) = match constraint {
                Constraint::Equality {
                    id, terms, equals, ..
                } => (terms, *equals, *equals, id),
                Constraint::Inequality {
                    id,
                    terms,
                    lower_bound,
                    upper_bound,
                } => (terms, *lower_bound, *upper_bound, id),
            };
            let mut row_vars = Vec::with_capacity(terms.len());
            let mut row_coefficients = Vec::with_capacity(terms.len());
            for term in terms {
                let column =
                    columns
                        .get(term.variable.as_str())
                        .ok_or_else(|| SolverError::UnknownVariable {
                            variable: term.variable.clone(),
                        })?;
                row_vars.push(column.clone());
                row_coefficients.push(term.coefficient);
            }
            model.add_cons(row_vars, &row_coefficients, lhs, rhs, id);
        }

        let solved = model.solve();
        let status = match solved.status() {
            Status::Optimal => OptimizationStatus::Optimal,
            Status::Infeasible => OptimizationStatus::Infeasible,
            Status::Unbounded => OptimizationStatus::Unbounded,
            Status::TimeLimit | Status::NodeLimit | Status::TotalNodeLimit => {
                OptimizationStatus::SolverHalted
            }
            _ => OptimizationStatus::NumericalError,
        };
        if status != OptimizationStatus::Optimal {
            return Ok(ProblemSolution::failed(status));
        }
        let best = solved
            .best_sol()
            .ok_or_else(|| SolverError::Backend("SCIP reported optimal without a solution".to_string()))?;
        let mut variable_values = IndexMap::new();
        for (id, column) in &columns {
            variable_values.insert(id.to_string(), best.val(column.clone()));
        }
        Ok(ProblemSolution {
            status,
            objective_value: Some(solved.obj_val()),
            variable_values: Some(variable_values),
        })
    }
}
