//! Implements a solver interface for microlp
//!
//! microlp is a pure rust simplex implementation with branch and bound for
//! integer variables, which makes it the default backend: it can handle both
//! the continuous flux problems and the mixed integer strain design problems
//! without any system dependencies.
use indexmap::IndexMap;
use microlp::{ComparisonOp, OptimizationDirection};

use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{SolverBackend, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub struct MicrolpSolver;

impl SolverBackend for MicrolpSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut lp = microlp::Problem::new(direction);

        // Accumulate objective coefficients per variable, variables not in the
        // objective get a zero coefficient
        let mut objective_coefficients: IndexMap<&str, f64> = IndexMap::new();
        for term in problem.objective().terms() {
            *objective_coefficients
                .entry(term.variable.as_str())
                .or_insert(0.0) += term.coefficient;
        }

        // Add every problem variable as a microlp column, in index order
        let mut columns: IndexMap<&str, microlp::Variable> = IndexMap::new();
        for (id, var) in problem.variables() {
            let coefficient = objective_coefficients.get(id.as_str()).copied().unwrap_or(0.0);
            let column = match var.variable_type {
                VariableType::Continuous => {
                    lp.add_var(coefficient, (var.lower_bound, var.upper_bound))
                }
                VariableType::Integer => lp.add_integer_var(
                    coefficient,
                    (var.lower_bound.round() as i32, var.upper_bound.round() as i32),
                ),
                VariableType::Binary => lp.add_binary_var(coefficient),
            };
            columns.insert(id.as_str(), column);
        }

        // Translate constraint rows. Range rows become two microlp rows.
        for constraint in problem.constraints().values() {
            match constraint {
                Constraint::Equality { terms, equals, .. } => {
                    if let Some(expr) = Self::to_expression(terms, &columns)? {
                        lp.add_constraint(&expr, ComparisonOp::Eq, *equals);
                    } else if equals.abs() > f64::EPSILON {
                        // A row with no terms can only be satisfied by a zero
                        // right hand side
                        return Ok(ProblemSolution::failed(OptimizationStatus::Infeasible));
                    }
                }
                Constraint::Inequality {
                    terms,
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if let Some(expr) = Self::to_expression(terms, &columns)? {
                        if upper_bound.is_finite() {
                            lp.add_constraint(&expr, ComparisonOp::Le, *upper_bound);
                        }
                        if lower_bound.is_finite() {
                            lp.add_constraint(&expr, ComparisonOp::Ge, *lower_bound);
                        }
                    } else if *lower_bound > 0.0 || *upper_bound < 0.0 {
                        return Ok(ProblemSolution::failed(OptimizationStatus::Infeasible));
                    }
                }
            }
        }

        match lp.solve() {
            Ok(solution) => {
                let mut variable_values = IndexMap::new();
                for (id, column) in &columns {
                    variable_values.insert(id.to_string(), solution[*column]);
                }
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(variable_values),
                })
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Unbounded))
            }
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }
}

impl MicrolpSolver {
    /// Merge constraint terms into a microlp linear expression
    ///
    /// Coefficients for repeated variables are summed, and exact zero
    /// coefficients are dropped. Returns None for a row with no remaining
    /// terms.
    fn to_expression(
        terms: &[ConstraintTerm],
        columns: &IndexMap<&str, microlp::Variable>,
    ) -> Result<Option<Vec<(microlp::Variable, f64)>>, SolverError> {
        let mut merged: IndexMap<&str, f64> = IndexMap::new();
        for term in terms {
            *merged.entry(term.variable.as_str()).or_insert(0.0) += term.coefficient;
        }
        let mut expression = Vec::with_capacity(merged.len());
        for (variable, coefficient) in merged {
            if coefficient == 0.0 {
                continue;
            }
            let column = columns
                .get(variable)
                .ok_or_else(|| SolverError::UnknownVariable {
                    variable: variable.to_string(),
                })?;
            expression.push((*column, coefficient));
        }
        if expression.is_empty() {
            Ok(None)
        } else {
            Ok(Some(expression))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn solve_simple_lp() {
        // max 3x + 2y subject to x + y <= 4, 0 <= x,y <= 3
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_inequality_constraint("cap", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term("x", 3.).unwrap();
        problem.add_new_linear_objective_term("y", 2.).unwrap();

        let solution = MicrolpSolver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 11.).abs() < 1e-6);
        assert!((solution.value_of("x") - 3.).abs() < 1e-6);
        assert!((solution.value_of("y") - 1.).abs() < 1e-6);
    }

    #[test]
    fn solve_simple_milp() {
        // max x + y with y binary, x <= 2.5, x + 10y <= 8
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 2.5)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Binary, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint(
                "cap",
                &["x", "y"],
                &[1., 10.],
                f64::NEG_INFINITY,
                8.,
            )
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem.add_new_linear_objective_term("y", 1.).unwrap();

        let solution = MicrolpSolver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        // y = 1 would force x <= -2, outside its bounds, so y must be 0
        assert!((solution.value_of("y") - 0.).abs() < 1e-6);
        assert!((solution.objective_value.unwrap() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn infeasible_is_a_status_not_an_error() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint("force_high", &["x"], &[1.], 5., f64::INFINITY)
            .unwrap();
        let solution = MicrolpSolver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.objective_value.is_none());
        assert!(solution.variable_values.is_none());
    }
}
