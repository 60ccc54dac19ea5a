//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::problem::ProblemError::{NonExistentVariable, NonExistentVariablesInObjective};
use crate::optimize::solvers::{self, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder, VariableType};
use crate::optimize::ProblemSolution;

/// An optimization problem
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, keyed by id, in column order
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem, keyed by id, in row order
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    // endregion Creation Functions

    // region Update Objective Sense
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        // Validate that the variable can in fact be added to the problem
        self.validate_variable(&variable)?;
        // Update the index of the variable to reflect the current variable count
        variable.index = self.variables.len();
        // Update the type of the problem if needed
        match variable.variable_type {
            VariableType::Continuous => {
                // This will not change the type
            }
            VariableType::Integer | VariableType::Binary => {
                self.problem_type = ProblemType::LinearMixedInteger;
            }
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let new_var = VariableBuilder::default()
            .id(id)
            .name(name.map(|n| n.to_string()))
            .variable_type(variable_type)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .map_err(|_| ProblemError::InvalidVariable)?;
        self.add_variable(new_var)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints.insert(constraint.get_id(), constraint);
        Ok(())
    }

    /// Create a new equality constraint (by variable ids) and add it to the problem
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        let new_cons = Constraint::new_equality(id, variables, coefficients, equals);
        self.add_constraint(new_cons)
    }

    /// Create a new inequality constraint (by variable ids) and add it to the problem
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let new_cons = Constraint::new_inequality(id, variables, coefficients, lower_bound, upper_bound);
        self.add_constraint(new_cons)
    }

    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        if !self.variables.contains_key(&objective_term.variable) {
            return Err(NonExistentVariablesInObjective);
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable_id, coefficient))
    }

    // endregion Adding Objective Terms

    // region Remove Objective Terms
    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Remove Objective Terms

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds);
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(NonExistentVariable),
        };
        Ok(())
    }

    // endregion update variable bounds

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        // Check if there is already a variable with this id
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists);
        };
        // Check if the variable bounds are valid
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds);
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        // Check that a constraint with the same id doesn't already exist
        if self.constraints.contains_key(&constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists);
        }
        // Check that for inequality constraints the bounds make sense
        match constraint {
            Constraint::Equality { .. } => {}
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                if lower_bound > upper_bound {
                    return Err(ProblemError::InvalidConstraintBounds);
                }
            }
        }
        // Check that the variables in this constraint are in the problem
        for term in constraint.get_terms() {
            if !self.variables.contains_key(&term.variable) {
                return Err(ProblemError::NonExistentVariablesInConstraint);
            }
        }
        // All checks have passed
        Ok(())
    }

    // endregion Validation Functions

    // region Check Problem
    /*
    Functions for checking properties of the Problem, such as if integer variables are
    present
    */
    pub fn has_integer_variables(&self) -> bool {
        self.variables.values().any(|var| {
            matches!(
                var.variable_type,
                VariableType::Integer | VariableType::Binary
            )
        })
    }

    /// Number of variables currently in the problem
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints currently in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// The variables of the problem, keyed by id, in column order
    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    /// Look up a single variable by id
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// The constraints of the problem, keyed by id, in row order
    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    /// The objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// The type of the problem
    pub fn problem_type(&self) -> &ProblemType {
        &self.problem_type
    }

    // endregion Check Problem

    // region Solving
    /// Solve the problem with the solver selected in the global configuration
    pub fn solve(&self) -> Result<ProblemSolution, SolverError> {
        solvers::default_backend()?.solve(self)
    }
    // endregion Solving
}

/// Types of optimization problems
#[derive(Clone, Debug, PartialEq)]
pub enum ProblemType {
    /// Problem with linear objective and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable")]
    VariableIdAlreadyExists,
    /// Error when trying to add a variable missing required fields
    #[error("Tried to add a variable missing required fields")]
    InvalidVariable,
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add a variable with lower_bound>upper_bound")]
    InvalidVariableBounds,
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint")]
    ConstraintAlreadyExists,
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add an inequality constraint with lower_bound > upper_bound")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the problem
    #[error("Tried to add a constraint with variables not in the problem")]
    NonExistentVariablesInConstraint,
    /// Error when trying to add an objective term which includes variables not in the problem
    #[error("Tried adding an objective term with variables not in the problem")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access a variable that doesn't exist")]
    NonExistentVariable,
}
