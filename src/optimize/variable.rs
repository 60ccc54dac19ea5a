//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A single variable in an optimization problem
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    pub id: String,
    /// Human readable variable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Type of the variable (see [`VariableType`])
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// The lowest value the variable can take
    #[builder(default = "f64::NEG_INFINITY")]
    pub lower_bound: f64,
    /// The highest value the variable can take
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
    /// Column index of the variable within its problem, assigned when the
    /// variable is added
    #[builder(setter(skip), default)]
    pub(crate) index: usize,
}

impl Variable {
    /// Column index of the variable within its problem
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", name, self.variable_type),
            None => write!(f, "{}:{}", self.id, self.variable_type),
        }
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported by all solvers, microlp and Russcip
/// both support all three
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
