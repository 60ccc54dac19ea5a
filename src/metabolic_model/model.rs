//! This module provides the Model struct for representing an entire metabolic model
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use thiserror::Error;

use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::Problem;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Underlying optimization problem, if one has been attached
    pub problem: Option<Problem>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            problem: None,
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Set the objective coefficient for a reaction
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownReaction`] if the reaction is not part of the model
    pub fn set_objective(&mut self, reaction_id: &str, coefficient: f64) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::UnknownReaction {
                id: reaction_id.to_string(),
            });
        }
        self.objective.insert(reaction_id.to_string(), coefficient);
        Ok(())
    }

    /// Assemble the stoichiometric matrix of the model
    ///
    /// Rows follow the metabolite insertion order, columns follow the reaction
    /// insertion order.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownMetabolite`] if a reaction references a
    /// metabolite that was never added to the model
    pub fn stoichiometric_matrix(&self) -> Result<CscMatrix<f64>, ModelError> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (rxn_index, (rxn_id, rxn)) in self.reactions.iter().enumerate() {
            for (met_id, coefficient) in &rxn.metabolites {
                let met_index =
                    self.metabolites
                        .get_index_of(met_id)
                        .ok_or_else(|| ModelError::UnknownMetabolite {
                            metabolite: met_id.clone(),
                            reaction: rxn_id.clone(),
                        })?;
                coo.push(met_index, rxn_index, *coefficient);
            }
        }
        Ok(CscMatrix::from(&coo))
    }
}

/// Errors associated with the Model
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// Error when referencing a reaction that isn't part of the model
    #[error("Reaction {id} is not part of the model")]
    UnknownReaction { id: String },
    /// Error when a reaction references a metabolite that isn't part of the model
    #[error("Reaction {reaction} references metabolite {metabolite} which is not part of the model")]
    UnknownMetabolite { metabolite: String, reaction: String },
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on two genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node, holding the gene id
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("({} or {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::And { left, right } => {
                    format!("({} and {})", left.to_string_id(), right.to_string_id())
                }
                GprOperation::Not { val } => {
                    format!("(not {})", val)
                }
            },
            Gpr::GeneNode(gene_ref) => gene_ref.to_string(),
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
    #[error("Gene in GPR is not present in the model")]
    GeneNotFound,
}

// Model associated functions for working with GPRs
impl Model {
    /// Evaluate whether a GPR evaluates to Active or Inactive
    pub fn eval_gpr(&self, gpr: &Gpr) -> Result<GeneActivity, GprError> {
        match gpr {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    let l = self.eval_gpr(left)?;
                    let r = self.eval_gpr(right)?;
                    if l == GeneActivity::Active || r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::And { left, right } => {
                    let l = self.eval_gpr(left)?;
                    let r = self.eval_gpr(right)?;
                    if l == GeneActivity::Active && r == GeneActivity::Active {
                        Ok(GeneActivity::Active)
                    } else {
                        Ok(GeneActivity::Inactive)
                    }
                }
                GprOperation::Not { val } => match self.eval_gpr(val)? {
                    GeneActivity::Active => Ok(GeneActivity::Inactive),
                    GeneActivity::Inactive => Ok(GeneActivity::Active),
                },
            },
            Gpr::GeneNode(gene) => match self.genes.get(gene) {
                Some(g) => Ok(g.activity),
                None => Err(GprError::GeneNotFound),
            },
        }
    }
}

// endregion GPR Functionality
