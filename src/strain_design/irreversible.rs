//! Irreversible reformulation of a metabolic model
//!
//! Splits every reversible reaction into a forward and a backward column with
//! non negative flux, keeping a bidirectional mapping between the original
//! reaction indices and the irreversible columns. Split pairs are adjacent,
//! the backward column directly follows its forward twin.
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::metabolic_model::model::{Model, ModelError};

/// Direction a split column carries flux in, relative to the original reaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FluxDirection {
    Forward,
    Backward,
}

/// A single non negative flux column of the irreversible model
#[derive(Clone, Debug)]
pub struct IrrevVariable {
    /// Variable id used in assembled optimization problems
    pub id: String,
    /// Index of the originating reaction in the source model
    pub reaction: usize,
    /// Which direction of the original reaction this column carries
    pub direction: FluxDirection,
    /// Lowest allowed flux, never negative
    pub lower_bound: f64,
    /// Highest allowed flux
    pub upper_bound: f64,
    /// Index of the opposite direction column for split reactions
    pub twin: Option<usize>,
}

/// A model reformulated so that every flux is non negative
#[derive(Clone, Debug)]
pub struct IrreversibleModel {
    variables: Vec<IrrevVariable>,
    /// Stoichiometry over the split columns, rows follow the source model's
    /// metabolite order
    stoichiometry: CscMatrix<f64>,
    metabolite_ids: Vec<String>,
    reaction_ids: Vec<String>,
    /// Original reaction index to forward column index
    forward_of: Vec<usize>,
    /// Original reaction index to backward column index, None for
    /// irreversible reactions
    backward_of: Vec<Option<usize>>,
}

impl IrreversibleModel {
    /// Split a model into its irreversible representation
    ///
    /// # Parameters
    /// - `model`: the source model
    /// - `v_max`: magnitude cap substituted for unbounded or larger flux
    ///   bounds when deriving the split column bounds
    ///
    /// # Note:
    /// Bounds with lower > upper are carried through unchanged, such models
    /// surface as solver infeasibility rather than an early error.
    pub fn from_model(model: &Model, v_max: f64) -> Result<Self, ModelError> {
        let n_rxns = model.reactions.len();
        let mut variables = Vec::with_capacity(2 * n_rxns);
        let mut forward_of = Vec::with_capacity(n_rxns);
        let mut backward_of = Vec::with_capacity(n_rxns);

        for (reaction_index, rxn) in model.reactions.values().enumerate() {
            let forward_index = variables.len();
            forward_of.push(forward_index);
            let reversible = rxn.reversible();
            variables.push(IrrevVariable {
                id: rxn.get_forward_id(),
                reaction: reaction_index,
                direction: FluxDirection::Forward,
                lower_bound: rxn.get_forward_lower_bound().min(v_max),
                upper_bound: rxn.get_forward_upper_bound().min(v_max),
                twin: if reversible {
                    Some(forward_index + 1)
                } else {
                    None
                },
            });
            if reversible {
                backward_of.push(Some(forward_index + 1));
                variables.push(IrrevVariable {
                    id: rxn.get_reverse_id(),
                    reaction: reaction_index,
                    direction: FluxDirection::Backward,
                    lower_bound: rxn.get_reverse_lower_bound().min(v_max),
                    upper_bound: rxn.get_reverse_upper_bound().min(v_max),
                    twin: Some(forward_index),
                });
            } else {
                backward_of.push(None);
            }
        }

        // Stoichiometry over the split columns, backward columns carry the
        // negated coefficients
        let mut coo = CooMatrix::new(model.metabolites.len(), variables.len());
        for (reaction_index, (rxn_id, rxn)) in model.reactions.iter().enumerate() {
            for (met_id, coefficient) in &rxn.metabolites {
                let met_index = model.metabolites.get_index_of(met_id).ok_or_else(|| {
                    ModelError::UnknownMetabolite {
                        metabolite: met_id.clone(),
                        reaction: rxn_id.clone(),
                    }
                })?;
                coo.push(met_index, forward_of[reaction_index], *coefficient);
                if let Some(backward_index) = backward_of[reaction_index] {
                    coo.push(met_index, backward_index, -coefficient);
                }
            }
        }

        Ok(IrreversibleModel {
            variables,
            stoichiometry: CscMatrix::from(&coo),
            metabolite_ids: model.metabolites.keys().cloned().collect(),
            reaction_ids: model.reactions.keys().cloned().collect(),
            forward_of,
            backward_of,
        })
    }

    /// The split flux columns, forward/backward pairs adjacent
    pub fn variables(&self) -> &[IrrevVariable] {
        &self.variables
    }

    /// Number of split columns
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Stoichiometry over the split columns
    pub fn stoichiometry(&self) -> &CscMatrix<f64> {
        &self.stoichiometry
    }

    /// Metabolite ids in row order
    pub fn metabolite_ids(&self) -> &[String] {
        &self.metabolite_ids
    }

    /// Original reaction ids in source order
    pub fn reaction_ids(&self) -> &[String] {
        &self.reaction_ids
    }

    /// Index of a column's opposite direction twin, None for columns of
    /// irreversible reactions
    pub fn match_rev(&self, column: usize) -> Option<usize> {
        self.variables[column].twin
    }

    /// Map an original reaction index to its forward and optional backward
    /// column indices
    pub fn rev2irrev(&self, reaction_index: usize) -> (usize, Option<usize>) {
        (
            self.forward_of[reaction_index],
            self.backward_of[reaction_index],
        )
    }

    /// Map a column index back to its original reaction index
    pub fn irrev2rev(&self, column: usize) -> usize {
        self.variables[column].reaction
    }

    /// Look up an original reaction index by id
    pub fn reaction_index(&self, reaction_id: &str) -> Option<usize> {
        self.reaction_ids.iter().position(|id| id == reaction_id)
    }

    /// Replace the lower bound of a column
    pub fn set_lower_bound(&mut self, column: usize, value: f64) {
        self.variables[column].lower_bound = value;
    }

    /// Replace the upper bound of a column
    pub fn set_upper_bound(&mut self, column: usize, value: f64) {
        self.variables[column].upper_bound = value;
    }

    /// Reconstruct net fluxes in original reaction space from split column
    /// values keyed by variable id
    pub fn net_fluxes(&self, values: &IndexMap<String, f64>) -> IndexMap<String, f64> {
        let mut fluxes = IndexMap::new();
        for (reaction_index, rxn_id) in self.reaction_ids.iter().enumerate() {
            let (forward, backward) = self.rev2irrev(reaction_index);
            let mut net = values
                .get(&self.variables[forward].id)
                .copied()
                .unwrap_or(0.0);
            if let Some(backward) = backward {
                net -= values
                    .get(&self.variables[backward].id)
                    .copied()
                    .unwrap_or(0.0);
            }
            fluxes.insert(rxn_id.clone(), net);
        }
        fluxes
    }
}
