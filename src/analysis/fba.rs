//! Flux balance analysis
//!
//! Builds the steady state flux optimization problem for a model, with every
//! reaction represented by a forward variable and, when the reaction can run
//! in reverse, a reverse variable. Net flux through a reaction is the forward
//! value minus the reverse value.
use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::SolverError;
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use serde::Serialize;

/// Result of a flux balance analysis run
#[derive(Clone, Debug, Serialize)]
pub struct FbaSolution {
    /// Outcome reported by the solver
    pub status: OptimizationStatus,
    /// Optimal objective value, None unless the status is optimal
    pub objective_value: Option<f64>,
    /// Net flux for every reaction, keyed by reaction id, None unless the
    /// status is optimal
    pub fluxes: Option<IndexMap<String, f64>>,
}

/// Errors arising while setting up or running flux balance analysis
#[derive(Error, Debug)]
pub enum FbaError {
    /// The model has no objective coefficients set
    #[error("Model has no objective, set at least one objective coefficient")]
    NoObjective,
    /// A knockout referenced a reaction that isn't part of the model
    #[error("Knockout reaction {id} is not part of the model")]
    UnknownKnockoutReaction { id: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Build the steady state flux problem for a model
///
/// Each reaction contributes a forward variable bounded by
/// [`Reaction::get_forward_lower_bound`](crate::metabolic_model::reaction::Reaction)
/// and its upper counterpart, plus a reverse variable when the reaction is
/// reversible. One mass balance equality row is added per metabolite.
pub fn build_flux_problem(model: &Model) -> Result<Problem, FbaError> {
    let mut problem = Problem::new_maximization();

    // Flux variables
    for rxn in model.reactions.values() {
        problem.add_new_variable(
            &rxn.get_forward_id(),
            None,
            VariableType::Continuous,
            rxn.get_forward_lower_bound(),
            rxn.get_forward_upper_bound(),
        )?;
        if rxn.reversible() {
            problem.add_new_variable(
                &rxn.get_reverse_id(),
                None,
                VariableType::Continuous,
                rxn.get_reverse_lower_bound(),
                rxn.get_reverse_upper_bound(),
            )?;
        }
    }

    // Mass balance rows, one per metabolite
    let mut balance_terms: IndexMap<&str, Vec<(String, f64)>> = IndexMap::new();
    for met_id in model.metabolites.keys() {
        balance_terms.insert(met_id.as_str(), Vec::new());
    }
    for (rxn_id, rxn) in &model.reactions {
        for (met_id, coefficient) in &rxn.metabolites {
            let terms = balance_terms.get_mut(met_id.as_str()).ok_or_else(|| {
                ModelError::UnknownMetabolite {
                    metabolite: met_id.clone(),
                    reaction: rxn_id.clone(),
                }
            })?;
            terms.push((rxn.get_forward_id(), *coefficient));
            if rxn.reversible() {
                terms.push((rxn.get_reverse_id(), -coefficient));
            }
        }
    }
    for (met_id, terms) in balance_terms {
        let variables: Vec<&str> = terms.iter().map(|(id, _)| id.as_str()).collect();
        let coefficients: Vec<f64> = terms.iter().map(|(_, c)| *c).collect();
        problem.add_new_equality_constraint(
            &format!("mass_balance_{}", met_id),
            &variables,
            &coefficients,
            0.,
        )?;
    }

    // Objective from the model's objective coefficient map
    for (rxn_id, coefficient) in &model.objective {
        if let Some(rxn) = model.reactions.get(rxn_id) {
            problem.add_new_linear_objective_term(&rxn.get_forward_id(), *coefficient)?;
            if rxn.reversible() {
                problem.add_new_linear_objective_term(&rxn.get_reverse_id(), -coefficient)?;
            }
        }
    }

    Ok(problem)
}

/// Net flux per reaction from a solved flux problem
pub(crate) fn net_fluxes(model: &Model, solution: &ProblemSolution) -> IndexMap<String, f64> {
    let mut fluxes = IndexMap::new();
    for (rxn_id, rxn) in &model.reactions {
        let forward = solution.value_of(&rxn.get_forward_id());
        let reverse = if rxn.reversible() {
            solution.value_of(&rxn.get_reverse_id())
        } else {
            0.0
        };
        fluxes.insert(rxn_id.clone(), forward - reverse);
    }
    fluxes
}

/// Optimize the model's objective subject to steady state mass balance
pub fn fba(model: &Model) -> Result<FbaSolution, FbaError> {
    fba_with_knockouts(model, &[])
}

/// Optimize the model's objective with the given reactions deleted
///
/// Both flux directions of every knocked out reaction are forced to zero.
pub fn fba_with_knockouts(model: &Model, knockouts: &[String]) -> Result<FbaSolution, FbaError> {
    if model.objective.is_empty() {
        return Err(FbaError::NoObjective);
    }
    let mut problem = build_flux_problem(model)?;
    for rxn_id in knockouts {
        let rxn = model
            .reactions
            .get(rxn_id)
            .ok_or_else(|| FbaError::UnknownKnockoutReaction { id: rxn_id.clone() })?;
        problem.update_variable_bounds(&rxn.get_forward_id(), 0., 0.)?;
        if rxn.reversible() {
            problem.update_variable_bounds(&rxn.get_reverse_id(), 0., 0.)?;
        }
    }
    let solution = problem.solve()?;
    if solution.status != OptimizationStatus::Optimal {
        return Ok(FbaSolution {
            status: solution.status,
            objective_value: None,
            fluxes: None,
        });
    }
    let fluxes = net_fluxes(model, &solution);
    Ok(FbaSolution {
        status: solution.status,
        objective_value: solution.objective_value,
        fluxes: Some(fluxes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::MetaboliteBuilder;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use indexmap::IndexMap;

    /// A -> B chain: uptake of A, conversion to B, secretion of B
    fn chain_model() -> Model {
        let mut model = Model::new_empty();
        model.add_metabolite(MetaboliteBuilder::default().id("A").build().unwrap());
        model.add_metabolite(MetaboliteBuilder::default().id("B").build().unwrap());

        let mut uptake = IndexMap::new();
        uptake.insert("A".to_string(), 1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("EX_A")
                .metabolites(uptake)
                .lower_bound(0.)
                .upper_bound(10.)
                .build()
                .unwrap(),
        );

        let mut conv = IndexMap::new();
        conv.insert("A".to_string(), -1.0);
        conv.insert("B".to_string(), 1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("CONV")
                .metabolites(conv)
                .lower_bound(-1000.)
                .upper_bound(1000.)
                .build()
                .unwrap(),
        );

        let mut secretion = IndexMap::new();
        secretion.insert("B".to_string(), -1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("EX_B")
                .metabolites(secretion)
                .lower_bound(0.)
                .upper_bound(1000.)
                .build()
                .unwrap(),
        );

        model.set_objective("EX_B", 1.0).unwrap();
        model
    }

    #[test]
    fn fba_finds_chain_optimum() {
        let model = chain_model();
        let solution = fba(&model).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-6);
        let fluxes = solution.fluxes.unwrap();
        assert!((fluxes["EX_A"] - 10.).abs() < 1e-6);
        assert!((fluxes["CONV"] - 10.).abs() < 1e-6);
        assert!((fluxes["EX_B"] - 10.).abs() < 1e-6);
    }

    #[test]
    fn knockout_stops_flux() {
        let model = chain_model();
        let solution = fba_with_knockouts(&model, &["CONV".to_string()]).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 0.).abs() < 1e-6);
        let fluxes = solution.fluxes.unwrap();
        assert!((fluxes["CONV"] - 0.).abs() < 1e-6);
        assert!((fluxes["EX_B"] - 0.).abs() < 1e-6);
    }

    #[test]
    fn missing_objective_is_an_error() {
        let mut model = chain_model();
        model.objective.clear();
        assert!(matches!(fba(&model), Err(FbaError::NoObjective)));
    }

    #[test]
    fn unknown_knockout_is_an_error() {
        let model = chain_model();
        assert!(matches!(
            fba_with_knockouts(&model, &["ghost".to_string()]),
            Err(FbaError::UnknownKnockoutReaction { .. })
        ));
    }

    #[test]
    fn solution_serializes() {
        let model = chain_model();
        let solution = fba(&model).unwrap();
        let json = serde_json::to_string(&solution).unwrap();
        assert!(json.contains("EX_B"));
    }
}
