//! Decoding solver output back into model terms
//!
//! Maps the irreversible space solution onto original reaction ids, reads the
//! knockout binaries (a binary near one marks a deleted reaction, matching
//! the formulator's polarity) and classifies the solver status.
use indexmap::IndexMap;

use crate::configuration::CONFIGURATION;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use crate::strain_design::formulate::BilevelIndex;
use crate::strain_design::irreversible::IrreversibleModel;
use crate::strain_design::OptKnockSolution;

/// Binary values are read against the feasibility tolerance scaled by this
/// factor, rather than machine epsilon, to absorb solver noise on integer
/// columns
pub const INTEGER_TOLERANCE_SCALING: f64 = 100.0;

/// Tolerance for deciding whether a binary is effectively one
pub(crate) fn integer_tolerance() -> f64 {
    CONFIGURATION.read().unwrap().tolerance * INTEGER_TOLERANCE_SCALING
}

/// Decode raw solver output into an OptKnock solution
///
/// Anything other than an optimal outcome yields empty knockout and flux
/// fields with the status passed through for the caller to inspect.
pub fn decode_solution(
    raw: ProblemSolution,
    index: &BilevelIndex,
    irrev: &IrreversibleModel,
) -> OptKnockSolution {
    if raw.status != OptimizationStatus::Optimal {
        return OptKnockSolution {
            status: raw.status,
            knockouts: Vec::new(),
            fluxes: IndexMap::new(),
            objective_value: None,
            raw,
        };
    }

    let tolerance = integer_tolerance();
    let mut knockouts = Vec::new();
    for (rxn_id, y_id) in &index.y_variables {
        if raw.value_of(y_id) > 1.0 - tolerance {
            knockouts.push(rxn_id.clone());
        }
    }

    let fluxes = match &raw.variable_values {
        Some(values) => irrev.net_fluxes(values),
        None => IndexMap::new(),
    };

    OptKnockSolution {
        status: raw.status,
        knockouts,
        fluxes,
        objective_value: raw.objective_value,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::MetaboliteBuilder;
    use crate::metabolic_model::model::Model;
    use crate::metabolic_model::reaction::ReactionBuilder;

    fn simple_index() -> BilevelIndex {
        let mut y_variables = IndexMap::new();
        y_variables.insert("R1".to_string(), "y_R1".to_string());
        y_variables.insert("R2".to_string(), "y_R2".to_string());
        BilevelIndex {
            y_variables,
            inner_objective: Vec::new(),
            dual_objective: Vec::new(),
        }
    }

    fn simple_irrev() -> IrreversibleModel {
        let mut model = Model::new_empty();
        model.add_metabolite(MetaboliteBuilder::default().id("A").build().unwrap());
        let mut uptake = indexmap::IndexMap::new();
        uptake.insert("A".to_string(), 1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("R1")
                .metabolites(uptake.clone())
                .lower_bound(-10.)
                .upper_bound(10.)
                .build()
                .unwrap(),
        );
        let mut sink = indexmap::IndexMap::new();
        sink.insert("A".to_string(), -1.0);
        model.add_reaction(
            ReactionBuilder::default()
                .id("R2")
                .metabolites(sink)
                .lower_bound(0.)
                .upper_bound(10.)
                .build()
                .unwrap(),
        );
        IrreversibleModel::from_model(&model, 1000.).unwrap()
    }

    #[test]
    fn noisy_binaries_are_classified_by_scaled_tolerance() {
        let irrev = simple_irrev();
        let index = simple_index();
        let mut values = IndexMap::new();
        // Slightly noisy one and a clear zero
        values.insert("y_R1".to_string(), 1.0 - integer_tolerance() / 2.0);
        values.insert("y_R2".to_string(), 1e-9);
        let raw = ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(3.0),
            variable_values: Some(values),
        };
        let solution = decode_solution(raw, &index, &irrev);
        assert_eq!(solution.knockouts, vec!["R1".to_string()]);
        assert_eq!(solution.objective_value, Some(3.0));
    }

    #[test]
    fn reversible_flux_is_reconstructed_as_net() {
        let irrev = simple_irrev();
        let index = simple_index();
        let mut values = IndexMap::new();
        values.insert(irrev.variables()[0].id.clone(), 1.0);
        values.insert(irrev.variables()[1].id.clone(), 4.0);
        let raw = ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(0.0),
            variable_values: Some(values),
        };
        let solution = decode_solution(raw, &index, &irrev);
        assert!((solution.fluxes["R1"] + 3.0).abs() < 1e-12);
    }

    #[test]
    fn infeasible_outcome_has_empty_fields() {
        let irrev = simple_irrev();
        let index = simple_index();
        let raw = ProblemSolution::failed(OptimizationStatus::Infeasible);
        let solution = decode_solution(raw, &index, &irrev);
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.knockouts.is_empty());
        assert!(solution.fluxes.is_empty());
        assert!(solution.objective_value.is_none());
    }
}
