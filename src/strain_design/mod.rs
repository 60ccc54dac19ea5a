//! Bilevel strain design: searching for reaction deletions that couple a
//! target flux to the model's native objective
//!
//! The search is expressed as a single mixed integer program per call (see
//! [`formulate`]). Repeated search for distinct knockout sets is driven by the
//! caller: every discovered set is passed back in through `prev_solutions`,
//! which excludes it from the next solve. No state survives between calls.
pub mod constraints;
pub mod cuts;
pub mod decode;
pub mod formulate;
pub mod irreversible;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{self, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

pub use constraints::{ConstraintSense, FluxConstraint};
pub use formulate::{BilevelIndex, BilevelProblem};
pub use irreversible::IrreversibleModel;

use constraints::{apply_patches, translate_constraints};
use decode::decode_solution;
use formulate::build_bilevel_problem;

/// Options controlling a single knockout search
///
/// Every recognized option with its default, validated once at entry. There
/// is no other configuration surface.
#[derive(Builder, Clone, Debug)]
#[builder(setter(into))]
pub struct OptKnockOptions {
    /// Reaction whose flux the outer problem maximizes
    pub target_rxn: String,
    /// Knockout budget
    #[builder(default = "5")]
    pub num_del: usize,
    /// Direction of the deletion count comparison, at most `num_del` by
    /// default
    #[builder(default = "ConstraintSense::Less")]
    pub num_del_sense: ConstraintSense,
    /// Flux magnitude cap used when deriving irreversible bounds
    #[builder(default = "1000.")]
    pub v_max: f64,
    /// Box bound on the inner dual variables; dual optima beyond this cap
    /// make the search infeasible, raise it for models with extreme
    /// coefficients
    #[builder(default = "1000.")]
    pub dual_bound: f64,
    /// When false, assemble the problem but skip solving
    #[builder(default = "true")]
    pub solve: bool,
    /// Candidate knockout set to hint the solver with, validated against the
    /// candidate list and the deletion budget
    #[builder(default = "None")]
    pub initial_knockouts: Option<Vec<String>>,
}

/// Outcome of one knockout search call
pub struct OptKnockResult {
    /// The assembled bilevel MILP
    pub problem: Problem,
    /// Bookkeeping connecting MILP variables back to the model
    pub index: BilevelIndex,
    /// The decoded solution, None when solving was skipped
    pub solution: Option<OptKnockSolution>,
}

/// A decoded knockout search solution
#[derive(Clone, Debug, Serialize)]
pub struct OptKnockSolution {
    /// Solver outcome; infeasible and halted searches are reported here, not
    /// as errors
    pub status: OptimizationStatus,
    /// Deleted reactions, by original reaction id
    pub knockouts: Vec<String>,
    /// Net flux per original reaction at the optimum, empty unless optimal
    pub fluxes: IndexMap<String, f64>,
    /// Target flux at the optimum
    pub objective_value: Option<f64>,
    /// Raw solver output over the irreversible and dual variables
    pub raw: ProblemSolution,
}

/// Errors raised before or during a knockout search
///
/// Everything here is a configuration or infrastructure failure. Solver
/// infeasibility is not an error, it surfaces as
/// [`OptKnockSolution::status`].
#[derive(Error, Debug)]
pub enum OptKnockError {
    /// The target reaction is not part of the model
    #[error("Target reaction {id} is not part of the model")]
    UnknownTargetReaction { id: String },
    /// A selected candidate reaction is not part of the model
    #[error("Selected reaction {id} is not part of the model")]
    UnknownSelectedReaction { id: String },
    /// A constraint entry references a reaction that isn't part of the model
    #[error("Constraint references reaction {id} which is not part of the model")]
    UnknownConstraintReaction { id: String },
    /// The model has no objective to use as the inner optimization
    #[error("Model has no objective, set at least one objective coefficient")]
    NoInnerObjective,
    /// A prior solution references a reaction outside the candidate set
    #[error("Prior solution references reaction {id} which is not a knockout candidate")]
    InvalidPriorSolution { id: String },
    /// A prior solution contains no reactions
    #[error("Prior solution contains no reactions")]
    EmptyPriorSolution,
    /// The initial knockout set doesn't satisfy the deletion budget
    #[error("Initial knockout set does not satisfy the deletion budget")]
    InvalidInitialSolution,
    /// The initial knockout set references a non candidate reaction
    #[error("Initial knockout {id} is not a knockout candidate")]
    InvalidInitialKnockout { id: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Search for reaction deletions maximizing the target flux at the inner
/// optimum
///
/// # Parameters
/// - `model`: source model, not modified
/// - `selected_rxns`: reactions eligible for knockout; empty means every
///   reaction
/// - `options`: search options, see [`OptKnockOptions`]
/// - `constraints`: additional reaction level constraints, applied to the
///   inner problem's bounds before formulation
/// - `prev_solutions`: previously discovered knockout sets to exclude
pub fn run_optknock(
    model: &Model,
    selected_rxns: &[String],
    options: &OptKnockOptions,
    constraints: &[FluxConstraint],
    prev_solutions: &[Vec<String>],
) -> Result<OptKnockResult, OptKnockError> {
    // Resolve the candidate set, empty means every reaction
    let selected: Vec<usize> = if selected_rxns.is_empty() {
        (0..model.reactions.len()).collect()
    } else {
        selected_rxns
            .iter()
            .map(|id| {
                model
                    .reactions
                    .get_index_of(id)
                    .ok_or_else(|| OptKnockError::UnknownSelectedReaction { id: id.clone() })
            })
            .collect::<Result<_, _>>()?
    };

    // Validate the warm start hint against the candidate set and the budget
    if let Some(initial) = &options.initial_knockouts {
        for id in initial {
            let index = model.reactions.get_index_of(id.as_str());
            let is_candidate = match index {
                Some(index) => selected.contains(&index),
                None => false,
            };
            if !is_candidate {
                return Err(OptKnockError::InvalidInitialKnockout { id: id.clone() });
            }
        }
        let count = initial.len();
        let budget_ok = match options.num_del_sense {
            ConstraintSense::Less => count <= options.num_del,
            ConstraintSense::Equal => count == options.num_del,
            ConstraintSense::Greater => count >= options.num_del,
        };
        if !budget_ok {
            return Err(OptKnockError::InvalidInitialSolution);
        }
    }

    let mut irrev = IrreversibleModel::from_model(model, options.v_max)?;
    let patches = translate_constraints(constraints, &irrev)?;
    apply_patches(&mut irrev, &patches);

    let bilevel = build_bilevel_problem(model, &irrev, &selected, options, prev_solutions)?;
    if !options.solve {
        return Ok(OptKnockResult {
            problem: bilevel.problem,
            index: bilevel.index,
            solution: None,
        });
    }

    let backend = solvers::default_backend()?;
    let raw = match &options.initial_knockouts {
        Some(initial) => {
            let mut hint = IndexMap::new();
            for (rxn_id, y_id) in &bilevel.index.y_variables {
                let value = if initial.contains(rxn_id) { 1.0 } else { 0.0 };
                hint.insert(y_id.clone(), value);
            }
            backend.solve_with_hint(&bilevel.problem, &hint)?
        }
        None => backend.solve(&bilevel.problem)?,
    };
    let solution = decode_solution(raw, &bilevel.index, &irrev);
    Ok(OptKnockResult {
        problem: bilevel.problem,
        index: bilevel.index,
        solution: Some(solution),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::MetaboliteBuilder;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use indexmap::IndexMap;

    fn add_reaction(model: &mut Model, id: &str, stoich: &[(&str, f64)], lower: f64, upper: f64) {
        let mut metabolites = IndexMap::new();
        for (met, coefficient) in stoich {
            metabolites.insert(met.to_string(), *coefficient);
        }
        model.add_reaction(
            ReactionBuilder::default()
                .id(id)
                .metabolites(metabolites)
                .lower_bound(lower)
                .upper_bound(upper)
                .build()
                .unwrap(),
        );
    }

    /// A single unconstrained reaction, no metabolites involved
    fn single_reaction_model() -> Model {
        let mut model = Model::new_empty();
        add_reaction(&mut model, "FREE", &[], 0., 10.);
        model.set_objective("FREE", 1.0).unwrap();
        model
    }

    /// Growth coupling network: the wasteful pathway R1 outproduces the
    /// product pathway R2 on biomass, so without deletions no product is
    /// made at the inner optimum
    ///
    ///   SRC -> A, R1: A -> 2 B, R2: A -> B + P, BIO: B ->, EXP: P ->
    fn growth_coupling_model() -> Model {
        let mut model = Model::new_empty();
        for met in ["A", "B", "P"] {
            model.add_metabolite(MetaboliteBuilder::default().id(met).build().unwrap());
        }
        add_reaction(&mut model, "SRC", &[("A", 1.0)], 0., 10.);
        add_reaction(&mut model, "R1", &[("A", -1.0), ("B", 2.0)], 0., 1000.);
        add_reaction(&mut model, "R2", &[("A", -1.0), ("B", 1.0), ("P", 1.0)], 0., 1000.);
        add_reaction(&mut model, "BIO", &[("B", -1.0)], 0., 1000.);
        add_reaction(&mut model, "EXP", &[("P", -1.0)], 0., 1000.);
        model.set_objective("BIO", 1.0).unwrap();
        model
    }

    /// Two parallel reversible conversions between A and B
    fn parallel_reversible_model() -> Model {
        let mut model = Model::new_empty();
        for met in ["A", "B"] {
            model.add_metabolite(MetaboliteBuilder::default().id(met).build().unwrap());
        }
        add_reaction(&mut model, "SRC", &[("A", 1.0)], 0., 10.);
        add_reaction(&mut model, "D1", &[("A", -1.0), ("B", 1.0)], -1000., 1000.);
        add_reaction(&mut model, "D2", &[("A", -1.0), ("B", 1.0)], -1000., 1000.);
        add_reaction(&mut model, "BIO", &[("B", -1.0)], 0., 1000.);
        model.set_objective("BIO", 1.0).unwrap();
        model
    }

    fn options(target: &str) -> OptKnockOptionsBuilder {
        let mut builder = OptKnockOptionsBuilder::default();
        builder.target_rxn(target);
        builder
    }

    #[test]
    fn zero_deletions_returns_unconstrained_optimum() {
        let model = single_reaction_model();
        let opts = options("FREE").num_del(0usize).build().unwrap();
        let result = run_optknock(&model, &["FREE".to_string()], &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!(solution.knockouts.is_empty());
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-5);
    }

    #[test]
    fn growth_coupling_knocks_out_the_wasteful_pathway() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(1usize).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();

        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert_eq!(solution.knockouts, vec!["R1".to_string()]);
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-5);
        // Deleted reaction carries no flux, the product pathway carries all
        assert!(solution.fluxes["R1"].abs() < 1e-5);
        assert!((solution.fluxes["R2"] - 10.).abs() < 1e-5);
        assert!((solution.fluxes["BIO"] - 10.).abs() < 1e-5);
    }

    #[test]
    fn without_deletions_no_product_is_made() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(0usize).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!(solution.knockouts.is_empty());
        assert!(solution.objective_value.unwrap().abs() < 1e-5);
        // The inner optimum is still the wild type growth optimum
        assert!((solution.fluxes["BIO"] - 20.).abs() < 1e-5);
    }

    #[test]
    fn strong_duality_holds_at_the_reported_optimum() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(1usize).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);

        let primal: f64 = result
            .index
            .inner_objective
            .iter()
            .map(|(id, coefficient)| coefficient * solution.raw.value_of(id))
            .sum();
        let dual: f64 = result
            .index
            .dual_objective
            .iter()
            .map(|(id, coefficient)| coefficient * solution.raw.value_of(id))
            .sum();
        assert!(
            (primal - dual).abs() < 1e-5,
            "inner primal {} != inner dual {}",
            primal,
            dual
        );
        // The inner optimum after the knockout
        assert!((primal - 10.).abs() < 1e-5);
    }

    #[test]
    fn paired_directions_share_one_binary_and_die_together() {
        let model = parallel_reversible_model();
        let opts = options("BIO")
            .num_del(1usize)
            .num_del_sense(ConstraintSense::Equal)
            .build()
            .unwrap();
        let selected = vec!["D1".to_string(), "D2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();

        assert_eq!(solution.status, OptimizationStatus::Optimal);
        // Exactly one whole reaction removed, never a single direction
        assert_eq!(solution.knockouts.len(), 1);
        let removed = solution.knockouts[0].clone();
        assert!(removed == "D1" || removed == "D2");
        // Both split directions of the removed reaction carry nothing
        let removed_rxn = &model.reactions[&removed];
        assert!(solution.raw.value_of(&removed_rxn.get_forward_id()).abs() < 1e-5);
        assert!(solution.raw.value_of(&removed_rxn.get_reverse_id()).abs() < 1e-5);
        assert!(solution.fluxes[&removed].abs() < 1e-5);
        // Growth is unaffected, the surviving conversion carries everything
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-5);
    }

    #[test]
    fn knockout_fluxes_agree_with_plain_fba() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(1usize).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let solution = run_optknock(&model, &selected, &opts, &[], &[])
            .unwrap()
            .solution
            .unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);

        // Applying the discovered deletions to an ordinary FBA run reproduces
        // the inner growth optimum the bilevel problem reported
        let fba = crate::analysis::fba::fba_with_knockouts(&model, &solution.knockouts).unwrap();
        assert_eq!(fba.status, OptimizationStatus::Optimal);
        assert!((fba.objective_value.unwrap() - solution.fluxes["BIO"]).abs() < 1e-5);
    }

    #[test]
    fn prior_solutions_are_never_rediscovered() {
        let model = parallel_reversible_model();
        let opts = options("BIO")
            .num_del(1usize)
            .num_del_sense(ConstraintSense::Equal)
            .build()
            .unwrap();
        let selected = vec!["D1".to_string(), "D2".to_string()];

        let first = run_optknock(&model, &selected, &opts, &[], &[])
            .unwrap()
            .solution
            .unwrap();
        assert_eq!(first.knockouts.len(), 1);

        // The found set must not come back
        let prev = vec![first.knockouts.clone()];
        let second = run_optknock(&model, &selected, &opts, &[], &prev)
            .unwrap()
            .solution
            .unwrap();
        assert_eq!(second.knockouts.len(), 1);
        assert_ne!(second.knockouts, first.knockouts);

        // With both singleton sets excluded the search has nowhere to go,
        // which is a status, not an error
        let prev = vec![first.knockouts.clone(), second.knockouts.clone()];
        let third = run_optknock(&model, &selected, &opts, &[], &prev)
            .unwrap()
            .solution
            .unwrap();
        assert_eq!(third.status, OptimizationStatus::Infeasible);
        assert!(third.knockouts.is_empty());
        assert!(third.fluxes.is_empty());
    }

    #[test]
    fn constraint_round_trip_preserves_net_flux_semantics() {
        let mut model = Model::new_empty();
        for met in ["A", "B"] {
            model.add_metabolite(MetaboliteBuilder::default().id(met).build().unwrap());
        }
        add_reaction(&mut model, "SRC", &[("A", 1.0)], 0., 10.);
        add_reaction(&mut model, "CONV", &[("A", -1.0), ("B", 1.0)], -1000., 1000.);
        add_reaction(&mut model, "BIO", &[("B", -1.0)], 0., 1000.);
        model.set_objective("BIO", 1.0).unwrap();

        let opts = options("BIO").num_del(0usize).build().unwrap();
        let constraint = FluxConstraint::new("CONV", 2.0, ConstraintSense::Equal);
        let result = run_optknock(
            &model,
            &["CONV".to_string()],
            &opts,
            &[constraint],
            &[],
        )
        .unwrap();
        let solution = result.solution.unwrap();

        assert_eq!(solution.status, OptimizationStatus::Optimal);
        // The decoded flux is 2, not -2 or another split artifact
        assert!((solution.fluxes["CONV"] - 2.0).abs() < 1e-5);
        assert!((solution.objective_value.unwrap() - 2.0).abs() < 1e-5);
        // Complementarity: only the forward direction carries flux
        let conv = &model.reactions["CONV"];
        assert!((solution.raw.value_of(&conv.get_forward_id()) - 2.0).abs() < 1e-5);
        assert!(solution.raw.value_of(&conv.get_reverse_id()).abs() < 1e-5);
    }

    #[test]
    fn skipping_the_solve_returns_only_the_problem() {
        let model = growth_coupling_model();
        let opts = options("EXP").solve(false).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        assert!(result.solution.is_none());
        assert!(result.problem.has_integer_variables());
        // One binary per candidate reaction
        assert_eq!(result.index.y_variables.len(), 2);
        assert!(result.problem.variable("y_R1").is_some());
        assert!(result.problem.variable("y_R2").is_some());
    }

    #[test]
    fn configuration_errors_abort_before_assembly() {
        let model = growth_coupling_model();

        let opts = options("ghost").build().unwrap();
        assert!(matches!(
            run_optknock(&model, &[], &opts, &[], &[]),
            Err(OptKnockError::UnknownTargetReaction { .. })
        ));

        let opts = options("EXP").build().unwrap();
        assert!(matches!(
            run_optknock(&model, &["ghost".to_string()], &opts, &[], &[]),
            Err(OptKnockError::UnknownSelectedReaction { .. })
        ));

        let constraint = FluxConstraint::new("ghost", 1.0, ConstraintSense::Less);
        assert!(matches!(
            run_optknock(&model, &[], &opts, &[constraint], &[]),
            Err(OptKnockError::UnknownConstraintReaction { .. })
        ));

        let mut no_objective = growth_coupling_model();
        no_objective.objective.clear();
        assert!(matches!(
            run_optknock(&no_objective, &[], &opts, &[], &[]),
            Err(OptKnockError::NoInnerObjective)
        ));
    }

    #[test]
    fn initial_knockouts_are_validated() {
        let model = growth_coupling_model();
        let selected = vec!["R1".to_string(), "R2".to_string()];

        // Not a candidate
        let opts = options("EXP")
            .initial_knockouts(Some(vec!["BIO".to_string()]))
            .build()
            .unwrap();
        assert!(matches!(
            run_optknock(&model, &selected, &opts, &[], &[]),
            Err(OptKnockError::InvalidInitialKnockout { .. })
        ));

        // Over budget
        let opts = options("EXP")
            .num_del(1usize)
            .initial_knockouts(Some(vec!["R1".to_string(), "R2".to_string()]))
            .build()
            .unwrap();
        assert!(matches!(
            run_optknock(&model, &selected, &opts, &[], &[]),
            Err(OptKnockError::InvalidInitialSolution)
        ));

        // A valid hint still reaches the same optimum
        let opts = options("EXP")
            .num_del(1usize)
            .initial_knockouts(Some(vec!["R1".to_string()]))
            .build()
            .unwrap();
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();
        assert_eq!(solution.knockouts, vec!["R1".to_string()]);
    }

    #[test]
    fn deletion_budget_is_respected() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(1usize).build().unwrap();
        let selected: Vec<String> = model.reactions.keys().cloned().collect();
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let solution = result.solution.unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!(solution.knockouts.len() <= 1);
    }

    #[test]
    fn knockout_solution_serializes() {
        let model = growth_coupling_model();
        let opts = options("EXP").num_del(1usize).build().unwrap();
        let selected = vec!["R1".to_string(), "R2".to_string()];
        let result = run_optknock(&model, &selected, &opts, &[], &[]).unwrap();
        let json = serde_json::to_string(&result.solution.unwrap()).unwrap();
        assert!(json.contains("knockouts"));
    }
}
