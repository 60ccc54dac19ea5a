//! Reduction of the bilevel knockout search to a single mixed integer program
//!
//! The inner problem maximizes the model's native objective over the
//! irreversible fluxes. The outer problem picks reaction deletions and
//! maximizes the target flux, subject to the inner problem sitting at its
//! optimum. The reduction makes that condition linear by carrying the inner
//! problem's dual variables alongside the fluxes and pinning primal and dual
//! objectives to each other (strong duality).
//!
//! Binary polarity: `y = 1` knocks the reaction out, `y = 0` leaves it
//! active. The deletion count row and the integer cuts are written against
//! this orientation, and the decoder reads binaries the same way. Both split
//! directions of a reversible candidate share a single binary.
use indexmap::IndexMap;

use crate::metabolic_model::model::Model;
use crate::optimize::problem::Problem;
use crate::optimize::variable::VariableType;
use crate::strain_design::constraints::ConstraintSense;
use crate::strain_design::cuts::integer_cut_rows;
use crate::strain_design::irreversible::IrreversibleModel;
use crate::strain_design::{OptKnockError, OptKnockOptions};

/// The assembled bilevel MILP plus the bookkeeping needed to read a solution
/// back
pub struct BilevelProblem {
    /// The single level mixed integer problem
    pub problem: Problem,
    /// Index data connecting problem variables back to the model
    pub index: BilevelIndex,
}

/// Bookkeeping connecting MILP variables back to model entities
pub struct BilevelIndex {
    /// Candidate reaction id to its knockout binary id
    pub y_variables: IndexMap<String, String>,
    /// Inner objective as (flux variable id, coefficient) terms
    pub inner_objective: Vec<(String, f64)>,
    /// Inner dual objective as (dual variable id, coefficient) terms; at a
    /// feasible optimum its value matches the inner objective value
    pub dual_objective: Vec<(String, f64)>,
}

/// Assemble the bilevel MILP
///
/// # Parameters
/// - `model`: source model, supplies the inner objective
/// - `irrev`: irreversible reformulation with all constraint patches applied
/// - `selected`: original reaction indices eligible for knockout
/// - `options`: validated search options
/// - `prev_solutions`: previously found knockout sets to exclude
///
/// # Errors
/// Unknown target reaction and an empty inner objective are configuration
/// errors, reported before any assembly.
pub fn build_bilevel_problem(
    model: &Model,
    irrev: &IrreversibleModel,
    selected: &[usize],
    options: &OptKnockOptions,
    prev_solutions: &[Vec<String>],
) -> Result<BilevelProblem, OptKnockError> {
    let target_index = irrev.reaction_index(&options.target_rxn).ok_or_else(|| {
        OptKnockError::UnknownTargetReaction {
            id: options.target_rxn.clone(),
        }
    })?;
    if model.objective.is_empty() {
        return Err(OptKnockError::NoInnerObjective);
    }
    if let Some(attached) = &model.problem {
        if attached.num_constraints() > model.metabolites.len()
            || attached.num_variables() > 2 * model.reactions.len()
        {
            log::warn!(
                "model carries constraint or variable blocks beyond stoichiometry; \
                 the knockout search is built from the stoichiometric subset only"
            );
        }
    }

    let n_columns = irrev.num_variables();
    let big_m = options.dual_bound;

    // Inner objective coefficients per irreversible column
    let mut inner_coefficients = vec![0.0; n_columns];
    for (rxn_id, coefficient) in &model.objective {
        if let Some(reaction_index) = irrev.reaction_index(rxn_id) {
            let (forward, backward) = irrev.rev2irrev(reaction_index);
            inner_coefficients[forward] += coefficient;
            if let Some(backward) = backward {
                inner_coefficients[backward] -= coefficient;
            }
        }
    }

    // Which columns belong to knockout candidates, and the binary covering them
    let mut candidate_binary: Vec<Option<String>> = vec![None; n_columns];
    let mut y_variables = IndexMap::new();
    for reaction_index in selected {
        let rxn_id = &irrev.reaction_ids()[*reaction_index];
        let y_id = format!("y_{}", rxn_id);
        let (forward, backward) = irrev.rev2irrev(*reaction_index);
        candidate_binary[forward] = Some(y_id.clone());
        if let Some(backward) = backward {
            candidate_binary[backward] = Some(y_id.clone());
        }
        y_variables.insert(rxn_id.clone(), y_id);
    }

    let mut problem = Problem::new_maximization();

    // region Variables
    // Flux columns. The box keeps columns non negative, the exact bounds are
    // enforced by explicit rows below so their duals exist as columns.
    for var in irrev.variables() {
        problem.add_new_variable(
            &var.id,
            None,
            VariableType::Continuous,
            0.0,
            var.upper_bound.max(0.0),
        )?;
    }
    // Metabolite duals, free
    for met_id in irrev.metabolite_ids() {
        problem.add_new_variable(
            &format!("lambda_{}", met_id),
            None,
            VariableType::Continuous,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
    }
    // Upper bound duals
    for var in irrev.variables() {
        problem.add_new_variable(
            &format!("mu_{}", var.id),
            None,
            VariableType::Continuous,
            0.0,
            big_m,
        )?;
    }
    // Lower bound duals, only for columns with a nonzero lower bound
    for var in irrev.variables() {
        if var.lower_bound > 0.0 {
            problem.add_new_variable(
                &format!("sigma_{}", var.id),
                None,
                VariableType::Continuous,
                0.0,
                big_m,
            )?;
        }
    }
    // Linearization products for candidate columns: w stands for (1 - y) * mu,
    // t for (1 - y) * sigma
    for (column, var) in irrev.variables().iter().enumerate() {
        if candidate_binary[column].is_some() {
            if var.upper_bound > 0.0 {
                problem.add_new_variable(
                    &format!("w_{}", var.id),
                    None,
                    VariableType::Continuous,
                    0.0,
                    big_m,
                )?;
            }
            if var.lower_bound > 0.0 {
                problem.add_new_variable(
                    &format!("t_{}", var.id),
                    None,
                    VariableType::Continuous,
                    0.0,
                    big_m,
                )?;
            }
        }
    }
    // Knockout binaries, one per candidate reaction
    for y_id in y_variables.values() {
        problem.add_new_variable(y_id, None, VariableType::Binary, 0.0, 1.0)?;
    }
    // endregion Variables

    // region Primal feasibility
    // Mass balance rows
    let mut balance_terms: Vec<Vec<(String, f64)>> = vec![Vec::new(); irrev.metabolite_ids().len()];
    for (row, column, value) in irrev.stoichiometry().triplet_iter() {
        balance_terms[row].push((irrev.variables()[column].id.clone(), *value));
    }
    for (row, terms) in balance_terms.iter().enumerate() {
        let variables: Vec<&str> = terms.iter().map(|(id, _)| id.as_str()).collect();
        let coefficients: Vec<f64> = terms.iter().map(|(_, c)| *c).collect();
        problem.add_new_equality_constraint(
            &format!("mass_balance_{}", irrev.metabolite_ids()[row]),
            &variables,
            &coefficients,
            0.,
        )?;
    }

    // Flux bound rows. Candidate rows couple the bound to the knockout
    // binary: v <= u * (1 - y) written as v + u*y <= u, and for nonzero
    // lower bounds v >= l * (1 - y) written as v + l*y >= l.
    for (column, var) in irrev.variables().iter().enumerate() {
        match &candidate_binary[column] {
            Some(y_id) => {
                problem.add_new_inequality_constraint(
                    &format!("knockout_upper_{}", var.id),
                    &[var.id.as_str(), y_id.as_str()],
                    &[1.0, var.upper_bound],
                    f64::NEG_INFINITY,
                    var.upper_bound,
                )?;
                if var.lower_bound > 0.0 {
                    problem.add_new_inequality_constraint(
                        &format!("knockout_lower_{}", var.id),
                        &[var.id.as_str(), y_id.as_str()],
                        &[1.0, var.lower_bound],
                        var.lower_bound,
                        f64::INFINITY,
                    )?;
                }
            }
            None => {
                problem.add_new_inequality_constraint(
                    &format!("flux_upper_{}", var.id),
                    &[var.id.as_str()],
                    &[1.0],
                    f64::NEG_INFINITY,
                    var.upper_bound,
                )?;
                if var.lower_bound > 0.0 {
                    problem.add_new_inequality_constraint(
                        &format!("flux_lower_{}", var.id),
                        &[var.id.as_str()],
                        &[1.0],
                        var.lower_bound,
                        f64::INFINITY,
                    )?;
                }
            }
        }
    }
    // endregion Primal feasibility

    // region Dual feasibility
    // One row per flux column: S^T lambda + mu - sigma >= c
    for (column, var) in irrev.variables().iter().enumerate() {
        let mut variables: Vec<String> = Vec::new();
        let mut coefficients: Vec<f64> = Vec::new();
        let lane = irrev.stoichiometry().col(column);
        for (row, value) in lane.row_indices().iter().zip(lane.values()) {
            variables.push(format!("lambda_{}", irrev.metabolite_ids()[*row]));
            coefficients.push(*value);
        }
        variables.push(format!("mu_{}", var.id));
        coefficients.push(1.0);
        if var.lower_bound > 0.0 {
            variables.push(format!("sigma_{}", var.id));
            coefficients.push(-1.0);
        }
        let variable_refs: Vec<&str> = variables.iter().map(|v| v.as_str()).collect();
        problem.add_new_inequality_constraint(
            &format!("dual_feasibility_{}", var.id),
            &variable_refs,
            &coefficients,
            inner_coefficients[column],
            f64::INFINITY,
        )?;
    }
    // endregion Dual feasibility

    // region Strong duality
    let mut inner_objective = Vec::new();
    for (column, var) in irrev.variables().iter().enumerate() {
        if inner_coefficients[column] != 0.0 {
            inner_objective.push((var.id.clone(), inner_coefficients[column]));
        }
    }
    let mut dual_objective = Vec::new();
    for (column, var) in irrev.variables().iter().enumerate() {
        let is_candidate = candidate_binary[column].is_some();
        if var.upper_bound > 0.0 {
            if is_candidate {
                dual_objective.push((format!("w_{}", var.id), var.upper_bound));
            } else {
                dual_objective.push((format!("mu_{}", var.id), var.upper_bound));
            }
        }
        if var.lower_bound > 0.0 {
            if is_candidate {
                dual_objective.push((format!("t_{}", var.id), -var.lower_bound));
            } else {
                dual_objective.push((format!("sigma_{}", var.id), -var.lower_bound));
            }
        }
    }
    {
        let mut variables: Vec<&str> = Vec::new();
        let mut coefficients: Vec<f64> = Vec::new();
        for (id, coefficient) in &inner_objective {
            variables.push(id.as_str());
            coefficients.push(*coefficient);
        }
        for (id, coefficient) in &dual_objective {
            variables.push(id.as_str());
            coefficients.push(-coefficient);
        }
        problem.add_new_equality_constraint("strong_duality", &variables, &coefficients, 0.)?;
    }
    // endregion Strong duality

    // region Linearization
    // Glover rows tying w to (1 - y) * mu: w <= mu, w >= mu - M*y and
    // w <= M * (1 - y). Same shape for t against sigma.
    for (column, var) in irrev.variables().iter().enumerate() {
        let y_id = match &candidate_binary[column] {
            Some(y_id) => y_id,
            None => continue,
        };
        if var.upper_bound > 0.0 {
            let w_id = format!("w_{}", var.id);
            let mu_id = format!("mu_{}", var.id);
            problem.add_new_inequality_constraint(
                &format!("link_w_mu_{}", var.id),
                &[w_id.as_str(), mu_id.as_str()],
                &[1.0, -1.0],
                f64::NEG_INFINITY,
                0.0,
            )?;
            problem.add_new_inequality_constraint(
                &format!("link_w_active_{}", var.id),
                &[w_id.as_str(), mu_id.as_str(), y_id.as_str()],
                &[1.0, -1.0, big_m],
                0.0,
                f64::INFINITY,
            )?;
            problem.add_new_inequality_constraint(
                &format!("link_w_knockout_{}", var.id),
                &[w_id.as_str(), y_id.as_str()],
                &[1.0, big_m],
                f64::NEG_INFINITY,
                big_m,
            )?;
        }
        if var.lower_bound > 0.0 {
            let t_id = format!("t_{}", var.id);
            let sigma_id = format!("sigma_{}", var.id);
            problem.add_new_inequality_constraint(
                &format!("link_t_sigma_{}", var.id),
                &[t_id.as_str(), sigma_id.as_str()],
                &[1.0, -1.0],
                f64::NEG_INFINITY,
                0.0,
            )?;
            problem.add_new_inequality_constraint(
                &format!("link_t_active_{}", var.id),
                &[t_id.as_str(), sigma_id.as_str(), y_id.as_str()],
                &[1.0, -1.0, big_m],
                0.0,
                f64::INFINITY,
            )?;
            problem.add_new_inequality_constraint(
                &format!("link_t_knockout_{}", var.id),
                &[t_id.as_str(), y_id.as_str()],
                &[1.0, big_m],
                f64::NEG_INFINITY,
                big_m,
            )?;
        }
    }
    // endregion Linearization

    // region Outer layer
    // Deletion budget over the binaries
    {
        let y_refs: Vec<&str> = y_variables.values().map(|id| id.as_str()).collect();
        let ones = vec![1.0; y_refs.len()];
        let budget = options.num_del as f64;
        match options.num_del_sense {
            ConstraintSense::Equal => {
                problem.add_new_equality_constraint("deletion_count", &y_refs, &ones, budget)?;
            }
            ConstraintSense::Less => {
                problem.add_new_inequality_constraint(
                    "deletion_count",
                    &y_refs,
                    &ones,
                    f64::NEG_INFINITY,
                    budget,
                )?;
            }
            ConstraintSense::Greater => {
                problem.add_new_inequality_constraint(
                    "deletion_count",
                    &y_refs,
                    &ones,
                    budget,
                    f64::INFINITY,
                )?;
            }
        }
    }

    // Integer cuts over prior knockout sets
    for (cut_index, cut) in integer_cut_rows(&y_variables, prev_solutions)?
        .into_iter()
        .enumerate()
    {
        let variables: Vec<&str> = cut.variables.iter().map(|id| id.as_str()).collect();
        let ones = vec![1.0; variables.len()];
        problem.add_new_inequality_constraint(
            &format!("integer_cut_{}", cut_index),
            &variables,
            &ones,
            f64::NEG_INFINITY,
            cut.upper_bound,
        )?;
    }

    // Outer objective: maximize net flux through the target reaction
    let (target_forward, target_backward) = irrev.rev2irrev(target_index);
    problem.add_new_linear_objective_term(&irrev.variables()[target_forward].id, 1.0)?;
    if let Some(target_backward) = target_backward {
        problem.add_new_linear_objective_term(&irrev.variables()[target_backward].id, -1.0)?;
    }
    // endregion Outer layer

    log::debug!(
        "bilevel MILP assembled: {} variables, {} constraints, {} binaries",
        problem.num_variables(),
        problem.num_constraints(),
        y_variables.len()
    );

    Ok(BilevelProblem {
        problem,
        index: BilevelIndex {
            y_variables,
            inner_objective,
            dual_objective,
        },
    })
}
