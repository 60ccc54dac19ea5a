//! Mapping gene expression data onto reactions through GPR rules
//!
//! A reaction's expression score is derived from its GPR rule: enzyme
//! complexes (`and`) take the minimum over their subunits, isozymes (`or`)
//! take the maximum over the alternatives.
use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic_model::model::{Gpr, GprOperation, Model};
use crate::metabolic_model::reaction::ReactionActivity;

/// Errors arising while mapping expression data
#[derive(Error, Debug, Clone)]
pub enum ExpressionError {
    /// GPR rules with `not` nodes have no defined expression semantics
    #[error("Cannot map expression data through a GPR containing a not operation")]
    UnsupportedNot,
}

/// Map gene expression values onto every reaction of the model
///
/// # Parameters
/// - `model`: the model whose GPR rules are walked
/// - `expression`: gene id to expression value
///
/// # Returns
/// Reaction id to optional score. A reaction scores None when it has no GPR,
/// or when the data doesn't cover the genes its rule requires.
pub fn map_expression_to_reactions(
    model: &Model,
    expression: &IndexMap<String, f64>,
) -> Result<IndexMap<String, Option<f64>>, ExpressionError> {
    let mut scores = IndexMap::new();
    for (rxn_id, rxn) in &model.reactions {
        let score = match &rxn.gpr {
            Some(gpr) => eval_expression(gpr, expression)?,
            None => None,
        };
        scores.insert(rxn_id.clone(), score);
    }
    Ok(scores)
}

/// Evaluate a GPR rule over expression values
///
/// `and` takes the minimum and requires both sides, `or` takes the maximum of
/// whichever sides have data.
fn eval_expression(
    gpr: &Gpr,
    expression: &IndexMap<String, f64>,
) -> Result<Option<f64>, ExpressionError> {
    match gpr {
        Gpr::GeneNode(gene) => Ok(expression.get(gene).copied()),
        Gpr::Operation(op) => match op {
            GprOperation::And { left, right } => {
                let l = eval_expression(left, expression)?;
                let r = eval_expression(right, expression)?;
                Ok(match (l, r) {
                    (Some(l), Some(r)) => Some(l.min(r)),
                    _ => None,
                })
            }
            GprOperation::Or { left, right } => {
                let l = eval_expression(left, expression)?;
                let r = eval_expression(right, expression)?;
                Ok(match (l, r) {
                    (Some(l), Some(r)) => Some(l.max(r)),
                    (Some(l), None) => Some(l),
                    (None, Some(r)) => Some(r),
                    (None, None) => None,
                })
            }
            GprOperation::Not { .. } => Err(ExpressionError::UnsupportedNot),
        },
    }
}

/// Deactivate reactions whose expression score falls below a threshold
///
/// Reactions whose activity was manually pinned keep their activity. Reactions
/// without a score are left untouched.
///
/// # Returns
/// The number of reactions switched to inactive.
pub fn apply_expression_threshold(
    model: &mut Model,
    scores: &IndexMap<String, Option<f64>>,
    threshold: f64,
) -> usize {
    let mut deactivated = 0;
    for (rxn_id, rxn) in model.reactions.iter_mut() {
        if rxn.activity_set {
            continue;
        }
        if let Some(Some(score)) = scores.get(rxn_id) {
            if *score < threshold {
                if rxn.activity == ReactionActivity::Active {
                    deactivated += 1;
                }
                rxn.activity = ReactionActivity::Inactive;
            } else {
                rxn.activity = ReactionActivity::Active;
            }
        }
    }
    deactivated
}
