//! Translation of reaction level flux constraints into irreversible space
//!
//! Constraints are specified against the original model, where a reversible
//! reaction's flux may be negative. Before formulation each entry is turned
//! into bound patches on the split columns so that the net flux semantics are
//! preserved exactly, e.g. requiring a reversible reaction to stay above -5
//! becomes an upper bound of 5 on its backward column.
use serde::Serialize;

use crate::strain_design::irreversible::IrreversibleModel;
use crate::strain_design::OptKnockError;

/// Direction of a constraint or of the deletion count comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConstraintSense {
    /// The constrained quantity must be at least the value
    Greater,
    /// The constrained quantity must equal the value
    Equal,
    /// The constrained quantity must be at most the value
    Less,
}

/// A single reaction level constraint in original model space
#[derive(Clone, Debug, Serialize)]
pub struct FluxConstraint {
    /// Id of the constrained reaction
    pub reaction: String,
    /// Right hand side of the constraint
    pub value: f64,
    /// Direction of the constraint
    pub sense: ConstraintSense,
}

impl FluxConstraint {
    pub fn new(reaction: &str, value: f64, sense: ConstraintSense) -> Self {
        FluxConstraint {
            reaction: reaction.to_string(),
            value,
            sense,
        }
    }
}

/// A bound replacement on a single irreversible column
#[derive(Clone, Debug, PartialEq)]
pub struct BoundPatch {
    /// Column the patch applies to
    pub column: usize,
    /// Replacement lower bound, None leaves the bound untouched
    pub lower: Option<f64>,
    /// Replacement upper bound, None leaves the bound untouched
    pub upper: Option<f64>,
}

impl BoundPatch {
    fn lower(column: usize, value: f64) -> Self {
        BoundPatch {
            column,
            lower: Some(value),
            upper: None,
        }
    }

    fn upper(column: usize, value: f64) -> Self {
        BoundPatch {
            column,
            lower: None,
            upper: Some(value),
        }
    }

    fn fixed(column: usize, value: f64) -> Self {
        BoundPatch {
            column,
            lower: Some(value),
            upper: Some(value),
        }
    }
}

/// Translate constraints from original model space into irreversible bound
/// patches
///
/// # Errors
/// Returns [`OptKnockError::UnknownConstraintReaction`] when an entry
/// references a reaction that isn't part of the model. This is caught before
/// any matrix assembly.
pub fn translate_constraints(
    constraints: &[FluxConstraint],
    irrev: &IrreversibleModel,
) -> Result<Vec<BoundPatch>, OptKnockError> {
    let mut patches = Vec::new();
    for entry in constraints {
        let reaction_index = irrev.reaction_index(&entry.reaction).ok_or_else(|| {
            OptKnockError::UnknownConstraintReaction {
                id: entry.reaction.clone(),
            }
        })?;
        let (forward, backward) = irrev.rev2irrev(reaction_index);
        let value = entry.value;
        match backward {
            // Irreversible reaction, the single column carries the net flux
            None => match entry.sense {
                ConstraintSense::Greater => {
                    // Negative lower bounds are vacuous on a non negative column
                    patches.push(BoundPatch::lower(forward, value.max(0.0)));
                }
                ConstraintSense::Less => {
                    patches.push(BoundPatch::upper(forward, value));
                }
                ConstraintSense::Equal => {
                    patches.push(BoundPatch::fixed(forward, value));
                }
            },
            // Reversible reaction, net flux is forward minus backward
            Some(backward) => match entry.sense {
                ConstraintSense::Greater => {
                    if value >= 0.0 {
                        patches.push(BoundPatch::lower(forward, value));
                        patches.push(BoundPatch::upper(backward, 0.0));
                    } else {
                        patches.push(BoundPatch::upper(backward, -value));
                    }
                }
                ConstraintSense::Less => {
                    if value >= 0.0 {
                        patches.push(BoundPatch::upper(forward, value));
                    } else {
                        patches.push(BoundPatch::upper(forward, 0.0));
                        patches.push(BoundPatch::lower(backward, -value));
                    }
                }
                ConstraintSense::Equal => {
                    if value >= 0.0 {
                        patches.push(BoundPatch::fixed(forward, value));
                        patches.push(BoundPatch::fixed(backward, 0.0));
                    } else {
                        patches.push(BoundPatch::fixed(forward, 0.0));
                        patches.push(BoundPatch::fixed(backward, -value));
                    }
                }
            },
        }
    }
    Ok(patches)
}

/// Apply bound patches to the irreversible model
pub fn apply_patches(irrev: &mut IrreversibleModel, patches: &[BoundPatch]) {
    for patch in patches {
        if let Some(lower) = patch.lower {
            irrev.set_lower_bound(patch.column, lower);
        }
        if let Some(upper) = patch.upper {
            irrev.set_upper_bound(patch.column, upper);
        }
    }
}
