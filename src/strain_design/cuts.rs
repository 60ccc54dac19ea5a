//! Integer cuts excluding previously discovered knockout sets
//!
//! Each prior solution contributes one inequality over the knockout binaries:
//! the binaries of its reactions may not all be one at the same time, which
//! rules out rediscovering the set (and any superset of it).
use indexmap::IndexMap;

use crate::strain_design::OptKnockError;

/// A single cut row: the y variable ids on the left hand side, and the
/// inclusive upper bound of their sum
#[derive(Clone, Debug, PartialEq)]
pub struct CutRow {
    pub variables: Vec<String>,
    pub upper_bound: f64,
}

/// Build one cut row per prior knockout set
///
/// # Parameters
/// - `candidates`: map from candidate reaction id to its knockout binary id
/// - `prev_solutions`: previously returned knockout sets, as reaction ids
///
/// # Errors
/// A prior set naming a reaction outside the candidate list, or an empty
/// prior set, is a configuration error.
///
/// # Note:
/// Pure function of its inputs, the same prior solution list always produces
/// identical rows.
pub fn integer_cut_rows(
    candidates: &IndexMap<String, String>,
    prev_solutions: &[Vec<String>],
) -> Result<Vec<CutRow>, OptKnockError> {
    let mut rows = Vec::with_capacity(prev_solutions.len());
    for prior in prev_solutions {
        if prior.is_empty() {
            return Err(OptKnockError::EmptyPriorSolution);
        }
        let mut variables: Vec<String> = Vec::with_capacity(prior.len());
        for rxn_id in prior {
            let y_id = candidates
                .get(rxn_id)
                .ok_or_else(|| OptKnockError::InvalidPriorSolution { id: rxn_id.clone() })?;
            if !variables.contains(y_id) {
                variables.push(y_id.clone());
            }
        }
        let upper_bound = variables.len() as f64 - 1.0;
        rows.push(CutRow {
            variables,
            upper_bound,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        map.insert("R1".to_string(), "y_R1".to_string());
        map.insert("R2".to_string(), "y_R2".to_string());
        map.insert("R3".to_string(), "y_R3".to_string());
        map
    }

    #[test]
    fn one_row_per_prior_solution() {
        let prev = vec![
            vec!["R1".to_string()],
            vec!["R2".to_string(), "R3".to_string()],
        ];
        let rows = integer_cut_rows(&candidates(), &prev).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].variables, vec!["y_R1".to_string()]);
        assert!((rows[0].upper_bound - 0.0).abs() < 1e-12);
        assert_eq!(
            rows[1].variables,
            vec!["y_R2".to_string(), "y_R3".to_string()]
        );
        assert!((rows[1].upper_bound - 1.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_names_within_a_set_collapse() {
        let prev = vec![vec!["R1".to_string(), "R1".to_string()]];
        let rows = integer_cut_rows(&candidates(), &prev).unwrap();
        assert_eq!(rows[0].variables.len(), 1);
        assert!((rows[0].upper_bound - 0.0).abs() < 1e-12);
    }

    #[test]
    fn idempotent_over_repeated_calls() {
        let prev = vec![vec!["R1".to_string(), "R2".to_string()]];
        let first = integer_cut_rows(&candidates(), &prev).unwrap();
        let second = integer_cut_rows(&candidates(), &prev).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_candidate_reaction_is_rejected() {
        let prev = vec![vec!["ghost".to_string()]];
        assert!(matches!(
            integer_cut_rows(&candidates(), &prev),
            Err(OptKnockError::InvalidPriorSolution { .. })
        ));
    }

    #[test]
    fn empty_prior_set_is_rejected() {
        let prev = vec![vec![]];
        assert!(matches!(
            integer_cut_rows(&candidates(), &prev),
            Err(OptKnockError::EmptyPriorSolution)
        ));
    }
}
