//! Uniform-ish sampling of the feasible flux space
//!
//! Artificially centered hit and run: warmup vertices come from minimizing and
//! maximizing each reaction's net flux, afterwards the chain walks along
//! directions spanned by warmup points. Every accepted point satisfies the
//! steady state constraint because warmup points do and the walk only moves
//! along their differences.
use derive_builder::Builder;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::analysis::fba::{build_flux_problem, net_fluxes, FbaError};
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::SolverError;
use crate::optimize::OptimizationStatus;

/// Options controlling the sampler
#[derive(Builder, Clone, Debug)]
pub struct SamplingOptions {
    /// Number of samples to return
    #[builder(default = "100")]
    pub n_samples: usize,
    /// Number of chain steps between recorded samples
    #[builder(default = "10")]
    pub thinning: usize,
    /// Seed for the random number generator, random when None
    #[builder(default = "None")]
    pub seed: Option<u64>,
}

/// A matrix of flux samples, one row per sample, columns keyed by
/// `reaction_ids`
#[derive(Clone, Debug, Serialize)]
pub struct FluxSamples {
    pub reaction_ids: Vec<String>,
    pub samples: Vec<Vec<f64>>,
}

/// Errors arising while sampling
#[derive(Error, Debug)]
pub enum SamplingError {
    /// The model has no reactions to sample over
    #[error("Model has no reactions")]
    EmptyModel,
    /// The flux space is empty
    #[error("Flux space is infeasible, nothing to sample")]
    InfeasibleFluxSpace,
    #[error(transparent)]
    Fba(#[from] FbaError),
    #[error(transparent)]
    Problem(#[from] crate::optimize::problem::ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

// Directions with a smaller norm than this are discarded as degenerate
const MIN_DIRECTION_NORM: f64 = 1e-9;

/// Sample flux vectors from the feasible space of the model
pub fn sample_flux_space(
    model: &Model,
    options: &SamplingOptions,
) -> Result<FluxSamples, SamplingError> {
    if model.reactions.is_empty() {
        return Err(SamplingError::EmptyModel);
    }
    let reaction_ids: Vec<String> = model.reactions.keys().cloned().collect();
    let warmup = warmup_points(model)?;

    // Effective net flux bounds per reaction, accounting for activity
    let bounds: Vec<(f64, f64)> = model
        .reactions
        .values()
        .map(|rxn| {
            (
                rxn.get_forward_lower_bound() - rxn.get_reverse_upper_bound(),
                rxn.get_forward_upper_bound() - rxn.get_reverse_lower_bound(),
            )
        })
        .collect();

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let n = reaction_ids.len();
    let mut center = vec![0.0; n];
    for point in &warmup {
        for (c, v) in center.iter_mut().zip(point) {
            *c += v / warmup.len() as f64;
        }
    }

    let thinning = options.thinning.max(1);
    let mut current = center.clone();
    let mut samples = Vec::with_capacity(options.n_samples);
    let mut steps_since_record = 0;
    // Bail out eventually if every proposed direction is degenerate
    let max_attempts = options.n_samples * thinning * 100 + 1000;
    let mut attempts = 0;
    while samples.len() < options.n_samples && attempts < max_attempts {
        attempts += 1;
        let pick = rng.gen_range(0..warmup.len());
        let direction: Vec<f64> = warmup[pick]
            .iter()
            .zip(&center)
            .map(|(w, c)| w - c)
            .collect();
        let norm = direction.iter().map(|d| d * d).sum::<f64>().sqrt();
        if norm < MIN_DIRECTION_NORM {
            continue;
        }

        // Largest step interval keeping every coordinate inside its bounds
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for ((x, d), (lower, upper)) in current.iter().zip(&direction).zip(&bounds) {
            if d.abs() < MIN_DIRECTION_NORM {
                continue;
            }
            let to_lower = (lower - x) / d;
            let to_upper = (upper - x) / d;
            let (low, high) = if to_lower < to_upper {
                (to_lower, to_upper)
            } else {
                (to_upper, to_lower)
            };
            t_min = t_min.max(low);
            t_max = t_max.min(high);
        }
        if !t_min.is_finite() || !t_max.is_finite() || t_max - t_min < MIN_DIRECTION_NORM {
            continue;
        }

        let t = rng.gen_range(t_min..t_max);
        for (x, d) in current.iter_mut().zip(&direction) {
            *x += t * d;
        }
        steps_since_record += 1;
        if steps_since_record >= thinning {
            samples.push(current.clone());
            steps_since_record = 0;
        }
    }

    Ok(FluxSamples {
        reaction_ids,
        samples,
    })
}

/// Solve for the minimum and maximum net flux of every reaction, collecting
/// the optima as warmup vertices
fn warmup_points(model: &Model) -> Result<Vec<Vec<f64>>, SamplingError> {
    let mut problem = build_flux_problem(model)?;
    let mut points = Vec::with_capacity(2 * model.reactions.len());
    for sense in [ObjectiveSense::Maximize, ObjectiveSense::Minimize] {
        for rxn in model.reactions.values() {
            problem.remove_all_objective_terms();
            problem.update_objective_sense(sense);
            problem.add_new_linear_objective_term(&rxn.get_forward_id(), 1.0)?;
            if rxn.reversible() {
                problem.add_new_linear_objective_term(&rxn.get_reverse_id(), -1.0)?;
            }
            let solution = problem.solve()?;
            if solution.status != OptimizationStatus::Optimal {
                return Err(SamplingError::InfeasibleFluxSpace);
            }
            let fluxes = net_fluxes(model, &solution);
            points.push(fluxes.values().copied().collect());
        }
    }
    Ok(points)
}

/// Summarize samples into per-reaction means
pub fn sample_means(samples: &FluxSamples) -> IndexMap<String, f64> {
    let mut means = IndexMap::new();
    if samples.samples.is_empty() {
        return means;
    }
    for (column, rxn_id) in samples.reaction_ids.iter().enumerate() {
        let total: f64 = samples.samples.iter().map(|row| row[column]).sum();
        means.insert(rxn_id.clone(), total / samples.samples.len() as f64);
    }
    means
}
