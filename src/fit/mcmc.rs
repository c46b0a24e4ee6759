//! Random-walk MCMC engine.
//!
//! Metropolis-within-Gibbs: one axis is perturbed per step with a Gaussian
//! proposal scaled to that parameter's prior width. The chain is seeded, so
//! a re-run of the same job reproduces the same result handle exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::domain::{EngineKind, FitOutput, McmcOptions, ObservationBundle};
use crate::error::EngineError;
use crate::fit::{FittingEngine, Objective};
use crate::models::PhysicalModel;

pub struct McmcEngine {
    opts: McmcOptions,
    seed: u64,
}

impl McmcEngine {
    pub fn new(opts: McmcOptions, seed: u64) -> Self {
        Self { opts, seed }
    }
}

impl FittingEngine for McmcEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Mcmc
    }

    fn fit(
        &self,
        bundle: &ObservationBundle,
        model: &PhysicalModel,
    ) -> Result<FitOutput, EngineError> {
        let objective = Objective::new(bundle, model);
        let priors = model.axis_priors();
        if priors.is_empty() {
            return Err(EngineError::NoFreeParameters);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut evaluations = 0usize;

        // Start from the initial position; fall back to prior draws if it is
        // outside the usable region.
        let mut theta: Vec<f64> = model
            .theta_init()
            .iter()
            .zip(&priors)
            .map(|(&x, p)| p.clamp(x))
            .collect();
        let mut lp = objective.ln_posterior(&theta);
        evaluations += 1;
        for _ in 0..100 {
            if lp.is_finite() {
                break;
            }
            theta = model.sample_prior(&mut rng);
            lp = objective.ln_posterior(&theta);
            evaluations += 1;
        }
        if !lp.is_finite() {
            return Err(EngineError::NonFiniteObjective);
        }

        let step: Vec<f64> = priors
            .iter()
            .map(|p| (p.width() * self.opts.step_scale).max(1e-9))
            .collect();

        let mut best = (lp, theta.clone());
        let mut accepted = 0usize;
        let mut counted = 0usize;

        for i in 0..self.opts.steps.max(1) {
            let axis = i % theta.len();
            let old = theta[axis];
            let jump: f64 = rng.sample(StandardNormal);
            theta[axis] = old + step[axis] * jump;

            let lp_new = objective.ln_posterior(&theta);
            evaluations += 1;

            let accept = lp_new.is_finite()
                && (lp_new >= lp || rng.gen_range(0.0..1.0f64).ln() < lp_new - lp);
            if accept {
                lp = lp_new;
                if lp > best.0 {
                    best = (lp, theta.clone());
                }
            } else {
                theta[axis] = old;
            }

            if i >= self.opts.burn {
                counted += 1;
                if accept {
                    accepted += 1;
                }
            }
        }

        let acceptance = if counted > 0 {
            accepted as f64 / counted as f64
        } else {
            0.0
        };
        debug!(acceptance, best_lp = best.0, "chain finished");

        Ok(FitOutput {
            engine: EngineKind::Mcmc,
            parameters: model.fitted_parameters(&best.1),
            ln_prob: best.0,
            chi2: objective.chi2(&best.1),
            n_valid: objective.n_valid(),
            evaluations,
            log_evidence: None,
        })
    }
}
