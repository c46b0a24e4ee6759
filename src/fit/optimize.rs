//! Deterministic coordinate-descent optimizer.
//!
//! Each sweep visits every free axis in turn and evaluates the objective on
//! a regular grid inside a window around the current value; the window
//! shrinks by half per sweep. No randomness: identical inputs give
//! identical fits, which keeps batch re-runs reproducible.

use tracing::debug;

use crate::domain::{EngineKind, FitOutput, ObservationBundle, OptimizeOptions};
use crate::error::EngineError;
use crate::fit::{FittingEngine, Objective};
use crate::models::PhysicalModel;

pub struct OptimizeEngine {
    opts: OptimizeOptions,
}

impl OptimizeEngine {
    pub fn new(opts: OptimizeOptions) -> Self {
        Self { opts }
    }
}

impl FittingEngine for OptimizeEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Optimize
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

        let mut theta: Vec<f64> = model
            .theta_init()
            .iter()
            .zip(&priors)
            .map(|(&x, p)| p.clamp(x))
            .collect();

        let mut evaluations = 0usize;
        let mut best_lp = objective.ln_posterior(&theta);
        evaluations += 1;
        if !best_lp.is_finite() {
            return Err(EngineError::NonFiniteObjective);
        }

        let grid = self.opts.grid_steps.max(3);
        for sweep in 0..self.opts.sweeps.max(1) {
            let shrink = 0.5f64.powi(sweep as i32);

            for (axis, prior) in priors.iter().enumerate() {
                let (lo_s, hi_s) = prior.support();
                let half = 0.5 * (hi_s - lo_s) * shrink;
                let lo = (theta[axis] - half).max(lo_s);
                let hi = (theta[axis] + half).min(hi_s);
                if !(hi > lo) {
                    continue;
                }

                let mut axis_best = (best_lp, theta[axis]);
                for k in 0..grid {
                    let x = lo + (hi - lo) * k as f64 / (grid - 1) as f64;
                    theta[axis] = x;
                    let lp = objective.ln_posterior(&theta);
                    evaluations += 1;
                    if lp > axis_best.0 {
                        axis_best = (lp, x);
                    }
                }
                best_lp = axis_best.0;
                theta[axis] = axis_best.1;
            }

            debug!(sweep, best_lp, "optimizer sweep complete");
        }

        Ok(FitOutput {
            engine: EngineKind::Optimize,
            parameters: model.fitted_parameters(&theta),
            ln_prob: best_lp,
            chi2: objective.chi2(&theta),
            n_valid: objective.n_valid(),
            evaluations,
            log_evidence: None,
        })
    }
}
