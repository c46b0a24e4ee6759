//! Static nested-sampling engine.
//!
//! A deliberately small sampler: `nlive` points drawn from the prior, the
//! worst one replaced each iteration by a likelihood-constrained random walk
//! started from a surviving point. The prior-volume shrinkage per iteration
//! is the standard `exp(-i / nlive)`, giving a running log-evidence
//! estimate; iteration stops once the largest possible remaining
//! contribution falls below `dlogz` (after a minimum number of iterations
//! tied to the requested effective sample size).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::domain::{EngineKind, FitOutput, NestedOptions, ObservationBundle};
use crate::error::EngineError;
use crate::fit::{FittingEngine, Objective};
use crate::models::PhysicalModel;

/// Fraction of the prior width used for walk proposals.
const WALK_SCALE: f64 = 0.1;

pub struct NestedEngine {
    opts: NestedOptions,
    seed: u64,
}

impl NestedEngine {
    pub fn new(opts: NestedOptions, seed: u64) -> Self {
        Self { opts, seed }
    }
}

struct LivePoint {
    theta: Vec<f64>,
    ln_like: f64,
}

impl FittingEngine for NestedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Nested
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

        let nlive = self.opts.nlive.max(8);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut evaluations = 0usize;

        // Populate the live set from the prior.
        let mut live: Vec<LivePoint> = Vec::with_capacity(nlive);
        for _ in 0..nlive * 10 {
            if live.len() == nlive {
                break;
            }
            let theta = model.sample_prior(&mut rng);
            let ln_like = objective.ln_likelihood(&theta);
            evaluations += 1;
            if ln_like.is_finite() {
                live.push(LivePoint { theta, ln_like });
            }
        }
        if live.len() < nlive {
            return Err(EngineError::Failed(format!(
                "could not populate the live set: {}/{} finite prior draws",
                live.len(),
                nlive
            )));
        }

        let step: Vec<f64> = priors
            .iter()
            .map(|p| (p.width() * WALK_SCALE).max(1e-9))
            .collect();

        let mut log_z = f64::NEG_INFINITY;
        let mut best = (f64::NEG_INFINITY, live[0].theta.clone());
        let min_iter = self.opts.target_n_effective.max(nlive);
        let mut ln_x_prev = 0.0;
        let mut iterations = 0usize;

        for it in 1..=self.opts.max_iter.max(min_iter) {
            iterations = it;

            let worst = argmin(&live);
            let threshold = live[worst].ln_like;

            // Weight of the shell peeled off this iteration.
            let ln_x = -(it as f64) / nlive as f64;
            let ln_w = ln_diff_exp(ln_x_prev, ln_x);
            ln_x_prev = ln_x;
            log_z = ln_add_exp(log_z, threshold + ln_w);

            // Replace the worst point by walking a surviving one above the
            // likelihood threshold.
            let start = loop {
                let idx = rng.gen_range(0..live.len());
                if idx != worst || live.len() == 1 {
                    break idx;
                }
            };
            let mut cur = live[start].theta.clone();
            let mut cur_like = live[start].ln_like;

            for w in 0..self.opts.walk_steps.max(1) {
                let axis = w % cur.len();
                let old = cur[axis];
                let jump: f64 = rng.sample(StandardNormal);
                cur[axis] = old + step[axis] * jump;

                if model.ln_prior(&cur).is_finite() {
                    let ln_like = objective.ln_likelihood(&cur);
                    evaluations += 1;
                    if ln_like > threshold {
                        cur_like = ln_like;
                        continue;
                    }
                }
                cur[axis] = old;
            }

            live[worst] = LivePoint {
                theta: cur,
                ln_like: cur_like,
            };

            let ln_like_max = live
                .iter()
                .map(|p| p.ln_like)
                .fold(f64::NEG_INFINITY, f64::max);
            if ln_like_max > best.0 {
                let best_idx = live
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.ln_like.total_cmp(&b.1.ln_like))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                best = (ln_like_max, live[best_idx].theta.clone());
            }

            // Remaining-evidence stopping rule.
            if it >= min_iter {
                let remaining = ln_like_max + ln_x;
                if remaining - log_z < self.opts.dlogz.ln() {
                    break;
                }
            }
        }

        // Fold the final live set into the evidence.
        let ln_x_final = ln_x_prev - (nlive as f64).ln();
        for point in &live {
            log_z = ln_add_exp(log_z, point.ln_like + ln_x_final);
        }

        debug!(iterations, log_z, "nested sampling finished");

        let ln_prob = objective.ln_posterior(&best.1);
        Ok(FitOutput {
            engine: EngineKind::Nested,
            parameters: model.fitted_parameters(&best.1),
            ln_prob,
            chi2: objective.chi2(&best.1),
            n_valid: objective.n_valid(),
            evaluations,
            log_evidence: Some(log_z),
        })
    }
}

fn argmin(live: &[LivePoint]) -> usize {
    let mut idx = 0;
    for (i, p) in live.iter().enumerate() {
        if p.ln_like < live[idx].ln_like {
            idx = i;
        }
    }
    idx
}

fn ln_add_exp(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    if m.is_infinite() && m < 0.0 {
        return f64::NEG_INFINITY;
    }
    m + ((a - m).exp() + (b - m).exp()).ln()
}

/// `ln(exp(a) - exp(b))` for `a > b`.
fn ln_diff_exp(a: f64, b: f64) -> f64 {
    a + (1.0 - (b - a).exp()).max(f64::MIN_POSITIVE).ln()
}
