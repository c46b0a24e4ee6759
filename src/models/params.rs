//! Model parameters and priors.

use rand::Rng;
use rand_distr::{Distribution, Normal as GaussDist};

/// Prior over one scalar model parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Prior {
    TopHat {
        min: f64,
        max: f64,
    },
    Normal {
        mean: f64,
        sigma: f64,
    },
    ClippedNormal {
        mean: f64,
        sigma: f64,
        min: f64,
        max: f64,
    },
}

impl Prior {
    /// Unnormalized log prior density; `-inf` outside the support.
    pub fn ln_prob(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return f64::NEG_INFINITY;
        }
        match *self {
            Prior::TopHat { min, max } => {
                if (min..=max).contains(&x) {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Normal { mean, sigma } => {
                let r = (x - mean) / sigma;
                -0.5 * r * r
            }
            Prior::ClippedNormal {
                mean,
                sigma,
                min,
                max,
            } => {
                if (min..=max).contains(&x) {
                    let r = (x - mean) / sigma;
                    -0.5 * r * r
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }

    /// Finite search interval covering (essentially) all prior mass.
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Prior::TopHat { min, max } => (min, max),
            Prior::Normal { mean, sigma } => (mean - 5.0 * sigma, mean + 5.0 * sigma),
            Prior::ClippedNormal { min, max, .. } => (min, max),
        }
    }

    /// Width of the search interval (used to scale proposal steps).
    pub fn width(&self) -> f64 {
        let (lo, hi) = self.support();
        hi - lo
    }

    /// Clamp a value into the support.
    pub fn clamp(&self, x: f64) -> f64 {
        let (lo, hi) = self.support();
        x.clamp(lo, hi)
    }

    /// Draw one value from the prior.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Prior::TopHat { min, max } => rng.gen_range(min..=max),
            Prior::Normal { mean, sigma } => draw_gaussian(rng, mean, sigma),
            Prior::ClippedNormal {
                mean,
                sigma,
                min,
                max,
            } => {
                for _ in 0..100 {
                    let x = draw_gaussian(rng, mean, sigma);
                    if (min..=max).contains(&x) {
                        return x;
                    }
                }
                mean.clamp(min, max)
            }
        }
    }
}

fn draw_gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    match GaussDist::new(mean, sigma) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mean,
    }
}

impl std::fmt::Display for Prior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Prior::TopHat { min, max } => write!(f, "TopHat[{min:.3}, {max:.3}]"),
            Prior::Normal { mean, sigma } => write!(f, "Normal({mean:.3}, {sigma:.3})"),
            Prior::ClippedNormal {
                mean,
                sigma,
                min,
                max,
            } => write!(f, "ClippedNormal({mean:.3}, {sigma:.3})[{min:.3}, {max:.3}]"),
        }
    }
}

/// One model parameter: `n` elements, free or fixed, initial values, prior.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub n: usize,
    pub free: bool,
    pub init: Vec<f64>,
    pub units: &'static str,
    /// Present on every free parameter; optional for fixed ones.
    pub prior: Option<Prior>,
}

impl ParamSpec {
    pub fn free_scalar(name: &'static str, init: f64, units: &'static str, prior: Prior) -> Self {
        Self {
            name,
            n: 1,
            free: true,
            init: vec![init],
            units,
            prior: Some(prior),
        }
    }

    pub fn free_vector(
        name: &'static str,
        n: usize,
        init: f64,
        units: &'static str,
        prior: Prior,
    ) -> Self {
        Self {
            name,
            n,
            free: true,
            init: vec![init; n],
            units,
            prior: Some(prior),
        }
    }

    pub fn fixed_scalar(name: &'static str, init: f64, units: &'static str) -> Self {
        Self {
            name,
            n: 1,
            free: false,
            init: vec![init],
            units,
            prior: None,
        }
    }

    /// Prior for search purposes; falls back to a unit window around the
    /// initial value if a free parameter was built without one.
    pub fn search_prior(&self) -> Prior {
        self.prior.clone().unwrap_or(Prior::TopHat {
            min: self.init[0] - 1.0,
            max: self.init[0] + 1.0,
        })
    }
}
