//! Physical model construction and evaluation.
//!
//! Model variants form a closed set behind a single entry point
//! ([`build_model`]), selected by the configured [`ModelType`]. Adding a
//! variant extends the enum and the builder match, not the interface.
//!
//! The parameter set mirrors the configuration toggles: star-formation
//! history (continuity bins or delayed-tau), metallicity, dust attenuation
//! and emission, nebular emission, AGN fraction, spectral smoothing and
//! calibration, and outlier mixture fractions.

pub mod params;
pub mod sed;

pub use params::*;
pub use sed::*;

use crate::domain::{FittedParameter, ModelType, RunConfig};

/// A physical model: named parameter set plus SED evaluation context.
#[derive(Debug, Clone)]
pub struct PhysicalModel {
    pub model_type: ModelType,
    pub params: Vec<ParamSpec>,
    /// Extra instrumental broadening (km/s) per spectroscopy pixel, aligned
    /// with the bundle's spectroscopy wavelength axis.
    pub lsf_delta_v: Option<Vec<f64>>,
}

/// Build the model selected by the configuration.
///
/// `redshift` is the resolved value from the validator (override > record
/// metadata); when absent, the redshift parameter starts from zero and is
/// always free.
pub fn build_model(
    config: &RunConfig,
    redshift: Option<f64>,
    lsf_delta_v: Option<Vec<f64>>,
) -> PhysicalModel {
    let mut params = Vec::new();

    setup_sfh(&mut params, config, redshift);
    setup_physical(&mut params);
    setup_dust(&mut params, config);
    if config.add_nebular {
        setup_nebular(&mut params);
    }
    if config.use_spectroscopy {
        setup_spectroscopy(&mut params);
    }
    setup_outliers(&mut params, config);

    PhysicalModel {
        model_type: config.model_type,
        params,
        lsf_delta_v,
    }
}

fn setup_sfh(params: &mut Vec<ParamSpec>, config: &RunConfig, redshift: Option<f64>) {
    let z = redshift.unwrap_or(0.0);

    if config.fixed_z && redshift.is_some() {
        params.push(ParamSpec::fixed_scalar("zred", z, "redshift"));
    } else {
        params.push(ParamSpec::free_scalar(
            "zred",
            z,
            "redshift",
            Prior::ClippedNormal {
                mean: z,
                sigma: 0.05,
                min: (z - 0.5).max(0.0),
                max: z + 0.5,
            },
        ));
    }

    params.push(ParamSpec::free_scalar(
        "logmass",
        10.5,
        "log solar masses formed",
        Prior::TopHat {
            min: 6.0,
            max: 13.0,
        },
    ));

    match config.model_type {
        ModelType::ContinuitySfh => {
            params.push(ParamSpec::free_vector(
                "logsfr_ratios",
                config.nbins.saturating_sub(1).max(1),
                0.0,
                "dex",
                Prior::Normal {
                    mean: 0.0,
                    sigma: 0.3,
                },
            ));
        }
        ModelType::ParametricSfh => {
            params.push(ParamSpec::free_scalar(
                "tau",
                1.0,
                "Gyr",
                Prior::TopHat {
                    min: 0.1,
                    max: 30.0,
                },
            ));
            params.push(ParamSpec::free_scalar(
                "tage",
                5.0,
                "Gyr",
                Prior::TopHat {
                    min: 0.1,
                    max: 13.7,
                },
            ));
        }
    }
}

fn setup_physical(params: &mut Vec<ParamSpec>) {
    params.push(ParamSpec::free_scalar(
        "logzsol",
        -0.3,
        "log Z/Z_sun",
        Prior::TopHat {
            min: -2.0,
            max: 0.5,
        },
    ));
    params.push(ParamSpec::fixed_scalar("imf_type", 1.0, "IMF index"));
}

fn setup_dust(params: &mut Vec<ParamSpec>, config: &RunConfig) {
    params.push(ParamSpec::fixed_scalar("dust_type", 4.0, "law index"));
    params.push(ParamSpec::free_scalar(
        "dust2",
        0.5,
        "optical depth at 5500 AA",
        Prior::TopHat { min: 0.0, max: 4.0 },
    ));
    params.push(ParamSpec::free_scalar(
        "dust_index",
        0.0,
        "",
        Prior::ClippedNormal {
            mean: 0.0,
            sigma: 0.3,
            min: -1.5,
            max: 0.4,
        },
    ));

    if config.add_dust1 {
        params.push(ParamSpec::free_scalar(
            "dust1_fraction",
            1.0,
            "",
            Prior::ClippedNormal {
                mean: 1.0,
                sigma: 0.3,
                min: 0.0,
                max: 2.0,
            },
        ));
    }

    if config.add_duste {
        params.push(ParamSpec::free_scalar(
            "duste_gamma",
            0.01,
            "",
            Prior::TopHat { min: 0.0, max: 1.0 },
        ));
        params.push(ParamSpec::free_scalar(
            "duste_qpah",
            3.5,
            "percent",
            Prior::TopHat {
                min: 0.5,
                max: 10.0,
            },
        ));
        params.push(ParamSpec::free_scalar(
            "duste_umin",
            1.0,
            "",
            Prior::TopHat {
                min: 0.1,
                max: 25.0,
            },
        ));
    }

    if config.add_agn {
        params.push(ParamSpec::free_scalar(
            "fagn",
            0.05,
            "",
            Prior::TopHat { min: 0.0, max: 0.5 },
        ));
    }
}

fn setup_nebular(params: &mut Vec<ParamSpec>) {
    params.push(ParamSpec::free_scalar(
        "gas_logz",
        0.0,
        "log Z/Z_sun",
        Prior::TopHat {
            min: -2.0,
            max: 0.5,
        },
    ));
    params.push(ParamSpec::free_scalar(
        "gas_logu",
        -2.0,
        "",
        Prior::TopHat {
            min: -4.0,
            max: -1.0,
        },
    ));
    params.push(ParamSpec::free_scalar(
        "eline_sigma",
        150.0,
        "km/s",
        Prior::TopHat {
            min: 50.0,
            max: 500.0,
        },
    ));
}

fn setup_spectroscopy(params: &mut Vec<ParamSpec>) {
    params.push(ParamSpec::free_scalar(
        "sigma_smooth",
        1000.0,
        "km/s",
        Prior::TopHat {
            min: 200.0,
            max: 2000.0,
        },
    ));
    params.push(ParamSpec::free_scalar(
        "spec_norm",
        1.0,
        "",
        Prior::Normal {
            mean: 1.0,
            sigma: 0.2,
        },
    ));
    params.push(ParamSpec::free_scalar(
        "spec_jitter",
        1.0,
        "",
        Prior::TopHat { min: 0.0, max: 5.0 },
    ));
    params.push(ParamSpec::fixed_scalar("polyorder", 10.0, "Chebyshev order"));
}

fn setup_outliers(params: &mut Vec<ParamSpec>, config: &RunConfig) {
    if config.fit_outliers_spec && config.use_spectroscopy {
        params.push(ParamSpec::free_scalar(
            "f_outlier_spec",
            0.01,
            "",
            Prior::TopHat {
                min: 1e-5,
                max: 0.2,
            },
        ));
        params.push(ParamSpec::fixed_scalar("nsigma_outlier_spec", 50.0, "sigma"));
    }

    if config.fit_outliers_photo && config.use_photometry {
        params.push(ParamSpec::free_scalar(
            "f_outlier_phot",
            0.0,
            "",
            Prior::TopHat { min: 0.0, max: 0.1 },
        ));
        params.push(ParamSpec::fixed_scalar("nsigma_outlier_phot", 50.0, "sigma"));
    }
}

impl PhysicalModel {
    /// Number of free scalar components (the dimension of theta).
    pub fn free_dim(&self) -> usize {
        self.params.iter().filter(|p| p.free).map(|p| p.n).sum()
    }

    /// Initial theta vector: the free parameters' initial values, in order.
    pub fn theta_init(&self) -> Vec<f64> {
        self.params
            .iter()
            .filter(|p| p.free)
            .flat_map(|p| p.init.iter().copied())
            .collect()
    }

    /// One prior per free scalar component, aligned with theta.
    pub fn axis_priors(&self) -> Vec<Prior> {
        let mut out = Vec::with_capacity(self.free_dim());
        for p in self.params.iter().filter(|p| p.free) {
            let prior = p.search_prior();
            for _ in 0..p.n {
                out.push(prior.clone());
            }
        }
        out
    }

    /// Sum of the per-component log priors; `-inf` if any is violated.
    pub fn ln_prior(&self, theta: &[f64]) -> f64 {
        let mut total = 0.0;
        let mut offset = 0;
        for p in self.params.iter().filter(|p| p.free) {
            let prior = p.search_prior();
            for k in 0..p.n {
                total += prior.ln_prob(theta[offset + k]);
                if total.is_infinite() {
                    return f64::NEG_INFINITY;
                }
            }
            offset += p.n;
        }
        total
    }

    /// Draw a full theta vector from the priors.
    pub fn sample_prior<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.free_dim());
        for p in self.params.iter().filter(|p| p.free) {
            let prior = p.search_prior();
            for _ in 0..p.n {
                out.push(prior.sample(rng));
            }
        }
        out
    }

    /// Resolve parameter values by name against a theta vector.
    pub fn view<'a>(&'a self, theta: &'a [f64]) -> ParamView<'a> {
        ParamView { model: self, theta }
    }

    /// Best-fit values of the free parameters, for result handles.
    pub fn fitted_parameters(&self, theta: &[f64]) -> Vec<FittedParameter> {
        let mut out = Vec::new();
        let mut offset = 0;
        for p in self.params.iter().filter(|p| p.free) {
            out.push(FittedParameter {
                name: p.name.to_string(),
                values: theta[offset..offset + p.n].to_vec(),
            });
            offset += p.n;
        }
        out
    }
}

/// Name-based access to parameter values, free components resolved from
/// theta and fixed ones from their stored initial values.
pub struct ParamView<'a> {
    model: &'a PhysicalModel,
    theta: &'a [f64],
}

impl<'a> ParamView<'a> {
    pub fn get(&self, name: &str) -> Option<&'a [f64]> {
        let mut offset = 0;
        for p in &self.model.params {
            if p.free {
                if p.name == name {
                    return Some(&self.theta[offset..offset + p.n]);
                }
                offset += p.n;
            } else if p.name == name {
                return Some(&p.init);
            }
        }
        None
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.first().copied())
    }
}
