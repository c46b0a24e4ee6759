//! Fitting engines.
//!
//! Responsibilities:
//!
//! - define the engine collaborator interface (`FittingEngine`)
//! - evaluate the masked, weighted objective (`objective`)
//! - provide the three selectable engines: deterministic coordinate descent
//!   (`optimize`), random-walk MCMC (`mcmc`), and static nested sampling
//!   (`nested`)
//!
//! Engines only ever see validated bundles; masked entries never enter the
//! objective. All engine failures are values; the fault-isolation runner
//! additionally catches panics, so nothing escapes a job.

pub mod mcmc;
pub mod nested;
pub mod objective;
pub mod optimize;

pub use mcmc::*;
pub use nested::*;
pub use objective::*;
pub use optimize::*;

use crate::domain::{EngineKind, FitOutput, ObservationBundle, RunConfig};
use crate::error::EngineError;
use crate::models::PhysicalModel;

/// The fitting engine collaborator interface.
///
/// Treated as opaque by the orchestrator: it accepts a clean observation
/// bundle plus the built model and either returns a result handle or fails
/// with a catchable error.
pub trait FittingEngine {
    fn kind(&self) -> EngineKind;

    fn fit(
        &self,
        bundle: &ObservationBundle,
        model: &PhysicalModel,
    ) -> Result<FitOutput, EngineError>;
}

/// Build the engine selected by the resolved configuration.
pub fn build_engine(config: &RunConfig) -> Result<Box<dyn FittingEngine>, EngineError> {
    match config.engine_kind() {
        Some(EngineKind::Optimize) => Ok(Box::new(OptimizeEngine::new(config.optimizer.clone()))),
        Some(EngineKind::Mcmc) => Ok(Box::new(McmcEngine::new(config.mcmc.clone(), config.seed))),
        Some(EngineKind::Nested) => {
            Ok(Box::new(NestedEngine::new(config.nested.clone(), config.seed)))
        }
        None => Err(EngineError::Failed(
            "no fitting engine enabled (need one of optimize/emcee/dynesty)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_factory_follows_the_selection_flags() {
        let mut config = RunConfig::default();
        assert_eq!(build_engine(&config).unwrap().kind(), EngineKind::Nested);

        config.dynesty = false;
        config.emcee = true;
        assert_eq!(build_engine(&config).unwrap().kind(), EngineKind::Mcmc);

        config.emcee = false;
        config.optimize = true;
        assert_eq!(build_engine(&config).unwrap().kind(), EngineKind::Optimize);

        config.optimize = false;
        assert!(build_engine(&config).is_err());
    }
}
