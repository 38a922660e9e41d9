use thiserror::Error;

use super::config::ConfigError;
use super::dispatch::DispatchError;
use super::operators::OperatorError;
use super::utils::sampling::SamplingError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::models::error::ModelError;
use crate::core::space::SpaceError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid cluster model: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid placement region: {0}")]
    Space(#[from] SpaceError),

    #[error("Force field parameters: {0}")]
    Params(#[from] ParamLoadError),

    #[error("Strategy dispatcher: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Operator setup failed: {0}")]
    Operator(#[from] OperatorError),

    #[error("Parent selection failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Search phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
