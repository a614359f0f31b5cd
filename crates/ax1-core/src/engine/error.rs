use super::config::ConfigError;
use super::diagnostics::NonFiniteReport;
use crate::core::io::output::OutputError;
use crate::core::models::assembly::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid assembly: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Numerical failure: {0}")]
    NonFinite(NonFiniteReport),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),

    #[error("Assembly has no fission source; the {mode} eigenvalue is undefined")]
    NoFissionSource { mode: &'static str },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl From<NonFiniteReport> for EngineError {
    fn from(report: NonFiniteReport) -> Self {
        EngineError::NonFinite(report)
    }
}
