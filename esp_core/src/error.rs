use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Failures that end the overlay's lifecycle or lose user data.
#[derive(Debug, Error)]
pub enum EspError {
    #[error("snapshot provider failed to initialise: {0}")]
    ProviderInit(String),
    #[error("renderer failed to initialise: {0}")]
    RendererInit(String),
    #[error("cannot initialise services while {0}")]
    NotReady(&'static str),
    #[error("settings: {0:#}")]
    Settings(anyhow::Error),
}

impl EspError {
    pub(crate) fn not_ready(state: LifecycleState) -> Self {
        EspError::NotReady(state.label())
    }
}
