//! Error taxonomy for fleet reconciliation.

use flotilla_substrate::SubstrateError;
use thiserror::Error;

/// Errors surfaced by planning and reconciliation.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Malformed or incomplete fleet specification. Detected before any
    /// substrate mutation; surfaced to the caller verbatim.
    #[error("invalid fleet specification: {0}")]
    Validation(String),

    /// Substrate call failure for one instance. The fleet is left partially
    /// converged; re-running reconciliation retries the instance.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),
}

impl OperatorError {
    pub fn validation(message: impl Into<String>) -> Self {
        OperatorError::Validation(message.into())
    }

    /// Returns true for specification validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, OperatorError::Validation(_))
    }
}
