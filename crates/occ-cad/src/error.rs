//! Facade error types

use thiserror::Error;

use crate::kernel::{KernelError, KernelResult};

/// Error type for facade operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OccError {
    /// Shape missing, null or of an unexpected kind; raised before any
    /// kernel allocation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A requested indexed element does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The kernel could not produce a result from well-typed inputs
    #[error("Construction failed: {0}")]
    ConstructionFailure(String),
}

/// Result type for facade operations
pub type OccResult<T> = Result<T, OccError>;

impl From<KernelError> for OccError {
    fn from(err: KernelError) -> Self {
        OccError::ConstructionFailure(err.to_string())
    }
}

/// Attach the name of the failing step to kernel errors
pub trait KernelResultExt<T> {
    fn during(self, step: &str) -> OccResult<T>;
}

impl<T> KernelResultExt<T> for KernelResult<T> {
    fn during(self, step: &str) -> OccResult<T> {
        self.map_err(|err| {
            tracing::debug!(step, error = %err, "kernel step failed");
            OccError::ConstructionFailure(format!("{step}: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_names_the_step() {
        let result: KernelResult<()> = Err(KernelError::Degenerate("collinear points".into()));
        let err = result.during("arc of circle").unwrap_err();
        assert_eq!(
            err,
            OccError::ConstructionFailure(
                "arc of circle: Degenerate geometry: collinear points".into()
            )
        );
    }

    #[test]
    fn test_kernel_error_converts_to_construction_failure() {
        let err: OccError = KernelError::NotDone("sewing".into()).into();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
    }
}
