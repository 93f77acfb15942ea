use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    /// The combined source failed to evaluate to a usable `exports`
    /// instance, or a persisted method name/source fails reconstruction
    /// validation.
    #[error("Bad definition")]
    BadDefinition,

    /// The script ran past its wall-clock budget and was torn down.
    #[error("sandbox execution timed out after {0:?}")]
    Timeout(Duration),

    /// The script raised or threw during evaluation.
    #[error("script error: {0}")]
    Script(String),

    /// The captured data snapshot exceeded the configured size cap.
    #[error("captured contract data exceeds {max} bytes")]
    DataTooLarge { max: usize },

    /// The worker thread running the script panicked or its result
    /// channel was dropped before answering.
    #[error("sandbox worker failed: {0}")]
    WorkerFailed(String),
}
