//! Error types for the smoothing engine.

use crate::param_set::ParamId;
use thiserror::Error;

/// Errors that can abort a block or reject a configuration.
///
/// A failed [`process`](crate::Smoother::process) call leaves the persisted
/// parameter sets exactly as they were before the call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The host supplied a non-positive or non-finite sample rate.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// A point could not be read from a host-supplied curve.
    #[error("point {index} of parameter {id} could not be read")]
    MalformedPoint {
        /// Parameter whose queue failed.
        id: ParamId,
        /// Index of the failed point within the queue.
        index: usize,
    },

    /// The engine configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Writing or reading the persisted state stream failed.
    #[error("state stream error: {0}")]
    State(#[from] std::io::Error),
}
