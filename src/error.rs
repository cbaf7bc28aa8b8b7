//! Errors surfaced by the scoring engine.
//!
//! Only hard failures live here. Per-chunk detection failures, too-short
//! analysis inputs and degenerate alignments are recovered where they occur
//! and never reach the caller.

use std::fmt;

/// Errors returned from the public engine API.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// PCM buffer too short or malformed (odd byte count, zero sample rate,
    /// non-mono channel layout).
    InputFormat(String),

    /// The caller's cancellation token fired or its deadline passed.
    Cancelled,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InputFormat(msg) => write!(f, "Invalid PCM input: {}", msg),
            EngineError::Cancelled => write!(f, "Analysis cancelled"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
