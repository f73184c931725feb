// Error taxonomy for the engine
// Boundary-facing operations validate inputs and fail with one of these;
// internal invariant violations are debug assertions, not errors.

use crate::model::InstrumentId;
use thiserror::Error;

/// Errors returned by boundary-facing engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Pitch index outside the 88-key range
    #[error("pitch {0} out of range (0..=87)")]
    InvalidPitch(u8),

    /// No beat exists at the given time index
    #[error("no beat at time {0}")]
    InvalidBeat(u32),

    /// Instrument id not present in the score
    #[error("unknown instrument {0}")]
    UnknownInstrument(InstrumentId),

    /// Operation not valid in the current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
