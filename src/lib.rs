// StepSynth - Library exports for tests and embedders

pub mod command;
pub mod engine;
pub mod error;
pub mod model;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use command::{CommandStack, EditCommand, EngineState};
pub use engine::Engine;
pub use error::EngineError;
pub use model::{
    Beat, Instrument, InstrumentId, PitchTable, Score, DEFAULT_BEATS_PER_BAR,
    DEFAULT_SCORE_LENGTH, PITCH_COUNT,
};
pub use sequencer::{CancelToken, IntervalClock, Transport, TransportState};
pub use synth::{NullSink, SoundProfile, ToneSink};
