// Data model for the step sequencer
// Pitch table, per-instrument beat grids and the multi-instrument score

pub mod beat;
pub mod instrument;
pub mod pitch;
pub mod score;

pub use beat::Beat;
pub use instrument::{Instrument, InstrumentId};
pub use pitch::{PitchTable, PITCH_COUNT};
pub use score::{Score, DEFAULT_BEATS_PER_BAR, DEFAULT_SCORE_LENGTH};

pub(crate) use score::{DeletedBeats, RemovedInstrument};
