// EngineState - Centralized mutable state for the sequencer
//
// This struct holds all the mutable state that commands can modify.
// One lock around it covers both a full command and a full playback tick.

use crate::model::Score;
use crate::sequencer::Transport;

/// Central state of the engine that commands and the playback tick share
pub struct EngineState {
    /// The multi-instrument timeline
    pub score: Score,

    /// Playback position, tempo and loop state
    pub transport: Transport,
}

impl EngineState {
    pub fn new(score: Score, transport: Transport) -> Self {
        Self { score, transport }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(Score::default(), Transport::default())
    }
}
