// Transport - Playback control and state management
// Playback position and tempo state, plus the per-tick step that feeds
// active notes to the tone sink. Beat advancement is computed from the
// clock's tick count rather than by incrementing, so a slow tick cannot
// silently slip the position.

use crate::error::EngineError;
use crate::model::{PitchTable, Score};
use crate::synth::ToneSink;

/// Whether the transport is currently producing ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

impl Default for TransportState {
    fn default() -> Self {
        TransportState::Stopped
    }
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// Playback engine state: tempo, position and loop bookkeeping
///
/// `loop_offset` accumulates one score length per completed loop so that
/// `start_beat + tick_count + 1 - loop_offset` always lands back inside
/// the score.
#[derive(Debug, Clone)]
pub struct Transport {
    ms_per_beat: u64,
    current_beat: u32,
    start_beat: u32,
    loop_offset: u64,
    is_looping: bool,
    state: TransportState,
}

impl Transport {
    pub fn new(ms_per_beat: u64) -> Self {
        assert!(ms_per_beat > 0, "tempo must be > 0 ms per beat");
        Self {
            ms_per_beat,
            current_beat: 0,
            start_beat: 0,
            loop_offset: 0,
            is_looping: true,
            state: TransportState::Stopped,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn ms_per_beat(&self) -> u64 {
        self.ms_per_beat
    }

    /// Change the tempo; takes effect when playback next starts
    pub fn set_ms_per_beat(&mut self, ms_per_beat: u64) -> Result<(), EngineError> {
        if ms_per_beat == 0 {
            return Err(EngineError::InvalidState("tempo must be > 0 ms per beat"));
        }
        self.ms_per_beat = ms_per_beat;
        Ok(())
    }

    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn set_looping(&mut self, is_looping: bool) {
        self.is_looping = is_looping;
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.is_looping = !self.is_looping;
        self.is_looping
    }

    /// Enter the playing state from the given beat; no-op when already
    /// playing
    pub fn begin(&mut self, from_beat: u32) {
        if self.is_playing() {
            return;
        }
        self.start_beat = from_beat;
        self.current_beat = from_beat;
        self.loop_offset = 0;
        self.state = TransportState::Playing;
    }

    /// Leave the playing state; idempotent
    pub fn halt(&mut self) {
        self.state = TransportState::Stopped;
    }

    /// Stop playback and move the position to the first beat
    pub fn rewind_to_start(&mut self) {
        self.halt();
        self.start_beat = 0;
        self.current_beat = 0;
    }

    /// Stop playback and move the position past the last beat
    pub fn forward_to_end(&mut self, score_length: u32) {
        self.halt();
        self.start_beat = score_length;
        self.current_beat = score_length;
    }

    /// Run one playback tick: play the current beat of every instrument,
    /// then advance (wrapping when looping)
    ///
    /// `count` is the number of completed clock ticks. Exhaustion is
    /// checked before any synthesis, so a non-looping run past the end
    /// stops without a stray tone.
    pub fn tick(
        &mut self,
        count: u64,
        score: &Score,
        pitches: &PitchTable,
        sink: &mut dyn ToneSink,
    ) -> TransportState {
        if !self.is_playing() {
            return self.state;
        }
        if self.current_beat >= score.score_length() {
            self.halt();
            return self.state;
        }
        for instrument in score.instruments() {
            let Some(beat) = instrument.beat(self.current_beat) else {
                // an instrument ran out of beats; stop the whole transport
                self.halt();
                return self.state;
            };
            let frequencies: Vec<f64> = beat
                .active_pitches()
                .filter_map(|pitch| pitches.frequency(pitch).ok())
                .collect();
            sink.play_tone(&frequencies, instrument.loudness(), instrument.profile());
        }

        let len = u64::from(score.score_length());
        let mut next = (u64::from(self.start_beat) + count + 1).saturating_sub(self.loop_offset);
        if next >= len && self.is_looping && len > 0 {
            self.loop_offset += len;
            next -= len;
        }
        // when not looping this may land past the end; the next tick's
        // exhaustion check halts before playing anything
        self.current_beat = next as u32;
        self.state
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(300)
    }
}
