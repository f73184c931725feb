// Synthesis boundary
// The sequencer core never talks to an audio backend directly; each tick
// hands the frequencies to play to an opaque sink.

/// Timbre an instrument plays with
///
/// A single profile ships today; the enum keeps the instrument model and
/// the sink signature stable when more are added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoundProfile {
    #[default]
    SynthPiano,
}

/// Receiver for the tones produced by one instrument on one beat
///
/// Called from the playback clock thread with the whole tick lock held,
/// so implementations should hand work off rather than block.
pub trait ToneSink: Send {
    /// Play the given frequencies (Hz) at once
    fn play_tone(&mut self, frequencies: &[f64], loudness: f64, profile: SoundProfile);
}

/// Sink that discards everything; useful in tests and headless runs
#[derive(Debug, Default)]
pub struct NullSink;

impl ToneSink for NullSink {
    fn play_tone(&mut self, _frequencies: &[f64], _loudness: f64, _profile: SoundProfile) {}
}
