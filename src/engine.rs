// Engine - the public facade over score, transport and history
//
// Owns the single lock around the engine state. Every edit and every
// playback tick runs with that lock held for its full duration, so a
// tick observes either all of a command's effects or none of them.

use crate::command::{CommandStack, EditCommand, EngineState};
use crate::error::EngineError;
use crate::model::{InstrumentId, PitchTable, Score};
use crate::sequencer::IntervalClock;
use crate::synth::{SoundProfile, ToneSink};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Lock a mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The sequencer engine
///
/// Edits go through [`EditCommand`] values on an undo/redo stack;
/// playback runs on a background [`IntervalClock`] that ticks the
/// transport at the configured tempo and feeds tones to the sink.
pub struct Engine {
    state: Arc<Mutex<EngineState>>,
    pitches: Arc<PitchTable>,
    sink: Arc<Mutex<Box<dyn ToneSink>>>,
    commands: CommandStack,
    clock: Option<IntervalClock>,
}

impl Engine {
    /// Create an engine with a default score and tempo, playing into
    /// `sink`
    pub fn new(sink: Box<dyn ToneSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            pitches: Arc::new(PitchTable::new()),
            sink: Arc::new(Mutex::new(sink)),
            commands: CommandStack::new(),
            clock: None,
        }
    }

    pub fn pitches(&self) -> &PitchTable {
        &self.pitches
    }

    /// Run a closure against the current score under the engine lock
    pub fn with_score<R>(&self, f: impl FnOnce(&Score) -> R) -> R {
        f(&lock(&self.state).score)
    }

    // Editing --------------------------------------------------------------

    /// Apply an edit and record it for undo
    pub fn invoke(&mut self, command: EditCommand) -> Result<(), EngineError> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        self.commands.invoke(command, &mut guard)
    }

    /// Flip a note on the active instrument
    pub fn toggle_note(&mut self, time: u32, pitch: u8) -> Result<(), EngineError> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        let instrument = guard
            .score
            .active_instrument()
            .ok_or(EngineError::InvalidState("no active instrument"))?;
        self.commands
            .invoke(EditCommand::toggle_note(instrument, time, pitch), &mut guard)
    }

    /// Add an instrument and return its id
    pub fn add_instrument(
        &mut self,
        profile: SoundProfile,
        name: impl Into<String>,
    ) -> Result<InstrumentId, EngineError> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        self.commands
            .invoke(EditCommand::add_instrument(profile, name), &mut guard)?;
        guard
            .score
            .instruments()
            .last()
            .map(|instr| instr.id())
            .ok_or(EngineError::InvalidState("instrument was not added"))
    }

    /// Extend every timeline by one bar of empty beats
    pub fn append_bar(&mut self) -> Result<(), EngineError> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        let count = guard.score.beats_per_bar();
        self.commands
            .invoke(EditCommand::append_beats(count), &mut guard)
    }

    /// Delete every selected beat
    pub fn delete_selected_beats(&mut self) -> Result<(), EngineError> {
        self.invoke(EditCommand::delete_selected_beats())
    }

    /// Undo the most recent edit; returns its description
    pub fn undo(&mut self) -> Option<String> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        self.commands.undo(&mut guard)
    }

    /// Redo the most recently undone edit; returns its description
    pub fn redo(&mut self) -> Option<String> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state);
        self.commands.redo(&mut guard)
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // Beat selection -------------------------------------------------------

    pub fn select_beat(&mut self, time: u32) -> Result<(), EngineError> {
        lock(&self.state).score.set_beat_selection(time, true)
    }

    pub fn unselect_beat(&mut self, time: u32) -> Result<(), EngineError> {
        lock(&self.state).score.set_beat_selection(time, false)
    }

    pub fn unselect_all_beats(&mut self) {
        lock(&self.state).score.unselect_all_beats();
    }

    // Playback -------------------------------------------------------------

    /// Start playback from the first beat
    pub fn play(&mut self) {
        self.play_from(0);
    }

    /// Start playback from the given beat; no-op when already playing
    pub fn play_from(&mut self, start_beat: u32) {
        let period = {
            let mut guard = lock(&self.state);
            if guard.transport.is_playing() {
                return;
            }
            guard.transport.begin(start_beat);
            Duration::from_millis(guard.transport.ms_per_beat())
        };
        let state = Arc::clone(&self.state);
        let pitches = Arc::clone(&self.pitches);
        let sink = Arc::clone(&self.sink);
        self.clock = Some(IntervalClock::start(period, move |count| {
            let mut guard = lock(&state);
            let EngineState { score, transport } = &mut *guard;
            let mut sink = lock(&sink);
            transport
                .tick(count, score, &pitches, sink.as_mut())
                .is_playing()
        }));
    }

    /// Stop playback, keeping the current position; idempotent
    pub fn stop(&mut self) {
        self.cancel_clock();
        lock(&self.state).transport.halt();
    }

    /// Stop when playing, otherwise resume from the current position
    pub fn toggle_play(&mut self) {
        let (playing, current) = {
            let guard = lock(&self.state);
            (guard.transport.is_playing(), guard.transport.current_beat())
        };
        if playing {
            self.stop();
        } else {
            self.play_from(current);
        }
    }

    /// Stop and move the position to the first beat
    pub fn rewind_to_start(&mut self) {
        self.cancel_clock();
        lock(&self.state).transport.rewind_to_start();
    }

    /// Stop and move the position past the last beat
    pub fn forward_to_end(&mut self) {
        self.cancel_clock();
        let mut guard = lock(&self.state);
        let EngineState { score, transport } = &mut *guard;
        transport.forward_to_end(score.score_length());
    }

    fn cancel_clock(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.cancel();
        }
    }

    // Transport queries and settings ---------------------------------------

    pub fn is_playing(&self) -> bool {
        lock(&self.state).transport.is_playing()
    }

    pub fn current_beat(&self) -> u32 {
        lock(&self.state).transport.current_beat()
    }

    pub fn ms_per_beat(&self) -> u64 {
        lock(&self.state).transport.ms_per_beat()
    }

    /// Change the tempo; a run already playing keeps its old period until
    /// playback is restarted
    pub fn set_tempo(&mut self, ms_per_beat: u64) -> Result<(), EngineError> {
        lock(&self.state).transport.set_ms_per_beat(ms_per_beat)
    }

    pub fn is_looping(&self) -> bool {
        lock(&self.state).transport.is_looping()
    }

    pub fn set_looping(&mut self, is_looping: bool) {
        lock(&self.state).transport.set_looping(is_looping);
    }

    pub fn toggle_loop(&mut self) -> bool {
        lock(&self.state).transport.toggle_loop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::NullSink;

    fn engine_with_instrument() -> Engine {
        let mut engine = Engine::new(Box::new(NullSink));
        engine
            .add_instrument(SoundProfile::SynthPiano, "piano")
            .unwrap();
        engine
    }

    #[test]
    fn test_toggle_note_requires_an_active_instrument() {
        let mut engine = Engine::new(Box::new(NullSink));

        assert_eq!(
            engine.toggle_note(0, 39),
            Err(EngineError::InvalidState("no active instrument"))
        );
    }

    #[test]
    fn test_toggle_note_targets_the_active_instrument() {
        let mut engine = engine_with_instrument();

        engine.toggle_note(2, 39).unwrap();

        let set = engine.with_score(|score| {
            score
                .instrument(0)
                .unwrap()
                .beat(2)
                .unwrap()
                .note(39)
                .unwrap()
        });
        assert!(set);
    }

    #[test]
    fn test_undo_redo_through_the_facade() {
        let mut engine = engine_with_instrument();
        engine.toggle_note(0, 48).unwrap();

        let undone = engine.undo().unwrap();
        assert!(undone.contains("Toggle note"));
        assert!(!engine.with_score(|score| {
            score.instrument(0).unwrap().beat(0).unwrap().note(48).unwrap()
        }));

        engine.redo().unwrap();
        assert!(engine.with_score(|score| {
            score.instrument(0).unwrap().beat(0).unwrap().note(48).unwrap()
        }));
    }

    #[test]
    fn test_append_bar_uses_beats_per_bar() {
        let mut engine = engine_with_instrument();
        let before = engine.with_score(Score::score_length);

        engine.append_bar().unwrap();

        let per_bar = engine.with_score(Score::beats_per_bar);
        assert_eq!(engine.with_score(Score::score_length), before + per_bar);
    }

    #[test]
    fn test_delete_without_selection_fails_cleanly() {
        let mut engine = engine_with_instrument();

        assert!(engine.delete_selected_beats().is_err());
        // the failed edit is not recorded; the last edit is still the add
        let undone = engine.undo().unwrap();
        assert!(undone.contains("Add instrument"));
    }

    #[test]
    fn test_stop_is_idempotent_without_playback() {
        let mut engine = engine_with_instrument();
        engine.stop();
        engine.stop();
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_rewind_and_forward() {
        let mut engine = engine_with_instrument();

        engine.forward_to_end();
        assert_eq!(
            engine.current_beat(),
            engine.with_score(Score::score_length)
        );

        engine.rewind_to_start();
        assert_eq!(engine.current_beat(), 0);
    }
}
