// Score - the multi-instrument timeline
// Owns the instruments, the shared score length, the active-instrument
// state and the beat selection used by batch structural edits. A
// non-audible ruler instrument keeps a timeline reference that structural
// edits apply to alongside every real instrument.

use crate::error::EngineError;
use crate::model::beat::Beat;
use crate::model::instrument::{Instrument, InstrumentId};
use crate::synth::SoundProfile;
use std::collections::BTreeSet;

/// Score length a fresh score starts with, in beats
pub const DEFAULT_SCORE_LENGTH: u32 = 24;

/// Beats per bar a fresh score starts with
pub const DEFAULT_BEATS_PER_BAR: u32 = 8;

/// Id reserved for the ruler; never handed out to real instruments
const RULER_ID: InstrumentId = InstrumentId::MAX;

/// Beats removed by one delete edit, with everything needed to reverse it
#[derive(Debug, Clone)]
pub(crate) struct DeletedBeats {
    selection: BTreeSet<u32>,
    ruler: Vec<Beat>,
    per_instrument: Vec<(InstrumentId, Vec<Beat>)>,
}

impl DeletedBeats {
    pub(crate) fn count(&self) -> u32 {
        self.selection.len() as u32
    }
}

/// An instrument removed from the score, with its position and the
/// activation state in force before the removal
#[derive(Debug, Clone)]
pub(crate) struct RemovedInstrument {
    index: usize,
    instrument: Instrument,
    prior_active: Option<InstrumentId>,
}

/// The full multi-instrument timeline
///
/// All instruments (and the ruler) share one `score_length`; structural
/// edits keep every timeline contiguous. Structural mutators are
/// crate-private so external edits flow through the command layer.
#[derive(Debug, Clone)]
pub struct Score {
    instruments: Vec<Instrument>,
    ruler: Instrument,
    next_instrument_id: InstrumentId,
    score_length: u32,
    beats_per_bar: u32,
    active_instrument: Option<InstrumentId>,
    selected_beats: BTreeSet<u32>,
}

impl Score {
    /// Create an empty score with the given timeline length
    pub fn new(score_length: u32) -> Self {
        Self {
            instruments: Vec::new(),
            ruler: Instrument::new(RULER_ID, "ruler".into(), SoundProfile::SynthPiano, score_length),
            next_instrument_id: 0,
            score_length,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            active_instrument: None,
            selected_beats: BTreeSet::new(),
        }
    }

    /// Timeline length shared by every instrument, in beats
    pub fn score_length(&self) -> u32 {
        self.score_length
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        assert!(beats_per_bar > 0, "beats per bar must be > 0");
        self.beats_per_bar = beats_per_bar;
    }

    /// All instruments in creation order (ruler excluded)
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    /// The instrument with the given id
    pub fn instrument(&self, id: InstrumentId) -> Result<&Instrument, EngineError> {
        self.instruments
            .iter()
            .find(|instr| instr.id() == id)
            .ok_or(EngineError::UnknownInstrument(id))
    }

    fn instrument_mut(&mut self, id: InstrumentId) -> Result<&mut Instrument, EngineError> {
        self.instruments
            .iter_mut()
            .find(|instr| instr.id() == id)
            .ok_or(EngineError::UnknownInstrument(id))
    }

    /// The non-audible ruler instrument
    pub fn ruler(&self) -> &Instrument {
        &self.ruler
    }

    /// Id of the instrument currently being edited, if any
    pub fn active_instrument(&self) -> Option<InstrumentId> {
        self.active_instrument
    }

    // Instrument management ------------------------------------------------

    /// Add an instrument with a grid sized to the current score length
    ///
    /// Assigns the next monotonic id; the first instrument added to an
    /// empty score becomes active automatically.
    pub(crate) fn add_instrument(&mut self, profile: SoundProfile, name: String) -> InstrumentId {
        let id = self.next_instrument_id;
        self.next_instrument_id += 1;
        self.instruments
            .push(Instrument::new(id, name, profile, self.score_length));
        if self.instruments.len() == 1 {
            self.activate(id);
        }
        id
    }

    /// Reverse the most recent `add_instrument`, restoring the id counter
    pub(crate) fn remove_instrument_rollback(&mut self, id: InstrumentId) {
        debug_assert_eq!(self.instruments.last().map(Instrument::id), Some(id));
        if self.active_instrument == Some(id) {
            self.active_instrument = None;
        }
        self.instruments.pop();
        self.next_instrument_id = id;
    }

    /// Remove an instrument; if it was active, the first remaining
    /// instrument (if any) becomes active
    pub(crate) fn remove_instrument(
        &mut self,
        id: InstrumentId,
    ) -> Result<RemovedInstrument, EngineError> {
        let index = self
            .instruments
            .iter()
            .position(|instr| instr.id() == id)
            .ok_or(EngineError::UnknownInstrument(id))?;
        let prior_active = self.active_instrument;
        let instrument = self.instruments.remove(index);
        if prior_active == Some(id) {
            self.active_instrument = None;
            if let Some(first) = self.instruments.first().map(Instrument::id) {
                self.activate(first);
            }
        }
        Ok(RemovedInstrument {
            index,
            instrument,
            prior_active,
        })
    }

    /// Reverse a `remove_instrument`, restoring position and activation
    pub(crate) fn restore_instrument(&mut self, removed: RemovedInstrument) {
        if let Some(current) = self.active_instrument {
            if removed.prior_active != Some(current) {
                if let Ok(instr) = self.instrument_mut(current) {
                    instr.set_active(false);
                }
            }
        }
        let index = removed.index.min(self.instruments.len());
        self.instruments.insert(index, removed.instrument);
        self.active_instrument = removed.prior_active;
    }

    /// Make `id` the single active instrument; returns the previous one
    pub(crate) fn set_active_instrument(
        &mut self,
        id: InstrumentId,
    ) -> Result<Option<InstrumentId>, EngineError> {
        // validate before touching anything
        self.instrument(id)?;
        let previous = self.active_instrument;
        if let Some(prev) = previous {
            if let Ok(instr) = self.instrument_mut(prev) {
                instr.set_active(false);
            }
        }
        self.activate(id);
        Ok(previous)
    }

    /// Leave no instrument active (undo path for the initial activation)
    pub(crate) fn clear_active_instrument(&mut self) {
        if let Some(prev) = self.active_instrument.take() {
            if let Ok(instr) = self.instrument_mut(prev) {
                instr.set_active(false);
            }
        }
    }

    fn activate(&mut self, id: InstrumentId) {
        if let Ok(instr) = self.instrument_mut(id) {
            instr.set_active(true);
            self.active_instrument = Some(id);
        }
    }

    pub(crate) fn rename_instrument(
        &mut self,
        id: InstrumentId,
        name: String,
    ) -> Result<String, EngineError> {
        Ok(self.instrument_mut(id)?.set_name(name))
    }

    pub(crate) fn set_loudness(
        &mut self,
        id: InstrumentId,
        loudness: f64,
    ) -> Result<f64, EngineError> {
        if !loudness.is_finite() || loudness < 0.0 {
            return Err(EngineError::InvalidState(
                "loudness must be finite and non-negative",
            ));
        }
        Ok(self.instrument_mut(id)?.set_loudness(loudness))
    }

    // Note edits -----------------------------------------------------------

    /// Set one note; returns the previous state for undo
    pub(crate) fn set_note(
        &mut self,
        id: InstrumentId,
        time: u32,
        pitch: u8,
        active: bool,
    ) -> Result<bool, EngineError> {
        self.instrument_mut(id)?.set_note(time, pitch, active)
    }

    /// Toggle one note; returns the resulting state
    pub(crate) fn toggle_note(
        &mut self,
        id: InstrumentId,
        time: u32,
        pitch: u8,
    ) -> Result<bool, EngineError> {
        self.instrument_mut(id)?.toggle_note(time, pitch)
    }

    // Structural edits -----------------------------------------------------

    /// Extend every timeline (ruler included) by `count` empty beats
    pub(crate) fn append_beats(&mut self, count: u32) {
        self.ruler.append_beats(count);
        for instrument in &mut self.instruments {
            instrument.append_beats(count);
        }
        self.score_length += count;
        debug_assert!(self.timelines_are_consistent());
    }

    /// Drop the trailing `count` beats from every timeline
    pub(crate) fn truncate_beats(&mut self, count: u32) {
        self.ruler.truncate_beats(count);
        for instrument in &mut self.instruments {
            instrument.truncate_beats(count);
        }
        self.score_length = self.score_length.saturating_sub(count);
        let len = self.score_length;
        self.selected_beats.retain(|&time| time < len);
        debug_assert!(self.timelines_are_consistent());
    }

    /// Delete every selected beat from every timeline and renumber
    ///
    /// Returns `None` (and changes nothing) when the selection is empty.
    /// Otherwise the selection is cleared, `score_length` drops by the
    /// number of deleted beats, and every timeline is contiguous again.
    pub(crate) fn delete_selected_beats(&mut self) -> Option<DeletedBeats> {
        if self.selected_beats.is_empty() {
            return None;
        }
        let selection = std::mem::take(&mut self.selected_beats);
        let ruler = self.ruler.remove_selected_beats(&selection);
        let per_instrument = self
            .instruments
            .iter_mut()
            .map(|instr| (instr.id(), instr.remove_selected_beats(&selection)))
            .collect();
        self.score_length -= selection.len() as u32;
        debug_assert!(self.timelines_are_consistent());
        Some(DeletedBeats {
            selection,
            ruler,
            per_instrument,
        })
    }

    /// Reverse a `delete_selected_beats`, restoring beats, selection and
    /// score length exactly
    pub(crate) fn restore_deleted_beats(&mut self, deleted: DeletedBeats) {
        // drop any selection made since the delete; the restored beats
        // carry their own selection flags
        self.unselect_all_beats();
        self.score_length += deleted.count();
        self.ruler.restore_beats(deleted.ruler);
        for (id, beats) in deleted.per_instrument {
            if let Ok(instr) = self.instrument_mut(id) {
                instr.restore_beats(beats);
            }
        }
        self.selected_beats = deleted.selection;
        debug_assert!(self.timelines_are_consistent());
    }

    // Beat selection -------------------------------------------------------

    /// Select or unselect one time slot across every timeline
    pub fn set_beat_selection(&mut self, time: u32, selected: bool) -> Result<(), EngineError> {
        if time >= self.score_length {
            return Err(EngineError::InvalidBeat(time));
        }
        if selected {
            self.selected_beats.insert(time);
        } else {
            self.selected_beats.remove(&time);
        }
        self.ruler.set_beat_selected(time, selected)?;
        for instrument in &mut self.instruments {
            instrument.set_beat_selected(time, selected)?;
        }
        Ok(())
    }

    /// Clear the whole selection
    pub fn unselect_all_beats(&mut self) {
        let times: Vec<u32> = self.selected_beats.iter().copied().collect();
        for time in times {
            // beats exist for every selected time
            let _ = self.set_beat_selection(time, false);
        }
        self.selected_beats.clear();
    }

    /// Currently selected time slots, ascending
    pub fn selected_beats(&self) -> impl Iterator<Item = u32> + '_ {
        self.selected_beats.iter().copied()
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_beats.is_empty()
    }

    /// Every timeline is contiguous and matches `score_length`
    pub(crate) fn timelines_are_consistent(&self) -> bool {
        let len = self.score_length;
        self.ruler.beat_count() == len
            && self.ruler.timeline_is_contiguous()
            && self.instruments.iter().all(|instr| {
                instr.beat_count() == len && instr.timeline_is_contiguous()
            })
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_with_two_instruments() -> Score {
        let mut score = Score::new(8);
        score.add_instrument(SoundProfile::SynthPiano, "one".into());
        score.add_instrument(SoundProfile::SynthPiano, "two".into());
        score
    }

    #[test]
    fn test_ids_monotonic_and_first_instrument_activates() {
        let mut score = Score::new(4);

        let a = score.add_instrument(SoundProfile::SynthPiano, "a".into());
        let b = score.add_instrument(SoundProfile::SynthPiano, "b".into());

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(score.active_instrument(), Some(a));
        assert!(score.instrument(a).unwrap().is_active());
        assert!(!score.instrument(b).unwrap().is_active());
    }

    #[test]
    fn test_set_active_instrument() {
        let mut score = score_with_two_instruments();

        let previous = score.set_active_instrument(1).unwrap();
        assert_eq!(previous, Some(0));
        assert_eq!(score.active_instrument(), Some(1));
        assert!(!score.instrument(0).unwrap().is_active());
        assert!(score.instrument(1).unwrap().is_active());

        assert_eq!(
            score.set_active_instrument(99),
            Err(EngineError::UnknownInstrument(99))
        );
        assert_eq!(score.active_instrument(), Some(1));
    }

    #[test]
    fn test_append_beats_extends_all_timelines() {
        let mut score = score_with_two_instruments();

        score.append_beats(4);

        assert_eq!(score.score_length(), 12);
        assert_eq!(score.ruler().beat_count(), 12);
        for instr in score.instruments() {
            assert_eq!(instr.beat_count(), 12);
        }
        assert!(score.timelines_are_consistent());
    }

    #[test]
    fn test_delete_selected_beats_renumbers_all_timelines() {
        let mut score = score_with_two_instruments();
        score.set_note(0, 5, 30, true).unwrap();
        score.set_note(1, 7, 31, true).unwrap();

        score.set_beat_selection(1, true).unwrap();
        score.set_beat_selection(4, true).unwrap();
        score.set_beat_selection(6, true).unwrap();
        let deleted = score.delete_selected_beats().unwrap();

        assert_eq!(deleted.count(), 3);
        assert_eq!(score.score_length(), 5);
        assert!(!score.has_selection());
        assert!(score.timelines_are_consistent());
        // beat 5 shifted down past deletions at 1 and 4; beat 7 past all three
        assert!(score.instrument(0).unwrap().beat(3).unwrap().note(30).unwrap());
        assert!(score.instrument(1).unwrap().beat(4).unwrap().note(31).unwrap());
    }

    #[test]
    fn test_delete_restore_round_trip() {
        let mut score = score_with_two_instruments();
        score.set_note(0, 2, 10, true).unwrap();
        score.set_note(1, 6, 11, true).unwrap();
        score.set_beat_selection(2, true).unwrap();
        score.set_beat_selection(3, true).unwrap();

        let deleted = score.delete_selected_beats().unwrap();
        score.restore_deleted_beats(deleted);

        assert_eq!(score.score_length(), 8);
        assert_eq!(score.selected_beats().collect::<Vec<_>>(), vec![2, 3]);
        assert!(score.instrument(0).unwrap().beat(2).unwrap().note(10).unwrap());
        assert!(score.instrument(0).unwrap().beat(2).unwrap().is_selected());
        assert!(score.instrument(1).unwrap().beat(6).unwrap().note(11).unwrap());
    }

    #[test]
    fn test_delete_all_beats_is_legal() {
        let mut score = score_with_two_instruments();
        for time in 0..8 {
            score.set_beat_selection(time, true).unwrap();
        }

        let deleted = score.delete_selected_beats().unwrap();

        assert_eq!(deleted.count(), 8);
        assert_eq!(score.score_length(), 0);
        assert!(score.timelines_are_consistent());
    }

    #[test]
    fn test_delete_with_empty_selection_is_noop() {
        let mut score = score_with_two_instruments();

        assert!(score.delete_selected_beats().is_none());
        assert_eq!(score.score_length(), 8);
    }

    #[test]
    fn test_selection_bounds() {
        let mut score = Score::new(4);

        assert_eq!(
            score.set_beat_selection(4, true),
            Err(EngineError::InvalidBeat(4))
        );
        score.set_beat_selection(3, true).unwrap();
        score.unselect_all_beats();
        assert!(!score.has_selection());
        assert!(!score.ruler().beat(3).unwrap().is_selected());
    }

    #[test]
    fn test_remove_instrument_activation_falls_back() {
        let mut score = score_with_two_instruments();
        assert_eq!(score.active_instrument(), Some(0));

        let removed = score.remove_instrument(0).unwrap();
        assert_eq!(score.active_instrument(), Some(1));
        assert!(score.instrument(1).unwrap().is_active());

        score.restore_instrument(removed);
        assert_eq!(score.active_instrument(), Some(0));
        assert!(score.instrument(0).unwrap().is_active());
        assert!(!score.instrument(1).unwrap().is_active());
        assert_eq!(score.instruments()[0].id(), 0);
    }

    #[test]
    fn test_add_instrument_rollback_restores_id_counter() {
        let mut score = Score::new(4);
        let a = score.add_instrument(SoundProfile::SynthPiano, "a".into());
        score.remove_instrument_rollback(a);

        assert_eq!(score.instrument_count(), 0);
        assert_eq!(score.active_instrument(), None);

        let again = score.add_instrument(SoundProfile::SynthPiano, "a".into());
        assert_eq!(again, a);
    }
}
