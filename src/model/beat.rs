// Beat - one time slot of the note grid
// Holds the dense 88-wide activation array used by playback reads and a
// sparse ordered set of active pitches used for enumeration. The two are
// kept in lockstep by routing every mutation through set_note.

use crate::error::EngineError;
use crate::model::pitch::PITCH_COUNT;
use std::collections::BTreeSet;

/// One beat of an instrument's note grid
///
/// The dense array is the source of truth for playback reads (O(1) lookup);
/// the sparse set exists so callers enumerating active notes never scan all
/// 88 entries. Neither representation is exposed mutably on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beat {
    time: u32,
    active: [bool; PITCH_COUNT],
    active_pitches: BTreeSet<u8>,
    selected: bool,
}

impl Beat {
    /// Create an empty beat at the given time index
    pub(crate) fn new(time: u32) -> Self {
        Self {
            time,
            active: [false; PITCH_COUNT],
            active_pitches: BTreeSet::new(),
            selected: false,
        }
    }

    /// Time index of this beat within the instrument's timeline
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Renumber this beat; used when earlier beats are deleted
    pub(crate) fn set_time(&mut self, time: u32) {
        self.time = time;
    }

    /// Whether the given pitch is active at this beat
    pub fn note(&self, pitch: u8) -> Result<bool, EngineError> {
        self.active
            .get(pitch as usize)
            .copied()
            .ok_or(EngineError::InvalidPitch(pitch))
    }

    /// Set a note on or off, updating both representations together
    ///
    /// Returns the previous state so edits can be reversed exactly.
    pub(crate) fn set_note(&mut self, pitch: u8, active: bool) -> Result<bool, EngineError> {
        let slot = self
            .active
            .get_mut(pitch as usize)
            .ok_or(EngineError::InvalidPitch(pitch))?;
        let previous = *slot;
        *slot = active;
        if active {
            self.active_pitches.insert(pitch);
        } else {
            self.active_pitches.remove(&pitch);
        }
        debug_assert!(self.is_consistent());
        Ok(previous)
    }

    /// Flip a note and return the resulting state
    pub(crate) fn toggle_note(&mut self, pitch: u8) -> Result<bool, EngineError> {
        let now = !self.note(pitch)?;
        self.set_note(pitch, now)?;
        Ok(now)
    }

    /// Active pitch indices at this beat, ascending
    ///
    /// Backed by the sparse set; never scans the full 88-wide array.
    pub fn active_pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.active_pitches.iter().copied()
    }

    /// Number of active notes
    pub fn active_count(&self) -> usize {
        self.active_pitches.len()
    }

    /// Whether this beat is marked for a batch structural edit
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Dense array and sparse set agree on every pitch
    fn is_consistent(&self) -> bool {
        self.active
            .iter()
            .enumerate()
            .all(|(p, &on)| on == self.active_pitches.contains(&(p as u8)))
    }
}
