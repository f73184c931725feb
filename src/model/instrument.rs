// Instrument - one playable voice and its note grid
// Owns an ordered-by-time collection of Beats spanning the score timeline.

use crate::error::EngineError;
use crate::model::beat::Beat;
use crate::synth::SoundProfile;
use std::collections::BTreeSet;

/// Unique identifier for instruments
pub type InstrumentId = u32;

/// An instrument: identity, loudness, sound profile, and its note grid
///
/// The beats vector is ordered by time and kept contiguous: while the score
/// timeline is consistent, `beats[t].time() == t`. Structural edits that
/// delete beats renumber the remainder to restore that property.
#[derive(Debug, Clone)]
pub struct Instrument {
    id: InstrumentId,
    name: String,
    loudness: f64,
    profile: SoundProfile,
    is_active: bool,
    beats: Vec<Beat>,
}

impl Instrument {
    /// Create an instrument with an empty grid spanning `score_length` beats
    pub(crate) fn new(
        id: InstrumentId,
        name: String,
        profile: SoundProfile,
        score_length: u32,
    ) -> Self {
        Self {
            id,
            name,
            loudness: 1.0,
            profile,
            is_active: false,
            beats: (0..score_length).map(Beat::new).collect(),
        }
    }

    pub fn id(&self) -> InstrumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    /// Loudness scalar passed to the synthesis sink (>= 0)
    pub fn loudness(&self) -> f64 {
        self.loudness
    }

    pub(crate) fn set_loudness(&mut self, loudness: f64) -> f64 {
        std::mem::replace(&mut self.loudness, loudness)
    }

    pub fn profile(&self) -> SoundProfile {
        self.profile
    }

    /// Whether this is the instrument currently being edited
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Number of beats in this instrument's timeline
    pub fn beat_count(&self) -> u32 {
        self.beats.len() as u32
    }

    /// All beats in time order
    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    /// The beat at the given time index, if present
    pub fn beat(&self, time: u32) -> Option<&Beat> {
        let beat = self.beats.get(time as usize)?;
        debug_assert_eq!(beat.time(), time);
        Some(beat)
    }

    fn beat_mut(&mut self, time: u32) -> Result<&mut Beat, EngineError> {
        self.beats
            .get_mut(time as usize)
            .ok_or(EngineError::InvalidBeat(time))
    }

    /// Active pitch indices at the given beat
    pub fn active_notes_at(
        &self,
        time: u32,
    ) -> Result<impl Iterator<Item = u8> + '_, EngineError> {
        self.beat(time)
            .map(|beat| beat.active_pitches())
            .ok_or(EngineError::InvalidBeat(time))
    }

    /// Set one note; returns the previous state for undo
    pub(crate) fn set_note(
        &mut self,
        time: u32,
        pitch: u8,
        active: bool,
    ) -> Result<bool, EngineError> {
        self.beat_mut(time)?.set_note(pitch, active)
    }

    /// Toggle one note; returns the resulting state
    pub(crate) fn toggle_note(&mut self, time: u32, pitch: u8) -> Result<bool, EngineError> {
        self.beat_mut(time)?.toggle_note(pitch)
    }

    pub(crate) fn set_beat_selected(
        &mut self,
        time: u32,
        selected: bool,
    ) -> Result<(), EngineError> {
        self.beat_mut(time)?.set_selected(selected);
        Ok(())
    }

    /// Append `count` fresh empty beats continuing the timeline
    pub(crate) fn append_beats(&mut self, count: u32) {
        let start = self.beats.len() as u32;
        self.beats.extend((start..start + count).map(Beat::new));
    }

    /// Drop the last `count` beats; reverses an append
    pub(crate) fn truncate_beats(&mut self, count: u32) {
        let new_len = self.beats.len().saturating_sub(count as usize);
        self.beats.truncate(new_len);
    }

    /// Remove every beat whose time is in `selected` and renumber the rest
    ///
    /// Removed beats are returned with their original time indices so the
    /// edit can be reversed; the survivors are renumbered to contiguity.
    pub(crate) fn remove_selected_beats(&mut self, selected: &BTreeSet<u32>) -> Vec<Beat> {
        let mut removed = Vec::with_capacity(selected.len());
        let mut kept = Vec::with_capacity(self.beats.len() - selected.len().min(self.beats.len()));
        for beat in self.beats.drain(..) {
            if selected.contains(&beat.time()) {
                removed.push(beat);
            } else {
                kept.push(beat);
            }
        }
        for (index, beat) in kept.iter_mut().enumerate() {
            beat.set_time(index as u32);
        }
        self.beats = kept;
        debug_assert!(self.timeline_is_contiguous());
        removed
    }

    /// Reinsert previously removed beats at their original time indices
    ///
    /// `removed` must be in ascending original-time order (as produced by
    /// `remove_selected_beats`); survivors shift back up to make room.
    pub(crate) fn restore_beats(&mut self, removed: Vec<Beat>) {
        for beat in removed {
            let index = beat.time() as usize;
            debug_assert!(index <= self.beats.len());
            self.beats.insert(index.min(self.beats.len()), beat);
        }
        for (index, beat) in self.beats.iter_mut().enumerate() {
            beat.set_time(index as u32);
        }
        debug_assert!(self.timeline_is_contiguous());
    }

    /// Beat times form exactly 0..len with no gaps or duplicates
    pub(crate) fn timeline_is_contiguous(&self) -> bool {
        self.beats
            .iter()
            .enumerate()
            .all(|(index, beat)| beat.time() == index as u32)
    }
}
