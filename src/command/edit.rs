// Edit commands
//
// Every score mutation is expressed as one EditCommand value. Applying a
// command captures whatever prior state its undo needs, so reverting
// restores the score exactly, including ids, activation and selection.

use crate::command::state::EngineState;
use crate::error::EngineError;
use crate::model::{DeletedBeats, InstrumentId, RemovedInstrument};
use crate::synth::SoundProfile;

/// One undoable edit, ready to apply to the engine state
///
/// Constructed through the editing methods on [`Engine`] or directly via
/// the constructors below; the concrete edit is intentionally opaque.
///
/// [`Engine`]: crate::engine::Engine
pub struct EditCommand {
    kind: EditKind,
}

enum EditKind {
    SetNote {
        instrument: InstrumentId,
        time: u32,
        pitch: u8,
        active: bool,
        previous: Option<bool>,
    },
    ToggleNote {
        instrument: InstrumentId,
        time: u32,
        pitch: u8,
        previous: Option<bool>,
    },
    AppendBeats {
        count: u32,
    },
    DeleteSelectedBeats {
        removed: Option<DeletedBeats>,
    },
    AddInstrument {
        profile: SoundProfile,
        name: String,
        added: Option<InstrumentId>,
    },
    RemoveInstrument {
        id: InstrumentId,
        removed: Option<RemovedInstrument>,
    },
    SetActiveInstrument {
        id: InstrumentId,
        previous: Option<Option<InstrumentId>>,
    },
    RenameInstrument {
        id: InstrumentId,
        name: String,
        previous: Option<String>,
    },
    SetLoudness {
        id: InstrumentId,
        loudness: f64,
        previous: Option<f64>,
    },
}

impl EditCommand {
    /// Turn one note on or off
    pub fn set_note(instrument: InstrumentId, time: u32, pitch: u8, active: bool) -> Self {
        Self {
            kind: EditKind::SetNote {
                instrument,
                time,
                pitch,
                active,
                previous: None,
            },
        }
    }

    /// Flip one note
    pub fn toggle_note(instrument: InstrumentId, time: u32, pitch: u8) -> Self {
        Self {
            kind: EditKind::ToggleNote {
                instrument,
                time,
                pitch,
                previous: None,
            },
        }
    }

    /// Extend every timeline by `count` empty beats
    pub fn append_beats(count: u32) -> Self {
        Self {
            kind: EditKind::AppendBeats { count },
        }
    }

    /// Delete every selected beat and renumber the rest
    pub fn delete_selected_beats() -> Self {
        Self {
            kind: EditKind::DeleteSelectedBeats { removed: None },
        }
    }

    /// Add an instrument sized to the current score
    pub fn add_instrument(profile: SoundProfile, name: impl Into<String>) -> Self {
        Self {
            kind: EditKind::AddInstrument {
                profile,
                name: name.into(),
                added: None,
            },
        }
    }

    /// Remove an instrument and its whole grid
    pub fn remove_instrument(id: InstrumentId) -> Self {
        Self {
            kind: EditKind::RemoveInstrument { id, removed: None },
        }
    }

    /// Make an instrument the editing target
    pub fn set_active_instrument(id: InstrumentId) -> Self {
        Self {
            kind: EditKind::SetActiveInstrument { id, previous: None },
        }
    }

    pub fn rename_instrument(id: InstrumentId, name: impl Into<String>) -> Self {
        Self {
            kind: EditKind::RenameInstrument {
                id,
                name: name.into(),
                previous: None,
            },
        }
    }

    pub fn set_loudness(id: InstrumentId, loudness: f64) -> Self {
        Self {
            kind: EditKind::SetLoudness {
                id,
                loudness,
                previous: None,
            },
        }
    }

    /// Human-readable description, for logs and undo menus
    pub fn description(&self) -> String {
        match &self.kind {
            EditKind::SetNote {
                time, pitch, active, ..
            } => {
                if *active {
                    format!("Set note {pitch} at beat {time}")
                } else {
                    format!("Clear note {pitch} at beat {time}")
                }
            }
            EditKind::ToggleNote { time, pitch, .. } => {
                format!("Toggle note {pitch} at beat {time}")
            }
            EditKind::AppendBeats { count } => format!("Append {count} beats"),
            EditKind::DeleteSelectedBeats { .. } => "Delete selected beats".to_string(),
            EditKind::AddInstrument { name, .. } => format!("Add instrument '{name}'"),
            EditKind::RemoveInstrument { id, .. } => format!("Remove instrument {id}"),
            EditKind::SetActiveInstrument { id, .. } => format!("Activate instrument {id}"),
            EditKind::RenameInstrument { id, name, .. } => {
                format!("Rename instrument {id} to '{name}'")
            }
            EditKind::SetLoudness { id, loudness, .. } => {
                format!("Set instrument {id} loudness to {loudness:.2}")
            }
        }
    }

    /// Apply the edit, capturing prior state for [`revert`](Self::revert)
    ///
    /// On error the state is unchanged and nothing is captured.
    pub(crate) fn apply(&mut self, state: &mut EngineState) -> Result<(), EngineError> {
        let score = &mut state.score;
        match &mut self.kind {
            EditKind::SetNote {
                instrument,
                time,
                pitch,
                active,
                previous,
            } => {
                *previous = Some(score.set_note(*instrument, *time, *pitch, *active)?);
            }
            EditKind::ToggleNote {
                instrument,
                time,
                pitch,
                previous,
            } => {
                let now_active = score.toggle_note(*instrument, *time, *pitch)?;
                *previous = Some(!now_active);
            }
            EditKind::AppendBeats { count } => {
                score.append_beats(*count);
            }
            EditKind::DeleteSelectedBeats { removed } => {
                *removed = Some(
                    score
                        .delete_selected_beats()
                        .ok_or(EngineError::InvalidState("no beats selected"))?,
                );
            }
            EditKind::AddInstrument {
                profile,
                name,
                added,
            } => {
                *added = Some(score.add_instrument(*profile, name.clone()));
            }
            EditKind::RemoveInstrument { id, removed } => {
                *removed = Some(score.remove_instrument(*id)?);
            }
            EditKind::SetActiveInstrument { id, previous } => {
                *previous = Some(score.set_active_instrument(*id)?);
            }
            EditKind::RenameInstrument { id, name, previous } => {
                *previous = Some(score.rename_instrument(*id, name.clone())?);
            }
            EditKind::SetLoudness {
                id,
                loudness,
                previous,
            } => {
                *previous = Some(score.set_loudness(*id, *loudness)?);
            }
        }
        Ok(())
    }

    /// Undo a previously applied edit
    pub(crate) fn revert(&mut self, state: &mut EngineState) -> Result<(), EngineError> {
        let score = &mut state.score;
        match &mut self.kind {
            EditKind::SetNote {
                instrument,
                time,
                pitch,
                previous,
                ..
            }
            | EditKind::ToggleNote {
                instrument,
                time,
                pitch,
                previous,
            } => {
                let prev = previous
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.set_note(*instrument, *time, *pitch, prev)?;
            }
            EditKind::AppendBeats { count } => {
                score.truncate_beats(*count);
            }
            EditKind::DeleteSelectedBeats { removed } => {
                let deleted = removed
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.restore_deleted_beats(deleted);
            }
            EditKind::AddInstrument { added, .. } => {
                let id = added
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.remove_instrument_rollback(id);
            }
            EditKind::RemoveInstrument { removed, .. } => {
                let instrument = removed
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.restore_instrument(instrument);
            }
            EditKind::SetActiveInstrument { previous, .. } => {
                let prev = previous
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                match prev {
                    Some(id) => {
                        score.set_active_instrument(id)?;
                    }
                    None => score.clear_active_instrument(),
                }
            }
            EditKind::RenameInstrument { id, previous, .. } => {
                let prev = previous
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.rename_instrument(*id, prev)?;
            }
            EditKind::SetLoudness { id, previous, .. } => {
                let prev = previous
                    .take()
                    .ok_or(EngineError::InvalidState("edit was never applied"))?;
                score.set_loudness(*id, prev)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_instrument() -> EngineState {
        let mut state = EngineState::default();
        let mut add = EditCommand::add_instrument(SoundProfile::SynthPiano, "piano");
        add.apply(&mut state).unwrap();
        state
    }

    #[test]
    fn test_set_note_round_trip() {
        let mut state = state_with_instrument();

        let mut cmd = EditCommand::set_note(0, 5, 39, true);
        cmd.apply(&mut state).unwrap();
        assert!(state.score.instrument(0).unwrap().beat(5).unwrap().note(39).unwrap());

        cmd.revert(&mut state).unwrap();
        assert!(!state.score.instrument(0).unwrap().beat(5).unwrap().note(39).unwrap());
    }

    #[test]
    fn test_toggle_note_round_trip() {
        let mut state = state_with_instrument();

        let mut cmd = EditCommand::toggle_note(0, 0, 48);
        cmd.apply(&mut state).unwrap();
        assert!(state.score.instrument(0).unwrap().beat(0).unwrap().note(48).unwrap());

        cmd.revert(&mut state).unwrap();
        assert!(!state.score.instrument(0).unwrap().beat(0).unwrap().note(48).unwrap());
    }

    #[test]
    fn test_append_beats_round_trip() {
        let mut state = state_with_instrument();
        let before = state.score.score_length();

        let mut cmd = EditCommand::append_beats(8);
        cmd.apply(&mut state).unwrap();
        assert_eq!(state.score.score_length(), before + 8);

        cmd.revert(&mut state).unwrap();
        assert_eq!(state.score.score_length(), before);
        assert!(state.score.timelines_are_consistent());
    }

    #[test]
    fn test_delete_requires_a_selection() {
        let mut state = state_with_instrument();

        let mut cmd = EditCommand::delete_selected_beats();
        assert_eq!(
            cmd.apply(&mut state),
            Err(EngineError::InvalidState("no beats selected"))
        );
    }

    #[test]
    fn test_delete_round_trip_restores_selection_and_length() {
        let mut state = state_with_instrument();
        state.score.set_beat_selection(1, true).unwrap();
        state.score.set_beat_selection(3, true).unwrap();
        let before = state.score.score_length();

        let mut cmd = EditCommand::delete_selected_beats();
        cmd.apply(&mut state).unwrap();
        assert_eq!(state.score.score_length(), before - 2);
        assert!(!state.score.has_selection());

        cmd.revert(&mut state).unwrap();
        assert_eq!(state.score.score_length(), before);
        assert_eq!(state.score.selected_beats().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_add_instrument_undo_redo_reuses_the_id() {
        let mut state = state_with_instrument();

        let mut cmd = EditCommand::add_instrument(SoundProfile::SynthPiano, "second");
        cmd.apply(&mut state).unwrap();
        assert_eq!(state.score.instrument_count(), 2);

        cmd.revert(&mut state).unwrap();
        assert_eq!(state.score.instrument_count(), 1);

        let mut again = EditCommand::add_instrument(SoundProfile::SynthPiano, "second");
        again.apply(&mut state).unwrap();
        assert_eq!(state.score.instruments()[1].id(), 1);
    }

    #[test]
    fn test_remove_instrument_round_trip() {
        let mut state = state_with_instrument();
        let mut second = EditCommand::add_instrument(SoundProfile::SynthPiano, "second");
        second.apply(&mut state).unwrap();

        let mut cmd = EditCommand::remove_instrument(0);
        cmd.apply(&mut state).unwrap();
        assert_eq!(state.score.active_instrument(), Some(1));

        cmd.revert(&mut state).unwrap();
        assert_eq!(state.score.active_instrument(), Some(0));
        assert_eq!(state.score.instruments()[0].name(), "piano");
    }

    #[test]
    fn test_set_active_round_trip() {
        let mut state = state_with_instrument();
        let mut second = EditCommand::add_instrument(SoundProfile::SynthPiano, "second");
        second.apply(&mut state).unwrap();

        let mut cmd = EditCommand::set_active_instrument(1);
        cmd.apply(&mut state).unwrap();
        assert_eq!(state.score.active_instrument(), Some(1));

        cmd.revert(&mut state).unwrap();
        assert_eq!(state.score.active_instrument(), Some(0));
    }

    #[test]
    fn test_rename_and_loudness_round_trip() {
        let mut state = state_with_instrument();

        let mut rename = EditCommand::rename_instrument(0, "lead");
        rename.apply(&mut state).unwrap();
        assert_eq!(state.score.instrument(0).unwrap().name(), "lead");
        rename.revert(&mut state).unwrap();
        assert_eq!(state.score.instrument(0).unwrap().name(), "piano");

        let mut louder = EditCommand::set_loudness(0, 2.5);
        louder.apply(&mut state).unwrap();
        assert_eq!(state.score.instrument(0).unwrap().loudness(), 2.5);
        louder.revert(&mut state).unwrap();
        assert_eq!(state.score.instrument(0).unwrap().loudness(), 1.0);
    }

    #[test]
    fn test_negative_loudness_is_rejected() {
        let mut state = state_with_instrument();

        let mut cmd = EditCommand::set_loudness(0, -0.5);
        assert!(cmd.apply(&mut state).is_err());
        assert_eq!(state.score.instrument(0).unwrap().loudness(), 1.0);
    }
}
