// CommandStack - Manages undo/redo stacks
//
// Invoking an edit pushes it on the undo stack and clears the redo
// stack; undo moves it across. History is bounded, dropping the oldest
// entries first.

use crate::command::edit::EditCommand;
use crate::command::state::EngineState;
use crate::error::EngineError;
use std::collections::VecDeque;

const DEFAULT_MAX_HISTORY: usize = 100;

/// Undo/redo history for edit commands
pub struct CommandStack {
    undo_stack: VecDeque<EditCommand>,
    redo_stack: VecDeque<EditCommand>,
    max_history: usize,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        assert!(max_history > 0, "history must hold at least one command");
        Self {
            undo_stack: VecDeque::with_capacity(max_history),
            redo_stack: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Apply a command and record it for undo
    ///
    /// A successful invoke clears the redo stack; a failed one leaves
    /// both stacks untouched.
    pub fn invoke(
        &mut self,
        mut command: EditCommand,
        state: &mut EngineState,
    ) -> Result<(), EngineError> {
        command.apply(state)?;
        log::debug!("executed: {}", command.description());
        self.undo_stack.push_back(command);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
        Ok(())
    }

    /// Undo the most recent command; `None` when there is nothing to undo
    pub fn undo(&mut self, state: &mut EngineState) -> Option<String> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            log::debug!("undo requested with empty history");
            return None;
        };
        if let Err(err) = command.revert(state) {
            // applied commands revert against the state they produced
            debug_assert!(false, "undo failed: {err}");
            log::error!("undo of '{}' failed: {err}", command.description());
            self.undo_stack.push_back(command);
            return None;
        }
        let description = command.description();
        log::debug!("undone: {description}");
        self.redo_stack.push_back(command);
        Some(description)
    }

    /// Re-apply the most recently undone command; `None` when the redo
    /// stack is empty
    pub fn redo(&mut self, state: &mut EngineState) -> Option<String> {
        let Some(mut command) = self.redo_stack.pop_back() else {
            log::debug!("redo requested with empty history");
            return None;
        };
        if let Err(err) = command.apply(state) {
            debug_assert!(false, "redo failed: {err}");
            log::error!("redo of '{}' failed: {err}", command.description());
            self.redo_stack.push_back(command);
            return None;
        }
        let description = command.description();
        log::debug!("redone: {description}");
        self.undo_stack.push_back(command);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}
