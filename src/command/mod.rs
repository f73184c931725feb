// Command Pattern for Undo/Redo functionality
//
// This module implements the Command Pattern to enable undo/redo for all
// score edits. All state-changing operations go through EditCommand.
//
// Architecture:
// - EditCommand: one score edit that captures prior state on apply
// - CommandStack: Manages undo/redo stacks
// - EngineState: the shared state commands mutate

pub mod edit;
pub mod stack;
pub mod state;

pub use edit::EditCommand;
pub use stack::CommandStack;
pub use state::EngineState;
