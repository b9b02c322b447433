//! Undoable commands and the bounded history that runs them.
//!
//! Every model mutation that should be reversible is expressed as a
//! [`Command`]: an `execute` that applies the change and an `unexecute` that
//! reverts it. The [`CommandManager`] owns the undo and redo stacks, caps the
//! undo depth by evicting the oldest entry, and tracks the modification
//! timestamp the way a host application's save logic expects: undoing a
//! command restores the timestamp the model had before that command ran.
//!
//! A command that fails while being undone or redone is dropped from both
//! stacks; the model may have partially changed, which mirrors the
//! mutate-first contract of the entities themselves.

use std::collections::VecDeque;
use std::time::SystemTime;

use log::{debug, warn};

use crate::error::ModelError;

/// A reversible model mutation.
pub trait Command {
    /// Applies the change. Also called again on redo.
    fn execute(&mut self) -> Result<(), ModelError>;

    /// Reverts the change made by the last `execute`.
    fn unexecute(&mut self) -> Result<(), ModelError>;

    /// Short human-readable label for logs
    fn label(&self) -> &'static str;
}

/// A history entry: the command plus the modification timestamps bracketing
/// its first execution.
struct Entry {
    command: Box<dyn Command>,
    /// Model timestamp before the command first ran
    before: SystemTime,
    /// Model timestamp right after the command first ran
    after: SystemTime,
}

/// Bounded undo/redo history.
pub struct CommandManager {
    undo_stack: VecDeque<Entry>,
    redo_stack: Vec<Entry>,
    limit: usize,
    last_modified: SystemTime,
}

impl CommandManager {
    /// Creates a manager retaining at most `limit` undoable commands;
    /// a limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
            last_modified: SystemTime::now(),
        }
    }

    /// Timestamp of the last applied change. Undo rolls it back to the value
    /// it had before the undone command; redo restores it.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Runs a fresh command and records it.
    ///
    /// On success the redo stack is cleared and the oldest history entry is
    /// evicted once the depth limit is exceeded; an evicted command can never
    /// be undone again. On failure nothing is recorded.
    pub fn execute(&mut self, mut command: Box<dyn Command>) -> Result<(), ModelError> {
        debug!(command = command.label(); "Executing command");
        command.execute()?;

        let before = self.last_modified;
        self.last_modified = SystemTime::now();
        self.undo_stack.push_back(Entry {
            command,
            before,
            after: self.last_modified,
        });
        if self.undo_stack.len() > self.limit {
            let evicted = self.undo_stack.pop_front();
            if let Some(entry) = evicted {
                debug!(command = entry.command.label(); "Evicting oldest history entry");
            }
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Reverts the most recent command and moves it to the redo stack.
    ///
    /// A command that fails to revert is dropped from the history entirely;
    /// the error is propagated and the model keeps whatever the failed
    /// `unexecute` left behind.
    pub fn undo(&mut self) -> Result<(), ModelError> {
        let mut entry = self.undo_stack.pop_back().ok_or(ModelError::NothingToUndo)?;
        debug!(command = entry.command.label(); "Undoing command");
        if let Err(error) = entry.command.unexecute() {
            warn!(command = entry.command.label(), error:% = error; "Undo failed, dropping command");
            return Err(error);
        }
        self.last_modified = entry.before;
        self.redo_stack.push(entry);
        Ok(())
    }

    /// Re-applies the most recently undone command.
    ///
    /// Failure drops the command, mirroring [`Self::undo`].
    pub fn redo(&mut self) -> Result<(), ModelError> {
        let mut entry = self.redo_stack.pop().ok_or(ModelError::NothingToRedo)?;
        debug!(command = entry.command.label(); "Redoing command");
        if let Err(error) = entry.command.execute() {
            warn!(command = entry.command.label(), error:% = error; "Redo failed, dropping command");
            return Err(error);
        }
        self.last_modified = entry.after;
        self.undo_stack.push_back(entry);
        Ok(())
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("limit", &self.limit)
            .finish()
    }
}
