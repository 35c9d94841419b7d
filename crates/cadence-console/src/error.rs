//! Error types for the console.
//!
//! Slot errors are recoverable: the submitter may drop or retry the line.
//! Command errors are reported on the output sink and never stop the
//! console or the tick driver.

use crate::slot::SlotState;

/// Errors raised by [`CommandSlot`](crate::slot::CommandSlot) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// A command is still pending or being consumed.
    #[error("command slot is busy (state: {state})")]
    Busy {
        /// The state that blocked the publish.
        state: SlotState,
    },

    /// The command does not fit in the slot.
    #[error("command of {len} bytes exceeds the {capacity}-byte slot")]
    Overflow {
        /// Length of the rejected command in bytes.
        len: usize,
        /// Slot capacity in bytes.
        capacity: usize,
    },

    /// The operation is not legal in the current state.
    #[error("cannot {operation} a command slot in state {state}")]
    InvalidTransition {
        /// The attempted operation.
        operation: &'static str,
        /// The state the slot was in.
        state: SlotState,
    },
}

/// Errors reported by command handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// `help` was asked about a command that is not in the table.
    #[error("Command not found, type help for more information")]
    UnknownTopic {
        /// The requested topic.
        topic: String,
    },

    /// The handler could not carry out the command.
    #[error("{reason}")]
    Failed {
        /// Human-readable explanation shown on the console.
        reason: String,
    },
}

impl CommandError {
    /// Shorthand for [`CommandError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`Session::submit_line`](crate::session::Session::submit_line).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The line could not be placed in the command slot.
    #[error("slot error: {source}")]
    Slot {
        /// The underlying slot error.
        #[from]
        source: SlotError,
    },

    /// The console has already terminated.
    #[error("console has terminated; no further commands are accepted")]
    Terminated,

    /// Reading the line back out of the slot failed.
    #[error("console input error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
