//! Single-command hand-off buffer between a line source and the dispatcher.
//!
//! The slot holds at most one command. Its state cycles through
//!
//! ```text
//! Empty --publish--> Pending --take_if_pending--> ConsumedDirty --finalize--> Empty
//! ```
//!
//! Only the producer moves `Empty -> Pending`; only the dispatcher side
//! moves `Pending -> ConsumedDirty -> Empty`. `ConsumedDirty` means the
//! text has been handed out but not yet erased, and the slot is not safe
//! to overwrite. `finalize` zeroes the buffer before returning the slot
//! to `Empty`, so no stale command text survives consumption.
//!
//! The state lives in an [`AtomicU8`] and every transition is a
//! compare-exchange. The buffer sits behind a mutex that each operation
//! holds across both its state transition and its buffer access, so the
//! buffer only ever has one writer.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::SlotError;

/// Default slot capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Lifecycle state of a [`CommandSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SlotState {
    /// Nothing buffered; safe to publish.
    Empty = 0,
    /// A command is waiting to be consumed.
    Pending = 1,
    /// The command has been consumed but the buffer is not yet erased.
    ConsumedDirty = 2,
}

impl SlotState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Empty,
            1 => Self::Pending,
            _ => Self::ConsumedDirty,
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Pending => f.write_str("pending"),
            Self::ConsumedDirty => f.write_str("consumed-dirty"),
        }
    }
}

struct SlotBuffer {
    bytes: Box<[u8]>,
    len: usize,
}

/// Bounded single-command buffer with a tri-state flag.
pub struct CommandSlot {
    state: AtomicU8,
    buffer: Mutex<SlotBuffer>,
    capacity: usize,
}

impl CommandSlot {
    /// Create an empty slot holding commands of up to `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: AtomicU8::new(SlotState::Empty as u8),
            buffer: Mutex::new(SlotBuffer {
                bytes: vec![0; capacity].into_boxed_slice(),
                len: 0,
            }),
            capacity,
        }
    }

    /// Maximum command length in bytes.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current state.
    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Copy `text` into the slot and mark it pending.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Busy`] if the slot is not empty, or
    /// [`SlotError::Overflow`] if `text` is longer than the capacity.
    /// The slot is unchanged on error.
    pub fn publish(&self, text: &str) -> Result<(), SlotError> {
        let mut buffer = self.lock_buffer();

        let state = self.state();
        if state != SlotState::Empty {
            return Err(SlotError::Busy { state });
        }

        let bytes = text.as_bytes();
        let overflow = SlotError::Overflow {
            len: bytes.len(),
            capacity: self.capacity,
        };
        let target = buffer.bytes.get_mut(..bytes.len()).ok_or(overflow)?;

        self.transition(SlotState::Empty, SlotState::Pending)
            .map_err(|state| SlotError::Busy { state })?;
        target.copy_from_slice(bytes);
        buffer.len = bytes.len();
        debug!(len = bytes.len(), "command slot published");
        Ok(())
    }

    /// Hand out the pending command, if any.
    ///
    /// On success the slot moves to [`SlotState::ConsumedDirty`]; the text
    /// stays in the buffer until [`finalize`](Self::finalize). Returns
    /// `None` when no command is pending.
    pub fn take_if_pending(&self) -> Option<String> {
        let buffer = self.lock_buffer();
        self.transition(SlotState::Pending, SlotState::ConsumedDirty)
            .ok()?;
        let text = buffer
            .bytes
            .get(..buffer.len)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        debug!(len = buffer.len, "command slot consumed");
        Some(text)
    }

    /// Erase the consumed command and return the slot to empty.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::InvalidTransition`] unless the slot is
    /// [`SlotState::ConsumedDirty`]. A pending command is never erased.
    pub fn finalize(&self) -> Result<(), SlotError> {
        let mut buffer = self.lock_buffer();

        let state = self.state();
        if state != SlotState::ConsumedDirty {
            return Err(SlotError::InvalidTransition {
                operation: "finalize",
                state,
            });
        }

        buffer.bytes.fill(0);
        buffer.len = 0;
        self.transition(SlotState::ConsumedDirty, SlotState::Empty)
            .map_err(|state| SlotError::InvalidTransition {
                operation: "finalize",
                state,
            })?;
        debug!("command slot erased");
        Ok(())
    }

    /// Whether the buffer holds no trace of any command.
    pub fn is_erased(&self) -> bool {
        let buffer = self.lock_buffer();
        buffer.len == 0 && buffer.bytes.iter().all(|&b| b == 0)
    }

    fn transition(&self, from: SlotState, to: SlotState) -> Result<(), SlotState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SlotState::from_raw)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, SlotBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CommandSlot {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for CommandSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSlot")
            .field("state", &self.state())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
