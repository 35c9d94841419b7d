//! Line-oriented command console for the Cadence tick scheduler.
//!
//! Lines flow from an input source through a single-slot hand-off buffer
//! into a dispatcher that looks the first word up in a command table:
//!
//! ```text
//! caller --submit_line--> CommandSlot --SlotSource--> Console --> handler
//!                                                        |
//!                                                   LineSink (output)
//! ```
//!
//! # Modules
//!
//! - [`slot`] -- [`CommandSlot`], the tri-state single-command buffer.
//! - [`io`] -- [`LineSource`] / [`LineSink`] and their terminal, scripted,
//!   recording, and slot-backed implementations.
//! - [`table`] -- [`CommandTable`] and the built-in `help` / `quit` commands.
//! - [`dispatch`] -- [`Console`], the dispatcher state machine.
//! - [`session`] -- [`Session`], the process-level loop contract.
//! - [`error`] -- Error types shared by the modules above.
//!
//! [`CommandSlot`]: slot::CommandSlot
//! [`LineSource`]: io::LineSource
//! [`LineSink`]: io::LineSink
//! [`CommandTable`]: table::CommandTable
//! [`Console`]: dispatch::Console
//! [`Session`]: session::Session

pub mod dispatch;
pub mod error;
pub mod io;
pub mod session;
pub mod slot;
pub mod table;
