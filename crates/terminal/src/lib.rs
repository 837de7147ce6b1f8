//! Line-oriented operator console for a scanning terminal.
//!
//! Each input line is either a scanned/typed code or a `:`-command. Scanner hardware in
//! keyboard-wedge mode ends every code with Enter, so one line is one scan.

pub mod command;
pub mod console;
pub mod journal;

pub use command::{Command, CommandError};
pub use console::{Console, Session};
pub use journal::spawn_event_log;
