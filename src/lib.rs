//! linegrid - terminal-aware line buffering for subprocess output
//!
//! Programs that think they are writing to a terminal emit progress bars,
//! spinners and colors that only make sense when rendered live. linegrid
//! resolves that output one line at a time, so each finished line can be
//! labeled and forwarded on its own.
//!
//! # Features
//!
//! - **Overwrite resolution**: `\r`, backspace, cursor column moves and
//!   erase/insert/delete in line are applied before a line is emitted
//! - **Style carry-over**: colors persist across lines and every emitted
//!   line closes its own styles
//! - **Noise removal**: titles and other string sequences are dropped,
//!   multi-line commands are ignored
//! - **Flush policy**: newline, explicit flush, or an inactivity timeout
//! - **Process streaming**: spawn a command and label every line of its
//!   stdout and stderr

pub mod config;
pub mod core;
pub mod ui;

pub use crate::core::line_buffer::{FlushTimeout, LineBuffer};
pub use crate::core::process::{spawn_streaming, ProcessError, SpawnOptions, SpawnOutput, StdioMode};
pub use crate::core::term::{LineState, SequenceParser};
pub use crate::ui::{ColorCycler, LinePrefixer};
