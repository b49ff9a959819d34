//! Core line buffering components.
//!
//! This module contains the stream-to-lines logic:
//!
//! - **term**: single-line cell grid and the escape sequence parser
//! - **timer**: single-shot flush timer for partial lines
//! - **line_buffer**: `LineBuffer` combining parser, grid and flush policy
//! - **process**: child process spawning with per-stream line buffers
//!
//! # Architecture
//!
//! ```text
//! spawn_streaming
//! └── reader thread (stdout / stderr)
//!     └── LineBuffer
//!         ├── SequenceParser (ANSI escape sequences)
//!         ├── LineState (cell grid + cursor + active style)
//!         └── FlushTimer (inactivity flush)
//! ```

pub mod line_buffer;
pub mod process;
pub mod term;
pub mod timer;
