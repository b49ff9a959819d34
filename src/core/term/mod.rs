//! Single-line terminal model: the cell grid and the parser that drives it.

mod parser;
mod state;

pub use parser::{ParserEvent, SequenceParser};
pub use state::{Cell, LineState, SGR_RESET};
