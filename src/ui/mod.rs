//! Presentation of emitted lines.
//!
//! - **palette**: label colors handed out per stream
//! - **prefix**: bold colored label in front of every line

pub mod palette;
pub mod prefix;

pub use palette::ColorCycler;
pub use prefix::LinePrefixer;
