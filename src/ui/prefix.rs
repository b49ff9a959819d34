//! Line prefixing
//!
//! Wraps each emitted line with a bold, colored label and a trailing newline
//! before it is forwarded to its sink.

use crossterm::style::{style, Color, Stylize};

/// Label applied to every line of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePrefixer {
    label: String,
    color: Color,
}

impl LinePrefixer {
    pub fn new(label: impl Into<String>, color: Color) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// `"<label>: <line>\n"` with the label styled
    pub fn decorate(&self, line: &str) -> String {
        format!("{}: {}\n", style(self.label.as_str()).with(self.color).bold(), line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_wraps_line() {
        let prefixer = LinePrefixer::new("build", Color::DarkCyan);
        let decorated = prefixer.decorate("compiling crate");

        assert!(decorated.contains("build"));
        assert!(decorated.ends_with(": compiling crate\n"));
        assert_eq!(decorated.matches('\n').count(), 1);
    }

    #[test]
    fn test_label_is_bold() {
        let prefixer = LinePrefixer::new("test", Color::Red);
        let decorated = prefixer.decorate("");
        // SGR 1 is bold
        assert!(decorated.contains("\x1b[1m"));
        assert!(decorated.ends_with(": \n"));
    }

    #[test]
    fn test_keeps_line_styles() {
        let prefixer = LinePrefixer::new("x", Color::Blue);
        let decorated = prefixer.decorate("\x1b[31mred\x1b[0m");
        assert!(decorated.ends_with(": \x1b[31mred\x1b[0m\n"));
    }
}
