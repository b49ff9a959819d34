//! Label color cycling
//!
//! Each streamed process gets the next color from a fixed ordered palette,
//! wrapping around once every color has been handed out.

use crossterm::style::Color;

/// Built-in palette, in hand-out order
pub const DEFAULT_PALETTE: [Color; 12] = [
    Color::DarkCyan,
    Color::DarkMagenta,
    Color::DarkBlue,
    Color::DarkYellow,
    Color::DarkGreen,
    Color::DarkRed,
    Color::Cyan,
    Color::Magenta,
    Color::Blue,
    Color::Yellow,
    Color::Green,
    Color::Red,
];

/// Hands out palette colors in order, owned by whoever spawns the streams
#[derive(Debug, Clone)]
pub struct ColorCycler {
    colors: Vec<Color>,
    index: usize,
}

impl Default for ColorCycler {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorCycler {
    pub fn new() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
            index: 0,
        }
    }

    /// Custom palette. An empty list falls back to the default one.
    pub fn with_colors(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            return Self::new();
        }
        Self { colors, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Next color, wrapping after the last one
    pub fn next_color(&mut self) -> Color {
        let color = self.colors[self.index % self.colors.len()];
        self.index = self.index.wrapping_add(1);
        color
    }

    /// Start again from the first color
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Look up a palette color by name.
///
/// Accepts the plain names (`cyan`, `red`, ...) and their bright variants
/// as `brightCyan`, `bright-cyan` or `bright_cyan`.
pub fn color_by_name(name: &str) -> Option<Color> {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    let color = match normalized.as_str() {
        "cyan" => Color::DarkCyan,
        "magenta" => Color::DarkMagenta,
        "blue" => Color::DarkBlue,
        "yellow" => Color::DarkYellow,
        "green" => Color::DarkGreen,
        "red" => Color::DarkRed,
        "brightcyan" => Color::Cyan,
        "brightmagenta" => Color::Magenta,
        "brightblue" => Color::Blue,
        "brightyellow" => Color::Yellow,
        "brightgreen" => Color::Green,
        "brightred" => Color::Red,
        _ => return None,
    };
    Some(color)
}

/// Names accepted by [`color_by_name`], in default palette order
pub fn list() -> Vec<&'static str> {
    vec![
        "cyan",
        "magenta",
        "blue",
        "yellow",
        "green",
        "red",
        "brightCyan",
        "brightMagenta",
        "brightBlue",
        "brightYellow",
        "brightGreen",
        "brightRed",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_in_order_and_wraps() {
        let mut cycler = ColorCycler::new();
        let first_round: Vec<Color> = (0..12).map(|_| cycler.next_color()).collect();
        assert_eq!(first_round, DEFAULT_PALETTE.to_vec());

        assert_eq!(cycler.next_color(), Color::DarkCyan);
        assert_eq!(cycler.next_color(), Color::DarkMagenta);
    }

    #[test]
    fn test_reset() {
        let mut cycler = ColorCycler::new();
        cycler.next_color();
        cycler.next_color();
        cycler.reset();
        assert_eq!(cycler.next_color(), Color::DarkCyan);
    }

    #[test]
    fn test_custom_palette() {
        let mut cycler = ColorCycler::with_colors(vec![Color::Red, Color::Green]);
        assert_eq!(cycler.len(), 2);
        assert_eq!(cycler.next_color(), Color::Red);
        assert_eq!(cycler.next_color(), Color::Green);
        assert_eq!(cycler.next_color(), Color::Red);

        let fallback = ColorCycler::with_colors(Vec::new());
        assert_eq!(fallback.len(), DEFAULT_PALETTE.len());
    }

    #[test]
    fn test_names_match_default_order() {
        let resolved: Vec<Color> = list()
            .into_iter()
            .filter_map(color_by_name)
            .collect();
        assert_eq!(resolved, DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn test_name_variants() {
        assert_eq!(color_by_name("bright-cyan"), Some(Color::Cyan));
        assert_eq!(color_by_name("BRIGHT_RED"), Some(Color::Red));
        assert_eq!(color_by_name("Green"), Some(Color::DarkGreen));
        assert_eq!(color_by_name("purple"), None);
    }
}
