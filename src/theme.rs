//! Colors used by the UI, including the severity palette from config and
//! the palette cycled through for group overrides.

use std::collections::HashMap;

use ratatui::style::Color;

use crate::config::Config;

#[derive(Clone, Debug)]
pub struct Theme {
    // Chrome
    pub tab_active: Color,
    pub tab_inactive: Color,
    pub header_bg: Color,
    pub border: Color,

    // Table
    pub line_number: Color,
    pub selected_row_bg: Color,
    pub filtered_column: Color,

    // Status bar
    pub status_mode_bg: Color,
    pub status_mode_fg: Color,
    pub status_help: Color,
    pub warning_message: Color,
    pub error_message: Color,

    // Detail pane
    pub json: Color,
    pub empty_state: Color,

    /// Severity value (lowercased) → row background.
    pub severity: HashMap<String, Color>,
    /// Cycled through when assigning a group override color.
    pub group_palette: Vec<Color>,
}

impl Theme {
    pub fn from_config(config: &Config) -> Self {
        let severity = config
            .severity_colors
            .iter()
            .filter_map(|(name, hex)| Some((name.to_lowercase(), parse_hex(hex)?)))
            .collect();

        Self {
            tab_active: Color::Green,
            tab_inactive: Color::DarkGray,
            header_bg: Color::DarkGray,
            border: Color::DarkGray,
            line_number: Color::DarkGray,
            selected_row_bg: Color::Rgb(60, 60, 80),
            filtered_column: Color::Cyan,
            status_mode_bg: Color::Blue,
            status_mode_fg: Color::White,
            status_help: Color::DarkGray,
            warning_message: Color::Yellow,
            error_message: Color::Red,
            json: Color::Cyan,
            empty_state: Color::DarkGray,
            severity,
            group_palette: vec![
                Color::Rgb(70, 100, 160),
                Color::Rgb(120, 80, 150),
                Color::Rgb(150, 110, 60),
                Color::Rgb(60, 130, 120),
                Color::Rgb(140, 70, 90),
            ],
        }
    }

    /// Background for a severity value, if severity coloring knows it.
    pub fn severity_color(&self, severity: &str) -> Option<Color> {
        self.severity.get(&severity.to_lowercase()).copied()
    }

    /// Next color in the group palette after `current`, or `None` once the
    /// palette wraps around (clearing the override).
    pub fn next_group_color(&self, current: Option<Color>) -> Option<Color> {
        match current {
            None => self.group_palette.first().copied(),
            Some(color) => {
                let idx = self.group_palette.iter().position(|&c| c == color)?;
                self.group_palette.get(idx + 1).copied()
            }
        }
    }
}

/// Parse "#RRGGBB" into a Color.
pub fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#FF0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex("#00ff7f"), Some(Color::Rgb(0, 255, 127)));
        assert_eq!(parse_hex("FF0000"), None);
        assert_eq!(parse_hex("#F00"), None);
    }

    #[test]
    fn severity_lookup_is_case_insensitive() {
        let theme = Theme::from_config(&Config::default());
        assert_eq!(theme.severity_color("High"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(theme.severity_color("unknown"), None);
    }

    #[test]
    fn group_palette_cycles_back_to_none() {
        let theme = Theme::from_config(&Config::default());
        let mut color = None;
        for _ in 0..theme.group_palette.len() {
            color = theme.next_group_color(color);
            assert!(color.is_some());
        }
        assert_eq!(theme.next_group_color(color), None);
    }
}
