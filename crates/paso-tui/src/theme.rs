//! An immutable `Theme` value, initialized once from configuration and
//! threaded through every `ui.rs` render function — no mutable global
//! palette statics.

use std::collections::HashMap;

use paso_core::config::ThemeConfig;
use paso_core::types::TaskPriority;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub border: Color,
    pub border_focused: Color,
    pub title: Color,
    pub selected_bg: Color,
    pub text: Color,
    pub muted: Color,
    pub critical: Color,
    pub high: Color,
    pub medium: Color,
    pub low: Color,
    pub trivial: Color,
    pub info: Color,
    pub warning: Color,
    pub error: Color,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Self {
        let base = match config.name.as_str() {
            "light" => Theme::light(),
            _ => Theme::default_dark(),
        };
        base.with_overrides(&config.overrides)
    }

    fn default_dark() -> Self {
        Theme {
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            title: Color::White,
            selected_bg: Color::Blue,
            text: Color::Gray,
            muted: Color::DarkGray,
            critical: Color::Red,
            high: Color::LightRed,
            medium: Color::Yellow,
            low: Color::Green,
            trivial: Color::DarkGray,
            info: Color::Cyan,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }

    fn light() -> Self {
        Theme {
            border: Color::Gray,
            border_focused: Color::Blue,
            title: Color::Black,
            selected_bg: Color::LightBlue,
            text: Color::Black,
            muted: Color::Gray,
            critical: Color::Red,
            high: Color::LightRed,
            medium: Color::Yellow,
            low: Color::Green,
            trivial: Color::Gray,
            info: Color::Blue,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }

    fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (key, value) in overrides {
            let Some(color) = parse_color(value) else { continue };
            match key.as_str() {
                "border" => self.border = color,
                "border_focused" => self.border_focused = color,
                "title" => self.title = color,
                "selected_bg" => self.selected_bg = color,
                "text" => self.text = color,
                "muted" => self.muted = color,
                "critical" => self.critical = color,
                "high" => self.high = color,
                "medium" => self.medium = color,
                "low" => self.low = color,
                "trivial" => self.trivial = color,
                "info" => self.info = color,
                "warning" => self.warning = color,
                "error" => self.error = color,
                _ => {}
            }
        }
        self
    }

    pub fn priority_color(&self, priority: TaskPriority) -> Color {
        match priority {
            TaskPriority::Critical => self.critical,
            TaskPriority::High => self.high,
            TaskPriority::Medium => self.medium,
            TaskPriority::Low => self.low,
            TaskPriority::Trivial => self.trivial,
        }
    }
}

fn parse_color(value: &str) -> Option<Color> {
    match value.to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "lightred" => Some(Color::LightRed),
        "lightgreen" => Some(Color::LightGreen),
        "lightyellow" => Some(Color::LightYellow),
        "lightblue" => Some(Color::LightBlue),
        "lightmagenta" => Some(Color::LightMagenta),
        "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        hex if hex.starts_with('#') => {
            let hex = &hex[1..];
            if hex.len() != 6 {
                return None;
            }
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_base() {
        let mut cfg = ThemeConfig::default();
        cfg.overrides.insert("critical".to_string(), "#ff00ff".to_string());
        let theme = Theme::from_config(&cfg);
        assert_eq!(theme.critical, Color::Rgb(255, 0, 255));
        assert_eq!(theme.high, Theme::default_dark().high);
    }

    #[test]
    fn unknown_override_value_is_ignored() {
        let mut cfg = ThemeConfig::default();
        cfg.overrides.insert("critical".to_string(), "not-a-color".to_string());
        let theme = Theme::from_config(&cfg);
        assert_eq!(theme.critical, Theme::default_dark().critical);
    }
}
