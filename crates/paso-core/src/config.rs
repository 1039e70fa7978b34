use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Abstract TUI actions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    SelectNext,
    SelectPrev,
    CreateTask,
    EditTask,
    DeleteTask,
    CreateColumn,
    EditColumn,
    DeleteColumn,
    OpenDetail,
    OpenLabelPicker,
    OpenParentPicker,
    OpenChildPicker,
    OpenPriorityPicker,
    OpenTypePicker,
    ToggleListView,
    Search,
    Help,
    Quit,
    Confirm,
    Cancel,
    MoveTaskNext,
    MoveTaskPrev,
    SwapTaskUp,
    SwapTaskDown,
}

impl Action {
    /// The vi-and-arrow hybrid default binding used when no user config
    /// overrides a given action.
    pub fn default_key(&self) -> &'static str {
        match self {
            Action::MoveUp => "k",
            Action::MoveDown => "j",
            Action::MoveLeft => "h",
            Action::MoveRight => "l",
            Action::SelectNext => "Down",
            Action::SelectPrev => "Up",
            Action::CreateTask => "n",
            Action::EditTask => "e",
            Action::DeleteTask => "d",
            Action::CreateColumn => "N",
            Action::EditColumn => "E",
            Action::DeleteColumn => "D",
            Action::OpenDetail => "Enter",
            Action::OpenLabelPicker => "L",
            Action::OpenParentPicker => "p",
            Action::OpenChildPicker => "c",
            Action::OpenPriorityPicker => "P",
            Action::OpenTypePicker => "T",
            Action::ToggleListView => "v",
            Action::Search => "/",
            Action::Help => "?",
            Action::Quit => "q",
            Action::Confirm => "y",
            Action::Cancel => "Esc",
            Action::MoveTaskNext => ">",
            Action::MoveTaskPrev => "<",
            Action::SwapTaskUp => "K",
            Action::SwapTaskDown => "J",
        }
    }
}

fn default_key_mappings() -> HashMap<Action, String> {
    Action::all().iter().map(|a| (*a, a.default_key().to_string())).collect()
}

impl Action {
    fn all() -> &'static [Action] {
        &[
            Action::MoveUp,
            Action::MoveDown,
            Action::MoveLeft,
            Action::MoveRight,
            Action::SelectNext,
            Action::SelectPrev,
            Action::CreateTask,
            Action::EditTask,
            Action::DeleteTask,
            Action::CreateColumn,
            Action::EditColumn,
            Action::DeleteColumn,
            Action::OpenDetail,
            Action::OpenLabelPicker,
            Action::OpenParentPicker,
            Action::OpenChildPicker,
            Action::OpenPriorityPicker,
            Action::OpenTypePicker,
            Action::ToggleListView,
            Action::Search,
            Action::Help,
            Action::Quit,
            Action::Confirm,
            Action::Cancel,
            Action::MoveTaskNext,
            Action::MoveTaskPrev,
            Action::SwapTaskUp,
            Action::SwapTaskDown,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_theme_name")]
    pub name: String,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_theme_name() -> String {
    "default".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig { name: default_theme_name(), overrides: HashMap::new() }
    }
}

/// Top-level configuration loaded from
/// `$XDG_CONFIG_HOME/paso/config.yaml` or `~/.config/paso/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_key_mappings")]
    pub key_mappings: HashMap<Action, String>,
    #[serde(default)]
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config { key_mappings: default_key_mappings(), theme: ThemeConfig::default() }
    }
}

impl Config {
    /// Load config from the standard XDG path, falling back field-by-field
    /// to defaults when the file is absent, unreadable, or only partially
    /// specified. A malformed file never panics — it logs a warning and
    /// falls back entirely to defaults.
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::with_theme_override(Config::default());
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_yaml::from_str::<Config>(&text) {
                Ok(cfg) => Self::with_theme_override(cfg),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse config, using defaults");
                    Self::with_theme_override(Config::default())
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read config, using defaults");
                Self::with_theme_override(Config::default())
            }
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_yaml::from_str(&text).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "failed to parse config, using defaults");
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn default_path() -> PathBuf {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("paso").join("config.yaml");
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("paso")
            .join("config.yaml")
    }

    /// Applies `PASO_THEME_FILE`, if set, on top of the loaded theme: its
    /// keys override the base scheme's palette.
    fn with_theme_override(mut cfg: Config) -> Config {
        if let Ok(theme_path) = std::env::var("PASO_THEME_FILE") {
            match std::fs::read_to_string(&theme_path) {
                Ok(text) => match serde_yaml::from_str::<ThemeConfig>(&text) {
                    Ok(theme_file) => {
                        for (k, v) in theme_file.overrides {
                            cfg.theme.overrides.insert(k, v);
                        }
                        if !theme_file.name.is_empty() {
                            cfg.theme.name = theme_file.name;
                        }
                    }
                    Err(err) => warn!(path = %theme_path, error = %err, "failed to parse PASO_THEME_FILE"),
                },
                Err(err) => warn!(path = %theme_path, error = %err, "failed to read PASO_THEME_FILE"),
            }
        }
        cfg
    }

    pub fn key_for(&self, action: Action) -> &str {
        self.key_mappings
            .get(&action)
            .map(|s| s.as_str())
            .unwrap_or_else(|| action.default_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_all_actions_mapped() {
        let cfg = Config::default();
        assert_eq!(cfg.key_mappings.get(&Action::Quit).unwrap(), "q");
        assert_eq!(cfg.key_for(Action::MoveDown), "j");
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("key_mappings: {}\ntheme: {}\n").unwrap();
        assert_eq!(cfg.key_for(Action::Quit), "q");
    }

    #[test]
    fn load_from_missing_path_is_default() {
        let cfg = Config::load_from("/nonexistent/paso/config.yaml");
        assert_eq!(cfg.theme.name, "default");
    }

    #[test]
    fn partial_override_preserves_other_defaults() {
        let yaml = "key_mappings:\n  quit: \"ctrl-c\"\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.key_for(Action::Quit), "ctrl-c");
        assert_eq!(cfg.key_for(Action::MoveDown), "j");
    }
}
