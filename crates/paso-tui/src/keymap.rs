//! Resolves a raw key event to an abstract `Action` via the user's
//! configurable key map (`paso_core::config`).

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use paso_core::config::{Action, Config};

pub struct Keymap {
    bindings: HashMap<String, Action>,
}

impl Keymap {
    pub fn from_config(config: &Config) -> Self {
        let mut bindings = HashMap::new();
        for action in ALL_ACTIONS {
            bindings.insert(config.key_for(*action).to_string(), *action);
        }
        Keymap { bindings }
    }

    pub fn resolve(&self, key: KeyEvent) -> Option<Action> {
        self.bindings.get(&canonical(key)).copied()
    }
}

const ALL_ACTIONS: &[Action] = &[
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
];

/// Renders a key event the same way `Action::default_key` names it, so the
/// default bindings resolve without requiring a config file on disk.
fn canonical(key: KeyEvent) -> String {
    let named = match key.code {
        KeyCode::Up => Some("Up"),
        KeyCode::Down => Some("Down"),
        KeyCode::Left => Some("Left"),
        KeyCode::Right => Some("Right"),
        KeyCode::Enter => Some("Enter"),
        KeyCode::Esc => Some("Esc"),
        KeyCode::Tab => Some("Tab"),
        KeyCode::BackTab => Some("BackTab"),
        KeyCode::Backspace => Some("Backspace"),
        KeyCode::Delete => Some("Delete"),
        _ => None,
    };
    if let Some(name) = named {
        return name.to_string();
    }
    if let KeyCode::Char(c) = key.code {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return format!("ctrl-{c}");
        }
        return c.to_string();
    }
    format!("{:?}", key.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn default_bindings_resolve() {
        let keymap = Keymap::from_config(&Config::default());
        assert_eq!(keymap.resolve(key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(keymap.resolve(key(KeyCode::Char('j'))), Some(Action::MoveDown));
        assert_eq!(keymap.resolve(key(KeyCode::Enter)), Some(Action::OpenDetail));
    }

    #[test]
    fn unbound_key_resolves_to_none() {
        let keymap = Keymap::from_config(&Config::default());
        assert_eq!(keymap.resolve(key(KeyCode::Char('z'))), None);
        let _ = KeyEventKind::Press;
    }

    #[test]
    fn custom_mapping_overrides_default() {
        let mut cfg = Config::default();
        cfg.key_mappings.insert(Action::Quit, "ctrl-c".to_string());
        let keymap = Keymap::from_config(&cfg);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(keymap.resolve(ctrl_c), Some(Action::Quit));
        assert_eq!(keymap.resolve(key(KeyCode::Char('q'))), None);
    }
}
