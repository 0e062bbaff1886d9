// ============================================================================
// Key Bindings
// ============================================================================

use std::collections::HashSet;

use colored::*;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use strum::{EnumIter, IntoEnumIterator};
use tracing::debug;

use crate::console::Console;
use crate::error::{AppError, Result};

/// Everything the user can do from the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Action {
    Next,
    Previous,
    Exit,
    Help,
    ChangeCategory,
    Info,
    ClearHistory,
    EditConfig,
}

impl Action {
    pub fn description(self) -> &'static str {
        match self {
            Action::Next => "Load the next wallpaper",
            Action::Previous => "Go back to the previous wallpaper",
            Action::Exit => "Quit",
            Action::Help => "Show this help",
            Action::ChangeCategory => "Change the wallpaper category",
            Action::Info => "Show info about the current wallpaper",
            Action::ClearHistory => "Delete the wallpaper history",
            Action::EditConfig => "Edit the configuration",
        }
    }
}

pub const DEFAULT_BINDINGS: &[(KeyCode, Action)] = &[
    (KeyCode::Char(' '), Action::Next),
    (KeyCode::Backspace, Action::Previous),
    (KeyCode::Esc, Action::Exit),
    (KeyCode::Char('h'), Action::Help),
    (KeyCode::Char('c'), Action::ChangeCategory),
    (KeyCode::Char('i'), Action::Info),
    (KeyCode::Char('d'), Action::ClearHistory),
    (KeyCode::Char('s'), Action::EditConfig),
];

/// A key table in which every action has exactly one key.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    table: Vec<(KeyCode, Action)>,
}

impl KeyBindings {
    pub fn new(table: &[(KeyCode, Action)]) -> Result<Self> {
        let mut keys = HashSet::new();
        for (key, action) in table {
            if !keys.insert(*key) {
                return Err(AppError::KeyBindings(format!(
                    "key {} is bound more than once (again for {:?})",
                    key_label(*key),
                    action
                )));
            }
        }

        for action in Action::iter() {
            let bound = table.iter().filter(|(_, a)| *a == action).count();
            if bound != 1 {
                return Err(AppError::KeyBindings(format!(
                    "{:?} has {} keys, expected exactly one",
                    action, bound
                )));
            }
        }

        Ok(KeyBindings { table: table.to_vec() })
    }

    pub fn lookup(&self, key: KeyCode) -> Option<Action> {
        let key = match key {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        self.table.iter().find(|(k, _)| *k == key).map(|(_, a)| *a)
    }

    pub fn key_for(&self, action: Action) -> Option<KeyCode> {
        self.table.iter().find(|(_, a)| *a == action).map(|(k, _)| *k)
    }

    /// One line per action, in table order, for the help panel.
    pub fn help_rows(&self) -> Vec<String> {
        self.table
            .iter()
            .map(|(key, action)| {
                let label = format!("{:<10}", key_label(*key));
                format!("{} {}", label.yellow().bold(), action.description())
            })
            .collect()
    }
}

pub fn key_label(key: KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        other => format!("{:?}", other),
    }
}

/// Blocking source of the next user action.
pub trait ActionSource {
    fn next_action(&mut self) -> Result<Action>;
}

/// Reads single key presses from the terminal in raw mode.
pub struct TerminalKeys {
    bindings: KeyBindings,
    console: Console,
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

impl TerminalKeys {
    pub fn new(bindings: KeyBindings, console: Console) -> Self {
        TerminalKeys { bindings, console }
    }

    fn wait_for_key(&self) -> Result<(KeyCode, Action)> {
        let _raw = RawMode::enable()?;
        loop {
            let Event::Key(key) = event::read()? else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Err(AppError::Interrupted);
            }
            match self.bindings.lookup(key.code) {
                Some(action) => return Ok((key.code, action)),
                None => debug!(?key, "ignoring unbound key"),
            }
        }
    }
}

impl ActionSource for TerminalKeys {
    fn next_action(&mut self) -> Result<Action> {
        let help = self
            .bindings
            .key_for(Action::Help)
            .map(key_label)
            .unwrap_or_else(|| "?".to_string());
        self.console
            .inline(format!("Press a key ({} for help): ", help).yellow().bold());
        let (key, action) = self.wait_for_key()?;
        self.console
            .line(format!("{} {}", "pressed".yellow(), key_label(key).white().bold()));
        Ok(action)
    }
}

// ============================================================================
// Scripted actions for tests
// ============================================================================
#[cfg(test)]
pub struct ScriptedActions(std::collections::VecDeque<Action>);

#[cfg(test)]
impl ScriptedActions {
    pub fn new(actions: &[Action]) -> Self {
        ScriptedActions(actions.iter().copied().collect())
    }
}

#[cfg(test)]
impl ActionSource for ScriptedActions {
    fn next_action(&mut self) -> Result<Action> {
        self.0.pop_front().ok_or(AppError::Interrupted)
    }
}
