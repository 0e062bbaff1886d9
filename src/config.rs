// ============================================================================
// Configuration
// ============================================================================
// Stored as a single JSON object, rewritten in full on every change:
//   { "version": 1, "max_items": 50 }

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::console::Console;
use crate::error::{AppError, Result};
use crate::prompt::Prompter;

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_MAX_ITEMS: usize = 50;
pub const MIN_MAX_ITEMS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    /// Upper bound on history entries (and cached images).
    pub max_items: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            version: CONFIG_VERSION,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl AppConfig {
    /// Build a config from whatever fields `map` carries. Missing or
    /// mistyped fields fall back to their defaults, unknown ones are ignored.
    pub fn merge_from(map: &Map<String, Value>) -> Self {
        let defaults = AppConfig::default();

        let max_items = match map.get("max_items") {
            None => defaults.max_items,
            Some(value) => match value.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) if n >= MIN_MAX_ITEMS => n,
                _ => {
                    warn!(?value, "max_items is invalid, using default");
                    defaults.max_items
                }
            },
        };

        let version = map
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);

        AppConfig { version, max_items }
    }
}

/// Sole owner and mutator of the config file.
pub struct ConfigStore {
    path: PathBuf,
    config: AppConfig,
    console: Console,
}

impl ConfigStore {
    /// Load the config at `path`, or create it interactively if absent.
    ///
    /// A file that exists but is not a JSON object is `ConfigCorrupt`.
    pub fn open(path: impl AsRef<Path>, console: Console, prompter: &mut dyn Prompter) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            warn!(path = %path.display(), "config file not found, creating default");
            let mut store = ConfigStore {
                path,
                config: AppConfig::default(),
                console,
            };
            store.save()?;
            store.create_interactive(prompter)?;
            return Ok(store);
        }

        let content = fs::read_to_string(&path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| AppError::ConfigCorrupt(e.to_string()))?;
        let map = value
            .as_object()
            .ok_or_else(|| AppError::ConfigCorrupt("expected a JSON object".to_string()))?;

        let mut config = AppConfig::merge_from(map);
        let outdated = config.version < CONFIG_VERSION;
        config.version = CONFIG_VERSION;

        let store = ConfigStore { path, config, console };
        if outdated {
            info!("upgrading config file to version {}", CONFIG_VERSION);
            store.save()?;
        }
        Ok(store)
    }

    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    pub fn set_max_items(&mut self, max_items: usize) -> Result<()> {
        self.config.max_items = max_items.max(MIN_MAX_ITEMS);
        self.save()
    }

    fn create_interactive(&mut self, prompter: &mut dyn Prompter) -> Result<()> {
        self.console.banner("Initial Configuration");
        let max_items = prompter.ask_number(
            "Maximum number of history entries",
            DEFAULT_MAX_ITEMS,
            MIN_MAX_ITEMS,
        )?;
        self.set_max_items(max_items)?;
        self.console.success("Config created and saved");
        Ok(())
    }

    /// Numbered menu of editable fields, then a prompt for the new value.
    pub fn edit_interactive(&mut self, prompter: &mut dyn Prompter) -> Result<()> {
        let options = ["Maximum number of history entries"];

        let rows: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}) {}", i + 1, label))
            .collect();
        self.console.blank();
        self.console.panel("Edit Configuration", &rows);

        loop {
            let choice = prompter.ask("Enter the number of the setting to edit")?;
            match choice.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => break,
                _ => self.console.error("Invalid setting number"),
            }
        }

        let current = self.config.max_items;
        let new_value = prompter.ask_number(
            &format!("{} (current: {})", options[0], current),
            current,
            MIN_MAX_ITEMS,
        )?;
        self.set_max_items(new_value)?;

        self.console.blank();
        self.console
            .success(&format!("{} updated to {}", options[0], self.config.max_items));
        Ok(())
    }
}
