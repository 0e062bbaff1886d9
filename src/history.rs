// ============================================================================
// Wallpaper History
// ============================================================================
// Persisted as a JSON array, oldest first, rewritten in full on every change:
//   [ { "url": "...", "local_path": "...", "category": "..." }, ... ]

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "url")]
    pub source_url: String,
    pub local_path: PathBuf,
    #[serde(rename = "category")]
    pub category_name: String,
}

impl HistoryEntry {
    pub fn new(source_url: impl Into<String>, local_path: impl Into<PathBuf>, category_name: impl Into<String>) -> Self {
        HistoryEntry {
            source_url: source_url.into(),
            local_path: local_path.into(),
            category_name: category_name.into(),
        }
    }
}

/// What `HistoryStore::add` did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended; the entry now sits at this index.
    Added(usize),
    /// An entry with the same source URL already exists at this index.
    Duplicate(usize),
}

/// Ordered, size-bounded wallpaper history. Sole writer of the history file.
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Read the history file. A missing file is an empty history; a file that
    /// cannot be read or parsed is `HistoryCorrupt`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(HistoryStore { path, entries: Vec::new() });
        }

        let content = fs::read_to_string(&path).map_err(|e| AppError::HistoryCorrupt(e.to_string()))?;
        let entries: Vec<HistoryEntry> =
            serde_json::from_str(&content).map_err(|e| AppError::HistoryCorrupt(e.to_string()))?;

        info!(count = entries.len(), "history loaded");
        Ok(HistoryStore { path, entries })
    }

    pub fn get(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position_of(&self, source_url: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.source_url == source_url)
    }

    /// Append `entry` unless its source URL is already known, evicting the
    /// oldest entries so the history fits `config.max_items`.
    pub fn add(&mut self, entry: HistoryEntry, config: &AppConfig) -> Result<AddOutcome> {
        if let Some(index) = self.position_of(&entry.source_url) {
            info!(url = %entry.source_url, "entry already in history");
            return Ok(AddOutcome::Duplicate(index));
        }

        info!(url = %entry.source_url, "history entry added");
        self.entries.push(entry);
        self.save(config)?;
        Ok(AddOutcome::Added(self.entries.len() - 1))
    }

    /// Point the entry at `index` to a new cached file and persist it.
    /// The previous file is removed when it differs.
    pub fn relocate(&mut self, index: usize, local_path: PathBuf, config: &AppConfig) -> Result<()> {
        let Some(entry) = self.entries.get_mut(index) else {
            return Ok(());
        };
        if entry.local_path != local_path {
            let old_path = std::mem::replace(&mut entry.local_path, local_path);
            info!(url = %entry.source_url, "history entry moved to a new cached file");
            remove_cached_file(&HistoryEntry { local_path: old_path, ..entry.clone() });
        }
        self.save(config)
    }

    /// Delete every cached file and empty the history.
    pub fn clear(&mut self, config: &AppConfig) -> Result<()> {
        if self.entries.is_empty() {
            info!("history already empty");
        }
        for entry in self.entries.drain(..) {
            remove_cached_file(&entry);
        }
        self.save(config)
    }

    /// Trim to the current limit (FIFO) and rewrite the file.
    fn save(&mut self, config: &AppConfig) -> Result<()> {
        let limit = config.max_items.max(1);
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            for evicted in self.entries.drain(..excess) {
                info!(url = %evicted.source_url, "evicting oldest history entry");
                remove_cached_file(&evicted);
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "history saved");
        Ok(())
    }
}

fn remove_cached_file(entry: &HistoryEntry) {
    if entry.local_path.as_os_str().is_empty() {
        return;
    }
    match fs::remove_file(&entry.local_path) {
        Ok(()) => info!(path = %entry.local_path.display(), "removed cached wallpaper"),
        Err(e) => warn!(path = %entry.local_path.display(), error = %e, "could not remove cached wallpaper"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        tmp: tempfile::TempDir,
        store: HistoryStore,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let store = HistoryStore::load(tmp.path().join("history.json")).unwrap();
            Fixture { tmp, store }
        }

        /// An entry whose cached file really exists.
        fn entry(&self, name: &str) -> HistoryEntry {
            let path = self.tmp.path().join(format!("{}.jpg", name));
            fs::write(&path, b"jpeg").unwrap();
            HistoryEntry::new(format!("https://img/{}", name), path, "Nature")
        }
    }

    fn limit(max_items: usize) -> AppConfig {
        AppConfig { max_items, ..AppConfig::default() }
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let fx = Fixture::new();
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_eviction_is_fifo_and_deletes_file() {
        let mut fx = Fixture::new();
        let (e1, e2, e3) = (fx.entry("e1"), fx.entry("e2"), fx.entry("e3"));
        let config = limit(2);

        fx.store.add(e1.clone(), &config).unwrap();
        fx.store.add(e2.clone(), &config).unwrap();
        let outcome = fx.store.add(e3.clone(), &config).unwrap();

        assert_eq!(outcome, AddOutcome::Added(1));
        assert_eq!(fx.store.get(), &[e2.clone(), e3.clone()]);
        assert!(!e1.local_path.exists());
        assert!(e2.local_path.exists());
    }

    #[test]
    fn test_duplicate_url_is_rejected() {
        let mut fx = Fixture::new();
        let e1 = fx.entry("u1");
        let config = limit(5);

        fx.store.add(e1.clone(), &config).unwrap();
        let again = HistoryEntry::new(e1.source_url.clone(), "/elsewhere.jpg", "Cars");
        let outcome = fx.store.add(again, &config).unwrap();

        assert_eq!(outcome, AddOutcome::Duplicate(0));
        assert_eq!(fx.store.get(), &[e1]);
    }

    #[test]
    fn test_length_never_exceeds_limit() {
        let mut fx = Fixture::new();
        let config = limit(3);
        for i in 0..10 {
            let entry = fx.entry(&format!("w{}", i));
            fx.store.add(entry, &config).unwrap();
            assert!(fx.store.len() <= 3);
        }
        assert_eq!(fx.store.get()[0].source_url, "https://img/w7");
    }

    #[test]
    fn test_lowered_limit_evicts_several_on_next_add() {
        let mut fx = Fixture::new();
        let entries: Vec<_> = (0..4).map(|i| fx.entry(&format!("w{}", i))).collect();
        for entry in &entries {
            fx.store.add(entry.clone(), &limit(10)).unwrap();
        }

        let newest = fx.entry("new");
        fx.store.add(newest.clone(), &limit(2)).unwrap();

        assert_eq!(fx.store.get(), &[entries[3].clone(), newest]);
        assert!(!entries[0].local_path.exists());
        assert!(!entries[2].local_path.exists());
    }

    #[test]
    fn test_missing_cached_file_does_not_block_eviction() {
        let mut fx = Fixture::new();
        let ghost = HistoryEntry::new("https://img/ghost", fx.tmp.path().join("gone.jpg"), "Space");
        let config = limit(1);
        fx.store.add(ghost, &config).unwrap();

        let real = fx.entry("real");
        fx.store.add(real.clone(), &config).unwrap();
        assert_eq!(fx.store.get(), &[real]);
    }

    #[test]
    fn test_relocate_tracks_new_file_and_drops_old_one() {
        let mut fx = Fixture::new();
        let (e1, e2) = (fx.entry("e1"), fx.entry("e2"));
        let config = limit(5);
        fx.store.add(e1.clone(), &config).unwrap();
        fx.store.add(e2.clone(), &config).unwrap();

        let fresh = fx.tmp.path().join("fresh.jpg");
        fs::write(&fresh, b"jpeg").unwrap();
        fx.store.relocate(0, fresh.clone(), &config).unwrap();

        assert_eq!(fx.store.get()[0].local_path, fresh);
        assert_eq!(fx.store.get()[0].source_url, e1.source_url);
        assert!(!e1.local_path.exists());
        assert!(e2.local_path.exists());

        let reloaded = HistoryStore::load(fx.tmp.path().join("history.json")).unwrap();
        assert_eq!(reloaded.get()[0].local_path, fresh);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut fx = Fixture::new();
        let (a, b) = (fx.entry("a"), fx.entry("b"));
        let config = limit(5);
        fx.store.add(a.clone(), &config).unwrap();
        fx.store.add(b.clone(), &config).unwrap();

        fx.store.clear(&config).unwrap();

        assert!(fx.store.is_empty());
        assert!(!a.local_path.exists());
        assert!(!b.local_path.exists());
        let reloaded = HistoryStore::load(fx.tmp.path().join("history.json")).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_save_then_load_reproduces_entries() {
        let mut fx = Fixture::new();
        let config = limit(5);
        let (a, b) = (fx.entry("a"), fx.entry("b"));
        fx.store.add(a.clone(), &config).unwrap();
        fx.store.add(b.clone(), &config).unwrap();

        let reloaded = HistoryStore::load(fx.tmp.path().join("history.json")).unwrap();
        assert_eq!(reloaded.get(), &[a, b]);
    }

    #[test]
    fn test_file_uses_url_local_path_category_keys() {
        let mut fx = Fixture::new();
        let entry = fx.entry("a");
        fx.store.add(entry, &limit(5)).unwrap();

        let raw = fs::read_to_string(fx.tmp.path().join("history.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &value[0];
        assert_eq!(first["url"], "https://img/a");
        assert_eq!(first["category"], "Nature");
        assert!(first["local_path"].is_string());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(HistoryStore::load(&path), Err(AppError::HistoryCorrupt(_))));

        fs::write(&path, r#"[{"url": "x"}]"#).unwrap();
        assert!(matches!(HistoryStore::load(&path), Err(AppError::HistoryCorrupt(_))));
    }
}
