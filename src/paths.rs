// ============================================================================
// Application Paths
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub const APP_DIR_NAME: &str = "WallSwap";

/// Locations of everything WallSwap keeps on disk.
///
/// Config, history and log live side by side in the user config directory;
/// downloaded images go into a `Cache` folder below it.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub config_file: PathBuf,
    pub history_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    /// Resolve paths under the platform config directory (AppData on Windows).
    pub fn from_system() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or(AppError::NoConfigDir)?;
        Ok(Self::under(config_dir.join(APP_DIR_NAME)))
    }

    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        AppPaths {
            cache_dir: root.join("Cache"),
            config_file: root.join("config.json"),
            history_file: root.join("history.json"),
            log_file: root.join("wallswap.log"),
            root,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }

    /// Cache path for a wallpaper downloaded at `timestamp` (Unix seconds).
    /// Two downloads in the same second map to the same file.
    pub fn cache_file_for(&self, timestamp: i64) -> PathBuf {
        self.cache_dir.join(format!("wallpaper_{}.jpg", timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let paths = AppPaths::under("/tmp/ws");
        assert_eq!(paths.config_file, PathBuf::from("/tmp/ws/config.json"));
        assert_eq!(paths.history_file, PathBuf::from("/tmp/ws/history.json"));
        assert_eq!(paths.cache_dir, PathBuf::from("/tmp/ws/Cache"));
    }

    #[test]
    fn test_cache_file_name_uses_timestamp() {
        let paths = AppPaths::under("/tmp/ws");
        assert_eq!(
            paths.cache_file_for(1_700_000_000),
            PathBuf::from("/tmp/ws/Cache/wallpaper_1700000000.jpg")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::under(tmp.path().join("app"));
        paths.ensure_dirs().unwrap();
        assert!(paths.cache_dir.is_dir());
    }
}
