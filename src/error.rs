// ============================================================================
// Error Types
// ============================================================================

use thiserror::Error;

/// Everything that can go wrong inside WallSwap.
///
/// Fatal conditions (`NoCategoriesFound`, `HistoryCorrupt`, `ConfigCorrupt`)
/// bubble up to `main` and end the process with a non-zero status. Transient
/// failures (HTTP, parse, empty downloads) are caught by the session and turned
/// into a retry prompt.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No categories found")]
    NoCategoriesFound,

    #[error("History file is corrupt: {0}")]
    HistoryCorrupt(String),

    #[error("Config file is corrupt: {0}")]
    ConfigCorrupt(String),

    #[error("Invalid category choice: {0}")]
    InvalidCategory(String),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Key bindings are inconsistent: {0}")]
    KeyBindings(String),

    #[error("Server returned an empty file or unknown size")]
    EmptyDownload,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Could not parse page: {0}")]
    Parse(String),

    #[error("Wallpaper error: {0}")]
    Wallpaper(String),

    #[error("Cannot find the user config directory")]
    NoConfigDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Process exit status for an error that reached `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Interrupted => 130,
            _ => 1,
        }
    }
}
