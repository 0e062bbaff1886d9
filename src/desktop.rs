// ============================================================================
// Desktop Wallpaper Setter
// ============================================================================

use std::path::{Path, PathBuf};
use std::thread;

use tracing::{info, warn};

use crate::error::{AppError, Result};

#[cfg(target_os = "windows")]
use windows::{core::*, Win32::System::Com::*, Win32::UI::Shell::*};

/// Changes the desktop background.
///
/// `set_wallpaper` returns at once. The OS call runs detached and is never
/// joined: it happens at most once, nobody waits for it, and a failure is
/// only logged. The process may exit before it finishes.
pub trait DesktopSetter {
    fn set_wallpaper(&self, path: &Path);
}

pub struct SystemDesktop;

impl DesktopSetter for SystemDesktop {
    fn set_wallpaper(&self, path: &Path) {
        let path: PathBuf = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name("wallpaper-set".to_string())
            .spawn(move || match apply_wallpaper(&path) {
                Ok(()) => info!(path = %path.display(), "desktop wallpaper set"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to set desktop wallpaper"),
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not start wallpaper thread");
        }
    }
}

fn apply_wallpaper(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(AppError::Wallpaper(format!("file not found: {}", path.display())));
    }
    set_wallpaper_native(path)
}

// ============================================================================
// Windows: IDesktopWallpaper (no admin rights needed)
// ============================================================================
#[cfg(target_os = "windows")]
fn set_wallpaper_native(image_path: &Path) -> Result<()> {
    let to_err = |e: windows::core::Error| AppError::Wallpaper(e.to_string());

    unsafe {
        let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);

        let result = (|| -> Result<()> {
            let desktop_wallpaper: IDesktopWallpaper =
                CoCreateInstance(&DesktopWallpaper, None, CLSCTX_LOCAL_SERVER).map_err(to_err)?;

            let path_wide: Vec<u16> = image_path
                .to_str()
                .ok_or_else(|| AppError::Wallpaper("path is not valid UTF-8".to_string()))?
                .encode_utf16()
                .chain(std::iter::once(0))
                .collect();

            desktop_wallpaper
                .SetWallpaper(None, PCWSTR::from_raw(path_wide.as_ptr()))
                .map_err(to_err)
        })();

        CoUninitialize();
        result
    }
}

#[cfg(not(target_os = "windows"))]
fn set_wallpaper_native(image_path: &Path) -> Result<()> {
    let path = image_path
        .to_str()
        .ok_or_else(|| AppError::Wallpaper("path is not valid UTF-8".to_string()))?;
    wallpaper::set_from_path(path).map_err(|e| AppError::Wallpaper(e.to_string()))
}

// ============================================================================
// Recording setter for tests
// ============================================================================
#[cfg(test)]
#[derive(Default, Clone)]
pub struct RecordingDesktop {
    pub applied: std::rc::Rc<std::cell::RefCell<Vec<PathBuf>>>,
}

#[cfg(test)]
impl DesktopSetter for RecordingDesktop {
    fn set_wallpaper(&self, path: &Path) {
        self.applied.borrow_mut().push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_rejected_before_os_call() {
        let err = apply_wallpaper(Path::new("/definitely/not/here.jpg")).unwrap_err();
        assert!(matches!(err, AppError::Wallpaper(_)));
    }
}
