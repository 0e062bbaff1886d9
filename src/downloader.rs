// ============================================================================
// Image Downloader
// ============================================================================

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use reqwest::blocking::Client;
use tracing::{error, info};

use crate::console::Console;
use crate::error::{AppError, Result};

const CHUNK_SIZE: usize = 8192;
/// Upper bound on the buffer reserved up front from the announced size.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

pub trait Downloader {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

pub struct HttpDownloader {
    client: Client,
    console: Console,
}

impl HttpDownloader {
    pub fn new(client: Client, console: Console) -> Self {
        HttpDownloader { client, console }
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.console.banner("Downloading Wallpaper");

        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            error!(url, %status, "download failed");
            return Err(AppError::HttpStatus(status.as_u16()));
        }

        // Servers that do not announce a size are treated like empty files
        let total_size = response.content_length().unwrap_or(0) as usize;
        if total_size == 0 {
            self.console.error("Empty file or unknown size");
            return Err(AppError::EmptyDownload);
        }

        let buffer = match read_with_progress(response, total_size, |done| {
            self.console.progress(done, total_size, "Downloading", &format_bytes(done));
        }) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.console.clear_progress_line();
                error!(url, error = %e, "download interrupted");
                return Err(e.into());
            }
        };

        // Write only after a complete read so a failed download leaves no file
        fs::write(dest, &buffer)?;
        self.console.clear_progress_line();
        self.console
            .success(&format!("Download complete ({})", format_bytes(buffer.len())));
        info!(url, path = %dest.display(), bytes = buffer.len(), "wallpaper downloaded");
        Ok(buffer.len() as u64)
    }
}

/// Read `reader` to the end in fixed-size chunks, reporting the running total.
/// Fails if the stream ends before `expected` bytes arrive.
pub fn read_with_progress<R: Read>(
    mut reader: R,
    expected: usize,
    mut on_progress: impl FnMut(usize),
) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(expected.min(MAX_PREALLOC));
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                on_progress(buffer.len());
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if buffer.len() < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("received {} of {} bytes", buffer.len(), expected),
        ));
    }
    Ok(buffer)
}

/// Format bytes to human-readable string
pub fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
