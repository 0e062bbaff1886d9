// ============================================================================
// Console Output Context
// ============================================================================
// Every component that talks to the user receives a `Console` at construction
// time. Clones share the same sink, so the spinner thread, the downloader and
// the session all write through one handle.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use colored::*;

#[cfg(target_os = "windows")]
use windows::Win32::System::Console::*;

// ============================================================================
// Windows Terminal ANSI Fix
// ============================================================================
#[cfg(target_os = "windows")]
pub fn enable_ansi_support() {
    unsafe {
        if let Ok(handle) = GetStdHandle(STD_OUTPUT_HANDLE) {
            let mut mode: CONSOLE_MODE = CONSOLE_MODE(0);
            if GetConsoleMode(handle, &mut mode).is_ok() {
                let new_mode = mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING;
                SetConsoleMode(handle, new_mode).ok();
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn enable_ansi_support() {}

// ============================================================================
// Windows Version Detection (Braille spinner needs Windows 11 fonts)
// ============================================================================
#[cfg(target_os = "windows")]
fn is_windows_11_or_greater() -> bool {
    use std::process::Command;

    // Windows 11 is build 22000 or greater
    if let Ok(output) = Command::new("cmd")
        .args(["/C", "reg query \"HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\" /v CurrentBuild"])
        .output()
    {
        if let Ok(output_str) = String::from_utf8(output.stdout) {
            if let Some(build_line) = output_str.lines().find(|line| line.contains("CurrentBuild")) {
                if let Some(build_str) = build_line.split_whitespace().last() {
                    if let Ok(build_num) = build_str.parse::<u32>() {
                        return build_num >= 22000;
                    }
                }
            }
        }
    }

    true
}

#[cfg(not(target_os = "windows"))]
fn is_windows_11_or_greater() -> bool {
    true
}

fn spinner_frames() -> Vec<char> {
    if is_windows_11_or_greater() {
        vec!['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏']
    } else {
        vec!['|', '/', '-', '\\']
    }
}

const BOX_WIDTH: usize = 40;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
pub struct Console {
    sink: Sink,
    /// Animations and screen clearing only make sense on a real terminal.
    live: bool,
}

impl Console {
    pub fn stdout() -> Self {
        Console {
            sink: Arc::new(Mutex::new(Box::new(io::stdout()))),
            live: true,
        }
    }

    fn write_raw(&self, text: &str) {
        if let Ok(mut out) = self.sink.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    pub fn line(&self, text: impl Display) {
        self.write_raw(&format!("{}\n", text));
    }

    pub fn blank(&self) {
        self.write_raw("\n");
    }

    /// Print without a trailing newline (prompts, "key pressed" echoes).
    pub fn inline(&self, text: impl Display) {
        self.write_raw(&text.to_string());
    }

    // Helper function to center text in box headers
    pub fn center_text(text: &str, width: usize) -> String {
        let text_len = text.chars().count();
        if text_len >= width {
            return text.to_string();
        }
        let padding = width - text_len;
        let left_pad = padding / 2;
        let right_pad = padding - left_pad;
        format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
    }

    pub fn banner(&self, title: &str) {
        let border = format!("+{}+", "-".repeat(BOX_WIDTH + 2));
        self.blank();
        self.line(border.cyan());
        self.line(format!("| {} |", Self::center_text(title, BOX_WIDTH)).cyan().bold());
        self.line(border.cyan());
        self.blank();
    }

    /// A titled box of pre-formatted rows (help, info, config menu).
    pub fn panel(&self, title: &str, rows: &[String]) {
        let border = format!("+{}+", "-".repeat(BOX_WIDTH + 2));
        self.line(border.bright_blue());
        self.line(format!("| {} |", Self::center_text(title, BOX_WIDTH)).bright_blue().bold());
        self.line(border.bright_blue());
        for row in rows {
            self.line(format!("  {}", row));
        }
        self.line(border.bright_blue());
    }

    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message.green()));
    }

    pub fn error(&self, message: &str) {
        self.line(format!("{} {}", "[ ERROR ]".red(), message.red()));
    }

    pub fn info(&self, message: &str) {
        self.line(format!("{} {}", "[ INFO ]".cyan(), message.cyan()));
    }

    pub fn clear_screen(&self) {
        if !self.live {
            return;
        }
        let mut out = io::stdout();
        let _ = crossterm::execute!(
            out,
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        );
    }

    /// Print a progress bar: ⠋ [----      ] 40% suffix
    pub fn progress(&self, current: usize, total: usize, prefix: &str, suffix: &str) {
        if !self.live || total == 0 {
            return;
        }
        let frames = spinner_frames();
        let spinner = frames[(current / 8192) % frames.len()];

        let ratio = (current as f64 / total as f64).min(1.0);
        let percent = (ratio * 100.0) as u32;
        let bar_width = 30;
        let filled = (ratio * bar_width as f64) as usize;
        let bar = "-".repeat(filled) + &" ".repeat(bar_width - filled);

        self.inline(format!(
            "\r{} {} [{}] {}% {}",
            spinner.to_string().cyan(),
            prefix.cyan(),
            bar,
            percent.to_string().bright_green(),
            suffix
        ));
    }

    pub fn clear_progress_line(&self) {
        if self.live {
            self.inline(format!("\r{}\r", " ".repeat(100)));
        }
    }

    /// Start an animated spinner that runs until the returned guard is
    /// stopped or dropped.
    pub fn spinner(&self, message: &str) -> Spinner {
        let mut spinner = Spinner {
            console: self.clone(),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        };
        if self.live {
            spinner.start(message);
        }
        spinner
    }
}

// ============================================================================
// Runtime-style Loader
// ============================================================================
pub struct Spinner {
    console: Console,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Spinner {
    fn start(&mut self, message: &str) {
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Relaxed);

        let msg = message.to_string();
        let console = self.console.clone();
        let frames = spinner_frames();
        let start_time = Instant::now();

        self.handle = Some(thread::spawn(move || {
            let mut i = 0;
            while running.load(Ordering::Relaxed) {
                let frame = frames[i % frames.len()];
                console.inline(format!(
                    "\r{} {}... {:.1}s",
                    frame.to_string().cyan(),
                    msg.cyan(),
                    start_time.elapsed().as_secs_f64()
                ));
                thread::sleep(Duration::from_millis(100));
                i += 1;
            }
            console.inline(format!("\r{}\r", " ".repeat(80)));
        }));
    }

    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::Relaxed) {
            if let Some(handle) = self.handle.take() {
                handle.join().ok();
            }
        }
    }

    pub fn complete(&mut self, message: &str) {
        self.stop();
        self.console.success(message);
    }

    pub fn fail(&mut self, message: &str) {
        self.stop();
        self.console.error(message);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Capturing console for tests
// ============================================================================
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl Console {
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let console = Console {
            sink: Arc::new(Mutex::new(Box::new(captured.clone()))),
            live: false,
        };
        (console, captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_text_pads_both_sides() {
        assert_eq!(Console::center_text("ab", 6), "  ab  ");
        assert_eq!(Console::center_text("abc", 6), " abc  ");
        assert_eq!(Console::center_text("too long", 4), "too long");
    }

    #[test]
    fn test_captured_output() {
        let (console, out) = Console::capture();
        console.banner("Hello");
        console.error("broken");
        let text = out.text();
        assert!(text.contains("Hello"));
        assert!(text.contains("[ ERROR ]"));
        assert!(text.contains("broken"));
    }

    #[test]
    fn test_spinner_is_silent_when_captured() {
        let (console, out) = Console::capture();
        let mut spinner = console.spinner("Working");
        spinner.complete("Done");
        let text = out.text();
        assert!(!text.contains("Working"));
        assert!(text.contains("Done"));
    }
}
