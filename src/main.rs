// WallSwap: random desktop wallpapers from wallpaperscraft with a
// key-driven history you can step back through.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod desktop;
mod downloader;
mod error;
mod history;
mod keys;
mod paths;
mod prompt;
mod provider;
mod session;

use config::ConfigStore;
use console::{enable_ansi_support, Console};
use desktop::SystemDesktop;
use downloader::HttpDownloader;
use error::{AppError, Result};
use history::HistoryStore;
use keys::{KeyBindings, TerminalKeys, DEFAULT_BINDINGS};
use paths::AppPaths;
use prompt::StdinPrompter;
use provider::{http_client, WallpapersCraft};
use session::{Collaborators, Launch, Session};

const LOG_ENV: &str = "WALLSWAP_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "wallswap",
    version,
    about = "Random wallpapers from wallpaperscraft, one key press at a time"
)]
struct Cli {
    /// Category number to start with (0 exits straight away)
    #[arg(allow_negative_numbers = true)]
    choice: Option<String>,

    /// Print the available categories and exit
    #[arg(short = 'c', long = "categories", visible_alias = "list")]
    categories: bool,
}

impl Cli {
    fn launch(self) -> Launch {
        if self.categories {
            return Launch::ListCategories;
        }
        match self.choice {
            Some(choice) => Launch::Preselect(choice),
            None => Launch::Interactive,
        }
    }
}

// ============================================================================
// Logging
// ============================================================================
fn init_logging(log_file: &Path) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        // No log file, so only errors go to stderr
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("error"))
            .with_writer(std::io::stderr)
            .init(),
    }
}

// ============================================================================
// Interrupt Handling
// ============================================================================
fn report_interrupt(console: &Console) {
    let _ = crossterm::terminal::disable_raw_mode();
    console.blank();
    console.info("Interrupted, bye!");
}

/// Ctrl+C outside raw mode (prompts, network fetches) arrives as SIGINT.
fn install_interrupt_handler(console: Console) {
    let installed = ctrlc::set_handler(move || {
        report_interrupt(&console);
        error!("interrupted by signal");
        std::process::exit(AppError::Interrupted.exit_code());
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install Ctrl+C handler");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================
fn main() {
    enable_ansi_support();

    let cli = Cli::parse();
    let console = Console::stdout();

    if let Err(e) = run(cli, &console) {
        match e {
            AppError::Interrupted => report_interrupt(&console),
            ref other => console.error(&other.to_string()),
        }
        error!(error = %e, "exiting with code {}", e.exit_code());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli, console: &Console) -> Result<()> {
    let paths = AppPaths::from_system()?;
    paths.ensure_dirs()?;
    init_logging(&paths.log_file);
    info!(version = env!("CARGO_PKG_VERSION"), root = %paths.root.display(), "starting");
    install_interrupt_handler(console.clone());

    let mut prompter = StdinPrompter::new(console.clone());
    let config = ConfigStore::open(&paths.config_file, console.clone(), &mut prompter)?;
    let history = HistoryStore::load(&paths.history_file)?;

    let client = http_client()?;
    let bindings = KeyBindings::new(DEFAULT_BINDINGS)?;

    let io = Collaborators {
        provider: Box::new(WallpapersCraft::new(client.clone(), console.clone())),
        downloader: Box::new(HttpDownloader::new(client, console.clone())),
        desktop: Box::new(SystemDesktop),
        actions: Box::new(TerminalKeys::new(bindings.clone(), console.clone())),
        prompter: Box::new(prompter),
    };

    let mut session = Session::new(console.clone(), io, config, history, paths, bindings);
    session.launch(cli.launch())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_modes() {
        let cli = Cli::try_parse_from(["wallswap"]).unwrap();
        assert_eq!(cli.launch(), Launch::Interactive);

        let cli = Cli::try_parse_from(["wallswap", "3"]).unwrap();
        assert_eq!(cli.launch(), Launch::Preselect("3".to_string()));

        for flag in ["-c", "--categories", "--list"] {
            let cli = Cli::try_parse_from(["wallswap", flag]).unwrap();
            assert_eq!(cli.launch(), Launch::ListCategories);
        }
    }

    #[test]
    fn test_interrupt_report_and_exit_code() {
        let (console, out) = Console::capture();
        report_interrupt(&console);
        assert!(out.text().contains("Interrupted, bye!"));
        assert_eq!(AppError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_negative_choice_reaches_validation() {
        let cli = Cli::try_parse_from(["wallswap", "-4"]).unwrap();
        assert_eq!(cli.launch(), Launch::Preselect("-4".to_string()));
    }
}
