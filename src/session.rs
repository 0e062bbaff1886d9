// ============================================================================
// Wallpaper Session
// ============================================================================
// The interactive loop: pick a category, then react to single key presses
// (next / previous / info / clear / change category / edit config / exit).
// Everything runs on the calling thread except the desktop OS call, which the
// DesktopSetter fires off detached.

use chrono::Utc;
use colored::*;
use tracing::{error, info, warn};

use crate::config::ConfigStore;
use crate::console::Console;
use crate::desktop::DesktopSetter;
use crate::downloader::Downloader;
use crate::error::{AppError, Result};
use crate::history::{AddOutcome, HistoryEntry, HistoryStore};
use crate::keys::{Action, ActionSource, KeyBindings};
use crate::paths::AppPaths;
use crate::prompt::Prompter;
use crate::provider::{Category, WallpaperProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoCategorySelected,
    CategorySelected,
    AwaitingInput,
    Exiting,
}

/// Result of validating a category number typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    Selected(Category),
    Exit,
}

/// How the process was asked to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Show the category list and ask.
    Interactive,
    /// Print the categories and stop.
    ListCategories,
    /// Category number given on the command line.
    Preselect(String),
}

/// The outside world as seen by the session.
pub struct Collaborators {
    pub provider: Box<dyn WallpaperProvider>,
    pub downloader: Box<dyn Downloader>,
    pub desktop: Box<dyn DesktopSetter>,
    pub actions: Box<dyn ActionSource>,
    pub prompter: Box<dyn Prompter>,
}

pub struct Session {
    console: Console,
    io: Collaborators,
    config: ConfigStore,
    history: HistoryStore,
    paths: AppPaths,
    bindings: KeyBindings,
    clock: Box<dyn FnMut() -> i64>,

    categories: Vec<Category>,
    selected: Option<Category>,
    /// Index into the history of the wallpaper on screen; `None` when there is none.
    cursor: Option<usize>,
    state: SessionState,
}

impl Session {
    pub fn new(
        console: Console,
        io: Collaborators,
        config: ConfigStore,
        history: HistoryStore,
        paths: AppPaths,
        bindings: KeyBindings,
    ) -> Self {
        let cursor = history.len().checked_sub(1);
        Session {
            console,
            io,
            config,
            history,
            paths,
            bindings,
            clock: Box::new(|| Utc::now().timestamp()),
            categories: Vec::new(),
            selected: None,
            cursor,
            state: SessionState::NoCategorySelected,
        }
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Load the category list and select the first one. Without categories
    /// there is nothing to do, so an empty list is fatal.
    pub fn initialize(&mut self) -> Result<()> {
        self.categories = self.load_categories()?;
        self.selected = self.categories.first().cloned();
        self.state = SessionState::CategorySelected;
        Ok(())
    }

    fn load_categories(&self) -> Result<Vec<Category>> {
        let categories = self.io.provider.list_categories().unwrap_or_else(|e| {
            error!(error = %e, "could not load categories");
            Vec::new()
        });
        if categories.is_empty() {
            error!("no categories found");
            return Err(AppError::NoCategoriesFound);
        }
        Ok(categories)
    }

    /// Initialize, honour the launch request, then run the key loop.
    pub fn launch(&mut self, launch: Launch) -> Result<()> {
        self.initialize()?;

        match launch {
            Launch::ListCategories => {
                self.show_categories();
                return Ok(());
            }
            Launch::Interactive => self.choose_category()?,
            Launch::Preselect(arg) => match self.select_category(&arg)? {
                CategoryChoice::Selected(category) => self.announce_category(&category),
                CategoryChoice::Exit => self.farewell(),
            },
        }

        self.run()
    }

    // ========================================================================
    // Category Selection
    // ========================================================================

    pub fn show_categories(&self) {
        self.console.banner("Choose a Category");
        for (i, category) in self.categories.iter().enumerate() {
            self.console.line(format!(
                "{} {} {}",
                format!("{:>3})", i + 1).yellow().bold(),
                category.name.cyan().bold(),
                category.url.dimmed()
            ));
        }
    }

    /// Validate `choice` (`1..=len`, or `0` for exit) and select it.
    /// Anything else is `InvalidCategory` and leaves the state untouched.
    pub fn select_category(&mut self, choice: &str) -> Result<CategoryChoice> {
        let number: usize = choice
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidCategory(choice.to_string()))?;

        if number == 0 {
            self.state = SessionState::Exiting;
            return Ok(CategoryChoice::Exit);
        }

        let category = self
            .categories
            .get(number - 1)
            .cloned()
            .ok_or_else(|| AppError::InvalidCategory(choice.to_string()))?;

        info!(category = %category.name, "category selected");
        self.selected = Some(category.clone());
        self.state = SessionState::CategorySelected;
        Ok(CategoryChoice::Selected(category))
    }

    /// Show the list and prompt until a valid number is entered.
    pub fn choose_category(&mut self) -> Result<()> {
        self.console.clear_screen();
        self.show_categories();

        loop {
            let answer = self
                .io
                .prompter
                .ask(&format!("\nEnter a category number (1-{}) or 0 to exit", self.categories.len()))?;
            match self.select_category(&answer) {
                Ok(CategoryChoice::Selected(category)) => {
                    self.console.clear_screen();
                    self.announce_category(&category);
                    return Ok(());
                }
                Ok(CategoryChoice::Exit) => {
                    self.farewell();
                    return Ok(());
                }
                Err(AppError::InvalidCategory(_)) => {
                    self.console.error("Enter a number from the list");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn announce_category(&self, category: &Category) {
        self.console.success(&format!("Selected category: {}", category.name));
    }

    fn farewell(&mut self) {
        self.state = SessionState::Exiting;
        self.console.blank();
        self.console.success("Goodbye!");
    }

    // ========================================================================
    // Main Loop
    // ========================================================================

    pub fn run(&mut self) -> Result<()> {
        if self.state == SessionState::Exiting {
            return Ok(());
        }
        while self.state != SessionState::Exiting {
            self.state = SessionState::AwaitingInput;
            self.show_help();
            let action = self.io.actions.next_action()?;
            self.dispatch(action)?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        info!(?action, "dispatching action");
        match action {
            Action::Next => self.next_wallpaper(),
            Action::Previous => {
                self.previous_wallpaper();
                Ok(())
            }
            Action::Help => {
                self.show_help();
                Ok(())
            }
            Action::Info => {
                self.show_info();
                Ok(())
            }
            Action::ClearHistory => self.clear_history(),
            Action::ChangeCategory => self.change_category(),
            Action::EditConfig => self.edit_config(),
            Action::Exit => {
                self.farewell();
                Ok(())
            }
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Fetch, download and apply a random wallpaper from the selected
    /// category, then record it. Provider or download failures ask the user
    /// whether to try again; declining leaves everything as it was.
    pub fn next_wallpaper(&mut self) -> Result<()> {
        self.console.clear_screen();
        let Some(category) = self.selected.clone() else {
            self.console.error("No category selected");
            return Ok(());
        };

        loop {
            let url = match self.io.provider.pick_random_wallpaper(&category) {
                Ok(url) => url,
                Err(e) => {
                    warn!(error = %e, category = %category.name, "no wallpaper found");
                    self.console.error(&format!("Could not find a wallpaper: {}", e));
                    if self.ask_retry()? {
                        continue;
                    }
                    return Ok(());
                }
            };

            if let Some(index) = self.history.position_of(&url) {
                let cached = self.history.get()[index].local_path.clone();
                if cached.exists() {
                    info!(%url, index, "wallpaper already cached");
                    self.io.desktop.set_wallpaper(&cached);
                    self.cursor = Some(index);
                    self.console.info("This wallpaper is already in the history");
                    return Ok(());
                }
            }

            let dest = self.paths.cache_file_for((self.clock)());
            if let Err(e) = self.io.downloader.download(&url, &dest) {
                warn!(error = %e, %url, "download failed");
                self.console.error(&format!("Download failed: {}", e));
                if self.ask_retry()? {
                    continue;
                }
                return Ok(());
            }

            self.io.desktop.set_wallpaper(&dest);

            let entry = HistoryEntry::new(url, dest.clone(), category.name.clone());
            let index = match self.history.add(entry, self.config.get())? {
                AddOutcome::Added(index) => index,
                AddOutcome::Duplicate(index) => {
                    // Known URL whose cached file was gone: track the new download instead
                    self.history.relocate(index, dest, self.config.get())?;
                    self.console.info("This wallpaper is already in the history");
                    index
                }
            };
            self.cursor = Some(index);
            self.console.success("Wallpaper applied");
            return Ok(());
        }
    }

    fn ask_retry(&mut self) -> Result<bool> {
        self.io.prompter.confirm("Try again?", true)
    }

    /// Step back one entry. The cursor never goes below the oldest entry.
    pub fn previous_wallpaper(&mut self) {
        self.console.clear_screen();
        match self.cursor {
            Some(index) if index > 0 => {
                let index = index - 1;
                self.cursor = Some(index);
                let entry = self.history.get()[index].clone();
                self.show_entry(&entry, index);
                self.io.desktop.set_wallpaper(&entry.local_path);
            }
            _ => self.console.error("No earlier wallpaper in history"),
        }
    }

    pub fn show_info(&self) {
        self.console.clear_screen();
        match self.cursor.and_then(|i| self.history.get().get(i).map(|e| (i, e))) {
            Some((index, entry)) => self.show_entry(entry, index),
            None => self.console.error("No info available about the current wallpaper"),
        }
    }

    fn show_entry(&self, entry: &HistoryEntry, index: usize) {
        let rows = vec![
            format!("{} {}", "Category:".yellow().bold(), entry.category_name),
            format!("{} {}", "URL:".yellow().bold(), entry.source_url),
            format!("{} {}", "Local path:".yellow().bold(), entry.local_path.display()),
            format!(
                "{} {} of {}",
                "Position:".yellow().bold(),
                index + 1,
                self.history.len()
            ),
        ];
        self.console.blank();
        self.console.panel("Current Wallpaper", &rows);
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.console.clear_screen();
        self.history.clear(self.config.get())?;
        self.cursor = None;
        self.console.blank();
        self.console.success("Wallpaper history deleted");
        Ok(())
    }

    /// Re-list categories and ask again. Choosing 0 ends the whole session.
    pub fn change_category(&mut self) -> Result<()> {
        match self.load_categories() {
            Ok(categories) => self.categories = categories,
            Err(_) => self
                .console
                .error("Could not refresh categories, showing the previous list"),
        }
        self.choose_category()
    }

    pub fn edit_config(&mut self) -> Result<()> {
        self.console.clear_screen();
        self.config.edit_interactive(self.io.prompter.as_mut())
    }

    pub fn show_help(&self) {
        self.console.blank();
        self.console.panel("Available Keys", &self.bindings.help_rows());
    }
}

// Read access and a fixed clock for tests
#[cfg(test)]
impl Session {
    /// Replace the Unix-seconds clock used to name cached files.
    pub fn with_clock(mut self, clock: impl FnMut() -> i64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selected.as_ref()
    }
}
