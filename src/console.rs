//! Operator settings menu.
//!
//! Shown before the first session and on every pause. Each edit is written to
//! `autobackup.yaml` straight away, so the file on disk is what a session
//! starts with. A settings file that cannot be read is reported and the menu
//! stays up; the operator can fix the file by hand or overwrite it from here.
//!
//! Input comes from a [`LineSource`] so the menu can be driven without a
//! terminal.

use crate::config::ConfigManager;
use crate::models::{
    Configuration, MIN_POLL_INTERVAL_SECS, Retention, UserSettings, suggested_backup_dir,
};
use crate::monitor::ConsoleProbe;
use camino::Utf8Path;
use std::collections::VecDeque;
use std::fs;

/// Intervals above this many seconds need confirmation.
pub const LONG_INTERVAL_SECS: f64 = 3600.0;

/// Retention below this many years needs confirmation.
pub const SHORT_RETENTION_YEARS: u32 = 10;

/// Blocking source of operator input lines.
pub trait LineSource {
    /// Next line, or `None` when input is closed or the operator interrupted.
    fn next_line(&mut self) -> Option<String>;
}

impl LineSource for ConsoleProbe {
    fn next_line(&mut self) -> Option<String> {
        self.wait_for_line()
    }
}

impl LineSource for VecDeque<String> {
    fn next_line(&mut self) -> Option<String> {
        self.pop_front()
    }
}

/// How the menu was left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    Start(Configuration),
    Exit,
}

/// A top-level menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Show,
    Source,
    BackupDir,
    Interval,
    Retention,
    Reset,
    Start,
    Exit,
}

impl MenuChoice {
    /// Map an input line to a menu entry. Enter on its own starts monitoring.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "1" => Some(Self::Show),
            "2" => Some(Self::Source),
            "3" => Some(Self::BackupDir),
            "4" => Some(Self::Interval),
            "5" => Some(Self::Retention),
            "6" => Some(Self::Reset),
            "7" | "" | "s" | "start" => Some(Self::Start),
            "0" | "q" | "quit" | "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Interactive editor over the persisted [`UserSettings`].
pub struct SettingsMenu<'a> {
    config_manager: &'a ConfigManager,
    settings: UserSettings,
}

impl<'a> SettingsMenu<'a> {
    /// Load the current settings, falling back to defaults if the file is unusable.
    pub fn new(config_manager: &'a ConfigManager) -> Self {
        let mut menu = Self {
            config_manager,
            settings: UserSettings::default(),
        };
        if !menu.reload() {
            tracing::warn!(
                "Showing default settings; changing any setting overwrites {}",
                config_manager.settings_path()
            );
        }
        menu
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Show the menu until the operator starts monitoring or exits.
    pub fn run(&mut self, input: &mut dyn LineSource) -> MenuOutcome {
        self.show();

        loop {
            print_menu();

            let Some(line) = input.next_line() else {
                return MenuOutcome::Exit;
            };
            let Some(choice) = MenuChoice::parse(&line) else {
                tracing::warn!("Invalid choice '{}'. Please select 0-7.", line.trim());
                continue;
            };

            match choice {
                MenuChoice::Show => {
                    self.reload();
                    self.show();
                }
                MenuChoice::Source => self.edit_source(input),
                MenuChoice::BackupDir => self.edit_backup_dir(input),
                MenuChoice::Interval => self.edit_interval(input),
                MenuChoice::Retention => self.edit_retention(input),
                MenuChoice::Reset => self.reset(input),
                MenuChoice::Start => {
                    if let Some(config) = self.start() {
                        return MenuOutcome::Start(config);
                    }
                }
                MenuChoice::Exit => return MenuOutcome::Exit,
            }
        }
    }

    /// Re-read the settings file. On failure the error is logged and the
    /// settings in memory are kept.
    fn reload(&mut self) -> bool {
        match self.config_manager.load_settings() {
            Ok(settings) => {
                self.settings = settings;
                true
            }
            Err(e) => {
                tracing::error!("Settings file cannot be used: {:#}", e);
                false
            }
        }
    }

    /// Validate what is on disk, so hand edits made while paused apply.
    fn start(&mut self) -> Option<Configuration> {
        if !self.reload() {
            tracing::error!("Fix the settings file or change a setting from this menu");
            return None;
        }

        match self.settings.to_configuration() {
            Ok(config) => {
                tracing::info!("Starting backup monitoring...");
                Some(config)
            }
            Err(e) => {
                tracing::error!("Settings cannot be used: {}", e);
                None
            }
        }
    }

    fn edit_source(&mut self, input: &mut dyn LineSource) {
        println!("\nCurrent: {}", self.settings.source);
        println!("Enter EU4 autosave file path (Enter to keep current):");
        let Some(value) = read_value(input) else {
            return;
        };

        let path = Utf8Path::new(&value);
        if !path.is_file() {
            let parent_exists = path
                .parent()
                .is_none_or(|parent| parent.as_str().is_empty() || parent.is_dir());
            if !parent_exists {
                tracing::error!("Invalid file path or directory doesn't exist: {}", value);
                return;
            }
            if !confirm(input, "File doesn't exist yet. Use this path anyway? (y/n)") {
                return;
            }
        }

        self.settings.source = value;

        let suggested = suggested_backup_dir(Utf8Path::new(&self.settings.source));
        if self.settings.backup_dir != suggested.as_str() {
            println!("\nSuggested backup directory: {}", suggested);
            if confirm(input, "Update backup directory to match? (y/n)") {
                self.settings.backup_dir = suggested.into_string();
                tracing::info!("Backup directory updated to match");
            }
        }

        self.save("Source file path updated");
    }

    fn edit_backup_dir(&mut self, input: &mut dyn LineSource) {
        println!("\nCurrent: {}", self.settings.backup_dir);
        println!("Enter backup directory path (Enter to keep current):");
        let Some(value) = read_value(input) else {
            return;
        };

        let path = Utf8Path::new(&value);
        if path.exists() && !path.is_dir() {
            tracing::error!("Not a directory: {}", value);
            return;
        }
        if !path.exists() {
            if !confirm(input, "Directory doesn't exist. Create it? (y/n)") {
                return;
            }
            if let Err(e) = fs::create_dir_all(path) {
                tracing::error!("Failed to create directory {}: {}", value, e);
                return;
            }
        }

        self.settings.backup_dir = value;
        self.save("Backup directory updated");
    }

    fn edit_interval(&mut self, input: &mut dyn LineSource) {
        loop {
            println!("\nCurrent interval: {} seconds", self.settings.interval);
            println!("Suggestions: 30 (30s), 60 (1min), 300 (5min), 600 (10min)");
            println!("Enter new interval in seconds (Enter to keep current):");
            let Some(value) = read_value(input) else {
                return;
            };

            let Ok(interval) = value.parse::<f64>() else {
                tracing::error!("Please enter a valid number.");
                continue;
            };
            if !interval.is_finite() || interval < MIN_POLL_INTERVAL_SECS as f64 {
                tracing::warn!("Interval too short. Minimum {} seconds.", MIN_POLL_INTERVAL_SECS);
                continue;
            }
            if interval.fract() != 0.0 {
                tracing::warn!("Please enter a whole number of seconds.");
                continue;
            }
            if interval > LONG_INTERVAL_SECS
                && !confirm(input, "Interval over 1 hour. Continue? (y/n)")
            {
                continue;
            }

            self.settings.interval = interval;
            self.save("Check interval updated");
            return;
        }
    }

    fn edit_retention(&mut self, input: &mut dyn LineSource) {
        loop {
            println!("\nCurrent setting: {}", self.settings.keep_years);
            println!("Options:");
            println!("  'all'  - Keep all backups (no cleanup)");
            println!("  Number - Years of backups to keep (e.g., 50 keeps last 50 in-game years)");
            println!("Enter new value (Enter to keep current):");
            let Some(value) = read_value(input) else {
                return;
            };

            let retention = match value.parse::<Retention>() {
                Ok(retention) => retention,
                Err(e) => {
                    tracing::error!("{}", e);
                    continue;
                }
            };
            if let Retention::Years(years) = retention {
                if years.get() < SHORT_RETENTION_YEARS {
                    let prompt =
                        format!("Only keeping {} years of backups. Continue? (y/n)", years);
                    if !confirm(input, &prompt) {
                        continue;
                    }
                }
            }

            self.settings.keep_years = retention;
            self.save("Backup retention updated");
            return;
        }
    }

    fn reset(&mut self, input: &mut dyn LineSource) {
        println!("\nThis will reset ALL settings to defaults!");
        println!("Are you sure? Type 'yes' to confirm:");
        let confirmed = input
            .next_line()
            .is_some_and(|line| line.trim().eq_ignore_ascii_case("yes"));
        if !confirmed {
            tracing::info!("Reset cancelled.");
            return;
        }

        self.settings = UserSettings::default();
        self.save("Settings reset to defaults");
    }

    fn save(&self, what: &str) {
        match self.config_manager.save_settings(&self.settings) {
            Ok(()) => tracing::info!("{}", what),
            Err(e) => tracing::error!("{}, but saving failed: {:#}", what, e),
        }
    }

    fn show(&self) {
        let exists = |path: &str| {
            if !path.is_empty() && Utf8Path::new(path).exists() {
                "EXISTS"
            } else {
                "NOT FOUND"
            }
        };

        println!();
        println!("{}", "=".repeat(50));
        println!("  EU4 AUTOBACKUP - SETTINGS ({})", self.config_manager.settings_path());
        println!("{}", "=".repeat(50));
        println!("  SOURCE      : {}", self.settings.source);
        println!("  BACKUP_DIR  : {}", self.settings.backup_dir);
        println!("  interval    : {}s", self.settings.interval);
        println!("  keep_years  : {}", self.settings.keep_years);
        println!();
        println!("  Source file : {}", exists(&self.settings.source));
        println!("  Backup dir  : {}", exists(&self.settings.backup_dir));
        println!("{}", "=".repeat(50));
    }
}

fn print_menu() {
    println!();
    println!("  1. Show current settings (re-read file)");
    println!("  2. Update source file path");
    println!("  3. Update backup directory");
    println!("  4. Update check interval");
    println!("  5. Update backup retention");
    println!("  6. Reset to defaults");
    println!("  7. Start backup monitoring (or press Enter)");
    println!("  0. Exit");
    println!("{}", "-".repeat(50));
    println!("Select option (0-7):");
}

/// Trimmed next line; `None` when input ended or the line was empty.
fn read_value(input: &mut dyn LineSource) -> Option<String> {
    let line = input.next_line()?;
    let value = line.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn confirm(input: &mut dyn LineSource, prompt: &str) -> bool {
    println!("{}", prompt);
    input
        .next_line()
        .is_some_and(|line| line.trim().eq_ignore_ascii_case("y"))
}
