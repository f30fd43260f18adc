//! Data models for the autobackup tool.
//!
//! - [`UserSettings`]: The persisted, operator-editable settings from `autobackup.yaml`
//! - [`Retention`]: How many in-game years of backups to keep (`all` or a positive number)
//! - [`Configuration`]: The validated, immutable snapshot a monitoring session runs with
//!
//! # Architecture Note
//!
//! Settings and configuration are deliberately separate types. The settings file
//! may be edited at any time while monitoring is paused; each resume validates a
//! fresh [`Configuration`] instead of mutating the one the monitor holds.

pub mod configuration;
pub mod settings;

pub use configuration::{ConfigError, Configuration, MIN_POLL_INTERVAL_SECS, SAVE_EXTENSION};
pub use settings::{
    DEFAULT_BACKUP_DIR_NAME, DEFAULT_SOURCE_FILE, Retention, UserSettings, suggested_backup_dir,
};
