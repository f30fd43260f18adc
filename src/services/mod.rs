//! Services module - Pure business logic for save backups.
//!
//! The services are **framework-agnostic**: they take explicit paths and values,
//! return results, and never print or emit events. The
//! [`ChangeMonitor`](crate::monitor::ChangeMonitor) turns their results into events.
//!
//! # Components
//!
//! - [`MetadataExtractor`]: Pulls the player tag and in-game year out of a save.
//!   Never fails; missing or malformed fields come back as `None`.
//!
//! - [`BackupWriter`]: Copies the autosave to
//!   `mp_autosave_<TAG>_<YYYY-MM-DD_HH-MM-SS>.eu4` in the backup directory.
//!
//! - [`RetentionManager`]: Deletes backups whose in-game year is older than
//!   `current_year - keep_years`. Best-effort; undated backups are kept.
//!
//! # Usage Example
//!
//! ```ignore
//! use eu4_autobackup::services::{BackupWriter, MetadataExtractor, RetentionManager};
//!
//! let metadata = MetadataExtractor::new().extract(source);
//! let backup = BackupWriter::new().write(
//!     source,
//!     backup_dir,
//!     metadata.tag_or_unknown(),
//!     chrono::Local::now().naive_local(),
//! )?;
//!
//! if let Some(year) = metadata.in_game_year {
//!     let report = RetentionManager::new().prune(backup_dir, year, retention);
//! }
//! ```

pub mod backup;
pub mod metadata;
pub mod retention;

pub use backup::{BACKUP_PREFIX, BackupError, BackupWriter, TIMESTAMP_FORMAT, backup_file_name};
pub use metadata::{MetadataExtractor, NO_PLAYER, SaveMetadata, UNKNOWN_TAG};
pub use retention::{PruneReport, PrunedBackup, RetentionManager};
