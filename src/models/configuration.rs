use crate::models::settings::Retention;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Shortest poll interval accepted, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// Extension shared by the autosave and every backup of it.
pub const SAVE_EXTENSION: &str = "eu4";

/// Reasons a configuration cannot be used for a monitoring session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Source save file is not set")]
    MissingSource,

    #[error("Backup directory is not set")]
    MissingBackupDir,

    #[error("Backup directory {0} is the source save file itself")]
    BackupDirIsSource(Utf8PathBuf),

    #[error("Backup directory {0} is inside the source save path")]
    BackupDirInsideSource(Utf8PathBuf),

    #[error("Backup directory {0} looks like a save file")]
    BackupDirIsSaveFile(Utf8PathBuf),

    #[error("Backup directory {0} also holds the source save; pruning would consider it a backup")]
    BackupDirHoldsSource(Utf8PathBuf),

    #[error("Poll interval {0}s is shorter than the {MIN_POLL_INTERVAL_SECS}s minimum")]
    IntervalTooShort(f64),

    #[error("Poll interval {0}s must be a whole number of seconds")]
    IntervalNotWhole(f64),
}

/// Immutable settings snapshot for one monitoring session.
///
/// Construction validates every precondition the monitor relies on, so a
/// `Configuration` can never describe a backup directory that overlaps the
/// source save. A new snapshot replaces the old one on every pause/resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    source: Utf8PathBuf,
    backup_dir: Utf8PathBuf,
    poll_interval_secs: u64,
    retention: Retention,
}

impl Configuration {
    /// Build and validate a configuration.
    ///
    /// `poll_interval_secs` must be finite, at least [`MIN_POLL_INTERVAL_SECS`]
    /// and a whole number of seconds.
    pub fn new(
        source: impl Into<Utf8PathBuf>,
        backup_dir: impl Into<Utf8PathBuf>,
        poll_interval_secs: f64,
        retention: Retention,
    ) -> Result<Self, ConfigError> {
        let poll_interval_secs = validate_interval(poll_interval_secs)?;
        let config = Self {
            source: source.into(),
            backup_dir: backup_dir.into(),
            poll_interval_secs,
            retention,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the path preconditions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.as_str().trim().is_empty() {
            return Err(ConfigError::MissingSource);
        }
        if self.backup_dir.as_str().trim().is_empty() {
            return Err(ConfigError::MissingBackupDir);
        }
        if same_path(&self.backup_dir, &self.source) {
            return Err(ConfigError::BackupDirIsSource(self.backup_dir.clone()));
        }
        if is_inside(&self.backup_dir, &self.source) {
            return Err(ConfigError::BackupDirInsideSource(self.backup_dir.clone()));
        }
        if self
            .backup_dir
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SAVE_EXTENSION))
        {
            return Err(ConfigError::BackupDirIsSaveFile(self.backup_dir.clone()));
        }
        if same_path(&self.backup_dir, containing_dir(&self.source)) {
            return Err(ConfigError::BackupDirHoldsSource(self.backup_dir.clone()));
        }
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort(self.poll_interval_secs as f64));
        }
        Ok(())
    }

    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    pub fn backup_dir(&self) -> &Utf8Path {
        &self.backup_dir
    }

    /// Number of one-second ticks between change checks.
    pub fn poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }
}

fn validate_interval(interval: f64) -> Result<u64, ConfigError> {
    if !interval.is_finite() || interval < MIN_POLL_INTERVAL_SECS as f64 {
        return Err(ConfigError::IntervalTooShort(interval));
    }
    if interval.fract() != 0.0 {
        return Err(ConfigError::IntervalNotWhole(interval));
    }
    Ok(interval as u64)
}

fn containing_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

/// Windows paths compare case-insensitively.
const FOLD_CASE: bool = cfg!(windows);

/// Lexical comparison; the paths may not exist yet.
fn same_path(a: &Utf8Path, b: &Utf8Path) -> bool {
    path_key(a, FOLD_CASE) == path_key(b, FOLD_CASE)
}

fn is_inside(path: &Utf8Path, ancestor: &Utf8Path) -> bool {
    path_key(path, FOLD_CASE).starts_with(&path_key(ancestor, FOLD_CASE))
}

fn path_key(path: &Utf8Path, fold_case: bool) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Utf8Component::CurDir))
        .map(|c| {
            if fold_case {
                c.as_str().to_lowercase()
            } else {
                c.as_str().to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(source: &str, backup_dir: &str) -> Result<Configuration, ConfigError> {
        Configuration::new(source, backup_dir, 60.0, Retention::All)
    }

    #[test]
    fn test_valid_configuration() {
        let config = config("/saves/mp_autosave.eu4", "/saves/backups").unwrap();
        assert_eq!(config.source(), Utf8Path::new("/saves/mp_autosave.eu4"));
        assert_eq!(config.backup_dir(), Utf8Path::new("/saves/backups"));
        assert_eq!(config.poll_interval_secs(), 60);
        assert_eq!(config.retention(), Retention::All);
    }

    #[test]
    fn test_path_key_folds_case_when_asked() {
        let upper = Utf8Path::new(r"C:\Saves\mp_autosave.eu4");
        let lower = Utf8Path::new(r"c:\saves\MP_AUTOSAVE.eu4");

        assert_eq!(path_key(upper, true), path_key(lower, true));
        assert_ne!(path_key(upper, false), path_key(lower, false));
        assert_eq!(
            path_key(Utf8Path::new("/Saves/./Backups"), true),
            path_key(Utf8Path::new("/saves/backups/"), true)
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_rejects_source_differing_only_in_case() {
        assert!(matches!(
            config(r"C:\Saves\mp_autosave.eu4", r"c:\saves\MP_AUTOSAVE.EU4"),
            Err(ConfigError::BackupDirIsSource(_))
        ));
        assert!(matches!(
            config(r"C:\Saves\mp_autosave.eu4", r"c:\saves"),
            Err(ConfigError::BackupDirHoldsSource(_))
        ));
    }

    #[test]
    fn test_rejects_unset_paths() {
        assert_eq!(config("", "/saves/backups"), Err(ConfigError::MissingSource));
        assert_eq!(
            config("/saves/mp_autosave.eu4", "  "),
            Err(ConfigError::MissingBackupDir)
        );
    }

    #[test]
    fn test_rejects_self_referential_backup_dir() {
        assert!(matches!(
            config("/saves/mp_autosave.eu4", "/saves/./mp_autosave.eu4/"),
            Err(ConfigError::BackupDirIsSource(_))
        ));
        assert!(matches!(
            config("/saves/mp_autosave.eu4", "/saves/mp_autosave.eu4/backups"),
            Err(ConfigError::BackupDirInsideSource(_))
        ));
        assert!(matches!(
            config("/saves/mp_autosave.eu4", "/saves/old.eu4"),
            Err(ConfigError::BackupDirIsSaveFile(_))
        ));
        assert!(matches!(
            config("/saves/mp_autosave.eu4", "/saves"),
            Err(ConfigError::BackupDirHoldsSource(_))
        ));
        assert!(matches!(
            config("mp_autosave.eu4", "."),
            Err(ConfigError::BackupDirHoldsSource(_))
        ));
    }

    #[test]
    fn test_interval_rules() {
        let source = "/saves/mp_autosave.eu4";
        let backups = "/saves/backups";

        assert_eq!(
            Configuration::new(source, backups, 4.0, Retention::All),
            Err(ConfigError::IntervalTooShort(4.0))
        );
        assert_eq!(
            Configuration::new(source, backups, 30.5, Retention::All),
            Err(ConfigError::IntervalNotWhole(30.5))
        );
        assert!(Configuration::new(source, backups, f64::NAN, Retention::All).is_err());
        assert_eq!(
            Configuration::new(source, backups, 5.0, Retention::All)
                .unwrap()
                .poll_interval_secs(),
            5
        );
    }
}
