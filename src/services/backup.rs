use crate::models::SAVE_EXTENSION;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use std::fs::{self, FileTimes, OpenOptions};
use std::io;
use thiserror::Error;

/// Prefix shared by every backup file name.
pub const BACKUP_PREFIX: &str = "mp_autosave";

/// Timestamp layout embedded in backup file names (one-second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Errors that can occur while writing a backup
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to copy {from} to {to}: {error}")]
    Copy {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Build the on-disk name of a backup: `mp_autosave_<TAG>_<YYYY-MM-DD_HH-MM-SS>.eu4`.
pub fn backup_file_name(tag: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}.{}",
        BACKUP_PREFIX,
        tag,
        timestamp.format(TIMESTAMP_FORMAT),
        SAVE_EXTENSION
    )
}

/// Copies the autosave into the backup directory under a timestamped name.
///
/// Two backups of the same tag within one second map to the same name; the
/// second copy overwrites the first.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupWriter;

impl BackupWriter {
    pub fn new() -> Self {
        Self
    }

    /// Copy `source` to `backup_dir/<backup name>` and return the new path.
    ///
    /// File contents are copied in full; modification and access times are
    /// carried over on a best-effort basis.
    pub fn write(
        &self,
        source: &Utf8Path,
        backup_dir: &Utf8Path,
        tag: &str,
        now: NaiveDateTime,
    ) -> Result<Utf8PathBuf, BackupError> {
        let destination = backup_dir.join(backup_file_name(tag, now));

        fs::copy(source, &destination).map_err(|error| BackupError::Copy {
            from: source.to_path_buf(),
            to: destination.clone(),
            error,
        })?;

        if let Err(e) = preserve_times(source, &destination) {
            tracing::debug!("Could not preserve timestamps on {}: {}", destination, e);
        }

        tracing::debug!("Copied {} to {}", source, destination);
        Ok(destination)
    }
}

fn preserve_times(source: &Utf8Path, destination: &Utf8Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    OpenOptions::new()
        .write(true)
        .open(destination)?
        .set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(21, 4, 9)
            .unwrap()
    }

    fn utf8_dir(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_backup_file_name() {
        assert_eq!(
            backup_file_name("SWE", timestamp()),
            "mp_autosave_SWE_2025-03-07_21-04-09.eu4"
        );
        assert_eq!(
            backup_file_name("UNKNOWN", timestamp()),
            "mp_autosave_UNKNOWN_2025-03-07_21-04-09.eu4"
        );
    }

    #[test]
    fn test_write_copies_contents_and_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let source = root.join("mp_autosave.eu4");
        let backups = root.join("backups");
        fs::create_dir_all(&backups).unwrap();
        fs::write(&source, b"date=1523.4.12\nplayer=\"SWE\"\n").unwrap();

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        OpenOptions::new()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let written = BackupWriter::new()
            .write(&source, &backups, "SWE", timestamp())
            .unwrap();

        assert_eq!(
            written,
            backups.join("mp_autosave_SWE_2025-03-07_21-04-09.eu4")
        );
        assert_eq!(fs::read(&written).unwrap(), fs::read(&source).unwrap());
        assert_eq!(fs::metadata(&written).unwrap().modified().unwrap(), mtime);
    }

    #[test]
    fn test_same_second_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let source = root.join("mp_autosave.eu4");
        let backups = root.join("backups");
        fs::create_dir_all(&backups).unwrap();

        let writer = BackupWriter::new();
        fs::write(&source, b"first").unwrap();
        let first = writer.write(&source, &backups, "SWE", timestamp()).unwrap();
        fs::write(&source, b"second").unwrap();
        let second = writer.write(&source, &backups, "SWE", timestamp()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"second");
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);

        let result = BackupWriter::new().write(
            &root.join("gone.eu4"),
            &root,
            "SWE",
            timestamp(),
        );

        assert!(matches!(result, Err(BackupError::Copy { .. })));
    }

    #[test]
    fn test_missing_backup_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let source = root.join("mp_autosave.eu4");
        fs::write(&source, b"date=1444.11.11\n").unwrap();

        let result =
            BackupWriter::new().write(&source, &root.join("no_such_dir"), "SWE", timestamp());

        assert!(result.is_err());
    }
}
