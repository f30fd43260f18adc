use crate::models::{Retention, SAVE_EXTENSION};
use crate::services::metadata::MetadataExtractor;
use camino::Utf8Path;
use std::fs;
use std::io;

/// A backup removed by a prune pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedBackup {
    pub filename: String,
    pub year: i32,
}

/// Outcome of one prune pass over the backup directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub pruned: Vec<PrunedBackup>,
    /// Backups old enough to delete that could not be removed.
    pub failed: Vec<String>,
    /// Backups kept, including those whose year could not be read.
    pub retained: usize,
}

/// Deletes backups whose in-game year falls before the retention cutoff.
///
/// Pruning is best-effort: an unreadable directory or a failed deletion is
/// recorded and skipped, never returned as an error. Backups without a
/// readable year are always kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionManager {
    extractor: MetadataExtractor,
}

impl RetentionManager {
    pub fn new() -> Self {
        Self {
            extractor: MetadataExtractor::new(),
        }
    }

    /// Remove every `.eu4` file in `backup_dir` whose year is below
    /// `current_year - retention`.
    pub fn prune(
        &self,
        backup_dir: &Utf8Path,
        current_year: i32,
        retention: Retention,
    ) -> PruneReport {
        self.prune_with(backup_dir, current_year, retention, |path| fs::remove_file(path))
    }

    /// [`prune`](Self::prune) with a caller-supplied deletion.
    pub fn prune_with<F>(
        &self,
        backup_dir: &Utf8Path,
        current_year: i32,
        retention: Retention,
        mut remove: F,
    ) -> PruneReport
    where
        F: FnMut(&Utf8Path) -> io::Result<()>,
    {
        let mut report = PruneReport::default();

        let Some(cutoff) = retention.cutoff(current_year) else {
            return report;
        };

        let entries = match backup_dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list backup directory {}: {}", backup_dir, e);
                return report;
            }
        };

        let suffix = format!(".{}", SAVE_EXTENSION);
        let mut candidates: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().ends_with(&suffix))
            .map(|entry| entry.into_path())
            .collect();
        candidates.sort();

        for path in candidates {
            let filename = path.file_name().unwrap_or(path.as_str()).to_string();

            match self.extractor.extract(&path).in_game_year {
                Some(year) if year < cutoff => match remove(&path) {
                    Ok(()) => {
                        tracing::debug!("Pruned {} (year {}, cutoff {})", filename, year, cutoff);
                        report.pruned.push(PrunedBackup { filename, year });
                    }
                    Err(e) => {
                        tracing::debug!("Could not prune {}: {}", filename, e);
                        report.failed.push(filename);
                    }
                },
                _ => report.retained += 1,
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn backup_dir_with(years: &[Option<i32>]) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        for (i, year) in years.iter().enumerate() {
            let content = match year {
                Some(year) => format!("player=\"SWE\"\ndate={}.1.1\n", year),
                None => "player=\"SWE\"\n".to_string(),
            };
            fs::write(dir.join(format!("mp_autosave_SWE_{}.eu4", i)), content).unwrap();
        }
        (temp_dir, dir)
    }

    #[test]
    fn test_keep_all_is_noop() {
        let (_temp_dir, dir) = backup_dir_with(&[Some(1444), Some(1500)]);

        let report = RetentionManager::new().prune(&dir, 1800, Retention::All);

        assert_eq!(report, PruneReport::default());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn test_prunes_strictly_older_than_cutoff() {
        let (_temp_dir, dir) = backup_dir_with(&[Some(1500), Some(1510), Some(1513), Some(1522)]);

        let report = RetentionManager::new().prune(&dir, 1523, Retention::years(10).unwrap());

        let years: Vec<i32> = report.pruned.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![1500, 1510]);
        assert_eq!(report.retained, 2);
        assert!(report.failed.is_empty());
        assert!(dir.join("mp_autosave_SWE_2.eu4").exists());
        assert!(dir.join("mp_autosave_SWE_3.eu4").exists());
    }

    #[test]
    fn test_undated_backups_are_kept() {
        let (_temp_dir, dir) = backup_dir_with(&[None, Some(1400)]);

        let report = RetentionManager::new().prune(&dir, 1700, Retention::years(1).unwrap());

        assert_eq!(report.pruned.len(), 1);
        assert_eq!(report.retained, 1);
        assert!(dir.join("mp_autosave_SWE_0.eu4").exists());
    }

    #[test]
    fn test_ignores_other_extensions() {
        let (_temp_dir, dir) = backup_dir_with(&[]);
        fs::write(dir.join("notes.txt"), "date=1400.1.1\n").unwrap();

        let report = RetentionManager::new().prune(&dir, 1700, Retention::years(1).unwrap());

        assert!(report.pruned.is_empty());
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_failed_deletion_does_not_stop_the_scan() {
        let (_temp_dir, dir) = backup_dir_with(&[Some(1400), Some(1401), Some(1700)]);

        let report = RetentionManager::new().prune_with(
            &dir,
            1700,
            Retention::years(10).unwrap(),
            |path| {
                if path.file_name() == Some("mp_autosave_SWE_0.eu4") {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
                } else {
                    fs::remove_file(path)
                }
            },
        );

        assert_eq!(report.failed, vec!["mp_autosave_SWE_0.eu4".to_string()]);
        assert_eq!(
            report.pruned,
            vec![PrunedBackup {
                filename: "mp_autosave_SWE_1.eu4".to_string(),
                year: 1401,
            }]
        );
        assert_eq!(report.retained, 1);
        assert!(dir.join("mp_autosave_SWE_0.eu4").exists());
        assert!(!dir.join("mp_autosave_SWE_1.eu4").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_records_failures() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, dir) = backup_dir_with(&[Some(1400), Some(1401)]);
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory permissions.
        let privileged = fs::write(dir.join("write-check"), b"").is_ok();
        let report = RetentionManager::new().prune(&dir, 1700, Retention::years(10).unwrap());
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            return;
        }

        assert!(report.pruned.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let report = RetentionManager::new().prune(
            Utf8Path::new("/definitely/not/a/backup/dir"),
            1700,
            Retention::years(5).unwrap(),
        );
        assert_eq!(report, PruneReport::default());
    }
}
