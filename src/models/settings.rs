use crate::models::configuration::{ConfigError, Configuration};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Name of the autosave file the game overwrites during multiplayer sessions.
pub const DEFAULT_SOURCE_FILE: &str = "mp_autosave.eu4";

/// Name of the backup directory created next to the autosave by default.
pub const DEFAULT_BACKUP_DIR_NAME: &str = "backups";

/// How many in-game years of backups to keep.
///
/// Persisted as the literal string `"all"` or a positive integer, matching the
/// `keep_years` key of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RetentionRepr", into = "RetentionRepr")]
pub enum Retention {
    /// Never prune.
    #[default]
    All,

    /// Keep backups whose year is at least `current_year - years`.
    Years(NonZeroU32),
}

impl Retention {
    /// Build a year-based policy, rejecting zero.
    pub fn years(years: u32) -> Option<Self> {
        NonZeroU32::new(years).map(Self::Years)
    }

    /// Oldest in-game year that survives pruning, or `None` when everything is kept.
    pub fn cutoff(&self, current_year: i32) -> Option<i32> {
        match self {
            Self::All => None,
            Self::Years(years) => {
                let years = i32::try_from(years.get()).unwrap_or(i32::MAX);
                Some(current_year.saturating_sub(years))
            }
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Years(years) => write!(f, "{} in-game years", years),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RetentionRepr {
    Years(u32),
    Keyword(String),
}

impl FromStr for Retention {
    type Err = String;

    /// Parse `all` (any case) or a positive number of years.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim();
        if word.eq_ignore_ascii_case("all") {
            return Ok(Retention::All);
        }
        word.parse::<u32>()
            .ok()
            .and_then(Retention::years)
            .ok_or_else(|| format!("keep_years must be 'all' or a positive number, got '{}'", word))
    }
}

impl TryFrom<RetentionRepr> for Retention {
    type Error = String;

    fn try_from(repr: RetentionRepr) -> Result<Self, Self::Error> {
        match repr {
            RetentionRepr::Years(years) => {
                Retention::years(years).ok_or_else(|| "keep_years must be positive".to_string())
            }
            RetentionRepr::Keyword(word) => word.parse(),
        }
    }
}

impl From<Retention> for RetentionRepr {
    fn from(retention: Retention) -> Self {
        match retention {
            Retention::All => RetentionRepr::Keyword("all".to_string()),
            Retention::Years(years) => RetentionRepr::Years(years.get()),
        }
    }
}

/// Operator settings as stored in `autobackup.yaml`.
///
/// This is the mutable, persisted form. A monitoring session never sees it
/// directly; it receives the validated [`Configuration`] produced by
/// [`to_configuration`](Self::to_configuration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(rename = "SOURCE", default)]
    pub source: String,

    #[serde(rename = "BACKUP_DIR", default)]
    pub backup_dir: String,

    #[serde(default = "default_interval")]
    pub interval: f64,

    #[serde(default)]
    pub keep_years: Retention,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_FILE.to_string(),
            backup_dir: DEFAULT_BACKUP_DIR_NAME.to_string(),
            interval: default_interval(),
            keep_years: Retention::All,
        }
    }
}

fn default_interval() -> f64 {
    60.0
}

impl UserSettings {
    /// Whether the backup directory points at the save itself or at another save file.
    pub fn backup_dir_needs_repair(&self) -> bool {
        !self.backup_dir.is_empty()
            && (self.backup_dir == self.source
                || self.backup_dir.to_ascii_lowercase().ends_with(".eu4"))
    }

    /// Point the backup directory at `<dir of SOURCE>/backups` if it is misconfigured.
    ///
    /// Returns true when the settings were changed.
    pub fn repair_backup_dir(&mut self) -> bool {
        if !self.backup_dir_needs_repair() {
            return false;
        }

        self.backup_dir = suggested_backup_dir(Utf8Path::new(&self.source)).into_string();
        true
    }

    /// Validate and freeze these settings for one monitoring session.
    pub fn to_configuration(&self) -> Result<Configuration, ConfigError> {
        Configuration::new(
            self.source.trim(),
            self.backup_dir.trim(),
            self.interval,
            self.keep_years,
        )
    }
}

/// The `backups` directory next to a save file.
pub fn suggested_backup_dir(source: &Utf8Path) -> Utf8PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.join(DEFAULT_BACKUP_DIR_NAME),
        _ => Utf8PathBuf::from(DEFAULT_BACKUP_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_settings_defaults() {
        let settings = UserSettings::default();
        assert_eq!(settings.source, "mp_autosave.eu4");
        assert_eq!(settings.backup_dir, "backups");
        assert_eq!(settings.interval, 60.0);
        assert_eq!(settings.keep_years, Retention::All);
    }

    #[test]
    fn test_retention_cutoff() {
        assert_eq!(Retention::All.cutoff(1523), None);
        assert_eq!(Retention::years(10).unwrap().cutoff(1523), Some(1513));
        assert_eq!(Retention::years(0), None);
    }

    #[test]
    fn test_retention_yaml_forms() {
        let all: Retention = serde_yaml_ng::from_str("all").unwrap();
        assert_eq!(all, Retention::All);

        let years: Retention = serde_yaml_ng::from_str("50").unwrap();
        assert_eq!(years, Retention::years(50).unwrap());

        let quoted: Retention = serde_yaml_ng::from_str("\"25\"").unwrap();
        assert_eq!(quoted, Retention::years(25).unwrap());

        assert!(serde_yaml_ng::from_str::<Retention>("0").is_err());
        assert!(serde_yaml_ng::from_str::<Retention>("forever").is_err());
    }

    #[test]
    fn test_retention_from_str() {
        assert_eq!(" ALL ".parse::<Retention>(), Ok(Retention::All));
        assert_eq!("12".parse::<Retention>(), Ok(Retention::years(12).unwrap()));
        assert!("0".parse::<Retention>().is_err());
        assert!("-3".parse::<Retention>().is_err());
        assert!("soon".parse::<Retention>().is_err());
    }

    #[test]
    fn test_retention_serializes_back() {
        assert_eq!(serde_yaml_ng::to_string(&Retention::All).unwrap().trim(), "all");
        assert_eq!(
            serde_yaml_ng::to_string(&Retention::years(30).unwrap())
                .unwrap()
                .trim(),
            "30"
        );
    }

    #[test]
    fn test_repair_backup_dir_pointing_at_save() {
        let mut settings = UserSettings {
            source: "/saves/mp_autosave.eu4".to_string(),
            backup_dir: "/saves/mp_autosave.eu4".to_string(),
            ..UserSettings::default()
        };

        assert!(settings.repair_backup_dir());
        assert_eq!(settings.backup_dir, "/saves/backups");
        assert!(!settings.repair_backup_dir());
    }

    #[test]
    fn test_repair_backup_dir_with_save_extension() {
        let mut settings = UserSettings {
            source: "/saves/mp_autosave.eu4".to_string(),
            backup_dir: "/saves/other.EU4".to_string(),
            ..UserSettings::default()
        };

        assert!(settings.repair_backup_dir());
        assert_eq!(settings.backup_dir, "/saves/backups");
    }

    #[test]
    fn test_suggested_backup_dir_for_bare_file_name() {
        assert_eq!(
            suggested_backup_dir(Utf8Path::new("mp_autosave.eu4")),
            Utf8PathBuf::from("backups")
        );
    }
}
