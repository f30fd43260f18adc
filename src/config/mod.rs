use crate::models::UserSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default directory holding the settings file, relative to the working directory.
pub const DEFAULT_CONFIG_DIR: &str = "AutoBackup Data";

/// File name of the persisted settings.
pub const SETTINGS_FILE_NAME: &str = "autobackup.yaml";

/// Configuration manager for loading and saving the YAML settings file.
///
/// The manager only persists [`UserSettings`]. Turning them into a session
/// [`Configuration`](crate::models::Configuration) is done by the caller with
/// [`UserSettings::to_configuration`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (e.g., "AutoBackup Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Whether a settings file has been written before.
    pub fn settings_exist(&self) -> bool {
        self.settings_path.exists()
    }

    /// Load the settings file.
    ///
    /// Returns defaults if the file doesn't exist. A backup directory that points
    /// at the save file (or at any `.eu4` file) is repaired to
    /// `<dir of SOURCE>/backups` and the repaired settings are written back.
    pub fn load_settings(&self) -> Result<UserSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(UserSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let mut settings: UserSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        if settings.repair_backup_dir() {
            tracing::warn!(
                "Backup directory pointed at a save file, updated to: {}",
                settings.backup_dir
            );
            self.save_settings(&settings)?;
        }

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Retention;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_settings_uses_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert!(!manager.settings_exist());
        assert_eq!(manager.load_settings().unwrap(), UserSettings::default());
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = UserSettings {
            source: "/saves/mp_autosave.eu4".to_string(),
            backup_dir: "/saves/backups".to_string(),
            interval: 30.0,
            keep_years: Retention::years(50).unwrap(),
        };
        manager.save_settings(&settings).unwrap();

        assert!(manager.settings_exist());
        assert_eq!(manager.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_repaired_settings_are_persisted() {
        let (manager, _temp_dir) = create_test_config_manager();

        fs::write(
            manager.settings_path(),
            "SOURCE: /saves/mp_autosave.eu4\nBACKUP_DIR: /saves/mp_autosave.eu4\n",
        )
        .unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.backup_dir, "/saves/backups");

        let on_disk = fs::read_to_string(manager.settings_path()).unwrap();
        assert!(on_disk.contains("/saves/backups"));
    }
}
