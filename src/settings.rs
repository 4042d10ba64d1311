//! Process-wide feature toggles, persisted as JSON next to the project's
//! other settings files.
//!
//! Settings are re-loaded before every processing pass so edits take effect
//! on the next watcher cycle without a restart.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SETTINGS_FILE_NAME: &str = "SharpTidySettings.json";

const SETTINGS_DIRECTORY: &str = "ProjectSettings";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SharpTidySettings {
    /// Skip project-file processing entirely.
    pub disable_cleanup: bool,

    /// Never inject analyzer package references or the analyzer-removal target.
    pub disable_analyzer_injection: bool,

    /// Log a processing report for every file, not just failures.
    pub verbose_logging: bool,
}

impl SharpTidySettings {
    /// Load settings from the project, writing a default file when none
    /// exists yet. Unreadable or corrupt settings fall back to defaults.
    pub fn load(project_root: &Path) -> Self {
        let path = Self::file_path(project_root);

        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|error| {
                warn!("ignoring corrupt settings file {}: {error}", path.display());
                Self::default()
            }),
            Err(_) => {
                let settings = Self::default();
                if let Err(error) = settings.save(project_root) {
                    debug!("could not persist default settings: {error:#}");
                }
                settings
            }
        }
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        let directory = project_root.join(SETTINGS_DIRECTORY);
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("failed to create {}", directory.display()))?;

        let path = directory.join(SETTINGS_FILE_NAME);
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, serialized)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(())
    }

    fn file_path(project_root: &Path) -> PathBuf {
        project_root.join(SETTINGS_DIRECTORY).join(SETTINGS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults() {
        let tmp = TempDir::new().unwrap();

        let settings = SharpTidySettings::load(tmp.path());
        assert!(!settings.disable_cleanup);
        assert!(!settings.disable_analyzer_injection);
        assert!(!settings.verbose_logging);

        assert!(tmp
            .path()
            .join(SETTINGS_DIRECTORY)
            .join(SETTINGS_FILE_NAME)
            .exists());
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();

        let settings = SharpTidySettings {
            disable_cleanup: false,
            disable_analyzer_injection: true,
            verbose_logging: true,
        };
        settings.save(tmp.path()).unwrap();

        let loaded = SharpTidySettings::load(tmp.path());
        assert!(loaded.disable_analyzer_injection);
        assert!(loaded.verbose_logging);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let directory = tmp.path().join(SETTINGS_DIRECTORY);
        std::fs::create_dir_all(&directory).unwrap();
        std::fs::write(directory.join(SETTINGS_FILE_NAME), "{ not json").unwrap();

        let settings = SharpTidySettings::load(tmp.path());
        assert!(!settings.disable_cleanup);
    }

    #[test]
    fn unknown_and_missing_keys_are_tolerated() {
        let tmp = TempDir::new().unwrap();
        let directory = tmp.path().join(SETTINGS_DIRECTORY);
        std::fs::create_dir_all(&directory).unwrap();
        std::fs::write(
            directory.join(SETTINGS_FILE_NAME),
            r#"{"verboseLogging": true, "futureKnob": 42}"#,
        )
        .unwrap();

        let settings = SharpTidySettings::load(tmp.path());
        assert!(settings.verbose_logging);
        assert!(!settings.disable_analyzer_injection);
    }
}
