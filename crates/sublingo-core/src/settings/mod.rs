//! Preference Persistence
//!
//! Stores the viewer's transform preferences with:
//! - Atomic file writes (temp file + rename)
//! - Schema validation with defaults
//! - Migration support for schema changes
//!
//! Storage location: {config_dir}/preferences.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::transform::TransformMode;

/// Preferences schema version for migration support
pub const PREFERENCES_VERSION: u32 = 1;

/// Preferences file name
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const PREFERENCES_LOCK_FILE: &str = "preferences.json.lock";

// ============================================================
// Preferences
// ============================================================

/// Viewer transform preferences
///
/// The serialized keys (`mode`, `fromLanguage`, `toLanguage`) are the
/// stable storage schema; renaming a field is a schema migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Transform mode applied to active cue text
    #[serde(default)]
    pub mode: TransformMode,

    /// Source language override; empty means "use the track's language"
    #[serde(default)]
    pub from_language: String,

    /// Target language for the transform
    #[serde(default = "default_to_language")]
    pub to_language: String,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

fn default_to_language() -> String {
    "en".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            mode: TransformMode::default(),
            from_language: String::new(),
            to_language: default_to_language(),
        }
    }
}

impl Preferences {
    /// Normalizes preferences so persisted state is always valid.
    ///
    /// Tolerant on purpose: corrects bad values instead of failing, so an
    /// old or hand-edited file never breaks loading.
    pub fn normalize(&mut self) {
        self.version = PREFERENCES_VERSION;

        self.from_language = self.from_language.trim().to_ascii_lowercase();
        self.to_language = self.to_language.trim().to_ascii_lowercase();

        // an empty target makes every transform an identity; restore the
        // fallback instead
        if self.to_language.is_empty() {
            self.to_language = default_to_language();
        }
    }
}

// ============================================================
// Preferences Store
// ============================================================

/// Store for loading, saving, and resetting preferences
pub struct PreferencesStore {
    preferences_path: PathBuf,
}

impl PreferencesStore {
    /// Creates a new store rooted at the given config directory
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            preferences_path: config_dir.join(PREFERENCES_FILE),
        }
    }

    /// Platform config directory for this application, if resolvable
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sublingo"))
    }

    /// Path of the preferences file
    pub fn preferences_path(&self) -> &PathBuf {
        &self.preferences_path
    }

    fn lock_path(&self) -> PathBuf {
        self.preferences_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(PREFERENCES_LOCK_FILE)
    }

    fn with_lock<T>(
        &self,
        exclusive: bool,
        op: impl FnOnce() -> Result<T, String>,
    ) -> Result<T, String> {
        // the lock file needs its parent directory to exist
        if let Some(parent) = self.preferences_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create preferences directory: {}", e))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| format!("Failed to open preferences lock file: {}", e))?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)
                .map_err(|e| format!("Failed to lock preferences file (exclusive): {}", e))?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)
                .map_err(|e| format!("Failed to lock preferences file (shared): {}", e))?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock preferences lock file: {}", e);
        }

        result
    }

    /// Loads preferences from disk, returning defaults if the file doesn't
    /// exist or fails to parse
    pub fn load(&self) -> Preferences {
        let result = self.with_lock(false, || {
            if !self.preferences_path.exists() {
                info!("Preferences file not found, using defaults");
                return Ok(Preferences::default());
            }

            let content = fs::read_to_string(&self.preferences_path)
                .map_err(|e| format!("Failed to read preferences file: {}", e))?;

            let mut preferences = serde_json::from_str::<Preferences>(&content)
                .map_err(|e| format!("Failed to parse preferences file: {}", e))?;

            if preferences.version < PREFERENCES_VERSION {
                info!(
                    "Migrating preferences from version {} to {}",
                    preferences.version, PREFERENCES_VERSION
                );
                preferences = self.migrate(preferences);
            }

            preferences.normalize();
            Ok(preferences)
        });

        match result {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        }
    }

    /// Saves preferences to disk using atomic write (temp file + rename)
    pub fn save(&self, preferences: &Preferences) -> Result<Preferences, String> {
        self.with_lock(true, || {
            let mut normalized = preferences.clone();
            normalized.normalize();

            let content = serde_json::to_string_pretty(&normalized)
                .map_err(|e| format!("Failed to serialize preferences: {}", e))?;

            // Atomic write: write to temp file, then rename.
            // Note: std::fs::rename does not overwrite on Windows.
            let temp_path = self.preferences_path.with_extension("json.tmp");
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }

            let mut file = fs::File::create(&temp_path)
                .map_err(|e| format!("Failed to create temp preferences file: {}", e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| format!("Failed to write preferences: {}", e))?;
            file.sync_all()
                .map_err(|e| format!("Failed to sync preferences file: {}", e))?;

            if cfg!(windows) {
                // Windows: rename does not overwrite, so we use a backup-then-swap.
                let backup_path = self.preferences_path.with_extension("json.bak");
                if backup_path.exists() {
                    let _ = fs::remove_file(&backup_path);
                }

                if self.preferences_path.exists() {
                    fs::rename(&self.preferences_path, &backup_path).map_err(|e| {
                        format!("Failed to backup existing preferences file: {}", e)
                    })?;
                }

                match fs::rename(&temp_path, &self.preferences_path) {
                    Ok(()) => {
                        if backup_path.exists() {
                            let _ = fs::remove_file(&backup_path);
                        }
                    }
                    Err(e) => {
                        // Best-effort restore.
                        if backup_path.exists() {
                            let _ = fs::rename(&backup_path, &self.preferences_path);
                        }
                        return Err(format!("Failed to finalize preferences file: {}", e));
                    }
                }
            } else {
                fs::rename(&temp_path, &self.preferences_path)
                    .map_err(|e| format!("Failed to finalize preferences file: {}", e))?;
            }

            info!("Preferences saved to {:?}", self.preferences_path);
            Ok(normalized)
        })
    }

    /// Resets preferences to defaults and deletes the preferences file
    pub fn reset(&self) -> Result<Preferences, String> {
        self.with_lock(true, || {
            if self.preferences_path.exists() {
                fs::remove_file(&self.preferences_path)
                    .map_err(|e| format!("Failed to delete preferences file: {}", e))?;
                info!("Preferences file deleted");
            }
            Ok(Preferences::default())
        })
    }

    /// Migrates preferences from an older version
    fn migrate(&self, mut preferences: Preferences) -> Preferences {
        // Future migrations would go here
        preferences.version = PREFERENCES_VERSION;
        preferences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_preferences() {
        let preferences = Preferences::default();
        assert_eq!(preferences.version, PREFERENCES_VERSION);
        assert_eq!(preferences.mode, TransformMode::Transliterate);
        assert_eq!(preferences.from_language, "");
        assert_eq!(preferences.to_language, "en");
    }

    #[test]
    fn test_preferences_serialization() {
        let preferences = Preferences::default();
        let json = serde_json::to_string(&preferences).unwrap();
        let deserialized: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(preferences, deserialized);
    }

    #[test]
    fn test_preferences_storage_keys_are_camel_case() {
        let preferences = Preferences {
            version: PREFERENCES_VERSION,
            mode: TransformMode::Translate,
            from_language: "hi".to_string(),
            to_language: "en".to_string(),
        };
        let json = serde_json::to_string(&preferences).unwrap();

        assert!(json.contains("\"mode\":\"translate\""));
        assert!(json.contains("\"fromLanguage\":\"hi\""));
        assert!(json.contains("\"toLanguage\":\"en\""));
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let mut preferences = Preferences {
            version: PREFERENCES_VERSION,
            mode: TransformMode::Transliterate,
            from_language: "  HI ".to_string(),
            to_language: "EN-us".to_string(),
        };
        preferences.normalize();

        assert_eq!(preferences.from_language, "hi");
        assert_eq!(preferences.to_language, "en-us");
    }

    #[test]
    fn test_normalize_restores_empty_target() {
        let mut preferences = Preferences {
            to_language: "   ".to_string(),
            ..Default::default()
        };
        preferences.normalize();
        assert_eq!(preferences.to_language, "en");
    }

    #[test]
    fn test_normalize_keeps_empty_source() {
        let mut preferences = Preferences::default();
        preferences.normalize();
        // empty source means "use the track's language"; it must survive
        assert_eq!(preferences.from_language, "");
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        let preferences = store.load();
        assert_eq!(preferences, Preferences::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        let preferences = Preferences {
            version: PREFERENCES_VERSION,
            mode: TransformMode::Translate,
            from_language: "es".to_string(),
            to_language: "en".to_string(),
        };
        store.save(&preferences).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.mode, TransformMode::Translate);
        assert_eq!(loaded.from_language, "es");
        assert_eq!(loaded.to_language, "en");
    }

    #[test]
    fn test_invalid_json_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PREFERENCES_FILE);
        fs::write(&path, "invalid json {{{").unwrap();

        let store = PreferencesStore::new(temp_dir.path().to_path_buf());
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_partial_json_uses_defaults_for_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PREFERENCES_FILE);
        fs::write(&path, r#"{"mode": "translate"}"#).unwrap();

        let store = PreferencesStore::new(temp_dir.path().to_path_buf());
        let preferences = store.load();

        assert_eq!(preferences.mode, TransformMode::Translate);
        assert_eq!(preferences.from_language, "");
        assert_eq!(preferences.to_language, "en");
        assert_eq!(preferences.version, PREFERENCES_VERSION);
    }

    #[test]
    fn test_versionless_file_loads() {
        // files written before the version field existed carry only the
        // storage keys
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(PREFERENCES_FILE);
        fs::write(
            &path,
            r#"{"mode": "transliterate", "fromLanguage": "hi", "toLanguage": "en"}"#,
        )
        .unwrap();

        let store = PreferencesStore::new(temp_dir.path().to_path_buf());
        let preferences = store.load();

        assert_eq!(preferences.mode, TransformMode::Transliterate);
        assert_eq!(preferences.from_language, "hi");
        assert_eq!(preferences.version, PREFERENCES_VERSION);
    }

    #[test]
    fn test_save_normalizes_before_persisting() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        let preferences = Preferences {
            version: PREFERENCES_VERSION,
            mode: TransformMode::Transliterate,
            from_language: " HI ".to_string(),
            to_language: String::new(),
        };
        let saved = store.save(&preferences).unwrap();

        assert_eq!(saved.from_language, "hi");
        assert_eq!(saved.to_language, "en");
        assert_eq!(store.load(), saved);
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        store.save(&Preferences::default()).unwrap();

        // Temp file should not exist after successful write
        let temp_path = store.preferences_path().with_extension("json.tmp");
        assert!(!temp_path.exists());
        assert!(store.preferences_path().exists());
    }

    #[test]
    fn test_reset_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        store.save(&Preferences::default()).unwrap();
        assert!(store.preferences_path().exists());

        let reset = store.reset().unwrap();
        assert!(!store.preferences_path().exists());
        assert_eq!(reset, Preferences::default());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("dir");
        let store = PreferencesStore::new(nested);

        assert!(store.save(&Preferences::default()).is_ok());
        assert!(store.preferences_path().exists());
    }

    #[test]
    fn test_save_twice_overwrites_successfully() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferencesStore::new(temp_dir.path().to_path_buf());

        let first = Preferences {
            to_language: "en".to_string(),
            ..Default::default()
        };
        store.save(&first).unwrap();

        let second = Preferences {
            to_language: "hi".to_string(),
            ..Default::default()
        };
        store.save(&second).unwrap();

        assert_eq!(store.load().to_language, "hi");
    }
}
