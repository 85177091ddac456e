// SettingsManager Service
// Handles server settings persistence and environment overrides

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;

use crate::models::ServerSettings;

/// Manages server settings storage and retrieval
pub struct SettingsManager {
    settings_path: PathBuf,
    data_dir: PathBuf,
    cache: RwLock<Option<ServerSettings>>,
}

impl SettingsManager {
    /// Create a new SettingsManager with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        let settings_path = data_dir.join("settings.json");
        Self {
            settings_path,
            data_dir,
            cache: RwLock::new(None),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load settings from disk, or return defaults if not found. Keys added
    /// since the file was written are filled in and persisted.
    pub fn load(&self) -> Result<ServerSettings, String> {
        if let Ok(cache) = self.cache.read() {
            if let Some(ref settings) = *cache {
                return Ok(settings.clone());
            }
        }

        let settings = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)
                .map_err(|e| format!("Failed to read settings: {e}"))?;

            let mut user_value: Value = serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse settings: {e}"))?;

            let defaults_value = serde_json::to_value(ServerSettings::default())
                .map_err(|e| format!("Failed to build default settings: {e}"))?;
            let changed = merge_missing_settings(&mut user_value, &defaults_value);

            let settings: ServerSettings = serde_json::from_value(user_value)
                .map_err(|e| format!("Failed to parse settings: {e}"))?;

            if changed {
                self.save_internal(&settings)?;
            }
            settings
        } else {
            let defaults = ServerSettings::default();
            self.save_internal(&defaults)?;
            defaults
        };

        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(settings.clone());
        }

        Ok(settings)
    }

    fn save_internal(&self, settings: &ServerSettings) -> Result<(), String> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {e}"))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;

        std::fs::write(&self.settings_path, content)
            .map_err(|e| format!("Failed to write settings: {e}"))
    }

    /// Working copies root: configured directory or `<data dir>/workspaces`
    pub fn workspaces_dir(&self, settings: &ServerSettings) -> PathBuf {
        if settings.workspaces_dir.trim().is_empty() {
            self.data_dir.join("workspaces")
        } else {
            resolve_against(&self.data_dir, &settings.workspaces_dir)
        }
    }

    /// Persisted documents root
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }
}

/// Relative settings paths are taken from the current directory, as the
/// themes directory usually lives next to the server binary
pub fn resolve_against(base: &Path, configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|dir| dir.join(&path))
        .unwrap_or_else(|_| base.join(&path))
}

/// Apply `THEMEFORGE_*` environment overrides on top of loaded settings
pub fn apply_env_overrides(settings: &mut ServerSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut ServerSettings, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(host) = get("THEMEFORGE_HOST") {
        settings.host = host;
    }
    if let Some(port) = get("THEMEFORGE_PORT") {
        match port.parse() {
            Ok(port) => settings.port = port,
            Err(_) => log::warn!("Ignoring invalid THEMEFORGE_PORT '{port}'"),
        }
    }
    if let Some(token) = get("THEMEFORGE_API_TOKEN") {
        settings.api_token = token;
    }
    if let Some(themes_dir) = get("THEMEFORGE_THEMES_DIR") {
        settings.themes_dir = themes_dir;
    }
    if let Some(limit) = get("THEMEFORGE_RATE_LIMIT") {
        match limit.parse() {
            Ok(limit) => settings.rate_limit_per_minute = limit,
            Err(_) => log::warn!("Ignoring invalid THEMEFORGE_RATE_LIMIT '{limit}'"),
        }
    }
}

fn merge_missing_settings(target: &mut Value, defaults: &Value) -> bool {
    match (target, defaults) {
        (Value::Object(target_map), Value::Object(defaults_map)) => {
            let mut changed = false;
            for (key, default_value) in defaults_map {
                match target_map.get_mut(key) {
                    Some(target_value) => {
                        if merge_missing_settings(target_value, default_value) {
                            changed = true;
                        }
                    }
                    None => {
                        target_map.insert(key.clone(), default_value.clone());
                        changed = true;
                    }
                }
            }
            changed
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        let settings = manager.load().unwrap();
        assert_eq!(settings, ServerSettings::default());
        assert!(dir.path().join("settings.json").exists());
    }

    #[test]
    fn test_partial_file_is_completed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"port": 9000}"#).unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        let settings = manager.load().unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.export_timeout_secs, 300);

        let written = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(written.contains("\"exportTimeoutSecs\""));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("THEMEFORGE_PORT", "9100"),
            ("THEMEFORGE_API_TOKEN", " secret "),
            ("THEMEFORGE_RATE_LIMIT", "not-a-number"),
        ]);
        let mut settings = ServerSettings::default();
        apply_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.api_token, "secret");
        assert_eq!(settings.rate_limit_per_minute, 120);
    }

    #[test]
    fn test_default_workspaces_dir() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        let settings = ServerSettings::default();
        assert_eq!(manager.workspaces_dir(&settings), dir.path().join("workspaces"));
    }
}
