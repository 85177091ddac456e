use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::ThemeSummary;
use crate::services::{validate_path_within, validate_theme_id};

/// Fields of a theme's package manifest shown in listings
#[derive(Debug, Default, Deserialize)]
struct ThemeManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Canonical (pristine) theme directories. Exports never write here; they
/// work on a synced copy.
#[derive(Clone)]
pub struct ThemeManager {
    themes_dir: PathBuf,
    documents_dir: PathBuf,
}

impl ThemeManager {
    pub fn new(themes_dir: PathBuf, documents_dir: PathBuf) -> Self {
        log::info!(
            "ThemeManager: themes_dir={:?} (exists={})",
            themes_dir,
            themes_dir.exists()
        );
        Self {
            themes_dir,
            documents_dir,
        }
    }

    pub fn is_ready(&self) -> bool {
        fs::read_dir(&self.themes_dir).is_ok()
    }

    pub fn list_themes(&self) -> Vec<ThemeSummary> {
        let entries = match fs::read_dir(&self.themes_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to read themes directory {:?}: {e}", self.themes_dir);
                return Vec::new();
            }
        };

        let mut themes: Vec<ThemeSummary> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let id = entry.file_name().to_str()?.to_string();
                if validate_theme_id(&id).is_err() {
                    log::debug!("Skipping theme directory with invalid id {:?}", id);
                    return None;
                }
                Some(self.summarize(&id, &entry.path()))
            })
            .collect();
        themes.sort_by(|a, b| a.id.cmp(&b.id));
        themes
    }

    fn summarize(&self, id: &str, dir: &Path) -> ThemeSummary {
        let manifest = fs::read_to_string(dir.join("package.json"))
            .ok()
            .and_then(|raw| match serde_json::from_str::<ThemeManifest>(&raw) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    log::warn!("Invalid package.json in theme '{id}': {e}");
                    None
                }
            })
            .unwrap_or_default();

        ThemeSummary {
            id: id.to_string(),
            name: manifest
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| id.to_string()),
            version: manifest.version,
            has_document: self.documents_dir.join(format!("{id}.json")).is_file(),
        }
    }

    /// Canonical directory of a theme. A symlinked theme must still resolve
    /// inside the themes directory.
    pub fn theme_dir(&self, theme_id: &str) -> Result<PathBuf, String> {
        validate_theme_id(theme_id)?;
        let dir = self.themes_dir.join(theme_id);
        if !dir.is_dir() {
            return Err(format!("Theme not found: {theme_id}"));
        }
        validate_path_within(&dir, &self.themes_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_themes() {
        let root = tempdir().unwrap();
        let themes = root.path().join("themes");
        let documents = root.path().join("documents");
        fs::create_dir_all(themes.join("casper")).unwrap();
        fs::create_dir_all(themes.join("source")).unwrap();
        fs::create_dir_all(themes.join("Not Valid")).unwrap();
        fs::create_dir_all(&documents).unwrap();
        fs::write(
            themes.join("source/package.json"),
            r#"{"name": "Source Theme", "version": "1.2.0"}"#,
        )
        .unwrap();
        fs::write(documents.join("casper.json"), "{}").unwrap();

        let manager = ThemeManager::new(themes, documents);
        let listed = manager.list_themes();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "casper");
        assert_eq!(listed[0].name, "casper");
        assert!(listed[0].has_document);
        assert_eq!(listed[1].name, "Source Theme");
        assert_eq!(listed[1].version.as_deref(), Some("1.2.0"));
        assert!(!listed[1].has_document);
    }

    #[test]
    fn test_theme_dir_rejects_traversal() {
        let root = tempdir().unwrap();
        let manager = ThemeManager::new(root.path().to_path_buf(), root.path().join("documents"));
        assert!(manager.theme_dir("../etc").is_err());
        assert!(manager.theme_dir("missing").is_err());

        fs::create_dir_all(root.path().join("casper")).unwrap();
        let dir = manager.theme_dir("casper").unwrap();
        assert!(dir.ends_with("casper"));
    }
}
