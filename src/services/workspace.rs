// Template Workspace
// Rooted read/write access to theme template files. Compiler logic only talks
// to this trait so it can run against an in-memory theme in tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use walkdir::WalkDir;

use crate::services::{validate_relative_path, ExportError, ExportResult};

/// Top-level entries never copied into a working copy
const EXCLUDED_ENTRIES: [&str; 4] = ["node_modules", "dist", ".git", ".DS_Store"];

/// Editor-only partial, never shipped in an export
pub const INTERNAL_HERO_PARTIAL: &str = "partials/sections/hero.hbs";

/// Directory kept across syncs so dependency installation is not repeated
const PRESERVED_ENTRY: &str = "node_modules";

pub trait TemplateWorkspace: Send + Sync {
    /// Read a file; `Ok(None)` when it does not exist
    fn read(&self, rel: &str) -> ExportResult<Option<String>>;
    fn write(&self, rel: &str, content: &str) -> ExportResult<()>;
    fn exists(&self, rel: &str) -> bool;
    /// Directory backing the workspace; `None` when it lives in memory
    fn root(&self) -> Option<&Path>;
}

/// Workspace over a directory on disk
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, rel: &str) -> ExportResult<PathBuf> {
        let relative = validate_relative_path(rel).map_err(ExportError::Workspace)?;
        Ok(self.root.join(relative))
    }
}

impl TemplateWorkspace for FsWorkspace {
    fn read(&self, rel: &str) -> ExportResult<Option<String>> {
        let path = self.resolve(rel)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ExportError::io(path, e)),
        }
    }

    fn write(&self, rel: &str, content: &str) -> ExportResult<()> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| ExportError::io(path, e))
    }

    fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|path| path.is_file()).unwrap_or(false)
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// In-memory workspace, keyed by relative path
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, rel: &str, content: &str) -> Self {
        if let Ok(mut files) = self.files.write() {
            files.insert(rel.to_string(), content.to_string());
        }
        self
    }

    pub fn get(&self, rel: &str) -> Option<String> {
        self.files.read().ok().and_then(|files| files.get(rel).cloned())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl TemplateWorkspace for MemoryWorkspace {
    fn read(&self, rel: &str) -> ExportResult<Option<String>> {
        validate_relative_path(rel).map_err(ExportError::Workspace)?;
        Ok(self.get(rel))
    }

    fn write(&self, rel: &str, content: &str) -> ExportResult<()> {
        validate_relative_path(rel).map_err(ExportError::Workspace)?;
        let mut files = self
            .files
            .write()
            .map_err(|_| ExportError::Workspace("workspace lock poisoned".to_string()))?;
        files.insert(rel.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, rel: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(rel))
            .unwrap_or(false)
    }

    fn root(&self) -> Option<&Path> {
        None
    }
}

fn is_excluded(relative: &Path) -> bool {
    let mut components = relative.components();
    let first = components
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .unwrap_or("");
    if EXCLUDED_ENTRIES.contains(&first) {
        return true;
    }
    let normalized = relative.to_string_lossy().replace('\\', "/");
    normalized == INTERNAL_HERO_PARTIAL
        || relative
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == ".DS_Store")
}

/// Reset `working` to a fresh copy of `canonical`. Everything except the
/// preserved dependency directory is removed first, so files written by an
/// interrupted export never leak into the next one.
pub fn sync_working_copy(canonical: &Path, working: &Path) -> ExportResult<usize> {
    if !canonical.is_dir() {
        return Err(ExportError::Workspace(format!(
            "Theme directory {canonical:?} does not exist"
        )));
    }
    fs::create_dir_all(working).map_err(|e| ExportError::io(working, e))?;

    for entry in fs::read_dir(working).map_err(|e| ExportError::io(working, e))?.flatten() {
        if entry.file_name() == PRESERVED_ENTRY {
            continue;
        }
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| ExportError::io(&path, e))?;
    }

    let mut copied = 0;
    let walker = WalkDir::new(canonical).min_depth(1).into_iter().filter_entry(|entry| {
        entry
            .path()
            .strip_prefix(canonical)
            .map(|relative| !is_excluded(relative))
            .unwrap_or(false)
    });

    for entry in walker {
        let entry = entry.map_err(|e| ExportError::Workspace(format!("Failed to walk theme: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(canonical)
            .map_err(|e| ExportError::Workspace(e.to_string()))?;
        let dest = working.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| ExportError::io(&dest, e))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| ExportError::io(&dest, e))?;
            copied += 1;
        }
    }

    log::info!("[Workspace] Synced {copied} file(s) from {canonical:?} to {working:?}");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_workspace_roundtrip() {
        let ws = MemoryWorkspace::new().with_file("home.hbs", "a");
        assert_eq!(ws.read("home.hbs").unwrap().as_deref(), Some("a"));
        assert_eq!(ws.read("missing.hbs").unwrap(), None);
        ws.write("partials/x.hbs", "b").unwrap();
        assert!(ws.exists("partials/x.hbs"));
    }

    #[test]
    fn test_workspace_rejects_escaping_paths() {
        let ws = MemoryWorkspace::new();
        assert!(ws.write("../outside.hbs", "x").is_err());
        assert!(ws.write("/etc/passwd", "x").is_err());
    }

    #[test]
    fn test_fs_workspace_read_write() {
        let temp = tempdir().unwrap();
        let ws = FsWorkspace::new(temp.path());
        assert_eq!(ws.read("partials/card.hbs").unwrap(), None);
        ws.write("partials/card.hbs", "card").unwrap();
        assert!(ws.exists("partials/card.hbs"));
        assert_eq!(ws.read("partials/card.hbs").unwrap().as_deref(), Some("card"));
    }

    #[test]
    fn test_sync_excludes_artifacts_and_internal_hero() {
        let canonical = tempdir().unwrap();
        let working = tempdir().unwrap();
        let root = canonical.path();
        fs::create_dir_all(root.join("partials/sections")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("home.hbs"), "home").unwrap();
        fs::write(root.join("partials/sections/hero.hbs"), "hero").unwrap();
        fs::write(root.join("partials/sections/cta.hbs"), "cta").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join("dist/old.zip"), "zip").unwrap();

        fs::create_dir_all(working.path().join("node_modules")).unwrap();
        fs::write(working.path().join("node_modules/.stamp"), "").unwrap();
        fs::write(working.path().join("stale.hbs"), "stale").unwrap();

        let copied = sync_working_copy(root, working.path()).unwrap();
        assert_eq!(copied, 2);
        assert!(working.path().join("home.hbs").exists());
        assert!(working.path().join("partials/sections/cta.hbs").exists());
        assert!(!working.path().join("partials/sections/hero.hbs").exists());
        assert!(!working.path().join("dist").exists());
        assert!(!working.path().join("stale.hbs").exists());
        assert!(working.path().join("node_modules/.stamp").exists());
    }

    #[test]
    fn test_sync_missing_canonical_fails() {
        let working = tempdir().unwrap();
        let missing = working.path().join("nope");
        assert!(sync_working_copy(&missing, working.path()).is_err());
    }
}
