// Packager
// Prepares the working copy for packaging (dependencies, package manifest)
// and turns it into a zip archive held in memory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tokio::process::Command;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{ExportArtifact, ThemeDocument};
use crate::services::{sanitize_filename, ExportError, ExportResult};

/// Marker left in `node_modules` once dependencies are installed; holds the
/// digest of the manifest they were installed from
pub const INSTALL_STAMP: &str = "node_modules/.themeforge-installed";

const PACKAGE_MANIFEST: &str = "package.json";

/// Entries never shipped in an archive
const ARCHIVE_EXCLUDED: [&str; 3] = ["node_modules", "dist", ".git"];

const STDERR_TAIL_LINES: usize = 20;

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Resolve a command's program through PATH, keeping the bare name when it
/// cannot be found so the spawn error names it
fn resolve_program(program: &str) -> PathBuf {
    which::which(program).unwrap_or_else(|_| PathBuf::from(program))
}

async fn run_command(command: &[String], working: &Path) -> Result<(), String> {
    let Some((program, args)) = command.split_first() else {
        return Err("empty command".to_string());
    };
    let output = Command::new(resolve_program(program))
        .args(args)
        .current_dir(working)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        ))
    }
}

/// Hex SHA-256 of the working copy's package manifest, if it has one
fn manifest_digest(working: &Path) -> Option<String> {
    let bytes = std::fs::read(working.join(PACKAGE_MANIFEST)).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(hex::encode(hasher.finalize()))
}

pub struct DependencyInstaller {
    command: Vec<String>,
}

impl DependencyInstaller {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Nothing to install, or installed from the current manifest
    pub fn is_satisfied(working: &Path) -> bool {
        let Some(digest) = manifest_digest(working) else {
            return true;
        };
        std::fs::read_to_string(working.join(INSTALL_STAMP))
            .is_ok_and(|stamp| stamp.trim() == digest)
    }

    /// Install dependencies once per working copy. Returns whether an install ran.
    pub async fn ensure(&self, working: &Path) -> ExportResult<bool> {
        if Self::is_satisfied(working) {
            log::debug!("[Dependencies] Already satisfied in {working:?}");
            return Ok(false);
        }
        if self.command.is_empty() {
            log::info!("[Dependencies] No install command configured, skipping");
            return Ok(false);
        }

        log::info!("[Dependencies] Running {:?} in {working:?}", self.command);
        run_command(&self.command, working)
            .await
            .map_err(ExportError::DependencyInstall)?;

        let Some(digest) = manifest_digest(working) else {
            return Ok(true);
        };
        let stamp = working.join(INSTALL_STAMP);
        if let Some(parent) = stamp.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ExportError::io(parent, e))?;
        }
        tokio::fs::write(&stamp, digest)
            .await
            .map_err(|e| ExportError::io(&stamp, e))?;
        Ok(true)
    }
}

/// Replace the working copy's package manifest with the document's raw
/// settings file, when the document carries one
pub fn apply_settings_file(working: &Path, document: &ThemeDocument) -> ExportResult<bool> {
    let Some(raw) = document.settings_file.as_deref() else {
        return Ok(false);
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ExportError::InvalidSettingsFile(e.to_string()))?;
    if !value.is_object() {
        return Err(ExportError::InvalidSettingsFile(
            "settings file must be a JSON object".to_string(),
        ));
    }
    let pretty = serde_json::to_string_pretty(&value)
        .map_err(|e| ExportError::InvalidSettingsFile(e.to_string()))?;
    let path = working.join(PACKAGE_MANIFEST);
    std::fs::write(&path, format!("{pretty}\n")).map_err(|e| ExportError::io(&path, e))?;
    log::info!("[SettingsFile] Wrote {PACKAGE_MANIFEST} from document");
    Ok(true)
}

/// Package name from the working copy's manifest, else the document name slug
pub fn package_identifier(working: &Path, document: &ThemeDocument) -> String {
    let from_manifest = std::fs::read_to_string(working.join(PACKAGE_MANIFEST))
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .and_then(|manifest| {
            manifest
                .get("name")
                .and_then(|name| name.as_str())
                .map(sanitize_filename)
        })
        .filter(|name| !name.trim().is_empty());
    from_manifest.unwrap_or_else(|| document.package_identifier())
}

fn is_archive_excluded(relative: &Path) -> bool {
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| ARCHIVE_EXCLUDED.contains(&name) || name.starts_with('.'))
    })
}

/// Zip `source` into `dest` with deflate compression. Returns the file count.
pub fn write_zip(source: &Path, dest: &Path) -> ExportResult<usize> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
    }
    let file = File::create(dest).map_err(|e| ExportError::io(dest, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(source)
                .map(|relative| !is_archive_excluded(relative))
                .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|e| ExportError::Packaging(format!("Failed to walk working copy: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| ExportError::Packaging(e.to_string()))?;
        let name = relative.to_string_lossy().replace('\\', "/");

        writer
            .start_file(name, options)
            .map_err(|e| ExportError::Packaging(e.to_string()))?;
        let mut input = File::open(entry.path()).map_err(|e| ExportError::io(entry.path(), e))?;
        std::io::copy(&mut input, &mut writer).map_err(|e| ExportError::io(entry.path(), e))?;
        count += 1;
    }

    let mut inner = writer
        .finish()
        .map_err(|e| ExportError::Packaging(e.to_string()))?;
    inner.flush().map_err(|e| ExportError::io(dest, e))?;
    Ok(count)
}

/// Newest `.zip` file directly inside `dir`
pub fn newest_archive(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        })
        .max_by_key(|path| {
            std::fs::metadata(path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        })
}

pub struct Archiver {
    /// External archiver; empty selects the built-in zip writer
    command: Vec<String>,
    output_dir: String,
}

impl Archiver {
    pub fn new(command: Vec<String>, output_dir: impl Into<String>) -> Self {
        Self {
            command,
            output_dir: output_dir.into(),
        }
    }

    /// Archive the working copy and read the result into memory
    pub async fn package(&self, working: &Path, package: &str) -> ExportResult<ExportArtifact> {
        let output_dir = working.join(&self.output_dir);

        let archive = if self.command.is_empty() {
            let dest = output_dir.join(format!("{package}.zip"));
            let (source, target) = (working.to_path_buf(), dest.clone());
            let count = tokio::task::spawn_blocking(move || write_zip(&source, &target))
                .await
                .map_err(|e| ExportError::Packaging(format!("Archive task failed: {e}")))??;
            log::info!("[Packager] Wrote {count} file(s) to {dest:?}");
            dest
        } else {
            log::info!("[Packager] Running {:?} in {working:?}", self.command);
            run_command(&self.command, working)
                .await
                .map_err(ExportError::Packaging)?;
            newest_archive(&output_dir).ok_or_else(|| {
                ExportError::Packaging(format!("No archive produced in {output_dir:?}"))
            })?
        };

        let bytes = tokio::fs::read(&archive)
            .await
            .map_err(|e| ExportError::io(&archive, e))?;
        let filename = archive
            .file_name()
            .and_then(|name| name.to_str())
            .map(sanitize_filename)
            .unwrap_or_else(|| format!("{package}.zip"));

        Ok(ExportArtifact {
            filename,
            bytes: bytes::Bytes::from(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_dependencies_satisfied_without_manifest() {
        let dir = tempdir().unwrap();
        assert!(DependencyInstaller::is_satisfied(dir.path()));
        write(dir.path(), "package.json", "{}");
        assert!(!DependencyInstaller::is_satisfied(dir.path()));
        write(dir.path(), INSTALL_STAMP, "");
        assert!(!DependencyInstaller::is_satisfied(dir.path()));
        write(dir.path(), INSTALL_STAMP, &manifest_digest(dir.path()).unwrap());
        assert!(DependencyInstaller::is_satisfied(dir.path()));
    }

    #[test]
    fn test_manifest_change_invalidates_install_stamp() {
        let dir = tempdir().unwrap();
        write(dir.path(), "package.json", r#"{"name":"casper"}"#);
        write(dir.path(), INSTALL_STAMP, &manifest_digest(dir.path()).unwrap());
        assert!(DependencyInstaller::is_satisfied(dir.path()));

        let mut doc = ThemeDocument::default();
        doc.settings_file =
            Some(r#"{"name":"casper","devDependencies":{"gscan":"4.0.0"}}"#.to_string());
        apply_settings_file(dir.path(), &doc).unwrap();
        assert!(!DependencyInstaller::is_satisfied(dir.path()));
    }

    #[tokio::test]
    async fn test_failed_install_reports_stderr() {
        let dir = tempdir().unwrap();
        write(dir.path(), "package.json", "{}");
        let installer = DependencyInstaller::new(vec!["themeforge-no-such-binary".to_string()]);
        let err = installer.ensure(dir.path()).await.unwrap_err();
        assert!(matches!(err, ExportError::DependencyInstall(_)));
        assert!(!dir.path().join(INSTALL_STAMP).exists());
    }

    #[test]
    fn test_settings_file_validation() {
        let dir = tempdir().unwrap();
        let mut doc = ThemeDocument::default();
        assert!(!apply_settings_file(dir.path(), &doc).unwrap());

        doc.settings_file = Some("[1, 2]".to_string());
        assert!(matches!(
            apply_settings_file(dir.path(), &doc),
            Err(ExportError::InvalidSettingsFile(_))
        ));

        doc.settings_file = Some(r#"{"name":"my-theme","version":"1.0.0"}"#.to_string());
        assert!(apply_settings_file(dir.path(), &doc).unwrap());
        assert_eq!(package_identifier(dir.path(), &doc), "my-theme");
    }

    #[test]
    fn test_package_identifier_falls_back_to_document_name() {
        let dir = tempdir().unwrap();
        let mut doc = ThemeDocument::default();
        doc.name = "My Great Theme".to_string();
        assert_eq!(package_identifier(dir.path(), &doc), "my-great-theme");
    }

    #[tokio::test]
    async fn test_builtin_archiver_skips_build_artifacts() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.hbs", "index");
        write(dir.path(), "partials/cards.hbs", "cards");
        write(dir.path(), "node_modules/pkg/index.js", "x");
        write(dir.path(), "dist/old.zip", "stale");
        write(dir.path(), ".env", "secret");

        let archiver = Archiver::new(Vec::new(), "dist");
        let artifact = archiver.package(dir.path(), "demo").await.unwrap();
        assert_eq!(artifact.filename, "demo.zip");

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(artifact.bytes.to_vec())).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["index.hbs", "partials/cards.hbs"]);

        let mut content = String::new();
        archive
            .by_name("partials/cards.hbs")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "cards");
    }
}
