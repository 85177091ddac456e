// Themeforge Path Validation Service
// Keeps theme ids, working-copy paths and download names inside their roots

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

const THEME_ID_PATTERN: &str = r"^[a-z0-9][a-z0-9-_]{0,63}$";

static THEME_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// Validate that a path is within an allowed directory (prevents path traversal attacks).
///
/// # Arguments
/// * `path` - The path to validate
/// * `allowed_dir` - The directory the path must be within
///
/// # Returns
/// * `Ok(PathBuf)` - The canonicalized path if valid
/// * `Err(String)` - Error message if validation fails
pub fn validate_path_within(path: &Path, allowed_dir: &Path) -> Result<PathBuf, String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| format!("Invalid path: {e}"))?;
    let allowed_canonical = allowed_dir
        .canonicalize()
        .map_err(|e| format!("Invalid allowed directory: {e}"))?;

    if !canonical.starts_with(&allowed_canonical) {
        return Err("Path traversal detected: path outside allowed directory".to_string());
    }

    Ok(canonical)
}

/// Validate a workspace-relative path: no root, no prefix, no `..` components.
pub fn validate_relative_path(rel: &str) -> Result<PathBuf, String> {
    if rel.trim().is_empty() {
        return Err("Path cannot be empty".to_string());
    }
    let path = Path::new(rel);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("Path traversal detected in '{rel}'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("Absolute path not allowed: '{rel}'"));
            }
        }
    }
    Ok(path.to_path_buf())
}

/// Validate a theme identifier used as a directory name
pub fn validate_theme_id(theme_id: &str) -> Result<(), String> {
    let id_regex = THEME_ID_REGEX.get_or_init(|| {
        Regex::new(THEME_ID_PATTERN).expect("theme id pattern is valid")
    });
    if !id_regex.is_match(theme_id) {
        return Err("Theme id must be lowercase alphanumeric with dashes or underscores".to_string());
    }
    Ok(())
}

/// Sanitize a filename to prevent directory traversal.
/// Removes any path separators and '..' sequences.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .replace(['/', '\\', '"'], "_")
        .replace("..", "_")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_path_traversal() {
        let temp = tempdir().unwrap();
        let allowed = temp.path().join("themes");
        fs::create_dir_all(&allowed).unwrap();
        fs::create_dir_all(temp.path().join("outside")).unwrap();
        let bad_path = allowed.join("../outside");

        let result = validate_path_within(&bad_path, &allowed);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("traversal"));
    }

    #[test]
    fn test_accepts_valid_path() {
        let temp = tempdir().unwrap();
        let allowed = temp.path();
        let theme_dir = allowed.join("casper");
        fs::create_dir_all(&theme_dir).unwrap();

        let result = validate_path_within(&theme_dir, allowed);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_relative_path() {
        assert!(validate_relative_path("partials/cards-2.hbs").is_ok());
        assert!(validate_relative_path("./home.hbs").is_ok());
        assert!(validate_relative_path("../home.hbs").is_err());
        assert!(validate_relative_path("partials/../../x").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("").is_err());
    }

    #[test]
    fn test_validate_theme_id() {
        assert!(validate_theme_id("source-pro").is_ok());
        assert!(validate_theme_id("Source").is_err());
        assert!(validate_theme_id("../x").is_err());
        assert!(validate_theme_id("").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("theme.zip"), "theme.zip");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_filename("file\\na\"me"), "file_na_me");
    }
}
