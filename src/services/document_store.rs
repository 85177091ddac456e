// Document Store
// Read-only access to customization documents persisted by the editor,
// one `<theme id>.json` per theme.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ThemeDocument;
use crate::services::validate_theme_id;

#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error("No saved document for theme '{0}'")]
    NotFound(String),

    #[error("Invalid theme id: {0}")]
    InvalidId(String),

    #[error("Saved document for '{theme_id}' is unreadable: {message}")]
    Corrupt { theme_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct DocumentStore {
    documents_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(documents_dir: PathBuf) -> Self {
        Self { documents_dir }
    }

    fn document_path(&self, theme_id: &str) -> Result<PathBuf, DocumentStoreError> {
        validate_theme_id(theme_id).map_err(DocumentStoreError::InvalidId)?;
        Ok(self.documents_dir.join(format!("{theme_id}.json")))
    }

    /// Load a persisted document. Fields missing from older schema versions
    /// take their defaults.
    pub async fn load(&self, theme_id: &str) -> Result<ThemeDocument, DocumentStoreError> {
        let path = self.document_path(theme_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentStoreError::NotFound(theme_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let document: ThemeDocument =
            serde_json::from_str(&raw).map_err(|e| DocumentStoreError::Corrupt {
                theme_id: theme_id.to_string(),
                message: e.to_string(),
            })?;
        log::debug!(
            "[DocumentStore] Loaded '{theme_id}' (schema v{}, {} page(s))",
            document.version,
            document.pages.len()
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("casper.json"),
            r##"{"name": "Casper", "version": 2, "accentColor": "#000000"}"##,
        )
        .unwrap();
        let store = DocumentStore::new(dir.path().to_path_buf());

        let document = store.load("casper").await.unwrap();
        assert_eq!(document.name, "Casper");
        assert_eq!(document.version, 2);
        assert!(document.page("home").is_some());
        assert!(document.header_section().is_some());
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = DocumentStore::new(dir.path().to_path_buf());

        assert!(matches!(store.load("missing").await, Err(DocumentStoreError::NotFound(_))));
        assert!(matches!(store.load("../x").await, Err(DocumentStoreError::InvalidId(_))));
        assert!(matches!(store.load("broken").await, Err(DocumentStoreError::Corrupt { .. })));
    }
}
