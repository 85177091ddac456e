use serde::Serialize;

// Canonical theme directory summary for display in UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub has_document: bool,
}

// Exported archive ready to be streamed back to the caller
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: bytes::Bytes,
}
