// Export Orchestrator
// Drives one export from a validated document to an in-memory archive:
// sync working copy, prepare dependencies, build page templates, run the
// customization passes, fan out instance partials, package. Every stage is
// logged and emitted; any failure ends the export with nothing returned.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::models::{ExportArtifact, ServerSettings, ThemeDocument};
use crate::services::{
    apply_customization_passes, apply_settings_file, build_page_template, emit_event,
    package_identifier, plan_instance_partials, sync_working_copy, validate_relative_path,
    validate_theme_id, Archiver, DependencyInstaller, EventSink, ExportError, ExportResult,
    FsWorkspace, InstancePartial, PageTemplateContext, TemplateWorkspace, EXPORT_STAGE_EVENT,
    HOME_PAGE_KEY,
};

/// Instance partial writes in flight at once
const INSTANCE_WRITE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportStage {
    Idle,
    Syncing,
    DependenciesReady,
    TemplateBuilt,
    PassesApplied,
    Packaged,
    Streamed,
    Failed,
}

impl ExportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStage::Idle => "idle",
            ExportStage::Syncing => "syncing",
            ExportStage::DependenciesReady => "dependenciesReady",
            ExportStage::TemplateBuilt => "templateBuilt",
            ExportStage::PassesApplied => "passesApplied",
            ExportStage::Packaged => "packaged",
            ExportStage::Streamed => "streamed",
            ExportStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStageEvent {
    pub theme_id: String,
    pub stage: ExportStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

/// Template file a page key renders into
pub fn page_template_path(page_key: &str) -> String {
    match page_key {
        HOME_PAGE_KEY => "home.hbs".to_string(),
        "index" => "index.hbs".to_string(),
        other => format!("page-{other}.hbs"),
    }
}

/// Write every page template. `home.hbs` is always written, other pages only
/// replace a template the theme already ships.
pub fn write_page_templates(
    workspace: &dyn TemplateWorkspace,
    document: &ThemeDocument,
) -> ExportResult<Vec<String>> {
    let mut written = Vec::new();
    for (page_key, page) in &document.pages {
        let path = page_template_path(page_key);
        if validate_relative_path(&path).is_err() {
            log::warn!("[SnippetBuilder] Page key '{page_key}' is not a valid template name, skipping");
            continue;
        }
        if page_key != HOME_PAGE_KEY && !workspace.exists(&path) {
            log::info!("[SnippetBuilder] {path} not present in theme, skipping page '{page_key}'");
            continue;
        }
        let template = build_page_template(&PageTemplateContext {
            page,
            header: document.header_section(),
        });
        workspace.write(&path, &template)?;
        written.push(path);
    }
    Ok(written)
}

/// Write the per-instance partials. On disk the writes run concurrently,
/// at most `INSTANCE_WRITE_CONCURRENCY` at a time.
pub async fn write_instance_partials(
    workspace: &dyn TemplateWorkspace,
    partials: Vec<InstancePartial>,
) -> ExportResult<usize> {
    let count = partials.len();
    let Some(root) = workspace.root() else {
        for partial in &partials {
            workspace.write(&partial.file, &partial.content)?;
        }
        return Ok(count);
    };

    let writes = partials.into_iter().map(|partial| {
        let path = validate_relative_path(&partial.file)
            .map(|relative| root.join(relative))
            .map_err(ExportError::Workspace);
        async move {
            let path = path?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ExportError::io(parent, e))?;
            }
            tokio::fs::write(&path, partial.content)
                .await
                .map_err(|e| ExportError::io(&path, e))
        }
    });

    stream::iter(writes)
        .buffer_unordered(INSTANCE_WRITE_CONCURRENCY)
        .try_collect::<Vec<()>>()
        .await?;
    Ok(count)
}

pub struct ThemeExporter {
    themes_dir: PathBuf,
    workspaces_dir: PathBuf,
    installer: DependencyInstaller,
    archiver: Archiver,
    events: Arc<dyn EventSink>,
}

impl ThemeExporter {
    pub fn new(
        themes_dir: PathBuf,
        workspaces_dir: PathBuf,
        settings: &ServerSettings,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            themes_dir,
            workspaces_dir,
            installer: DependencyInstaller::new(settings.install_command.clone()),
            archiver: Archiver::new(
                settings.archive_command.clone(),
                settings.archive_output_dir.clone(),
            ),
            events,
        }
    }

    /// Working copy of a theme; kept between exports so dependencies persist
    pub fn working_dir(&self, theme_id: &str) -> PathBuf {
        self.workspaces_dir.join(theme_id)
    }

    fn stage(&self, theme_id: &str, stage: ExportStage, message: Option<String>) {
        match &message {
            Some(message) => log::info!("[Export] {theme_id}: {} ({message})", stage.as_str()),
            None => log::info!("[Export] {theme_id}: {}", stage.as_str()),
        }
        emit_event(
            self.events.as_ref(),
            EXPORT_STAGE_EVENT,
            &ExportStageEvent {
                theme_id: theme_id.to_string(),
                stage,
                message,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Export a theme with the given document. All-or-nothing: on failure no
    /// artifact is returned and the working copy is left for inspection.
    pub async fn export(&self, theme_id: &str, document: &ThemeDocument) -> ExportResult<ExportArtifact> {
        self.stage(theme_id, ExportStage::Idle, None);
        match self.run(theme_id, document).await {
            Ok(artifact) => {
                self.stage(
                    theme_id,
                    ExportStage::Streamed,
                    Some(format!("{} ({} bytes)", artifact.filename, artifact.bytes.len())),
                );
                Ok(artifact)
            }
            Err(e) => {
                log::error!("[{}] Export of '{theme_id}' failed: {e}", e.scope());
                self.stage(theme_id, ExportStage::Failed, Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(&self, theme_id: &str, document: &ThemeDocument) -> ExportResult<ExportArtifact> {
        document.validate()?;
        validate_theme_id(theme_id).map_err(ExportError::Workspace)?;

        let canonical = self.themes_dir.join(theme_id);
        let working = self.working_dir(theme_id);

        self.stage(theme_id, ExportStage::Syncing, None);
        let (source, target) = (canonical.clone(), working.clone());
        let copied = tokio::task::spawn_blocking(move || sync_working_copy(&source, &target))
            .await
            .map_err(|e| ExportError::Workspace(format!("Sync task failed: {e}")))??;
        log::debug!("[Export] {theme_id}: {copied} file(s) in working copy");

        apply_settings_file(&working, document)?;
        let installed = self.installer.ensure(&working).await?;
        self.stage(
            theme_id,
            ExportStage::DependenciesReady,
            installed.then(|| "installed".to_string()),
        );

        let workspace = FsWorkspace::new(working.clone());
        let templates = write_page_templates(&workspace, document)?;
        self.stage(
            theme_id,
            ExportStage::TemplateBuilt,
            Some(templates.join(", ")),
        );

        let report = apply_customization_passes(&workspace, document)?;
        let partials = plan_instance_partials(&workspace, document)?;
        let instance_count = write_instance_partials(&workspace, partials).await?;
        self.stage(
            theme_id,
            ExportStage::PassesApplied,
            Some(format!(
                "{} file(s) patched, {instance_count} instance partial(s)",
                report.written.len()
            )),
        );

        let package = package_identifier(&working, document);
        let artifact = self.archiver.package(&working, &package).await?;
        self.stage(theme_id, ExportStage::Packaged, Some(artifact.filename.clone()));

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageConfig, SectionConfig, SectionType};
    use crate::services::MemoryWorkspace;

    #[test]
    fn test_page_template_paths() {
        assert_eq!(page_template_path("home"), "home.hbs");
        assert_eq!(page_template_path("index"), "index.hbs");
        assert_eq!(page_template_path("about"), "page-about.hbs");
    }

    #[test]
    fn test_only_existing_page_templates_are_replaced() {
        let mut document = ThemeDocument::default();
        let mut about = PageConfig::default();
        about.push("main", SectionConfig::new(SectionType::Main));
        document.pages.insert("about".to_string(), about.clone());
        document.pages.insert("contact".to_string(), about);

        let workspace = MemoryWorkspace::new().with_file("page-about.hbs", "old");
        let written = write_page_templates(&workspace, &document).unwrap();
        assert_eq!(written, vec!["page-about.hbs", "home.hbs"]);
        assert!(workspace.get("page-about.hbs").unwrap().contains("{{> \"post-list\"}}"));
        assert!(workspace.get("page-contact.hbs").is_none());
    }

    fn numbered_partials(count: usize) -> Vec<InstancePartial> {
        (1..=count)
            .map(|n| {
                let key = if n == 1 { "cards".to_string() } else { format!("cards-{n}") };
                InstancePartial {
                    page: "home".to_string(),
                    file: format!("partials/{key}.hbs"),
                    content: format!("instance {n}"),
                    key,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_instance_partials_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FsWorkspace::new(dir.path());
        let count = INSTANCE_WRITE_CONCURRENCY * 2 + 1;
        assert_eq!(
            write_instance_partials(&workspace, numbered_partials(count)).await.unwrap(),
            count
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join(format!("partials/cards-{count}.hbs"))).unwrap(),
            format!("instance {count}")
        );
    }

    #[tokio::test]
    async fn test_instance_partials_written_to_memory() {
        let workspace = MemoryWorkspace::new();
        assert_eq!(write_instance_partials(&workspace, numbered_partials(2)).await.unwrap(), 2);
        assert_eq!(workspace.get("partials/cards-2.hbs").as_deref(), Some("instance 2"));
    }

    #[tokio::test]
    async fn test_instance_partial_outside_workspace_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = FsWorkspace::new(dir.path().join("working"));
        let partials = vec![InstancePartial {
            page: "home".to_string(),
            key: "cards".to_string(),
            file: "../escaped.hbs".to_string(),
            content: "x".to_string(),
        }];
        let err = write_instance_partials(&workspace, partials).await.unwrap_err();
        assert!(matches!(err, ExportError::Workspace(_)));
        assert!(!dir.path().join("escaped.hbs").exists());
    }
}
