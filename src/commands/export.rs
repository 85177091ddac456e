// Export Commands
// Serialized, time-bounded exports and how their failures are reported

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::sync::Mutex as AsyncMutex;

use crate::models::{ExportArtifact, ThemeDocument};
use crate::services::{ExportError, ThemeExporter};

/// One async mutex per theme id; two exports of the same theme share a
/// working copy and must not interleave.
#[derive(Default)]
pub struct ExportLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ExportLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, theme_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(theme_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[derive(Debug)]
pub enum ExportFailure {
    /// The caller's input was rejected
    Rejected(String),
    /// The theme's templates cannot take the customization
    Template(String),
    Internal,
    TimedOut(u64),
}

impl ExportFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            ExportFailure::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ExportFailure::Rejected(message) | ExportFailure::Template(message) => message.clone(),
            ExportFailure::Internal => "Export failed".to_string(),
            ExportFailure::TimedOut(secs) => format!("Export timed out after {secs}s"),
        }
    }
}

impl From<ExportError> for ExportFailure {
    fn from(error: ExportError) -> Self {
        if !error.is_user_facing() {
            return ExportFailure::Internal;
        }
        match error {
            ExportError::MissingMarker { .. } => ExportFailure::Template(error.to_string()),
            _ => ExportFailure::Rejected(error.to_string()),
        }
    }
}

/// Run `task` on its own task while holding `lock`. The caller stops waiting
/// after `timeout`, but the lock is only released once the task finishes, so
/// blocking work it started never overlaps the next holder.
pub async fn run_locked<T, F>(
    lock: Arc<AsyncMutex<()>>,
    timeout: Duration,
    task: F,
) -> Result<T, ExportFailure>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ExportError>> + Send + 'static,
{
    let guard = lock.lock_owned().await;
    let handle = tokio::spawn(async move {
        let result = task.await;
        drop(guard);
        result
    });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result.map_err(ExportFailure::from),
        Ok(Err(e)) => {
            log::error!("[Export] Export task failed: {e}");
            Err(ExportFailure::Internal)
        }
        Err(_) => Err(ExportFailure::TimedOut(timeout.as_secs())),
    }
}

/// Run one export under the theme's lock, bounded by `timeout_secs`
pub async fn export_theme(
    exporter: Arc<ThemeExporter>,
    locks: &ExportLocks,
    theme_id: String,
    document: ThemeDocument,
    timeout_secs: u64,
) -> Result<ExportArtifact, ExportFailure> {
    let lock = locks.lock_for(&theme_id);
    let timeout = Duration::from_secs(timeout_secs.max(1));
    let id = theme_id.clone();
    let result = run_locked(lock, timeout, async move {
        exporter.export(&id, &document).await
    })
    .await;
    if let Err(ExportFailure::TimedOut(secs)) = &result {
        log::error!("[Export] {theme_id}: timed out after {secs}s, working copy stays locked until it settles");
    }
    result
}

/// `Content-Disposition` for a download, with an RFC 5987 fallback for
/// non-ASCII names
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' && !c.is_ascii_control() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("casper.zip"),
            "attachment; filename=\"casper.zip\"; filename*=UTF-8''casper.zip"
        );
        assert_eq!(
            content_disposition("thème \"x\".zip"),
            "attachment; filename=\"th_me _x_.zip\"; filename*=UTF-8''th%C3%A8me%20%22x%22.zip"
        );
    }

    #[test]
    fn test_failure_status_mapping() {
        let marker = ExportFailure::from(ExportError::MissingMarker {
            pass: "FooterPass",
            file: "partials/footer.hbs".to_string(),
            marker: "{{!-- tf:signup:start --}}".to_string(),
        });
        assert_eq!(marker.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(marker.message().contains("FooterPass"));

        let rejected = ExportFailure::from(ExportError::InvalidSettingsFile("not an object".into()));
        assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let invalid = ExportFailure::from(ExportError::from(ValidationError {
            field: "name".to_string(),
            message: "theme name is required".to_string(),
        }));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(invalid.message().contains("theme name is required"));

        let internal = ExportFailure::from(ExportError::Packaging("disk full".into()));
        assert_eq!(internal.message(), "Export failed");
    }

    #[tokio::test]
    async fn test_locks_are_shared_per_theme() {
        let locks = ExportLocks::new();
        let a = locks.lock_for("casper");
        let b = locks.lock_for("casper");
        let c = locks.lock_for("source");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        let _held = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(c.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_timed_out_export_keeps_theme_locked_until_done() {
        let locks = ExportLocks::new();
        let lock = locks.lock_for("casper");

        let result = run_locked(lock.clone(), Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ExportFailure::TimedOut(_))));
        assert!(lock.try_lock().is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_run_locked_maps_export_errors() {
        let lock = Arc::new(AsyncMutex::new(()));
        let result: Result<(), _> = run_locked(lock.clone(), Duration::from_secs(1), async {
            Err(ExportError::Packaging("disk full".into()))
        })
        .await;
        assert!(matches!(result, Err(ExportFailure::Internal)));
        assert!(lock.try_lock().is_ok());
    }
}
