// Marker-Region Patcher
// Locates a named begin/end comment pair in a template and replaces the
// enclosed region. The markers are always re-emitted so every region stays
// patchable on the next export.

use crate::services::{ExportError, ExportResult, TemplateWorkspace};

/// A begin/end comment pair delimiting a patchable region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Standard `{{!-- tf:<name>:start --}}` / `{{!-- tf:<name>:end --}}` pair
    pub fn named(name: &str) -> Self {
        Self::new(
            format!("{{{{!-- tf:{name}:start --}}}}"),
            format!("{{{{!-- tf:{name}:end --}}}}"),
        )
    }
}

/// Byte offsets of a located region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Offset of the start marker
    pub start: usize,
    /// First byte after the start marker
    pub body_start: usize,
    /// Offset of the end marker
    pub body_end: usize,
    /// First byte after the end marker
    pub end: usize,
}

impl Region {
    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        &content[self.body_start..self.body_end]
    }
}

/// Find the first start marker and the first end marker after it.
/// Matching is ASCII case-insensitive; offsets refer to the original text.
pub fn find_region(content: &str, pair: &MarkerPair) -> Option<Region> {
    let haystack = content.to_ascii_lowercase();
    let start_marker = pair.start.to_ascii_lowercase();
    let end_marker = pair.end.to_ascii_lowercase();

    let start = haystack.find(&start_marker)?;
    let body_start = start + start_marker.len();
    let body_end = body_start + haystack[body_start..].find(&end_marker)?;
    Some(Region {
        start,
        body_start,
        body_end,
        end: body_end + end_marker.len(),
    })
}

/// Number of (case-insensitive) occurrences of a marker
pub fn count_marker(content: &str, marker: &str) -> usize {
    content
        .to_ascii_lowercase()
        .matches(&marker.to_ascii_lowercase())
        .count()
}

/// Replace `[start, end)` of a region with `start_marker + body + end_marker`,
/// keeping the markers exactly as written in the template.
pub fn replace_region(content: &str, region: Region, body: &str) -> String {
    let start_marker = &content[region.start..region.body_start];
    let end_marker = &content[region.body_end..region.end];
    let mut out = String::with_capacity(content.len() + body.len());
    out.push_str(&content[..region.start]);
    out.push_str(start_marker);
    out.push_str(body);
    out.push_str(end_marker);
    out.push_str(&content[region.end..]);
    out
}

/// Patch a region; `None` when either marker is missing
pub fn patch_region(content: &str, pair: &MarkerPair, body: &str) -> Option<String> {
    find_region(content, pair).map(|region| replace_region(content, region, body))
}

/// Remove a region together with its markers (and one trailing newline)
pub fn remove_region(content: &str, pair: &MarkerPair) -> Option<String> {
    let region = find_region(content, pair)?;
    let mut end = region.end;
    if content[end..].starts_with("\r\n") {
        end += 2;
    } else if content[end..].starts_with('\n') {
        end += 1;
    }
    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..region.start]);
    out.push_str(&content[end..]);
    Some(out)
}

/// What a pass does when its markers are absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Cosmetic pass: leave the file untouched
    Skip,
    /// Load-bearing pass: abort the export
    Fatal,
}

/// One row of a pass table
pub enum PassAction<C> {
    /// Replace the body of a named region with a computed body
    Region {
        region: &'static str,
        on_missing: OnMissing,
        compute_body: fn(&C) -> String,
    },
    /// Rewrite the whole file; the function applies its own missing-marker policy
    Transform(fn(&str, &C) -> ExportResult<String>),
    /// Drop an editor-only region, markers included
    RemoveRegion(&'static str),
}

pub struct PassSpec<C> {
    /// Scope tag used in logs and errors
    pub name: &'static str,
    pub file: &'static str,
    pub action: PassAction<C>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched(String),
    Skipped,
}

/// Apply a single pass to file contents
pub fn apply_pass<C>(content: &str, spec: &PassSpec<C>, ctx: &C) -> ExportResult<PatchOutcome> {
    match &spec.action {
        PassAction::Region {
            region,
            on_missing,
            compute_body,
        } => {
            let pair = MarkerPair::named(region);
            match find_region(content, &pair) {
                Some(found) => {
                    let body = compute_body(ctx);
                    Ok(PatchOutcome::Patched(replace_region(content, found, &body)))
                }
                None => match on_missing {
                    OnMissing::Skip => {
                        log::debug!("[{}] Region '{region}' not found in {}, skipping", spec.name, spec.file);
                        Ok(PatchOutcome::Skipped)
                    }
                    OnMissing::Fatal => Err(missing_marker(spec.name, spec.file, content, &pair)),
                },
            }
        }
        PassAction::Transform(transform) => transform(content, ctx).map(PatchOutcome::Patched),
        PassAction::RemoveRegion(region) => Ok(remove_region(content, &MarkerPair::named(region))
            .map(PatchOutcome::Patched)
            .unwrap_or(PatchOutcome::Skipped)),
    }
}

/// Error naming whichever marker of the pair is absent
pub fn missing_marker(pass: &'static str, file: &str, content: &str, pair: &MarkerPair) -> ExportError {
    let marker = if count_marker(content, &pair.start) == 0 {
        pair.start.clone()
    } else {
        pair.end.clone()
    };
    ExportError::MissingMarker {
        pass,
        file: file.to_string(),
        marker,
    }
}

/// Files touched by a pass table run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub written: Vec<String>,
    pub skipped_files: Vec<String>,
}

/// Run a pass table against a workspace. Passes are grouped per file; each
/// file is read once and written once, after all of its passes succeeded, so
/// a fatal pass leaves its file untouched. A missing file is a soft skip.
pub fn run_passes<C>(
    workspace: &dyn TemplateWorkspace,
    specs: &[PassSpec<C>],
    ctx: &C,
) -> ExportResult<PassReport> {
    let mut files: Vec<&'static str> = Vec::new();
    for spec in specs {
        if !files.contains(&spec.file) {
            files.push(spec.file);
        }
    }

    let mut report = PassReport::default();
    for file in files {
        let Some(original) = workspace.read(file)? else {
            log::info!("[Passes] {file} not present in theme, skipping its passes");
            report.skipped_files.push(file.to_string());
            continue;
        };

        let mut content = original.clone();
        for spec in specs.iter().filter(|spec| spec.file == file) {
            match apply_pass(&content, spec, ctx) {
                Ok(PatchOutcome::Patched(next)) => content = next,
                Ok(PatchOutcome::Skipped) => {}
                Err(e) => {
                    log::error!("[{}] {e}", spec.name);
                    return Err(e);
                }
            }
        }

        if content != original {
            workspace.write(file, &content)?;
            report.written.push(file.to_string());
        }
    }
    Ok(report)
}
