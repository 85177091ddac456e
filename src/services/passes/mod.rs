// Section Customization Passes
// One table of marker-region passes per customizable region of the theme.
// Every pass computes its body from the document alone, so re-running the
// table on its own output yields the same files.

mod accent;
mod announcement;
mod footer;
mod hero;
mod main_list;
mod native;
mod navigation;

pub use accent::*;
pub use announcement::*;
pub use footer::*;
pub use hero::*;
pub use main_list::*;
pub use native::*;
pub use navigation::*;

use crate::models::{PageConfig, SectionConfig, ThemeDocument};
use crate::services::{run_passes, ExportResult, PassReport, PassSpec, TemplateWorkspace};

/// Page whose sections drive the shared header and post-list partials
pub const HOME_PAGE_KEY: &str = "home";

pub struct PassContext<'a> {
    pub document: &'a ThemeDocument,
    pub page_key: &'a str,
}

impl<'a> PassContext<'a> {
    pub fn new(document: &'a ThemeDocument) -> Self {
        Self {
            document,
            page_key: HOME_PAGE_KEY,
        }
    }

    pub fn page(&self) -> Option<&'a PageConfig> {
        self.document.page(self.page_key)
    }

    pub fn page_section(&self, key: &str) -> Option<&'a SectionConfig> {
        self.page().and_then(|page| page.sections.get(key))
    }

    pub fn header(&self) -> Option<&'a SectionConfig> {
        self.document.header_section()
    }
}

/// The full pass table in application order
pub fn customization_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    let mut passes = Vec::new();
    passes.extend(accent_passes());
    passes.extend(navigation_passes());
    passes.extend(footer_passes());
    passes.extend(announcement_passes());
    passes.extend(hero_passes());
    passes.extend(main_list_passes());
    passes
}

/// Apply every region pass to the working copy
pub fn apply_customization_passes(
    workspace: &dyn TemplateWorkspace,
    document: &ThemeDocument,
) -> ExportResult<PassReport> {
    let ctx = PassContext::new(document);
    let report = run_passes(workspace, &customization_passes(), &ctx)?;
    log::info!(
        "[Passes] Patched {} file(s), {} absent from theme",
        report.written.len(),
        report.skipped_files.len()
    );
    Ok(report)
}
