// Footer pass
// The footer partial holds two load-bearing blocks, signup and bar. They are
// placed in the configured order into the two slots the template defines,
// keeping whatever separates the slots. A block that is hidden or absent
// from the order keeps its markers with an empty body.

use crate::models::{Margin, SectionConfig, SectionType};
use crate::services::{
    find_region, missing_marker, resolve_margin, section_padding, CssVars, ExportError,
    ExportResult, MarkerPair, OnMissing, PassAction, PassSpec, Region,
};

use super::PassContext;

pub const FOOTER_FILE: &str = "partials/footer.hbs";

const PASS_NAME: &str = "FooterPass";

/// The two fixed footer blocks, in their default order
pub const FOOTER_BLOCKS: [(SectionType, &str); 2] = [
    (SectionType::FooterSignup, "footer-signup"),
    (SectionType::FooterBar, "footer-bar"),
];

struct Block<'c> {
    section_type: SectionType,
    region: Region,
    content: &'c str,
}

impl Block<'_> {
    fn start_marker(&self) -> &str {
        &self.content[self.region.start..self.region.body_start]
    }

    fn end_marker(&self) -> &str {
        &self.content[self.region.body_end..self.region.end]
    }

    fn render(&self, visible: bool) -> String {
        let body = if visible { self.region.body(self.content) } else { "" };
        format!("{}{}{}", self.start_marker(), body, self.end_marker())
    }
}

fn locate_block<'c>(
    content: &'c str,
    section_type: SectionType,
    region_name: &str,
) -> ExportResult<Block<'c>> {
    let pair = MarkerPair::named(region_name);
    let region = find_region(content, &pair)
        .ok_or_else(|| missing_marker(PASS_NAME, FOOTER_FILE, content, &pair))?;
    Ok(Block {
        section_type,
        region,
        content,
    })
}

/// Block types in render order: visible configured blocks first, then the
/// remaining ones, which render empty
fn footer_layout(ctx: &PassContext) -> Vec<(SectionType, bool)> {
    let footer = &ctx.document.footer;
    let mut layout: Vec<(SectionType, bool)> = Vec::new();
    for (key, section) in footer.ordered_sections() {
        let Some(section_type) = footer_block_type(section) else {
            log::warn!("[{PASS_NAME}] Footer section '{key}' is not a footer block, ignoring");
            continue;
        };
        if layout.iter().any(|(existing, _)| *existing == section_type) {
            continue;
        }
        layout.push((section_type, section.is_visible()));
    }
    layout.sort_by_key(|(_, visible)| !*visible);
    for (section_type, _) in FOOTER_BLOCKS {
        if !layout.iter().any(|(existing, _)| *existing == section_type) {
            layout.push((section_type, false));
        }
    }
    layout
}

fn footer_block_type(section: &SectionConfig) -> Option<SectionType> {
    match section.section_type {
        SectionType::FooterSignup | SectionType::FooterBar => Some(section.section_type),
        _ => None,
    }
}

/// Reorder the footer blocks. Fails when either block's markers are missing
/// or the two blocks overlap.
pub fn reorder_footer(content: &str, ctx: &PassContext) -> ExportResult<String> {
    let mut blocks = Vec::with_capacity(FOOTER_BLOCKS.len());
    for (section_type, region_name) in FOOTER_BLOCKS {
        blocks.push(locate_block(content, section_type, region_name)?);
    }
    blocks.sort_by_key(|block| block.region.start);

    let (first, second) = (&blocks[0], &blocks[1]);
    if first.region.end > second.region.start {
        log::error!("[{PASS_NAME}] Footer blocks overlap in {FOOTER_FILE}");
        return Err(ExportError::MissingMarker {
            pass: PASS_NAME,
            file: FOOTER_FILE.to_string(),
            marker: first.end_marker().to_string(),
        });
    }

    let separator = &content[first.region.end..second.region.start];
    let layout = footer_layout(ctx);
    let rendered: Vec<String> = layout
        .iter()
        .filter_map(|(section_type, visible)| {
            blocks
                .iter()
                .find(|block| block.section_type == *section_type)
                .map(|block| block.render(*visible))
        })
        .collect();

    log::debug!(
        "[{PASS_NAME}] Footer order: {}",
        layout
            .iter()
            .map(|(section_type, visible)| format!("{}{}", section_type.as_str(), if *visible { "" } else { " (hidden)" }))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(format!(
        "{}{}{}{}{}",
        &content[..first.region.start],
        rendered[0],
        separator,
        rendered[1],
        &content[second.region.end..]
    ))
}

fn footer_style_body(ctx: &PassContext) -> String {
    let footer = &ctx.document.footer;
    let margin = resolve_margin(footer.margin.as_ref(), Margin::default());
    let mut vars = CssVars::new().margin("footer", margin);
    for (section_type, _) in FOOTER_BLOCKS {
        let section = footer
            .sections
            .values()
            .find(|section| section.section_type == section_type)
            .cloned()
            .unwrap_or_else(|| SectionConfig::new(section_type));
        vars = vars.padding(section_type.as_str(), section_padding(&section));
    }
    vars.style_block(".site-footer")
}

pub fn footer_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![
        PassSpec {
            name: PASS_NAME,
            file: FOOTER_FILE,
            action: PassAction::Transform(reorder_footer),
        },
        PassSpec {
            name: PASS_NAME,
            file: FOOTER_FILE,
            action: PassAction::Region {
                region: "footer-style",
                on_missing: OnMissing::Skip,
                compute_body: footer_style_body,
            },
        },
    ]
}
