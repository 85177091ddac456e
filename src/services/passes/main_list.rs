// Main post-list pass

use crate::models::{SectionConfig, SectionType};
use crate::services::{section_margin, section_padding, CssVars, OnMissing, PassAction, PassSpec};

use super::PassContext;

pub const MAIN_LIST_FILE: &str = "partials/post-list.hbs";

const MAIN_KEY: &str = "main";

fn main_section(ctx: &PassContext) -> SectionConfig {
    ctx.page_section(MAIN_KEY)
        .cloned()
        .unwrap_or_else(|| SectionConfig::new(SectionType::Main))
}

/// Layout class of the post feed, from `customConfig.layout`
pub fn main_layout_class(section: &SectionConfig) -> &'static str {
    match section.settings.config_str("layout") {
        Some("grid") => "post-feed-grid",
        Some("minimal") => "post-feed-minimal",
        _ => "post-feed-list",
    }
}

fn main_style_body(ctx: &PassContext) -> String {
    let section = main_section(ctx);
    CssVars::new()
        .padding("main", section_padding(&section))
        .margin("main", section_margin(&section))
        .style_block(".gh-main-list")
}

/// The region sits inside a class attribute, so the body is a bare class
fn main_class_body(ctx: &PassContext) -> String {
    format!(" {}", main_layout_class(&main_section(ctx)))
}

pub fn main_list_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![
        PassSpec {
            name: "MainPass",
            file: MAIN_LIST_FILE,
            action: PassAction::Region {
                region: "main-style",
                on_missing: OnMissing::Skip,
                compute_body: main_style_body,
            },
        },
        PassSpec {
            name: "MainPass",
            file: MAIN_LIST_FILE,
            action: PassAction::Region {
                region: "main-class",
                on_missing: OnMissing::Skip,
                compute_body: main_class_body,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThemeDocument;
    use crate::services::{run_passes, MemoryWorkspace};
    use serde_json::json;

    #[test]
    fn test_main_pass_output() {
        let mut doc = ThemeDocument::default();
        let main = doc.pages.get_mut("home").unwrap().sections.get_mut("main").unwrap();
        main.settings.custom_config = json!({ "layout": "grid" });

        let ws = MemoryWorkspace::new().with_file(
            MAIN_LIST_FILE,
            "{{!-- tf:main-style:start --}}{{!-- tf:main-style:end --}}\n\
             <div class=\"post-feed{{!-- tf:main-class:start --}} post-feed-list{{!-- tf:main-class:end --}}\"></div>\n",
        );
        run_passes(&ws, &main_list_passes(), &PassContext::new(&doc)).unwrap();
        let out = ws.get(MAIN_LIST_FILE).unwrap();
        assert!(out.contains(
            "class=\"post-feed{{!-- tf:main-class:start --}} post-feed-grid{{!-- tf:main-class:end --}}\""
        ));
        assert!(out.contains("--main-padding-bottom: 64px;"));
        assert!(out.contains("--main-margin-bottom: 32px;"));
    }
}
