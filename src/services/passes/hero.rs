// Hero pass
// Styles and fills the page header from the page's subheader section

use crate::models::{SectionConfig, SectionType};
use crate::services::{
    css_value_or, escape_html, escape_url, section_margin, section_padding, CssVars, OnMissing,
    PassAction, PassSpec,
};

use super::PassContext;

pub const HERO_FILE: &str = "partials/page-header.hbs";

const SUBHEADER_KEY: &str = "subheader";

fn subheader(ctx: &PassContext) -> SectionConfig {
    ctx.page_section(SUBHEADER_KEY)
        .cloned()
        .unwrap_or_else(|| SectionConfig::new(SectionType::Header))
}

fn hero_style_body(ctx: &PassContext) -> String {
    let section = subheader(ctx);
    let settings = &section.settings;
    let alignment = match settings.config_str("alignment") {
        Some("left") => "left",
        Some("right") => "right",
        _ => "center",
    };
    CssVars::new()
        .padding("hero", section_padding(&section))
        .margin("hero", section_margin(&section))
        .set("hero-background", css_value_or(settings.config_str("backgroundColor"), "transparent"))
        .set("hero-color", css_value_or(settings.config_str("textColor"), "inherit"))
        .set("hero-align", alignment)
        .style_block(".gh-page-header")
}

fn hero_content_body(ctx: &PassContext) -> String {
    let section = subheader(ctx);
    let settings = &section.settings;
    let mut out = String::new();
    if let Some(title) = settings.config_str("title") {
        out.push_str(&format!("<h1 class=\"gh-page-header-title\">{}</h1>\n", escape_html(title)));
    }
    if let Some(description) = settings.config_str("description") {
        out.push_str(&format!(
            "<p class=\"gh-page-header-description\">{}</p>\n",
            escape_html(description)
        ));
    }
    if let Some(text) = settings.config_str("buttonText") {
        out.push_str(&format!(
            "<a class=\"gh-page-header-button gh-button\" href=\"{}\">{}</a>\n",
            escape_url(settings.config_str("buttonHref").unwrap_or("#")),
            escape_html(text)
        ));
    }
    if out.is_empty() {
        return out;
    }
    format!("\n{out}")
}

pub fn hero_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![
        PassSpec {
            name: "HeroPass",
            file: HERO_FILE,
            action: PassAction::Region {
                region: "hero-style",
                on_missing: OnMissing::Skip,
                compute_body: hero_style_body,
            },
        },
        PassSpec {
            name: "HeroPass",
            file: HERO_FILE,
            action: PassAction::Region {
                region: "hero-content",
                on_missing: OnMissing::Skip,
                compute_body: hero_content_body,
            },
        },
    ]
}
