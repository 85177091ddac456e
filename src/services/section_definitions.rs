// Section Definitions
// Registry of custom section types. Native types render through a dedicated
// per-instance partial; inline types produce their own markup fragment.

use crate::models::{Padding, SectionConfig};
use crate::services::{css_value_or, escape_html, escape_url, native_section, CssVars, NativeSection};

/// Definitions that exist for in-editor preview only and are never exported
pub const INTERNAL_ONLY_DEFINITIONS: [&str; 1] = ["hero"];

pub fn is_internal_only(definition_id: &str) -> bool {
    INTERNAL_ONLY_DEFINITIONS.contains(&definition_id)
}

/// A custom section that renders inline in the page template
pub trait SectionDefinition: Send + Sync {
    fn id(&self) -> &'static str;

    /// Markup fragment for the section, seeded with its resolved padding
    fn render_markup(&self, section: &SectionConfig, padding: Padding) -> String;
}

/// How the page template builder treats a definition id
pub enum SectionRender {
    InternalOnly,
    Native(&'static NativeSection),
    Inline(&'static dyn SectionDefinition),
}

static INLINE_DEFINITIONS: [&dyn SectionDefinition; 3] = [&CallToAction, &Divider, &TextBlock];

pub fn lookup_definition(definition_id: &str) -> Option<SectionRender> {
    if is_internal_only(definition_id) {
        return Some(SectionRender::InternalOnly);
    }
    if let Some(native) = native_section(definition_id) {
        return Some(SectionRender::Native(native));
    }
    INLINE_DEFINITIONS
        .iter()
        .find(|definition| definition.id() == definition_id)
        .map(|definition| SectionRender::Inline(*definition))
}

fn alignment(section: &SectionConfig) -> &'static str {
    match section.settings.config_str("alignment") {
        Some("left") => "left",
        Some("right") => "right",
        _ => "center",
    }
}

fn padding_style(padding: Padding) -> String {
    CssVars::new().padding("tf", padding).inline()
}

pub struct CallToAction;

impl SectionDefinition for CallToAction {
    fn id(&self) -> &'static str {
        "call-to-action"
    }

    fn render_markup(&self, section: &SectionConfig, padding: Padding) -> String {
        let settings = &section.settings;
        let background = css_value_or(settings.config_str("backgroundColor"), "transparent");
        let mut out = format!(
            "<section class=\"tf-cta tf-align-{}\" style=\"{} --tf-cta-background: {background};\">\n    <div class=\"tf-cta-inner gh-inner\">\n",
            alignment(section),
            padding_style(padding),
        );
        if let Some(title) = settings.config_str("title") {
            out.push_str(&format!("        <h2 class=\"tf-cta-title\">{}</h2>\n", escape_html(title)));
        }
        if let Some(description) = settings.config_str("description") {
            out.push_str(&format!(
                "        <p class=\"tf-cta-description\">{}</p>\n",
                escape_html(description)
            ));
        }
        if let Some(text) = settings.config_str("buttonText") {
            out.push_str(&format!(
                "        <a class=\"tf-cta-button gh-button\" href=\"{}\">{}</a>\n",
                escape_url(settings.config_str("buttonHref").unwrap_or("#")),
                escape_html(text)
            ));
        }
        out.push_str("    </div>\n</section>");
        out
    }
}

pub struct Divider;

impl SectionDefinition for Divider {
    fn id(&self) -> &'static str {
        "divider"
    }

    fn render_markup(&self, section: &SectionConfig, padding: Padding) -> String {
        let line = match section.settings.config_str("lineStyle") {
            Some("dashed") => "dashed",
            Some("dotted") => "dotted",
            _ => "solid",
        };
        let color = css_value_or(section.settings.config_str("color"), "currentColor");
        format!(
            "<div class=\"tf-divider\" style=\"{} --tf-divider-style: {line}; --tf-divider-color: {color};\"><hr></div>",
            padding_style(padding)
        )
    }
}

pub struct TextBlock;

impl SectionDefinition for TextBlock {
    fn id(&self) -> &'static str {
        "text-block"
    }

    fn render_markup(&self, section: &SectionConfig, padding: Padding) -> String {
        let settings = &section.settings;
        let mut out = format!(
            "<section class=\"tf-text-block tf-align-{}\" style=\"{}\">\n    <div class=\"gh-inner\">\n",
            alignment(section),
            padding_style(padding)
        );
        if let Some(heading) = settings.config_str("heading") {
            out.push_str(&format!("        <h2>{}</h2>\n", escape_html(heading)));
        }
        if let Some(body) = settings.config_str("body") {
            for paragraph in body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
                out.push_str(&format!(
                    "        <p>{}</p>\n",
                    escape_html(paragraph).replace('\n', "<br>")
                ));
            }
        }
        out.push_str("    </div>\n</section>");
        out
    }
}
