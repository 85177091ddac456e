// Template Snippet Builder
// Turns a page's ordered section list into the directives of its template

use std::collections::HashMap;

use crate::models::{PageConfig, SectionConfig};
use crate::services::{
    lookup_definition, resolve_instances, section_padding, SectionRender,
};

/// Layout directive every page template starts with
pub const LAYOUT_DIRECTIVE: &str = "{{!< default}}";

/// Header layout that featured posts are bound to
pub const FEATURED_HEADER_LAYOUT: &str = "Highlight";

/// Custom setting read by the featured guard and kept bound by the placeholder
pub const HEADER_STYLE_SETTING: &str = "@custom.header_style";

/// Order keys that render the page header area
const HEADER_PRODUCING_KEYS: [&str; 2] = ["subheader", "featured"];

pub struct PageTemplateContext<'a> {
    pub page: &'a PageConfig,
    /// The document's single header section
    pub header: Option<&'a SectionConfig>,
}

/// One emitted piece of a page template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `{{> "name"}}`
    Partial(String),
    /// Featured posts, guarded by the header layout
    Featured,
    /// Keeps the header style setting referenced when no header renders
    HiddenSettings,
    /// Markup produced by an inline section definition
    Inline(String),
}

impl Directive {
    pub fn render(&self) -> String {
        match self {
            Directive::Partial(name) => format!("{{{{> \"{name}\"}}}}"),
            Directive::Featured => format!(
                "{{{{#match {HEADER_STYLE_SETTING} \"{FEATURED_HEADER_LAYOUT}\"}}}}\n    {{{{> \"featured-posts\"}}}}\n{{{{/match}}}}"
            ),
            Directive::HiddenSettings => {
                format!("{{{{#match {HEADER_STYLE_SETTING} \"Hidden\"}}}}{{{{/match}}}}")
            }
            Directive::Inline(markup) => markup.clone(),
        }
    }
}

/// Directives of a page in render order
pub fn build_directives(ctx: &PageTemplateContext) -> Vec<Directive> {
    let page = ctx.page;
    let header_visible = ctx.header.map(SectionConfig::is_visible).unwrap_or(true);

    let mut includes: HashMap<String, String> = HashMap::new();
    let mut directives = Vec::new();

    for (key, section) in page.ordered_sections() {
        if !section.is_visible() {
            continue;
        }
        match key {
            "subheader" => directives.push(Directive::Partial("page-header".to_string())),
            "featured" => {
                if header_visible {
                    directives.push(Directive::Featured);
                } else {
                    log::debug!("[SnippetBuilder] Header hidden, dropping featured posts");
                }
            }
            "main" => directives.push(Directive::Partial("post-list".to_string())),
            _ => {
                if let Some(directive) = custom_directive(page, key, section, &mut includes) {
                    directives.push(directive);
                }
            }
        }
    }

    let has_header_key = page
        .order
        .iter()
        .any(|key| HEADER_PRODUCING_KEYS.contains(&key.as_str()));
    if !has_header_key {
        directives.insert(0, Directive::HiddenSettings);
    }

    directives
}

fn custom_directive(
    page: &PageConfig,
    key: &str,
    section: &SectionConfig,
    includes: &mut HashMap<String, String>,
) -> Option<Directive> {
    let Some(definition_id) = section.definition_id() else {
        log::warn!("[SnippetBuilder] Section '{key}' has no definition, skipping");
        return None;
    };

    match lookup_definition(definition_id) {
        Some(SectionRender::InternalOnly) => None,
        Some(SectionRender::Native(native)) => {
            if !includes.contains_key(key) {
                for instance in resolve_instances(page, native) {
                    includes.insert(instance.key, instance.include);
                }
            }
            includes.get(key).cloned().map(Directive::Partial)
        }
        Some(SectionRender::Inline(definition)) => Some(Directive::Inline(
            definition.render_markup(section, section_padding(section)),
        )),
        None => {
            log::warn!("[SnippetBuilder] Unknown section definition '{definition_id}' on '{key}', skipping");
            None
        }
    }
}

/// Full page template text, normalized
pub fn build_page_template(ctx: &PageTemplateContext) -> String {
    let mut text = String::from(LAYOUT_DIRECTIVE);
    text.push_str("\n\n");
    for directive in build_directives(ctx) {
        text.push_str(&directive.render());
        text.push_str("\n\n");
    }
    normalize_template(&text)
}

/// Unix newlines, no trailing whitespace, blank-line runs collapsed to one,
/// no leading blank lines, exactly one trailing newline
pub fn normalize_template(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank {
                lines.push("");
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SectionType, ThemeDocument};
    use serde_json::json;

    fn build(page: &PageConfig) -> String {
        let doc = ThemeDocument::default();
        build_page_template(&PageTemplateContext {
            page,
            header: doc.header_section(),
        })
    }

    #[test]
    fn test_default_home_template() {
        let doc = ThemeDocument::default();
        let out = build(doc.page("home").unwrap());
        assert_eq!(
            out,
            "{{!< default}}\n\n{{> \"page-header\"}}\n\n{{#match @custom.header_style \"Highlight\"}}\n    \
             {{> \"featured-posts\"}}\n{{/match}}\n\n{{> \"post-list\"}}\n"
        );
    }

    #[test]
    fn test_hidden_section_is_omitted() {
        let mut page = PageConfig::default();
        page.push("cta", SectionConfig::custom("call-to-action"));
        page.push("cards", SectionConfig::custom("cards"));
        page.push("main", SectionConfig::new(SectionType::Main));
        page.sections.get_mut("cards").unwrap().settings.visible = false;

        let directives = build_directives(&PageTemplateContext { page: &page, header: None });
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0], Directive::HiddenSettings);
        assert!(matches!(directives[1], Directive::Inline(_)));
        assert_eq!(directives[2], Directive::Partial("post-list".to_string()));
    }

    #[test]
    fn test_native_sections_use_instance_includes() {
        let mut page = PageConfig::default();
        page.push("subheader", SectionConfig::new(SectionType::Header));
        page.push("cards", SectionConfig::custom("cards"));
        page.push("cards-2", SectionConfig::custom("cards"));
        page.push("image-text-4", SectionConfig::custom("image-text"));
        let out = build(&page);
        let cards = out.find("{{> \"cards\"}}").unwrap();
        let cards_2 = out.find("{{> \"cards-2\"}}").unwrap();
        let image_text = out.find("{{> \"image-text-4\"}}").unwrap();
        assert!(cards < cards_2 && cards_2 < image_text);
        assert!(!out.contains("header_style \"Hidden\""));
    }

    #[test]
    fn test_hero_is_never_exported() {
        let mut page = PageConfig::default();
        page.push("subheader", SectionConfig::new(SectionType::Header));
        page.push("hero", SectionConfig::custom("hero"));
        page.sections.get_mut("hero").unwrap().settings.custom_config = json!({ "title": "Preview" });
        let out = build(&page);
        assert!(!out.contains("Preview"));
        assert!(!out.contains("hero"));
    }

    #[test]
    fn test_featured_dropped_without_visible_header() {
        let doc = ThemeDocument::default();
        let mut header = doc.header_section().unwrap().clone();
        header.settings.visible = false;
        let directives = build_directives(&PageTemplateContext {
            page: doc.page("home").unwrap(),
            header: Some(&header),
        });
        assert!(!directives.contains(&Directive::Featured));
        assert!(!directives.contains(&Directive::HiddenSettings));
    }

    #[test]
    fn test_inline_markup_seeded_with_padding() {
        let mut page = PageConfig::default();
        page.push("divider", SectionConfig::custom("divider"));
        page.sections.get_mut("divider").unwrap().settings.padding_block = Some(40.0);
        let out = build(&page);
        assert!(out.contains("--tf-padding-top: 40px;"));
    }

    #[test]
    fn test_build_is_stable() {
        let doc = ThemeDocument::default();
        let page = doc.page("home").unwrap();
        assert_eq!(build(page), build(page));
        assert_eq!(normalize_template(&build(page)), build(page));
    }

    #[test]
    fn test_normalize_template() {
        assert_eq!(normalize_template("\n\na  \r\n\n\n\nb\n\n\n"), "a\n\nb\n");
        assert_eq!(normalize_template(""), "\n");
    }
}
