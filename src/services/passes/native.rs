// Repeatable section passes
// Each instance of a card, grid or image-text section gets its own copy of
// the type's base partial with instance-scoped styles, content and filter.

use std::collections::HashSet;

use crate::models::{PageConfig, SectionConfig, ThemeDocument};
use crate::services::{
    css_value_or, escape_html, render_instance, resolve_instances, section_margin,
    section_padding, CssVars, ExportResult, NativeSection, ResolvedInstance, TemplateWorkspace,
    NATIVE_SECTIONS,
};

use super::HOME_PAGE_KEY;

const MAX_POST_LIMIT: f64 = 50.0;

/// A rendered per-instance partial waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePartial {
    /// Page the instance was rendered for
    pub page: String,
    pub key: String,
    pub file: String,
    pub content: String,
}

/// Page keys with the home page first
pub fn page_keys_home_first(document: &ThemeDocument) -> Vec<&str> {
    let mut keys: Vec<&str> = document.pages.keys().map(String::as_str).collect();
    keys.sort_by_key(|key| *key != HOME_PAGE_KEY);
    keys
}

/// Post count for an instance: `customConfig.limit`, else the type default
pub fn instance_post_limit(native: &NativeSection, instance: &ResolvedInstance) -> u32 {
    instance
        .section
        .settings
        .config_f64("limit")
        .filter(|limit| limit.is_finite())
        .map(|limit| limit.round().clamp(1.0, MAX_POST_LIMIT) as u32)
        .unwrap_or(native.default_limit)
}

pub fn instance_style_body(native: &NativeSection, instance: &ResolvedInstance) -> String {
    let section = &instance.section;
    let settings = &section.settings;
    let mut vars = CssVars::new()
        .padding("section", section_padding(section))
        .margin("section", section_margin(section))
        .set(
            "section-background",
            css_value_or(settings.config_str("backgroundColor"), "transparent"),
        );

    vars = match native.definition_id {
        "cards" => {
            let columns = settings
                .config_f64("columns")
                .filter(|value| value.is_finite())
                .map(|value| value.round().clamp(1.0, 6.0) as u32)
                .unwrap_or(3);
            vars.set("section-columns", columns.to_string())
        }
        "grid" => {
            let gap = settings
                .config_f64("columnGap")
                .filter(|value| value.is_finite())
                .map(|value| value.round().max(0.0) as u32)
                .unwrap_or(24);
            vars.px("section-column-gap", gap)
        }
        "image-text" => {
            let order = match settings.config_str("imagePosition") {
                Some("right") => "1",
                _ => "0",
            };
            vars.set("section-image-order", order)
        }
        _ => vars,
    };

    vars.style_block(&format!(".{}", instance.instance_class()))
}

pub fn instance_content_body(instance: &ResolvedInstance) -> String {
    let settings = &instance.section.settings;
    let mut out = String::new();
    if let Some(title) = settings.config_str("title") {
        out.push_str(&format!("<h2 class=\"tf-section-title\">{}</h2>\n", escape_html(title)));
    }
    if let Some(description) = settings.config_str("description") {
        out.push_str(&format!(
            "<p class=\"tf-section-description\">{}</p>\n",
            escape_html(description)
        ));
    }
    if out.is_empty() {
        return out;
    }
    format!("\n{out}")
}

/// Instance for the bare section key with default settings; renders the base
/// partial when no page claims it, so no placeholder ever ships
fn default_instance(native: &NativeSection) -> Option<ResolvedInstance> {
    let mut page = PageConfig::default();
    page.push(native.key_base, SectionConfig::custom(native.definition_id));
    resolve_instances(&page, native).into_iter().next()
}

fn plan_partial(
    base: &str,
    native: &NativeSection,
    page: &str,
    instance: ResolvedInstance,
) -> InstancePartial {
    let content = render_instance(
        base,
        native,
        &instance,
        instance_post_limit(native, &instance),
        &instance_style_body(native, &instance),
        &instance_content_body(&instance),
    );
    log::debug!(
        "[InstancePass] {page}.{} -> {} ({})",
        instance.key,
        instance.file,
        instance.tag
    );
    InstancePartial {
        page: page.to_string(),
        key: instance.key,
        file: instance.file,
        content,
    }
}

/// Render every visible repeatable-section instance across all pages. When
/// two pages use the same section key the home page wins.
pub fn plan_instance_partials(
    workspace: &dyn TemplateWorkspace,
    document: &ThemeDocument,
) -> ExportResult<Vec<InstancePartial>> {
    let mut planned = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for native in NATIVE_SECTIONS.iter() {
        let instances: Vec<(&str, ResolvedInstance)> = page_keys_home_first(document)
            .into_iter()
            .filter_map(|key| document.page(key).map(|page| (key, page)))
            .flat_map(|(key, page)| {
                resolve_instances(page, native)
                    .into_iter()
                    .map(move |instance| (key, instance))
            })
            .filter(|(_, instance)| instance.section.is_visible())
            .collect();

        let Some(base) = workspace.read(native.partial)? else {
            if !instances.is_empty() {
                log::info!(
                    "[InstancePass] {} not present in theme, skipping {} section(s)",
                    native.partial,
                    native.definition_id
                );
            }
            continue;
        };

        for (page, instance) in instances {
            if !claimed.insert(instance.file.clone()) {
                log::warn!(
                    "[InstancePass] {} already generated for another page, page '{page}' renders it instead of its own '{}'",
                    instance.file,
                    instance.key
                );
                continue;
            }
            planned.push(plan_partial(&base, native, page, instance));
        }

        if !claimed.contains(native.partial) {
            if let Some(instance) = default_instance(native) {
                claimed.insert(instance.file.clone());
                planned.push(plan_partial(&base, native, HOME_PAGE_KEY, instance));
            }
        }
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryWorkspace;
    use serde_json::json;

    const CARDS: &str = "<section class=\"tf-cards __INSTANCE_CLASS__\">\n\
        {{!-- tf:cards-style:start --}}{{!-- tf:cards-style:end --}}\n\
        {{!-- tf:cards-content:start --}}{{!-- tf:cards-content:end --}}\n\
        {{#get \"posts\" filter=\"tag:__TAG_SLUG__\" limit=\"__POST_LIMIT__\" as |posts|}}{{/get}}\n\
        </section>\n";

    fn doc_with_cards() -> ThemeDocument {
        let mut doc = ThemeDocument::default();
        let home = doc.pages.get_mut("home").unwrap();
        let mut first = SectionConfig::custom("cards");
        first.settings.custom_config = json!({ "title": "Latest <b>", "limit": 4, "columns": 2 });
        home.push("cards", first);
        home.push("cards-2", SectionConfig::custom("cards"));
        let mut hidden = SectionConfig::custom("cards");
        hidden.settings.visible = false;
        home.push("cards-3", hidden);
        doc
    }

    #[test]
    fn test_one_partial_per_visible_instance() {
        let ws = MemoryWorkspace::new().with_file("partials/cards.hbs", CARDS);
        let planned = plan_instance_partials(&ws, &doc_with_cards()).unwrap();
        let files: Vec<_> = planned.iter().map(|p| p.file.as_str()).collect();
        assert_eq!(files, vec!["partials/cards.hbs", "partials/cards-2.hbs"]);

        let first = &planned[0].content;
        assert!(first.contains("class=\"tf-cards tf-cards\""));
        assert!(first.contains("filter=\"tag:hash-card\""));
        assert!(first.contains("limit=\"4\""));
        assert!(first.contains("--section-columns: 2;"));
        assert!(first.contains("Latest &lt;b&gt;"));

        let second = &planned[1].content;
        assert!(second.contains("class=\"tf-cards tf-cards-2\""));
        assert!(second.contains("filter=\"tag:hash-card-2\""));
        assert!(second.contains("limit=\"3\""));
        assert!(second.contains(".tf-cards-2 {"));
    }

    #[test]
    fn test_hidden_bare_instance_still_renders_base_partial() {
        let mut doc = ThemeDocument::default();
        let home = doc.pages.get_mut("home").unwrap();
        let mut hidden = SectionConfig::custom("cards");
        hidden.settings.visible = false;
        home.push("cards", hidden);
        home.push("cards-2", SectionConfig::custom("cards"));

        let ws = MemoryWorkspace::new().with_file("partials/cards.hbs", CARDS);
        let planned = plan_instance_partials(&ws, &doc).unwrap();
        let files: Vec<_> = planned.iter().map(|p| p.file.as_str()).collect();
        assert_eq!(files, vec!["partials/cards-2.hbs", "partials/cards.hbs"]);

        let base = &planned[1].content;
        assert!(!base.contains("__"));
        assert!(base.contains("filter=\"tag:hash-card\""));
        assert!(base.contains("limit=\"3\""));
    }

    #[test]
    fn test_unused_base_partial_has_no_placeholders() {
        let ws = MemoryWorkspace::new().with_file("partials/cards.hbs", CARDS);
        let planned = plan_instance_partials(&ws, &ThemeDocument::default()).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].file, "partials/cards.hbs");
        assert!(!planned[0].content.contains("__"));
    }

    #[test]
    fn test_missing_base_partial_is_skipped() {
        let planned = plan_instance_partials(&MemoryWorkspace::new(), &doc_with_cards()).unwrap();
        assert!(planned.is_empty());
    }

    #[test]
    fn test_home_page_claims_shared_keys() {
        let mut doc = doc_with_cards();
        let mut about = PageConfig::default();
        about.push("cards-2", SectionConfig::custom("cards"));
        doc.pages.insert("about".to_string(), about);
        let ws = MemoryWorkspace::new().with_file("partials/cards.hbs", CARDS);
        let planned = plan_instance_partials(&ws, &doc).unwrap();
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|partial| partial.page == "home"));
        assert_eq!(page_keys_home_first(&doc), vec!["home", "about"]);

        let mut doc = ThemeDocument::default();
        let mut about = PageConfig::default();
        about.push("cards-2", SectionConfig::custom("cards"));
        doc.pages.insert("about".to_string(), about);
        let planned = plan_instance_partials(&ws, &doc).unwrap();
        let owners: Vec<_> = planned.iter().map(|p| (p.page.as_str(), p.file.as_str())).collect();
        assert_eq!(owners, vec![("about", "partials/cards-2.hbs"), ("home", "partials/cards.hbs")]);
    }

    #[test]
    fn test_grid_gap_and_limit_clamp() {
        let mut doc = ThemeDocument::default();
        let mut grid = SectionConfig::custom("grid");
        grid.settings.custom_config = json!({ "columnGap": "16", "limit": 500 });
        doc.pages.get_mut("home").unwrap().push("grid", grid);
        let instance = resolve_instances(doc.page("home").unwrap(), &NATIVE_SECTIONS[1]).remove(0);
        assert_eq!(instance_post_limit(&NATIVE_SECTIONS[1], &instance), 50);
        assert!(instance_style_body(&NATIVE_SECTIONS[1], &instance).contains("--section-column-gap: 16px;"));
    }
}
