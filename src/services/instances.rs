// Multi-Instance Partial Resolver
// Section types that can appear more than once on a page get one partial file
// per instance. File names and content tags are both derived from the
// section key, so two instances can never share either.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::{slugify, PageConfig, SectionConfig};
use crate::services::{patch_region, MarkerPair};

/// Placeholders a base partial carries for per-instance substitution
pub const INSTANCE_CLASS_PLACEHOLDER: &str = "__INSTANCE_CLASS__";
pub const TAG_SLUG_PLACEHOLDER: &str = "__TAG_SLUG__";
pub const POST_LIMIT_PLACEHOLDER: &str = "__POST_LIMIT__";

/// A repeatable section type rendered through its own partial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSection {
    pub definition_id: &'static str,
    /// Section keys look like `<key_base>` or `<key_base>-<N>`
    pub key_base: &'static str,
    /// Default content tags look like `#<tag_base>` or `#<tag_base>-<N>`
    pub tag_base: &'static str,
    /// Base partial, relative to the theme root
    pub partial: &'static str,
    /// Partial include name without suffix
    pub include_base: &'static str,
    pub default_limit: u32,
}

impl NativeSection {
    pub fn style_region(&self) -> String {
        format!("{}-style", self.include_base)
    }

    pub fn content_region(&self) -> String {
        format!("{}-content", self.include_base)
    }
}

pub const NATIVE_SECTIONS: [NativeSection; 3] = [
    NativeSection {
        definition_id: "cards",
        key_base: "cards",
        tag_base: "card",
        partial: "partials/cards.hbs",
        include_base: "cards",
        default_limit: 3,
    },
    NativeSection {
        definition_id: "grid",
        key_base: "grid",
        tag_base: "grid",
        partial: "partials/grid.hbs",
        include_base: "grid",
        default_limit: 6,
    },
    NativeSection {
        definition_id: "image-text",
        key_base: "image-text",
        tag_base: "image-text",
        partial: "partials/image-text.hbs",
        include_base: "image-text",
        default_limit: 1,
    },
];

pub fn native_section(definition_id: &str) -> Option<&'static NativeSection> {
    NATIVE_SECTIONS
        .iter()
        .find(|native| native.definition_id == definition_id)
}

/// Numeral-or-empty suffix reproduced from the section key: `cards` → ``,
/// `cards-2` → `-2`. Keys outside the pattern keep a slug of the whole key.
pub fn instance_suffix(section_key: &str, key_base: &str) -> String {
    let key = section_key.trim();
    match key.strip_prefix(key_base) {
        Some("") => String::new(),
        Some(rest)
            if rest.len() > 1
                && rest.starts_with('-')
                && rest[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest.to_string()
        }
        _ => {
            let slug = slugify(section_key);
            if slug.is_empty() {
                "-section".to_string()
            } else {
                format!("-{slug}")
            }
        }
    }
}

/// A user-provided content tag after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceTag {
    /// Instance suffix implied by the tag; `None` for free-form tags
    pub suffix: Option<String>,
    pub canonical: String,
}

fn numbered_tag_regex() -> &'static Regex {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    NUMBERED.get_or_init(|| Regex::new(r"^(?i)([a-z][a-z-]*?)-?(\d+)$").expect("numbered tag pattern is valid"))
}

/// Normalize a raw tag for a type whose tags are based on `tag_base`.
/// `#card2` → `#card-2`, `card-2` → `#card-2`, `#card` → `#card`; any other
/// non-empty tag is kept as written with a leading `#`.
pub fn parse_instance_tag(raw: &str, tag_base: &str) -> Option<InstanceTag> {
    let body = raw.trim().trim_start_matches('#').trim();
    if body.is_empty() {
        return None;
    }

    if body.eq_ignore_ascii_case(tag_base) {
        return Some(InstanceTag {
            suffix: Some(String::new()),
            canonical: format!("#{tag_base}"),
        });
    }

    if let Some(caps) = numbered_tag_regex().captures(body) {
        let base = &caps[1];
        if base.eq_ignore_ascii_case(tag_base) {
            let numeral = &caps[2];
            return Some(InstanceTag {
                suffix: Some(format!("-{numeral}")),
                canonical: format!("#{tag_base}-{numeral}"),
            });
        }
    }

    Some(InstanceTag {
        suffix: None,
        canonical: format!("#{body}"),
    })
}

/// Slug form of a tag for content filters: `#card-2` → `hash-card-2`
pub fn tag_slug(tag: &str) -> String {
    format!("hash-{}", slugify(tag.trim_start_matches('#')))
}

/// One instance of a repeatable section on a page
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    pub key: String,
    pub suffix: String,
    /// Output partial path, e.g. `partials/cards-2.hbs`
    pub file: String,
    /// Include name, e.g. `cards-2`
    pub include: String,
    pub tag: String,
    pub slug: String,
    pub section: SectionConfig,
}

impl ResolvedInstance {
    /// Class scoping the instance's style variables
    pub fn instance_class(&self) -> String {
        format!("tf-{}", self.include)
    }
}

/// All instances of `native` on a page: render order first, then sections
/// missing from the order array (sorted by key).
pub fn resolve_instances(page: &PageConfig, native: &NativeSection) -> Vec<ResolvedInstance> {
    let mut matches: Vec<(&str, &SectionConfig)> = page
        .ordered_sections()
        .filter(|(_, section)| section.definition_id() == Some(native.definition_id))
        .collect();
    for (key, section) in &page.sections {
        if section.definition_id() == Some(native.definition_id)
            && !page.order.iter().any(|ordered| ordered == key)
        {
            matches.push((key.as_str(), section));
        }
    }

    let mut used_files = HashSet::new();
    let mut used_tags = HashSet::new();
    let mut resolved = Vec::with_capacity(matches.len());

    for (key, section) in matches {
        let mut suffix = instance_suffix(key, native.key_base);
        let mut include = format!("{}{suffix}", native.include_base);
        let mut counter = 2;
        while !used_files.insert(include.clone()) {
            suffix = format!("{}-{counter}", instance_suffix(key, native.key_base));
            include = format!("{}{suffix}", native.include_base);
            counter += 1;
        }

        let default_tag = format!("#{}{suffix}", native.tag_base);
        let explicit = section
            .settings
            .config_str("tag")
            .and_then(|raw| parse_instance_tag(raw, native.tag_base))
            .map(|tag| tag.canonical);

        let tag = match explicit {
            Some(tag) if !used_tags.contains(&tag) => tag,
            Some(tag) => {
                log::warn!(
                    "[Instances] Tag {tag} on '{key}' already used by another {} section, using {default_tag}",
                    native.definition_id
                );
                unique_tag(&default_tag, &used_tags)
            }
            None => unique_tag(&default_tag, &used_tags),
        };
        used_tags.insert(tag.clone());

        resolved.push(ResolvedInstance {
            key: key.to_string(),
            file: format!("partials/{include}.hbs"),
            slug: tag_slug(&tag),
            include,
            suffix,
            tag,
            section: section.clone(),
        });
    }

    resolved
}

fn unique_tag(candidate: &str, used: &HashSet<String>) -> String {
    if !used.contains(candidate) {
        return candidate.to_string();
    }
    (2..)
        .map(|n| format!("{candidate}-{n}"))
        .find(|tag| !used.contains(tag))
        .unwrap_or_else(|| candidate.to_string())
}

/// Fan a base partial out into one instance's file content
pub fn render_instance(
    base_partial: &str,
    native: &NativeSection,
    instance: &ResolvedInstance,
    post_limit: u32,
    style_body: &str,
    content_body: &str,
) -> String {
    let rendered = base_partial
        .replace(INSTANCE_CLASS_PLACEHOLDER, &instance.instance_class())
        .replace(TAG_SLUG_PLACEHOLDER, &instance.slug)
        .replace(POST_LIMIT_PLACEHOLDER, &post_limit.to_string());

    let rendered = patch_region(&rendered, &MarkerPair::named(&native.style_region()), style_body)
        .unwrap_or(rendered);
    patch_region(&rendered, &MarkerPair::named(&native.content_region()), content_body)
        .unwrap_or(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cards() -> &'static NativeSection {
        native_section("cards").unwrap()
    }

    fn card_section(tag: Option<&str>) -> SectionConfig {
        let mut section = SectionConfig::custom("cards");
        if let Some(tag) = tag {
            section.settings.custom_config = json!({ "tag": tag });
        }
        section
    }

    #[test]
    fn test_instance_suffix_reproduces_key_numeral() {
        assert_eq!(instance_suffix("cards", "cards"), "");
        assert_eq!(instance_suffix("cards-2", "cards"), "-2");
        assert_eq!(instance_suffix("cards-10", "cards"), "-10");
        assert_eq!(instance_suffix("image-text-3", "image-text"), "-3");
        assert_eq!(instance_suffix("Promo Row", "cards"), "-promo-row");
        assert_eq!(instance_suffix("cards-", "cards"), "-cards");
        assert_eq!(instance_suffix("cardsx", "cards"), "-cardsx");
        assert_eq!(instance_suffix(" cards-4 ", "cards"), "-4");
    }

    #[test]
    fn test_tag_normalization() {
        assert_eq!(parse_instance_tag("#card2", "card").unwrap().canonical, "#card-2");
        assert_eq!(parse_instance_tag("#card-2", "card").unwrap().canonical, "#card-2");
        assert_eq!(parse_instance_tag("card-2", "card").unwrap().suffix.as_deref(), Some("-2"));
        assert_eq!(parse_instance_tag("#Card", "card").unwrap().canonical, "#card");
        assert_eq!(parse_instance_tag("#image-text2", "image-text").unwrap().canonical, "#image-text-2");
        assert_eq!(parse_instance_tag("#featured", "card").unwrap().canonical, "#featured");
        assert_eq!(parse_instance_tag("#featured", "card").unwrap().suffix, None);
        assert_eq!(parse_instance_tag("  # ", "card"), None);
    }

    #[test]
    fn test_default_tag_from_suffix() {
        let mut page = PageConfig::default();
        page.push("cards-3", card_section(None));
        let resolved = resolve_instances(&page, cards());
        assert_eq!(resolved[0].tag, "#card-3");
        assert_eq!(resolved[0].slug, "hash-card-3");
        assert_eq!(resolved[0].file, "partials/cards-3.hbs");
    }

    #[test]
    fn test_three_instances_are_unique() {
        let mut page = PageConfig::default();
        page.push("cards", card_section(Some("#card2")));
        page.push("cards-2", card_section(None));
        page.push("cards-3", card_section(Some("")));

        let resolved = resolve_instances(&page, cards());
        let files: HashSet<_> = resolved.iter().map(|i| i.file.clone()).collect();
        let tags: HashSet<_> = resolved.iter().map(|i| i.tag.clone()).collect();
        assert_eq!(files.len(), 3);
        assert_eq!(tags.len(), 3);
        assert_eq!(resolved[0].tag, "#card-2");
        // the key-derived default of cards-2 is taken, so it is disambiguated
        assert_eq!(resolved[1].tag, "#card-2-2");
        assert_eq!(resolved[2].tag, "#card-3");
    }

    #[test]
    fn test_explicit_tag_collision_falls_back_to_key() {
        let mut page = PageConfig::default();
        page.push("cards", card_section(Some("#news")));
        page.push("cards-2", card_section(Some("#news")));
        let resolved = resolve_instances(&page, cards());
        assert_eq!(resolved[0].tag, "#news");
        assert_eq!(resolved[1].tag, "#card-2");
    }

    #[test]
    fn test_orphan_sections_resolved_after_ordered() {
        let mut page = PageConfig::default();
        page.push("cards-2", card_section(None));
        page.sections.insert("cards".to_string(), card_section(None));
        let resolved = resolve_instances(&page, cards());
        let keys: Vec<_> = resolved.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["cards-2", "cards"]);
    }

    #[test]
    fn test_render_instance_substitutes_placeholders() {
        let base = "<section class=\"cards __INSTANCE_CLASS__\">\
            {{!-- tf:cards-style:start --}}{{!-- tf:cards-style:end --}}\
            {{#get \"posts\" filter=\"tag:__TAG_SLUG__\" limit=\"__POST_LIMIT__\"}}{{/get}}</section>";
        let mut page = PageConfig::default();
        page.push("cards-2", card_section(None));
        let instance = &resolve_instances(&page, cards())[0];
        let out = render_instance(base, cards(), instance, 4, "<style></style>", "");
        assert!(out.contains("class=\"cards tf-cards-2\""));
        assert!(out.contains("filter=\"tag:hash-card-2\""));
        assert!(out.contains("limit=\"4\""));
        assert!(out.contains("{{!-- tf:cards-style:start --}}<style></style>{{!-- tf:cards-style:end --}}"));
    }
}
