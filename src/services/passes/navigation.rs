// Navigation pass
// Rewrites the class attribute of the navigation root in place and injects
// the sticky-header assets. Attribute values may embed handlebars
// expressions, so quotes are only significant outside `{{ ... }}`.

use crate::models::SectionConfig;
use crate::services::{ExportResult, OnMissing, PassAction, PassSpec};

use super::PassContext;

pub const NAVIGATION_FILE: &str = "partials/navigation.hbs";

const ROOT_ID_ATTRIBUTE: &str = "id=\"gh-navigation\"";

/// Classes owned by this pass, in the order they are emitted
pub const MANAGED_NAV_CLASSES: [&str; 4] = [
    "search-hidden",
    "typography-uppercase",
    "sticky-always",
    "sticky-scroll-up",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyMode {
    None,
    Always,
    ScrollUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    pub show_search: bool,
    pub uppercase: bool,
    pub sticky: StickyMode,
}

impl NavigationOptions {
    pub fn from_header(header: Option<&SectionConfig>) -> Self {
        let Some(settings) = header.map(|section| &section.settings) else {
            return Self {
                show_search: true,
                uppercase: false,
                sticky: StickyMode::None,
            };
        };
        let sticky = match settings.config_str("sticky") {
            Some("always") => StickyMode::Always,
            Some("scroll-up") => StickyMode::ScrollUp,
            _ => StickyMode::None,
        };
        Self {
            show_search: settings.config_bool("showSearch").unwrap_or(true),
            uppercase: settings.config_str("typographyCase") == Some("uppercase"),
            sticky,
        }
    }

    /// Managed classes that are switched on
    pub fn classes(&self) -> Vec<&'static str> {
        MANAGED_NAV_CLASSES
            .iter()
            .copied()
            .filter(|class| match *class {
                "search-hidden" => !self.show_search,
                "typography-uppercase" => self.uppercase,
                "sticky-always" => self.sticky == StickyMode::Always,
                "sticky-scroll-up" => self.sticky == StickyMode::ScrollUp,
                _ => false,
            })
            .collect()
    }
}

/// Handlebars-aware cursor over template bytes
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos,
            depth: 0,
        }
    }

    /// Advance one step; returns the byte at the previous position when it
    /// sits outside any handlebars expression
    fn step(&mut self) -> Option<Option<u8>> {
        let rest = self.bytes.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }
        if rest.starts_with(b"{{") {
            self.depth += 1;
            self.pos += 2;
            return Some(None);
        }
        if rest.starts_with(b"}}") && self.depth > 0 {
            self.depth -= 1;
            self.pos += 2;
            return Some(None);
        }
        let byte = rest[0];
        self.pos += 1;
        Some(if self.depth == 0 { Some(byte) } else { None })
    }
}

/// Offset of the `"` closing an attribute value that starts at `from`
fn attribute_value_end(content: &str, from: usize) -> Option<usize> {
    let mut scanner = Scanner::new(content, from);
    loop {
        let at = scanner.pos;
        if scanner.step()? == Some(b'"') {
            return Some(at);
        }
    }
}

/// Byte range of the opening tag carrying the navigation root id
fn find_root_tag(content: &str) -> Option<(usize, usize)> {
    let id_at = content.to_ascii_lowercase().find(ROOT_ID_ATTRIBUTE)?;
    let start = content[..id_at].rfind('<')?;
    let mut scanner = Scanner::new(content, start);
    let mut in_quotes = false;
    loop {
        let at = scanner.pos;
        match scanner.step()? {
            Some(b'"') => in_quotes = !in_quotes,
            Some(b'>') if !in_quotes => return Some((start, at + 1)),
            _ => {}
        }
    }
}

/// Value range of the tag's `class="..."` attribute
fn find_class_value(tag: &str) -> Option<(usize, usize)> {
    let lower = tag.to_ascii_lowercase();
    let mut scanner = Scanner::new(tag, 0);
    let mut in_quotes = false;
    loop {
        let at = scanner.pos;
        match scanner.step()? {
            Some(b'"') => in_quotes = !in_quotes,
            Some(byte)
                if !in_quotes
                    && byte.is_ascii_whitespace()
                    && lower[at + 1..].starts_with("class=\"") =>
            {
                let value_start = at + 1 + "class=\"".len();
                let value_end = attribute_value_end(tag, value_start)?;
                return Some((value_start, value_end));
            }
            _ => {}
        }
    }
}

/// Whitespace-separated class tokens; expressions are kept whole
pub fn split_class_tokens(value: &str) -> Vec<&str> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{") {
            depth += 1;
            start.get_or_insert(i);
            i += 2;
            continue;
        }
        if bytes[i..].starts_with(b"}}") && depth > 0 {
            depth -= 1;
            i += 2;
            continue;
        }
        if depth == 0 && bytes[i].is_ascii_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&value[s..i]);
            }
        } else {
            start.get_or_insert(i);
        }
        i += 1;
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

/// Drop every managed class from a class value, then append the enabled ones
pub fn rewrite_class_value(value: &str, enabled: &[&str]) -> String {
    let mut tokens: Vec<&str> = split_class_tokens(value)
        .into_iter()
        .filter(|token| !MANAGED_NAV_CLASSES.contains(token))
        .collect();
    tokens.extend(enabled.iter().copied());
    tokens.join(" ")
}

fn rewrite_root_classes(content: &str, ctx: &PassContext) -> ExportResult<String> {
    let Some((tag_start, tag_end)) = find_root_tag(content) else {
        log::debug!("[NavigationPass] Navigation root not found, leaving classes untouched");
        return Ok(content.to_string());
    };
    let enabled = NavigationOptions::from_header(ctx.header()).classes();
    let tag = &content[tag_start..tag_end];

    let new_tag = match find_class_value(tag) {
        Some((value_start, value_end)) => format!(
            "{}{}{}",
            &tag[..value_start],
            rewrite_class_value(&tag[value_start..value_end], &enabled),
            &tag[value_end..]
        ),
        None if enabled.is_empty() => tag.to_string(),
        None => {
            // insert right after the element name
            let name_end = tag[1..]
                .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .map(|offset| offset + 1)
                .unwrap_or(tag.len() - 1);
            format!(
                "{} class=\"{}\"{}",
                &tag[..name_end],
                enabled.join(" "),
                &tag[name_end..]
            )
        }
    };

    Ok(format!(
        "{}{}{}",
        &content[..tag_start],
        new_tag,
        &content[tag_end..]
    ))
}

const STICKY_ALWAYS_STYLE: &str = r#"
<style>
.gh-navigation.sticky-always {
    position: sticky;
    top: 0;
    z-index: 100;
}
</style>
"#;

const STICKY_SCROLL_UP_ASSETS: &str = r#"
<style>
.gh-navigation.sticky-scroll-up {
    position: sticky;
    top: 0;
    z-index: 100;
    transition: transform 0.2s ease;
}
.gh-navigation.sticky-scroll-up.is-tucked {
    transform: translateY(-100%);
}
</style>
<script>
(function () {
    var nav = document.getElementById('gh-navigation');
    if (!nav) return;
    var last = window.scrollY;
    window.addEventListener('scroll', function () {
        var current = window.scrollY;
        nav.classList.toggle('is-tucked', current > last && current > nav.offsetHeight);
        last = current;
    }, { passive: true });
})();
</script>
"#;

fn nav_assets_body(ctx: &PassContext) -> String {
    match NavigationOptions::from_header(ctx.header()).sticky {
        StickyMode::None => String::new(),
        StickyMode::Always => STICKY_ALWAYS_STYLE.to_string(),
        StickyMode::ScrollUp => STICKY_SCROLL_UP_ASSETS.to_string(),
    }
}

pub fn navigation_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![
        PassSpec {
            name: "NavigationPass",
            file: NAVIGATION_FILE,
            action: PassAction::Transform(rewrite_root_classes),
        },
        PassSpec {
            name: "NavigationPass",
            file: NAVIGATION_FILE,
            action: PassAction::Region {
                region: "nav-assets",
                on_missing: OnMissing::Skip,
                compute_body: nav_assets_body,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThemeDocument;
    use crate::services::MemoryWorkspace;
    use crate::services::run_passes;
    use serde_json::json;

    const NAV: &str = "<header id=\"gh-navigation\" class=\"gh-navigation {{#if (match @custom.x \"y\")}}has-x{{/if}} is-{{@custom.layout}}\">\n\
        {{!-- tf:nav-assets:start --}}{{!-- tf:nav-assets:end --}}\n</header>\n";

    fn doc_with(config: serde_json::Value) -> ThemeDocument {
        let mut doc = ThemeDocument::default();
        doc.header.get_mut("header").unwrap().settings.custom_config = config;
        doc
    }

    fn run(doc: &ThemeDocument, content: &str) -> String {
        let ws = MemoryWorkspace::new().with_file(NAVIGATION_FILE, content);
        run_passes(&ws, &navigation_passes(), &PassContext::new(doc)).unwrap();
        ws.get(NAVIGATION_FILE).unwrap()
    }

    #[test]
    fn test_class_tokens_keep_expressions_whole() {
        let tokens = split_class_tokens("a {{#if x}}b c{{/if}} d-{{y}}");
        assert_eq!(tokens, vec!["a", "{{#if x}}b c{{/if}}", "d-{{y}}"]);
    }

    #[test]
    fn test_quote_inside_expression_is_not_attribute_end() {
        let doc = doc_with(json!({ "showSearch": false, "typographyCase": "uppercase" }));
        let out = run(&doc, NAV);
        assert!(out.contains(
            "class=\"gh-navigation {{#if (match @custom.x \"y\")}}has-x{{/if}} is-{{@custom.layout}} search-hidden typography-uppercase\">"
        ));
    }

    #[test]
    fn test_classes_toggle_off_again() {
        let on = run(&doc_with(json!({ "sticky": "always", "showSearch": false })), NAV);
        assert!(on.contains("search-hidden sticky-always\""));
        assert!(on.contains("position: sticky;"));

        let off = run(&ThemeDocument::default(), &on);
        assert!(!off.contains("search-hidden"));
        assert!(!off.contains("sticky-always"));
        assert!(off.contains("{{!-- tf:nav-assets:start --}}{{!-- tf:nav-assets:end --}}"));
    }

    #[test]
    fn test_navigation_is_idempotent() {
        let doc = doc_with(json!({ "sticky": "scroll-up", "typographyCase": "uppercase" }));
        let once = run(&doc, NAV);
        assert_eq!(run(&doc, &once), once);
        assert!(once.contains("<script>"));
        assert_eq!(once.matches("sticky-scroll-up").count(), 3);
    }

    #[test]
    fn test_class_attribute_inserted_when_absent() {
        let doc = doc_with(json!({ "sticky": "always" }));
        let out = run(&doc, "<nav id=\"gh-navigation\">\n</nav>\n");
        assert!(out.starts_with("<nav class=\"sticky-always\" id=\"gh-navigation\">"));
    }

    #[test]
    fn test_missing_root_is_left_alone() {
        let content = "<nav class=\"x\"></nav>\n";
        assert_eq!(run(&doc_with(json!({ "showSearch": false })), content), content);
    }
}
