// Accent colour pass for the site layout

use crate::services::{css_value_or, CssVars, OnMissing, PassAction, PassSpec};

use super::PassContext;

const DEFAULT_ACCENT: &str = "#FF1A75";

fn accent_body(ctx: &PassContext) -> String {
    let accent = css_value_or(Some(ctx.document.accent_color.as_str()), DEFAULT_ACCENT);
    CssVars::new()
        .set("ghost-accent-color", accent)
        .style_block(":root")
}

pub fn accent_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![PassSpec {
        name: "AccentPass",
        file: "default.hbs",
        action: PassAction::Region {
            region: "accent",
            on_missing: OnMissing::Skip,
            compute_body: accent_body,
        },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThemeDocument;

    #[test]
    fn test_accent_rejects_unsafe_colour() {
        let mut doc = ThemeDocument::default();
        doc.accent_color = "#123456".to_string();
        assert!(accent_body(&PassContext::new(&doc)).contains("--ghost-accent-color: #123456;"));

        doc.accent_color = "red;}</style><script>".to_string();
        let body = accent_body(&PassContext::new(&doc));
        assert!(body.contains("--ghost-accent-color: #FF1A75;"));
        assert!(!body.contains("<script>"));
    }
}
