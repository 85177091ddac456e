// Announcement bar pass
// Presentation drives the style block, content drives the block markup.
// The editor-only preview block never ships.

use crate::models::{
    AnnouncementBlock, BarWidth, LetterSpacing, TextCase, TextSize, TextWeight,
};
use crate::services::{
    css_value_or, escape_html, escape_url, resolve_padding, CssVars, OnMissing, PassAction,
    PassSpec, ANNOUNCEMENT_PADDING,
};

use super::PassContext;

pub const ANNOUNCEMENT_FILE: &str = "partials/announcement-bar.hbs";

const NARROW_BAR_WIDTH: &str = "720px";

fn announcement_style_body(ctx: &PassContext) -> String {
    let bar = &ctx.document.announcement_bar;
    let padding = resolve_padding(Some(bar), ANNOUNCEMENT_PADDING);
    let divider = if bar.divider {
        format!("1px solid {}", css_value_or(Some(bar.divider_color.as_str()), "rgba(255, 255, 255, 0.2)"))
    } else {
        "none".to_string()
    };
    let max_width = match bar.width {
        BarWidth::Full => "none",
        BarWidth::Narrow => NARROW_BAR_WIDTH,
    };

    CssVars::new()
        .set("announcement-display", if bar.visible { "block" } else { "none" })
        .set("announcement-background", css_value_or(Some(bar.background_color.as_str()), "#15171A"))
        .set("announcement-color", css_value_or(Some(bar.text_color.as_str()), "#FFFFFF"))
        .set("announcement-divider", divider)
        .set("announcement-max-width", max_width)
        .padding("announcement", padding)
        .style_block(".gh-announcement-bar")
}

/// Class list of one announcement block
pub fn announcement_block_classes(block: &AnnouncementBlock) -> Vec<&'static str> {
    let typography = &block.typography;
    let mut classes = vec![
        "announcement-block",
        match typography.size {
            TextSize::Small => "announcement-size-small",
            TextSize::Normal => "announcement-size-normal",
            TextSize::Large => "announcement-size-large",
        },
        match typography.weight {
            TextWeight::Regular => "announcement-weight-regular",
            TextWeight::Medium => "announcement-weight-medium",
            TextWeight::Bold => "announcement-weight-bold",
        },
        match typography.spacing {
            LetterSpacing::Tight => "announcement-spacing-tight",
            LetterSpacing::Normal => "announcement-spacing-normal",
            LetterSpacing::Wide => "announcement-spacing-wide",
        },
    ];
    if typography.case == TextCase::Uppercase {
        classes.push("announcement-uppercase");
    }
    if typography.underline {
        classes.push("announcement-underline");
    }
    classes
}

fn render_block(block: &AnnouncementBlock) -> Option<String> {
    let text = block.text.trim();
    if text.is_empty() {
        return None;
    }
    let classes = announcement_block_classes(block).join(" ");
    let inner = match block.link.as_deref().map(str::trim).filter(|link| !link.is_empty()) {
        Some(link) => format!("<a href=\"{}\">{}</a>", escape_url(link), escape_html(text)),
        None => escape_html(text),
    };
    Some(format!("    <p class=\"{classes}\">{inner}</p>\n"))
}

fn announcement_content_body(ctx: &PassContext) -> String {
    let content = &ctx.document.announcement_content;
    let blocks: Vec<String> = content.blocks.iter().filter_map(render_block).collect();
    if blocks.is_empty() {
        return String::new();
    }
    let mut wrapper = String::from("gh-announcement-content");
    if content.width == BarWidth::Narrow {
        wrapper.push_str(" announcement-narrow");
    }
    format!("\n<div class=\"{wrapper}\">\n{}</div>\n", blocks.concat())
}

pub fn announcement_passes<'a>() -> Vec<PassSpec<PassContext<'a>>> {
    vec![
        PassSpec {
            name: "AnnouncementPass",
            file: ANNOUNCEMENT_FILE,
            action: PassAction::Region {
                region: "announcement-style",
                on_missing: OnMissing::Skip,
                compute_body: announcement_style_body,
            },
        },
        PassSpec {
            name: "AnnouncementPass",
            file: ANNOUNCEMENT_FILE,
            action: PassAction::Region {
                region: "announcement-content",
                on_missing: OnMissing::Skip,
                compute_body: announcement_content_body,
            },
        },
        PassSpec {
            name: "AnnouncementPass",
            file: ANNOUNCEMENT_FILE,
            action: PassAction::RemoveRegion("announcement-preview"),
        },
    ]
}
