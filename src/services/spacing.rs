// Spacing Resolver
// Resolves section padding/margin against section-type defaults. Pure and total.

use crate::models::{
    AnnouncementBarConfig, Margin, MarginInput, Padding, PaddingInput, SectionConfig,
    SectionSettings, SectionType,
};

/// Anything carrying the two padding forms: explicit per-edge or unified block
pub trait PaddingSource {
    fn padding_input(&self) -> Option<&PaddingInput>;
    fn padding_block(&self) -> Option<f64>;
}

impl PaddingSource for SectionSettings {
    fn padding_input(&self) -> Option<&PaddingInput> {
        self.padding.as_ref()
    }

    fn padding_block(&self) -> Option<f64> {
        self.padding_block
    }
}

impl PaddingSource for AnnouncementBarConfig {
    fn padding_input(&self) -> Option<&PaddingInput> {
        self.padding.as_ref()
    }

    fn padding_block(&self) -> Option<f64> {
        self.padding_block
    }
}

/// Round and clamp to a non-negative pixel value; non-finite input yields `None`
fn normalize(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, u32::MAX as f64) as u32)
}

fn edge(value: Option<f64>, fallback: u32) -> u32 {
    value.and_then(normalize).unwrap_or(fallback)
}

fn has_any_edge(input: &PaddingInput) -> bool {
    input.top.is_some() || input.bottom.is_some() || input.left.is_some() || input.right.is_some()
}

/// Explicit per-edge padding wins (missing edges from `fallback`), then the
/// unified block value (top and bottom), then `fallback` unchanged.
pub fn resolve_padding<S: PaddingSource + ?Sized>(source: Option<&S>, fallback: Padding) -> Padding {
    let Some(source) = source else {
        return fallback;
    };

    if let Some(input) = source.padding_input().filter(|input| has_any_edge(input)) {
        return Padding {
            top: edge(input.top, fallback.top),
            bottom: edge(input.bottom, fallback.bottom),
            left: edge(input.left, fallback.left),
            right: edge(input.right, fallback.right),
        };
    }

    if let Some(block) = source.padding_block().and_then(normalize) {
        return Padding {
            top: block,
            bottom: block,
            left: fallback.left,
            right: fallback.right,
        };
    }

    fallback
}

pub fn resolve_margin(margin: Option<&MarginInput>, fallback: Margin) -> Margin {
    match margin {
        Some(input) => Margin {
            top: edge(input.top, fallback.top),
            bottom: edge(input.bottom, fallback.bottom),
        },
        None => fallback,
    }
}

/// Default padding of a section by type and, for custom sections, definition
pub fn default_padding(section_type: SectionType, definition_id: Option<&str>) -> Padding {
    match section_type {
        SectionType::Header => Padding::block(48, 48),
        SectionType::Main => Padding::block(0, 64),
        SectionType::FooterSignup => Padding::block(64, 64),
        SectionType::FooterBar => Padding::block(32, 32),
        SectionType::Custom => match definition_id {
            Some("cards") | Some("grid") => Padding::block(48, 48),
            Some("image-text") | Some("call-to-action") => Padding::block(64, 64),
            Some("divider") => Padding::block(24, 24),
            Some("text-block") => Padding::block(32, 32),
            _ => Padding::block(48, 48),
        },
    }
}

pub fn default_margin(section_type: SectionType) -> Margin {
    match section_type {
        SectionType::Main => Margin::new(0, 32),
        _ => Margin::default(),
    }
}

pub const ANNOUNCEMENT_PADDING: Padding = Padding::block(12, 12);

/// Resolved padding of a section against its own type defaults
pub fn section_padding(section: &SectionConfig) -> Padding {
    let fallback = default_padding(section.section_type, section.definition_id());
    resolve_padding(Some(&section.settings), fallback)
}

pub fn section_margin(section: &SectionConfig) -> Margin {
    resolve_margin(
        section.settings.margin.as_ref(),
        default_margin(section.section_type),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(padding: Option<PaddingInput>, block: Option<f64>) -> SectionSettings {
        SectionSettings {
            padding,
            padding_block: block,
            ..SectionSettings::default()
        }
    }

    #[test]
    fn test_explicit_edges_fill_from_fallback() {
        let settings = settings_with(
            Some(PaddingInput {
                top: Some(10.0),
                ..PaddingInput::default()
            }),
            None,
        );
        let resolved = resolve_padding(Some(&settings), Padding::new(5, 5, 0, 0));
        assert_eq!(resolved, Padding::new(10, 5, 0, 0));
    }

    #[test]
    fn test_unified_block_padding() {
        let settings = settings_with(None, Some(40.0));
        let resolved = resolve_padding(Some(&settings), Padding::new(5, 5, 2, 2));
        assert_eq!(resolved, Padding::new(40, 40, 2, 2));
    }

    #[test]
    fn test_absent_config_returns_fallback() {
        let fallback = Padding::new(5, 5, 0, 0);
        assert_eq!(resolve_padding::<SectionSettings>(None, fallback), fallback);
        assert_eq!(resolve_padding(Some(&SectionSettings::default()), fallback), fallback);
    }

    #[test]
    fn test_explicit_edges_take_precedence_over_block() {
        let settings = settings_with(
            Some(PaddingInput {
                bottom: Some(12.0),
                ..PaddingInput::default()
            }),
            Some(80.0),
        );
        let resolved = resolve_padding(Some(&settings), Padding::new(5, 5, 0, 0));
        assert_eq!(resolved, Padding::new(5, 12, 0, 0));
    }

    #[test]
    fn test_values_rounded_and_clamped() {
        let settings = settings_with(
            Some(PaddingInput {
                top: Some(-8.0),
                bottom: Some(12.6),
                left: Some(f64::NAN),
                right: Some(f64::INFINITY),
            }),
            None,
        );
        let resolved = resolve_padding(Some(&settings), Padding::new(1, 1, 3, 4));
        assert_eq!(resolved, Padding::new(0, 13, 3, 4));

        let block = settings_with(None, Some(-20.0));
        assert_eq!(
            resolve_padding(Some(&block), Padding::new(1, 1, 3, 4)),
            Padding::new(0, 0, 3, 4)
        );
    }

    #[test]
    fn test_resolve_margin() {
        let input = MarginInput {
            top: Some(24.4),
            bottom: None,
        };
        assert_eq!(resolve_margin(Some(&input), Margin::new(0, 16)), Margin::new(24, 16));
        assert_eq!(resolve_margin(None, Margin::new(3, 4)), Margin::new(3, 4));
    }

    #[test]
    fn test_section_defaults() {
        let section = SectionConfig::custom("image-text");
        assert_eq!(section_padding(&section), Padding::block(64, 64));
        assert_eq!(default_padding(SectionType::Main, None), Padding::block(0, 64));
    }
}
