// Theme Document Model
// The persisted customization document consumed by the export compiler

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{AnnouncementBarConfig, AnnouncementContentConfig, MarginInput, PaddingInput};

/// Latest document schema understood by this compiler
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Key of the single header section
pub const HEADER_SECTION_KEY: &str = "header";

fn default_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

fn default_accent_color() -> String {
    "#FF1A75".to_string()
}

fn default_visible() -> bool {
    true
}

fn default_header() -> BTreeMap<String, SectionConfig> {
    let mut header = BTreeMap::new();
    header.insert(
        HEADER_SECTION_KEY.to_string(),
        SectionConfig::new(SectionType::Header),
    );
    header
}

fn default_pages() -> BTreeMap<String, PageConfig> {
    let mut pages = BTreeMap::new();
    pages.insert("home".to_string(), PageConfig::default_home());
    pages
}

/// Section type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Header,
    FooterBar,
    FooterSignup,
    Main,
    Custom,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Header => "header",
            SectionType::FooterBar => "footer-bar",
            SectionType::FooterSignup => "footer-signup",
            SectionType::Main => "main",
            SectionType::Custom => "custom",
        }
    }
}

/// Open settings record of a section. The canonical keys are typed, anything
/// else the editor stores is kept in `extra` so it round-trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSettings {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<PaddingInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding_block: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<MarginInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub custom_config: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            visible: true,
            padding: None,
            padding_block: None,
            margin: None,
            definition_id: None,
            custom_config: Value::Null,
            extra: Map::new(),
        }
    }
}

impl SectionSettings {
    fn config_value(&self, key: &str) -> Option<&Value> {
        self.custom_config.get(key).or_else(|| self.extra.get(key))
    }

    /// String entry of the section's custom config, trimmed; empty counts as absent
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_value(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config_value(key).and_then(Value::as_bool)
    }

    /// Numeric entry; numeric strings such as "24" are accepted too
    pub fn config_f64(&self, key: &str) -> Option<f64> {
        match self.config_value(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// One configurable region of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub settings: SectionSettings,
}

impl SectionConfig {
    pub fn new(section_type: SectionType) -> Self {
        Self {
            section_type,
            settings: SectionSettings::default(),
        }
    }

    /// Custom section bound to a registered definition
    pub fn custom(definition_id: &str) -> Self {
        let mut section = Self::new(SectionType::Custom);
        section.settings.definition_id = Some(definition_id.to_string());
        section
    }

    pub fn is_visible(&self) -> bool {
        self.settings.visible
    }

    pub fn definition_id(&self) -> Option<&str> {
        self.settings
            .definition_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Ordered section list of a page. `order` is the render order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionConfig>,
}

impl PageConfig {
    fn default_home() -> Self {
        let mut page = PageConfig::default();
        page.push("subheader", SectionConfig::new(SectionType::Header));
        page.push("featured", SectionConfig::new(SectionType::Custom));
        page.push("main", SectionConfig::new(SectionType::Main));
        page
    }

    /// Append a section at the end of the render order
    pub fn push(&mut self, key: &str, section: SectionConfig) {
        if !self.sections.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.sections.insert(key.to_string(), section);
    }

    /// Sections in render order, skipping dangling order entries
    pub fn ordered_sections(&self) -> impl Iterator<Item = (&str, &SectionConfig)> {
        self.order.iter().filter_map(|key| {
            self.sections
                .get(key)
                .map(|section| (key.as_str(), section))
        })
    }
}

/// Footer layout: ordered signup/bar sections plus container margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterConfig {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<MarginInput>,
}

impl Default for FooterConfig {
    fn default() -> Self {
        let mut sections = BTreeMap::new();
        sections.insert("signup".to_string(), SectionConfig::new(SectionType::FooterSignup));
        sections.insert("bar".to_string(), SectionConfig::new(SectionType::FooterBar));
        Self {
            order: vec!["signup".to_string(), "bar".to_string()],
            sections,
            margin: None,
        }
    }
}

impl FooterConfig {
    pub fn ordered_sections(&self) -> impl Iterator<Item = (&str, &SectionConfig)> {
        self.order.iter().filter_map(|key| {
            self.sections
                .get(key)
                .map(|section| (key.as_str(), section))
        })
    }
}

/// Root customization document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<String>,
    #[serde(default = "default_header")]
    pub header: BTreeMap<String, SectionConfig>,
    #[serde(default)]
    pub footer: FooterConfig,
    #[serde(default = "default_pages")]
    pub pages: BTreeMap<String, PageConfig>,
    #[serde(default)]
    pub announcement_bar: AnnouncementBarConfig,
    #[serde(default)]
    pub announcement_content: AnnouncementContentConfig,
}

impl Default for ThemeDocument {
    fn default() -> Self {
        Self {
            name: "Themeforge".to_string(),
            version: CURRENT_SCHEMA_VERSION,
            accent_color: default_accent_color(),
            settings_file: None,
            header: default_header(),
            footer: FooterConfig::default(),
            pages: default_pages(),
            announcement_bar: AnnouncementBarConfig::default(),
            announcement_content: AnnouncementContentConfig::default(),
        }
    }
}

/// Document rejected at the request boundary, before any file I/O
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ThemeDocument {
    pub fn header_section(&self) -> Option<&SectionConfig> {
        self.header.get(HEADER_SECTION_KEY)
    }

    pub fn page(&self, key: &str) -> Option<&PageConfig> {
        self.pages.get(key)
    }

    /// Fallback package identifier derived from the document name
    pub fn package_identifier(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            "theme".to_string()
        } else {
            slug
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "theme name is required"));
        }
        if self.version > CURRENT_SCHEMA_VERSION {
            return Err(ValidationError::new(
                "version",
                format!(
                    "schema version {} is newer than supported version {CURRENT_SCHEMA_VERSION}",
                    self.version
                ),
            ));
        }

        if !self.header.contains_key(HEADER_SECTION_KEY) {
            return Err(ValidationError::new("header", "missing 'header' section"));
        }
        if let Some(extra) = self.header.keys().find(|key| *key != HEADER_SECTION_KEY) {
            return Err(ValidationError::new(
                format!("header.{extra}"),
                "only a single 'header' section is allowed",
            ));
        }

        validate_order("footer", &self.footer.order, &self.footer.sections)?;
        for (key, section) in &self.footer.sections {
            if !matches!(
                section.section_type,
                SectionType::FooterBar | SectionType::FooterSignup
            ) {
                return Err(ValidationError::new(
                    format!("footer.sections.{key}.type"),
                    format!("'{}' is not a footer section type", section.section_type.as_str()),
                ));
            }
        }

        for (page_key, page) in &self.pages {
            let scope = format!("pages.{page_key}");
            validate_order(&scope, &page.order, &page.sections)?;
            for (key, section) in &page.sections {
                if section.section_type == SectionType::Custom
                    && section.definition_id().is_none()
                    && !is_builtin_page_key(key)
                {
                    return Err(ValidationError::new(
                        format!("{scope}.sections.{key}.settings.definitionId"),
                        "custom section requires a definitionId",
                    ));
                }
            }
        }

        if let Some(raw) = &self.settings_file {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(_)) => {}
                Ok(_) => {
                    return Err(ValidationError::new(
                        "settingsFile",
                        "settings file must be a JSON object",
                    ))
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        "settingsFile",
                        format!("settings file is not valid JSON: {e}"),
                    ))
                }
            }
        }

        Ok(())
    }
}

/// Page keys rendered by fixed partials rather than a section definition
pub fn is_builtin_page_key(key: &str) -> bool {
    matches!(key, "subheader" | "featured" | "main")
}

fn validate_order(
    scope: &str,
    order: &[String],
    sections: &BTreeMap<String, SectionConfig>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (index, key) in order.iter().enumerate() {
        if !seen.insert(key.as_str()) {
            return Err(ValidationError::new(
                format!("{scope}.order[{index}]"),
                format!("duplicate section '{key}'"),
            ));
        }
        if !sections.contains_key(key) {
            return Err(ValidationError::new(
                format!("{scope}.order[{index}]"),
                format!("references missing section '{key}'"),
            ));
        }
    }
    Ok(())
}

/// Lowercase ASCII slug with single hyphens between words
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
