// Announcement Bar Models
// Presentation (global to the bar) is kept apart from the ordered content blocks

use serde::{Deserialize, Serialize};

use super::PaddingInput;

fn default_visible() -> bool {
    true
}

fn default_background_color() -> String {
    "#15171A".to_string()
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

fn default_divider_color() -> String {
    "rgba(255, 255, 255, 0.2)".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarWidth {
    #[default]
    Full,
    Narrow,
}

/// Presentation of the announcement bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementBarConfig {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub divider: bool,
    #[serde(default = "default_divider_color")]
    pub divider_color: String,
    #[serde(default)]
    pub width: BarWidth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<PaddingInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding_block: Option<f64>,
}

impl Default for AnnouncementBarConfig {
    fn default() -> Self {
        Self {
            visible: true,
            background_color: default_background_color(),
            text_color: default_text_color(),
            divider: false,
            divider_color: default_divider_color(),
            width: BarWidth::Full,
            padding: None,
            padding_block: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Small,
    #[default]
    Normal,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextWeight {
    #[default]
    Regular,
    Medium,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterSpacing {
    Tight,
    #[default]
    Normal,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    #[default]
    None,
    Uppercase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    #[serde(default)]
    pub size: TextSize,
    #[serde(default)]
    pub weight: TextWeight,
    #[serde(default)]
    pub spacing: LetterSpacing,
    #[serde(default)]
    pub case: TextCase,
    #[serde(default)]
    pub underline: bool,
}

/// One announcement entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub typography: Typography,
}

/// Ordered announcement content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementContentConfig {
    #[serde(default)]
    pub blocks: Vec<AnnouncementBlock>,
    #[serde(default)]
    pub width: BarWidth,
}
