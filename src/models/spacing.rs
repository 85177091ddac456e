// Spacing Models
// Padding and margin value objects shared by every section type

use serde::{Deserialize, Serialize};

/// Resolved per-edge padding in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self { top, bottom, left, right }
    }

    /// Top/bottom padding with zero horizontal inset
    pub const fn block(top: u32, bottom: u32) -> Self {
        Self { top, bottom, left: 0, right: 0 }
    }
}

/// Resolved vertical margin in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margin {
    pub top: u32,
    pub bottom: u32,
}

impl Margin {
    pub const fn new(top: u32, bottom: u32) -> Self {
        Self { top, bottom }
    }
}

/// Per-edge padding as stored in the document. Every edge is optional and may
/// arrive as a float or a negative number from older editors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaddingInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
}

/// Vertical margin as stored in the document
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarginInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
}
