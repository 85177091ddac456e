// CSS fragment helpers shared by the customization passes

use crate::models::{Margin, Padding};

/// Ordered list of CSS custom properties
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CssVars {
    entries: Vec<(String, String)>,
}

impl CssVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.entries.push((name.to_string(), value.into()));
        self
    }

    pub fn px(self, name: &str, value: u32) -> Self {
        self.set(name, format!("{value}px"))
    }

    pub fn padding(self, prefix: &str, padding: Padding) -> Self {
        self.px(&format!("{prefix}-padding-top"), padding.top)
            .px(&format!("{prefix}-padding-bottom"), padding.bottom)
            .px(&format!("{prefix}-padding-left"), padding.left)
            .px(&format!("{prefix}-padding-right"), padding.right)
    }

    pub fn margin(self, prefix: &str, margin: Margin) -> Self {
        self.px(&format!("{prefix}-margin-top"), margin.top)
            .px(&format!("{prefix}-margin-bottom"), margin.bottom)
    }

    /// Declarations for an inline `style` attribute
    pub fn inline(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("--{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A `<style>` block scoping the variables to `selector`, framed by
    /// newlines so it sits on its own lines between two markers
    pub fn style_block(&self, selector: &str) -> String {
        let mut out = format!("\n<style>\n{selector} {{\n");
        for (name, value) in &self.entries {
            out.push_str(&format!("    --{name}: {value};\n"));
        }
        out.push_str("}\n</style>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_block_layout() {
        let block = CssVars::new()
            .padding("hero", Padding::new(10, 20, 0, 4))
            .set("hero-color", "#fff")
            .style_block(".gh-hero");
        assert_eq!(
            block,
            "\n<style>\n.gh-hero {\n    --hero-padding-top: 10px;\n    --hero-padding-bottom: 20px;\n    \
             --hero-padding-left: 0px;\n    --hero-padding-right: 4px;\n    --hero-color: #fff;\n}\n</style>\n"
        );
    }

    #[test]
    fn test_inline_declarations() {
        let inline = CssVars::new().margin("tf", Margin::new(1, 2)).inline();
        assert_eq!(inline, "--tf-margin-top: 1px; --tf-margin-bottom: 2px;");
    }
}
