// Content Escaping
// User text is embedded into logic-less templates, so the template language's
// own delimiters are escaped along with the usual HTML metacharacters.

/// Escape text for an HTML text node or a quoted attribute value
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#96;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a link target. Script schemes are replaced by `#`.
pub fn escape_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "#".to_string();
    }
    let scheme: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") || scheme.starts_with("data:") {
        return "#".to_string();
    }
    escape_html(trimmed)
}

/// Sanitize a CSS value (colour, length, keyword). Returns `None` when the
/// value contains anything that could break out of a declaration.
pub fn sanitize_css_value(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return None;
    }
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'));
    if !allowed {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("expression") || lower.contains("url") {
        return None;
    }
    Some(trimmed.to_string())
}

/// CSS value with a fallback when the input is rejected
pub fn css_value_or(input: Option<&str>, fallback: &str) -> String {
    input
        .and_then(sanitize_css_value)
        .unwrap_or_else(|| fallback.to_string())
}
