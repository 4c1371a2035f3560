//! Text token preparation.
//!
//! Layout works on a trimmed body but needs to know what whitespace the
//! author put around it, so the boundary flags are taken from the raw bytes
//! before trimming.

/// Layout view of a text token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextInfo {
    /// Tabs expanded to the indent unit, surrounding spaces, carriage
    /// returns and newlines removed.
    pub body: String,
    /// The trimmed body still spans several lines.
    pub has_newline: bool,
    pub had_leading_newline: bool,
    pub had_trailing_newline: bool,
    pub had_leading_space: bool,
    pub had_trailing_space: bool,
    pub is_whitespace_only: bool,
}

impl TextInfo {
    pub fn new(raw: &str, indent_unit: &str) -> Self {
        let body = raw
            .replace('\t', indent_unit)
            .trim_matches(|c| matches!(c, ' ' | '\r' | '\n'))
            .to_string();

        let is_whitespace_only = is_whitespace_only(raw);
        let leading = &raw[..raw.len() - raw.trim_start_matches(is_space).len()];
        let trailing = &raw[raw.trim_end_matches(is_space).len()..];

        Self {
            has_newline: body.contains('\n'),
            had_leading_newline: leading.contains('\n'),
            had_trailing_newline: trailing.contains('\n'),
            had_leading_space: !leading.is_empty() && !is_whitespace_only,
            had_trailing_space: !trailing.is_empty() && !is_whitespace_only,
            is_whitespace_only,
            body,
        }
    }
}

/// ASCII whitespace: space, tab, newline, carriage return, form feed.
pub fn is_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

pub fn is_whitespace_only(s: &str) -> bool {
    s.chars().all(is_space)
}
