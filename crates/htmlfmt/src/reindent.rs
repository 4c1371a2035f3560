//! Re-indentation of multi-line text.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use regex::{Captures, Regex};

/// Compiled continuation-line patterns, keyed by the common indent width
/// they strip.
///
/// Widths seen in practice are few and small, so entries are never evicted.
/// The cache is shared by every call on a [`crate::Formatter`] and its clones.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: RwLock<HashMap<usize, Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled patterns held.
    pub fn len(&self) -> usize {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pattern matching a newline, `width` indentation bytes and the first
    /// byte of content after them.
    fn pattern(&self, width: usize) -> Option<Regex> {
        if let Some(re) = self
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&width)
        {
            return Some(re.clone());
        }

        let re = match Regex::new(&format!(r"\n[ \t]{{{width}}}([^\n])")) {
            Ok(re) => re,
            Err(err) => {
                tracing::warn!(
                    target: "htmlfmt::writer",
                    width,
                    error = %err,
                    "cannot compile re-indent pattern, leaving text as is"
                );
                return None;
            }
        };
        tracing::trace!(target: "htmlfmt::writer", width, "compiled re-indent pattern");

        let mut patterns = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        Some(patterns.entry(width).or_insert(re).clone())
    }

    /// Shift every continuation line of `text` so that the least indented
    /// one starts at `indent`. Relative indentation is kept; blank lines
    /// stay empty.
    pub fn reindent(&self, text: &str, indent: &str) -> String {
        let width = common_indent(text);
        match self.pattern(width) {
            Some(re) => re
                .replace_all(&clear_blank_lines(text), |caps: &Captures<'_>| {
                    format!("\n{indent}{}", &caps[1])
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}

/// Empty every whitespace-only line after the first.
fn clear_blank_lines(text: &str) -> Cow<'_, str> {
    let is_blank = |line: &str| !line.is_empty() && line.trim().is_empty();
    if !text.split('\n').skip(1).any(is_blank) {
        return Cow::Borrowed(text);
    }
    let lines: Vec<&str> = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| if i > 0 && is_blank(line) { "" } else { line })
        .collect();
    Cow::Owned(lines.join("\n"))
}

/// Smallest indentation over the non-blank lines after the first.
pub fn common_indent(text: &str) -> usize {
    text.split('\n')
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0)
}
