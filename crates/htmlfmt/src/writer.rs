//! Layout engine.
//!
//! One pass over the annotated tree. Every decision is local to a token and
//! its neighbours; nothing is buffered, so bytes reach the sink in the
//! order they are decided.

use std::io::Write;

use htmlfmt_lexer::TokenKind;
use htmlfmt_parser::{Node, NodeId, TokenTree};

use crate::cursor::{Cursor, Step};
use crate::{FormatError, FormatOptions, PatternCache, TextFormatter, TextFormatterLookup};

pub(crate) struct LayoutWriter<'a, W: Write> {
    dst: W,
    tree: &'a TokenTree,
    options: &'a FormatOptions,
    text_formatters: Option<&'a dyn TextFormatterLookup>,
    patterns: &'a PatternCache,
    depth: usize,
    /// Newlines requested since the last content write. Only the first
    /// one reaches the sink.
    pending_newlines: usize,
    /// Indentation owed at the start of the current line, written with the
    /// next content at whatever depth is current by then.
    pending_indent: bool,
    /// Start tags that opened an indented block, by node id.
    indented: Vec<bool>,
    /// Custom text formatter and the start tag that installed it.
    active: Option<(NodeId, TextFormatter)>,
}

impl<'a, W: Write> LayoutWriter<'a, W> {
    pub fn new(
        dst: W,
        tree: &'a TokenTree,
        options: &'a FormatOptions,
        text_formatters: Option<&'a dyn TextFormatterLookup>,
        patterns: &'a PatternCache,
    ) -> Self {
        Self {
            dst,
            tree,
            options,
            text_formatters,
            patterns,
            depth: 0,
            pending_newlines: 0,
            pending_indent: false,
            indented: vec![false; tree.len()],
            active: None,
        }
    }

    pub fn run(mut self) -> Result<(), FormatError> {
        for step in Cursor::new(self.tree) {
            self.step(step)?;
        }
        self.dst.flush().map_err(FormatError::SinkWrite)
    }

    fn step(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let curr = step.current;
        tracing::trace!(
            target: "htmlfmt::writer",
            index = curr.id,
            kind = curr.kind.as_str(),
            name = curr.name(),
            depth = self.depth,
            "layout"
        );

        if curr.in_verbatim {
            self.write(&curr.raw)?;
            if curr.kind == TokenKind::EndTag && curr.start.is_some() {
                self.after_block(step)?;
            }
            return Ok(());
        }

        if let Some((opener, formatter)) = self.active.clone() {
            return self.formatted(step, opener, &formatter);
        }

        if curr.is_whitespace_only() {
            return self.whitespace(step);
        }

        if self.is_placeholder(curr)? {
            return self.newline_forced();
        }

        match curr.kind {
            TokenKind::StartTag => self.start_tag(step),
            TokenKind::EndTag => self.end_tag(step),
            TokenKind::Text => self.text(step),
            TokenKind::SelfClosingTag | TokenKind::Comment | TokenKind::Doctype => {
                self.standalone(step)
            }
            TokenKind::Eof => Ok(()),
        }
    }

    // --- Token kinds ---

    fn start_tag(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let curr = step.current;

        if !curr.is_void() {
            if let Some(formatter) = self.text_formatters.and_then(|l| l.lookup(&curr.tag)) {
                tracing::trace!(
                    target: "htmlfmt::writer",
                    index = curr.id,
                    name = curr.name(),
                    "custom text formatter"
                );
                self.active = Some((curr.id, formatter));
                return self.write(&curr.raw);
            }
        }

        if self.needs_expansion(curr) {
            self.indented[curr.id] = true;
            self.depth += 1;
            self.write(&curr.raw)?;
            self.newline_indent()
        } else if curr.is_void() && step.prev.is_some() && step.next.is_some() {
            self.newline_indent()?;
            self.write(&curr.raw)?;
            self.newline_indent()
        } else {
            self.write(&curr.raw)
        }
    }

    fn end_tag(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let curr = step.current;

        if curr.start.is_some_and(|start| self.indented[start]) {
            self.depth = self.depth.saturating_sub(1);
            self.newline_indent()?;
        }

        self.write(&curr.raw)?;
        self.after_block(step)
    }

    fn text(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let curr = step.current;
        let Some(info) = &curr.text else {
            return self.write(&curr.raw);
        };

        match step.prev {
            Some(prev) => {
                if (prev.kind == TokenKind::EndTag || prev.is_void()) && !prev.is_inline() {
                    self.newline_indent()?;
                }
            }
            None if info.had_leading_newline => self.newline_indent()?,
            None => {}
        }

        let mut body = info.body.clone();
        if info.had_trailing_space
            && step
                .next
                .is_some_and(|n| n.kind == TokenKind::StartTag && n.is_inline())
        {
            body.push(' ');
        }
        if info.had_leading_space
            && step
                .prev
                .is_some_and(|p| p.kind == TokenKind::EndTag && p.is_inline())
        {
            body.insert(0, ' ');
        }
        if info.has_newline {
            body = self.patterns.reindent(&body, &self.indentation());
        }
        self.write(&body)?;

        match step.next {
            Some(next)
                if info.had_trailing_newline && !next.is_inline() && next.depth == curr.depth =>
            {
                self.newline_indent()
            }
            None if info.had_trailing_newline => self.newline(),
            _ => Ok(()),
        }
    }

    /// Comments, doctypes and self-closing tags.
    fn standalone(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let curr = step.current;
        let own_line = self.in_open_block(curr);

        if own_line && !curr.is_inline() && step.prev_visible.is_some_and(ends_block) {
            self.newline_indent()?;
        }
        self.write(&curr.raw)?;
        if step.prev.is_none() && step.next.is_some() {
            self.newline()?;
        }
        if own_line {
            self.after_block(step)?;
        }
        Ok(())
    }

    /// Texts inside an element owned by a custom text formatter.
    fn formatted(
        &mut self,
        step: Step<'a>,
        opener: NodeId,
        formatter: &TextFormatter,
    ) -> Result<(), FormatError> {
        let curr = step.current;
        match curr.kind {
            TokenKind::EndTag if curr.start == Some(opener) => {
                self.active = None;
                self.write(&curr.raw)?;
                self.after_block(step)
            }
            TokenKind::Text => {
                let out = formatter(&curr.raw, self.depth);
                self.write(&out)
            }
            _ => self.write(&curr.raw),
        }
    }

    /// Whitespace between tags carries no bytes of its own. At the edges of
    /// the document it keeps a single newline.
    fn whitespace(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let Some(info) = &step.current.text else {
            return Ok(());
        };
        if step.prev.is_none() && info.had_leading_newline {
            self.newline()?;
        }
        if step.next.is_none() && info.had_trailing_newline {
            self.newline()?;
        }
        Ok(())
    }

    /// Break the line after a closed block when the next start tag is a
    /// sibling.
    fn after_block(&mut self, step: Step<'a>) -> Result<(), FormatError> {
        let Some(next) = step.next else {
            return Ok(());
        };
        if step.current.is_inline() || next.is_inline() {
            return Ok(());
        }
        if step
            .next_start
            .is_some_and(|start| start.depth == step.current.depth)
        {
            self.newline_indent()?;
        }
        Ok(())
    }

    // --- Decisions ---

    fn needs_expansion(&self, node: &Node) -> bool {
        if node.in_verbatim || node.children.is_empty() {
            return false;
        }
        if self.options.always_expand.iter().any(|name| name == node.name()) {
            return true;
        }

        let blocks = self
            .tree
            .children(node.id)
            .filter(|child| {
                (child.kind == TokenKind::StartTag && !child.is_inline())
                    || child.text.as_ref().is_some_and(|t| t.has_newline)
            })
            .count();

        blocks > 1 || node.size > self.options.size_threshold
    }

    /// Top-level nodes and children of expanded elements sit on lines of
    /// their own. Anything else shares its parent's line.
    fn in_open_block(&self, node: &Node) -> bool {
        self.tree
            .parent(node.id)
            .map_or(true, |parent| self.indented[parent.id])
    }

    fn is_placeholder(&self, node: &Node) -> Result<bool, FormatError> {
        let Some(attribute) = self.options.newline_placeholder.as_deref() else {
            return Ok(false);
        };
        if attribute.is_empty()
            || !node.kind.is_tag()
            || !node.tag.attributes.contains_key(attribute)
        {
            return Ok(false);
        }
        if !node.is_void() {
            return Err(FormatError::PlaceholderMisuse {
                attribute: attribute.to_string(),
                tag: node.name().to_string(),
            });
        }
        Ok(true)
    }

    // --- Output ---

    fn indentation(&self) -> String {
        self.options.indent.repeat(self.depth)
    }

    /// Write content, preceded by any indentation owed. Resets newline
    /// deduplication.
    fn write(&mut self, s: &str) -> Result<(), FormatError> {
        if s.is_empty() {
            return Ok(());
        }
        if self.pending_indent {
            self.pending_indent = false;
            let indentation = self.indentation();
            self.emit(&indentation)?;
        }
        self.pending_newlines = 0;
        self.emit(s)
    }

    /// Request a newline. Only the first request after content is written.
    fn newline(&mut self) -> Result<(), FormatError> {
        self.pending_newlines += 1;
        if self.pending_newlines > 1 {
            return Ok(());
        }
        self.emit("\n")
    }

    /// A newline that bypasses deduplication.
    fn newline_forced(&mut self) -> Result<(), FormatError> {
        self.emit("\n")
    }

    /// Start a new line and owe it the current indentation.
    fn newline_indent(&mut self) -> Result<(), FormatError> {
        self.newline()?;
        self.pending_indent = true;
        Ok(())
    }

    fn emit(&mut self, s: &str) -> Result<(), FormatError> {
        if s.is_empty() {
            return Ok(());
        }
        self.dst
            .write_all(s.as_bytes())
            .map_err(FormatError::SinkWrite)
    }
}

/// Whether `node` closes a block, so that markup following it starts a
/// new line.
fn ends_block(node: &Node) -> bool {
    if node.is_inline() {
        return false;
    }
    match node.kind {
        TokenKind::EndTag | TokenKind::SelfClosingTag | TokenKind::Comment | TokenKind::Doctype => {
            true
        }
        TokenKind::StartTag => node.is_void(),
        TokenKind::Text | TokenKind::Eof => false,
    }
}
