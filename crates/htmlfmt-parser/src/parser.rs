use htmlfmt_lexer::{
    is_verbatim_element, is_void_element, LexerError, Scanner, Token, TokenKind, TokenSource,
};

use crate::text::TextInfo;
use crate::tree::{Node, NodeId, TokenTree};

/// An open `pre`/`textarea`/`code` element. Everything up to its matching
/// close is copied through untouched.
#[derive(Debug)]
struct VerbatimRegion {
    name: String,
    opener: NodeId,
    /// Same-name start tags seen inside the region and not yet closed.
    nested: usize,
}

/// Builds a [`TokenTree`] from a token stream in a single pass.
///
/// Depth is tracked as a running counter: start tags push, end tags pop,
/// void elements and verbatim regions leave it alone. Malformed nesting is
/// tolerated; unmatched end tags simply stay unpaired.
pub struct TreeBuilder {
    indent_unit: String,
    nodes: Vec<Node>,
    depth: usize,
    verbatim: Option<VerbatimRegion>,
}

impl TreeBuilder {
    /// `indent_unit` replaces tabs in text bodies.
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            indent_unit: indent_unit.into(),
            nodes: Vec::new(),
            depth: 0,
            verbatim: None,
        }
    }

    /// Scan and build in one step.
    pub fn parse(source: &str, indent_unit: &str) -> Result<TokenTree, LexerError> {
        Self::new(indent_unit).build(Scanner::new(source))
    }

    /// Drain `source` until end of input. A tokenizer error aborts the build.
    pub fn build<S: TokenSource>(mut self, mut source: S) -> Result<TokenTree, LexerError> {
        loop {
            let token = source.next_token()?;
            if token.kind == TokenKind::Eof {
                break;
            }
            self.push(token);
        }

        if let Some(region) = &self.verbatim {
            tracing::debug!(
                target: "htmlfmt::parser",
                element = %region.name,
                opener = region.opener,
                "verbatim region left open at end of input"
            );
        }
        tracing::trace!(
            target: "htmlfmt::parser",
            nodes = self.nodes.len(),
            depth = self.depth,
            "token tree built"
        );

        Ok(TokenTree::new(self.nodes))
    }

    fn push(&mut self, token: Token) {
        if self.verbatim.is_some() {
            self.push_verbatim(token);
        } else {
            self.push_structural(token);
        }
    }

    fn push_structural(&mut self, token: Token) {
        let id = self.nodes.len();
        let name = token.tag.name.clone();
        let mut node = self.node(token, id);

        match node.kind {
            TokenKind::StartTag if is_verbatim_element(&name) => {
                node.in_verbatim = true;
                self.verbatim = Some(VerbatimRegion {
                    name,
                    opener: id,
                    nested: 0,
                });
            }
            TokenKind::StartTag if !is_void_element(&name) => {
                self.depth += 1;
            }
            TokenKind::EndTag if !is_void_element(&name) => {
                self.depth = self.depth.saturating_sub(1);
                node.depth = self.depth;
                match self.find_opener(&name, node.depth) {
                    Some(start) => {
                        self.nodes[start].closed = true;
                        node.start = Some(start);
                        node.closed = true;
                    }
                    None => {
                        tracing::debug!(
                            target: "htmlfmt::parser",
                            element = %name,
                            index = id,
                            depth = node.depth,
                            "unmatched end tag"
                        );
                    }
                }
            }
            _ => {}
        }

        self.attach(node);
    }

    fn push_verbatim(&mut self, token: Token) {
        let id = self.nodes.len();
        let Some(region) = self.verbatim.as_mut() else {
            return;
        };

        let same_name = token.tag.name == region.name;
        let closes = match token.kind {
            TokenKind::StartTag if same_name => {
                region.nested += 1;
                false
            }
            TokenKind::EndTag if same_name && region.nested > 0 => {
                region.nested -= 1;
                false
            }
            TokenKind::EndTag if same_name => true,
            _ => false,
        };
        let opener = region.opener;

        let mut node = self.node(token, id);
        node.in_verbatim = true;

        if closes {
            self.verbatim = None;
            self.nodes[opener].closed = true;
            node.start = Some(opener);
            node.closed = true;
            self.attach(node);
        } else {
            node.closed = true;
            node.parent = Some(opener);
            self.nodes[opener].children.push(id);
            self.nodes.push(node);
        }
    }

    fn node(&self, token: Token, id: NodeId) -> Node {
        let text = (token.kind == TokenKind::Text)
            .then(|| TextInfo::new(&token.raw, &self.indent_unit));
        Node {
            id,
            kind: token.kind,
            raw: token.raw,
            tag: token.tag,
            text,
            depth: self.depth,
            start: None,
            parent: None,
            children: Vec::new(),
            in_verbatim: false,
            closed: false,
            size: 0,
        }
    }

    /// Link `node` under the nearest open element one level up, then store it.
    fn attach(&mut self, mut node: Node) {
        if let Some(parent_depth) = node.depth.checked_sub(1) {
            if let Some(parent) = self.nodes.iter_mut().rev().find(|n| {
                n.kind == TokenKind::StartTag
                    && !n.closed
                    && !n.is_void()
                    && n.depth == parent_depth
            }) {
                parent.children.push(node.id);
                node.parent = Some(parent.id);
            }
        }
        self.nodes.push(node);
    }

    fn find_opener(&self, name: &str, depth: usize) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| {
                n.kind == TokenKind::StartTag && !n.closed && n.depth == depth && n.name() == name
            })
            .map(|n| n.id)
    }
}
