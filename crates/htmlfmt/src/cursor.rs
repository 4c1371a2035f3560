use htmlfmt_lexer::TokenKind;
use htmlfmt_parser::{Node, TokenTree};

/// The neighbourhood of one node during layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step<'t> {
    pub current: &'t Node,
    /// The node immediately before, whitespace included.
    pub prev: Option<&'t Node>,
    /// The nearest earlier node that is not whitespace-only text.
    pub prev_visible: Option<&'t Node>,
    pub next: Option<&'t Node>,
    /// The first start tag anywhere after `current`.
    pub next_start: Option<&'t Node>,
}

/// Walks a token tree front to back with one token of look-behind and
/// unbounded look-ahead.
pub(crate) struct Cursor<'t> {
    nodes: &'t [Node],
    next_start: Vec<Option<usize>>,
    pos: usize,
    prev_visible: Option<&'t Node>,
}

impl<'t> Cursor<'t> {
    pub fn new(tree: &'t TokenTree) -> Self {
        let nodes = tree.nodes();
        let mut next_start = vec![None; nodes.len()];
        let mut upcoming = None;
        for (i, node) in nodes.iter().enumerate().rev() {
            next_start[i] = upcoming;
            if node.kind == TokenKind::StartTag {
                upcoming = Some(i);
            }
        }

        Self {
            nodes,
            next_start,
            pos: 0,
            prev_visible: None,
        }
    }
}

impl<'t> Iterator for Cursor<'t> {
    type Item = Step<'t>;

    fn next(&mut self) -> Option<Step<'t>> {
        let nodes = self.nodes;
        let pos = self.pos;
        let current = nodes.get(pos)?;
        self.pos += 1;

        let step = Step {
            current,
            prev: pos.checked_sub(1).map(|i| &nodes[i]),
            prev_visible: self.prev_visible,
            next: nodes.get(pos + 1),
            next_start: self.next_start[pos].map(|i| &nodes[i]),
        };

        if !current.is_whitespace_only() {
            self.prev_visible = Some(current);
        }
        Some(step)
    }
}
