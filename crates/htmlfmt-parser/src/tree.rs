use std::fmt;
use std::ops::Index;

use htmlfmt_lexer::{is_inline_element, is_void_element, Tag, TokenKind};

use crate::text::TextInfo;

/// Position of a node in its tree. Ids are the token's index in the input.
pub type NodeId = usize;

/// A token annotated with its place in the document structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: TokenKind,
    pub raw: String,
    pub tag: Tag,
    /// Present for text tokens only.
    pub text: Option<TextInfo>,
    /// Nesting depth, top level is 0.
    pub depth: usize,
    /// For an end tag, the start tag it closes.
    pub start: Option<NodeId>,
    /// The start tag whose children include this node.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Inside (or delimiting) a region reproduced byte for byte.
    pub in_verbatim: bool,
    /// No longer eligible for pairing or parenting.
    pub closed: bool,
    /// Bytes of this node plus everything below it. Whitespace-only text
    /// counts as zero.
    pub size: usize,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.tag.name
    }

    pub fn is_inline(&self) -> bool {
        self.kind.is_tag() && is_inline_element(&self.tag.name)
    }

    pub fn is_void(&self) -> bool {
        self.kind.is_tag() && is_void_element(&self.tag.name)
    }

    pub fn is_whitespace_only(&self) -> bool {
        self.text.as_ref().is_some_and(|t| t.is_whitespace_only)
    }

    fn own_size(&self) -> usize {
        if self.is_whitespace_only() {
            0
        } else {
            self.raw.len()
        }
    }
}

/// The annotated token sequence, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenTree {
    nodes: Vec<Node>,
}

impl TokenTree {
    /// Seal a node list. Sizes are filled in here, once.
    pub(crate) fn new(mut nodes: Vec<Node>) -> Self {
        // Children always come after their parent.
        for id in (0..nodes.len()).rev() {
            let below: usize = nodes[id].children.iter().map(|&c| nodes[c].size).sum();
            nodes[id].size = nodes[id].own_size() + below;
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// The start tag containing `id`, if any.
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(move |node| node.children.iter().map(move |&c| &self.nodes[c]))
    }
}

impl Index<NodeId> for TokenTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

/// One-line dump: `Kind-name-index[depth:children:size]` per node, with
/// `/start` after paired end tags, each terminated by `|`.
impl fmt::Display for TokenTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(
                f,
                "{}-{}-{}[{}:{}:{}]",
                node.kind.as_str(),
                node.name(),
                node.id,
                node.depth,
                node.children.len(),
                node.size
            )?;
            if let Some(start) = node.start {
                write!(f, "/{}", start)?;
            }
            f.write_str("|")?;
        }
        Ok(())
    }
}
