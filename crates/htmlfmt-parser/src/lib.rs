//! htmlfmt parser
//!
//! Annotates the flat token stream with structure: nesting depth, start/end
//! tag pairing, parent/child links and subtree sizes. The result is still a
//! sequence in input order; the layout engine walks it front to back and
//! uses the annotations to decide where line breaks go.
//!
//! ```
//! use htmlfmt_parser::parse;
//!
//! let tree = parse("<div>Hi</div>", "  ").unwrap();
//! assert_eq!(tree[2].start, Some(0));
//! assert_eq!(tree[0].size, 7);
//! ```

pub mod parser;
pub mod text;
pub mod tree;

pub use htmlfmt_lexer::LexerError;
pub use parser::TreeBuilder;
pub use text::TextInfo;
pub use tree::{Node, NodeId, TokenTree};

/// Tokenize `source` and build its tree. Tabs inside text expand to
/// `indent_unit`.
pub fn parse(source: &str, indent_unit: &str) -> Result<TokenTree, LexerError> {
    TreeBuilder::parse(source, indent_unit)
}
