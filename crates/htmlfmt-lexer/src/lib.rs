//! htmlfmt lexer
//!
//! Splits markup source into a flat stream of tokens: start, end and
//! self-closing tags, comments, doctypes and text. The scanner is lenient:
//! malformed markup degrades to text instead of failing.
//!
//! # Example
//!
//! ```
//! use htmlfmt_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("");
//! assert_eq!(tokens.len(), 1); // Just EOF
//! assert_eq!(tokens[0].kind, TokenKind::Eof);
//! ```

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{
    is_inline_element, is_raw_text_element, is_verbatim_element, is_void_element, Attribute,
    Attributes, Span, Tag, Token, TokenKind,
};

/// Lexer error. Produced when the source cannot be read as text; markup
/// itself never fails to scan.
#[derive(Debug, thiserror::Error)]
pub enum LexerError {
    #[error("Lexer error at line {line}, column {column}: invalid UTF-8")]
    InvalidUtf8 { line: usize, column: usize },

    #[error("Lexer error: failed to read source: {0}")]
    Read(#[from] std::io::Error),
}

/// A source of markup tokens.
///
/// `Ok` with a `TokenKind::Eof` token ends the stream cleanly; `Err` aborts
/// whoever is consuming it.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexerError>;
}

impl<S: TokenSource + ?Sized> TokenSource for &mut S {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        (**self).next_token()
    }
}
