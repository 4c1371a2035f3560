use memchr::{memchr, memchr_iter};

use crate::token::{is_raw_text_element, Attribute, Span, Tag, Token, TokenKind};
use crate::{LexerError, TokenSource};

const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &str = "-->";
const DOCTYPE_START: &[u8] = b"<!doctype";

/// Markup recognised at a `<`.
struct Markup {
    kind: TokenKind,
    /// Exclusive end offset of the markup in the source.
    end: usize,
    tag: Tag,
}

/// Markup source scanner.
///
/// Produces one token per call, in source order, ending with `Eof`.
/// Concatenating the `raw` field of every token reproduces the source.
///
/// - Byte-offset navigation over the UTF-8 source; every cut lands on an
///   ASCII delimiter, so slices stay on char boundaries
/// - `memchr` to jump between `<` candidates
/// - Raw-text elements (`script`, `style`, ...) yield their body as a
///   single text token
/// - Position tracking on every token
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    line_start: usize,
    /// Name of the raw-text element whose body comes next.
    raw_text: Option<String>,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            raw_text: None,
        }
    }

    /// Create a scanner over raw bytes, rejecting input that is not UTF-8.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, LexerError> {
        match std::str::from_utf8(bytes) {
            Ok(source) => Ok(Self::new(source)),
            Err(e) => {
                let (line, column) = line_and_column(bytes, e.valid_up_to());
                Err(LexerError::InvalidUtf8 { line, column })
            }
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.scan_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Scan the next token.
    fn scan_token(&mut self) -> Token {
        if let Some(name) = self.raw_text.take() {
            let end = find_raw_text_end(self.bytes, self.pos, &name);
            if end > self.pos {
                return self.emit(TokenKind::Text, end, Tag::default());
            }
        }

        if self.is_at_end() {
            return Token::eof(self.span_to(self.pos));
        }

        if let Some(markup) = self.markup_at(self.pos) {
            if markup.kind == TokenKind::StartTag && is_raw_text_element(&markup.tag.name) {
                self.raw_text = Some(markup.tag.name.clone());
            }
            return self.emit(markup.kind, markup.end, markup.tag);
        }

        let end = self.text_end(self.pos);
        self.emit(TokenKind::Text, end, Tag::default())
    }

    // --- Markup ---

    /// Recognise markup starting at `at`, or `None` if the `<` there is text.
    fn markup_at(&self, at: usize) -> Option<Markup> {
        let rest = &self.bytes[at..];
        if rest.len() < 2 || rest[0] != b'<' {
            return None;
        }

        if rest.starts_with(COMMENT_START) {
            // Unterminated comments run to the end of input.
            let body = at + COMMENT_START.len();
            let end = self.source[body..]
                .find(COMMENT_END)
                .map(|i| body + i + COMMENT_END.len())
                .unwrap_or(self.bytes.len());
            return Some(Markup {
                kind: TokenKind::Comment,
                end,
                tag: Tag::default(),
            });
        }

        match rest[1] {
            b'!' | b'?' => {
                let close = memchr(b'>', rest)?;
                let kind = if starts_with_ignore_ascii_case(rest, DOCTYPE_START) {
                    TokenKind::Doctype
                } else {
                    TokenKind::Comment
                };
                Some(Markup {
                    kind,
                    end: at + close + 1,
                    tag: Tag::default(),
                })
            }
            b'/' => {
                if rest.len() < 3 || !rest[2].is_ascii_alphabetic() {
                    return None;
                }
                let close = memchr(b'>', rest)?;
                let name_start = at + 2;
                let name_len = name_length(&rest[2..close]);
                let name = self.source[name_start..name_start + name_len].to_ascii_lowercase();
                Some(Markup {
                    kind: TokenKind::EndTag,
                    end: at + close + 1,
                    tag: Tag::new(name),
                })
            }
            c if c.is_ascii_alphabetic() => {
                let close = find_tag_end(rest)?;
                let inner = &rest[1..close];
                let name_len = name_length(inner);
                let name = self.source[at + 1..at + 1 + name_len].to_ascii_lowercase();

                let attrs_src = &self.source[at + 1 + name_len..at + close];
                let self_closing = attrs_src
                    .bytes()
                    .rev()
                    .find(|b| !b.is_ascii_whitespace())
                    == Some(b'/');

                Some(Markup {
                    kind: if self_closing {
                        TokenKind::SelfClosingTag
                    } else {
                        TokenKind::StartTag
                    },
                    end: at + close + 1,
                    tag: Tag::with_attributes(name, parse_attributes(attrs_src)),
                })
            }
            _ => None,
        }
    }

    /// Find where the text run starting at `start` ends: the next `<` that
    /// begins markup, or the end of input.
    fn text_end(&self, start: usize) -> usize {
        let mut i = start;
        loop {
            match memchr(b'<', &self.bytes[i..]) {
                None => return self.bytes.len(),
                Some(offset) => {
                    let at = i + offset;
                    if at > start && self.markup_at(at).is_some() {
                        return at;
                    }
                    i = at + 1;
                }
            }
        }
    }

    // --- Helpers ---

    fn emit(&mut self, kind: TokenKind, end: usize, tag: Tag) -> Token {
        let source = self.source;
        let span = self.span_to(end);
        let raw = &source[self.pos..end];
        self.advance_to(end);
        Token::new(kind, raw, tag, span)
    }

    fn span_to(&self, end: usize) -> Span {
        Span::new(self.pos, end, self.line, self.pos - self.line_start + 1)
    }

    fn advance_to(&mut self, end: usize) {
        for nl in memchr_iter(b'\n', &self.bytes[self.pos..end]) {
            self.line += 1;
            self.line_start = self.pos + nl + 1;
        }
        self.pos = end;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

impl TokenSource for Scanner<'_> {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        Ok(self.scan_token())
    }
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Length of the tag name at the start of `tag`.
fn name_length(tag: &[u8]) -> usize {
    tag.iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
        .unwrap_or(tag.len())
}

/// Find the `>` closing a start tag (`tag[0] == b'<'`). Quotes only open an
/// attribute value directly after `=`, so stray apostrophes do not swallow
/// the rest of the document.
fn find_tag_end(tag: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    for (i, &b) in tag.iter().enumerate().skip(1) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'>' => return Some(i),
                b'"' | b'\'' if after_equals => quote = Some(b),
                b'=' => {
                    after_equals = true;
                    continue;
                }
                _ if after_equals && b.is_ascii_whitespace() => continue,
                _ => {}
            },
        }
        after_equals = false;
    }

    None
}

/// Parse `key`, `key=value`, `key="value"` and `key='value'` pairs.
/// Keys are lowercased, values kept as written (without quotes).
fn parse_attributes(src: &str) -> Vec<Attribute> {
    let bytes = src.as_bytes();
    let n = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    loop {
        while i < n && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= n {
            break;
        }

        let key_start = i;
        if bytes[i] == b'=' {
            // A leading `=` is part of the name.
            i += 1;
        }
        while i < n && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        let key = src[key_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < n && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let mut value = String::new();
        if j < n && bytes[j] == b'=' {
            j += 1;
            while j < n && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < n && (bytes[j] == b'"' || bytes[j] == b'\'') {
                let start = j + 1;
                let end = memchr(bytes[j], &bytes[start..])
                    .map(|offset| start + offset)
                    .unwrap_or(n);
                value = src[start..end].to_string();
                i = (end + 1).min(n);
            } else {
                let start = j;
                while j < n && !bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                value = src[start..j].to_string();
                i = j;
            }
        }

        attrs.push(Attribute::new(key, value));
    }

    attrs
}

/// Find the start of `</name` (case-insensitive) at or after `from`, or the
/// end of input when the element is never closed.
fn find_raw_text_end(bytes: &[u8], from: usize, name: &str) -> usize {
    let name = name.as_bytes();
    let mut i = from;

    while let Some(offset) = memchr(b'<', &bytes[i..]) {
        let at = i + offset;
        let after = at + 2 + name.len();
        if bytes.get(at + 1) == Some(&b'/')
            && after <= bytes.len()
            && bytes[at + 2..after].eq_ignore_ascii_case(name)
            && bytes
                .get(after)
                .map_or(true, |b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
        {
            return at;
        }
        i = at + 1;
    }

    bytes.len()
}

/// 1-based line and column of byte `offset`.
fn line_and_column(bytes: &[u8], offset: usize) -> (usize, usize) {
    let head = &bytes[..offset];
    let line = memchr_iter(b'\n', head).count() + 1;
    let line_start = head
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}
