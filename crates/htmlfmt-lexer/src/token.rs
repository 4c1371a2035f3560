/// A position in source text, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Markup token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    StartTag,
    EndTag,
    SelfClosingTag,
    Comment,
    Doctype,

    // End of input
    Eof,
}

impl TokenKind {
    /// Name used in debug dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Text => "Text",
            TokenKind::StartTag => "StartTag",
            TokenKind::EndTag => "EndTag",
            TokenKind::SelfClosingTag => "SelfClosingTag",
            TokenKind::Comment => "Comment",
            TokenKind::Doctype => "Doctype",
            TokenKind::Eof => "Eof",
        }
    }

    /// Whether tokens of this kind carry a tag name.
    pub fn is_tag(&self) -> bool {
        matches!(
            self,
            TokenKind::StartTag | TokenKind::EndTag | TokenKind::SelfClosingTag
        )
    }
}

/// An attribute on a tag, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The zero attribute is what `Attributes::by_key` returns on a miss.
    pub fn is_zero(&self) -> bool {
        self.key.is_empty()
    }
}

/// Ordered attribute list. Duplicate keys are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes(pub Vec<Attribute>);

impl Attributes {
    /// Find an attribute by key. The first match wins; a miss returns the
    /// zero attribute.
    pub fn by_key(&self, key: &str) -> Attribute {
        self.0
            .iter()
            .find(|attr| attr.key == key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|attr| attr.key == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(attrs: Vec<Attribute>) -> Self {
        Self(attrs)
    }
}

/// A tag name with its attributes. Comments, doctypes and text carry the
/// zero tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub name: String,
    pub attributes: Attributes,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::default(),
        }
    }

    pub fn with_attributes(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.name.is_empty()
    }
}

/// A token produced by the markup scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The verbatim source bytes of the token.
    pub raw: String,
    pub tag: Tag,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, tag: Tag, span: Span) -> Self {
        Self {
            kind,
            raw: raw.into(),
            tag,
            span,
        }
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, String::new(), Tag::default(), span)
    }
}

/// HTML void elements (no closing tag, no children).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Elements that do not force their own line when adjacent to text.
pub const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdo", "big", "cite", "code", "dfn", "em", "i", "ins", "kbd",
    "map", "q", "samp", "small", "span", "strong", "sub", "sup", "tt", "var",
];

/// Elements whose content is reproduced byte for byte.
pub const VERBATIM_ELEMENTS: &[&str] = &["pre", "textarea", "code"];

/// Elements whose content the scanner does not tokenize.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// Check if a tag name is an HTML void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Check if a tag name is an inline element.
pub fn is_inline_element(tag: &str) -> bool {
    INLINE_ELEMENTS.contains(&tag)
}

/// Check if a tag name opens a verbatim region.
pub fn is_verbatim_element(tag: &str) -> bool {
    VERBATIM_ELEMENTS.contains(&tag)
}

/// Check if a tag name holds raw, untokenized text.
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}
