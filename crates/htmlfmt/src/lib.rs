//! htmlfmt
//!
//! Re-serializes HTML with consistent indentation and line breaks while
//! keeping the bytes of every tag, comment and preformatted region intact.
//!
//! ```text
//! source → Scanner → TreeBuilder → TokenTree → LayoutWriter → sink
//! ```
//!
//! ```
//! use htmlfmt::Formatter;
//!
//! let formatted = Formatter::new()
//!     .format_str("<div><div>Hello</div><div>World</div></div>")
//!     .unwrap();
//! assert_eq!(formatted, "<div>\n  <div>Hello</div>\n  <div>World</div>\n</div>");
//! ```

mod cursor;
pub mod reindent;
mod writer;

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use htmlfmt_lexer::Scanner;
use htmlfmt_parser::TreeBuilder;

pub use htmlfmt_lexer::{Attribute, Attributes, LexerError, Tag, TokenSource};
pub use reindent::PatternCache;

use writer::LayoutWriter;

/// Default indent unit.
pub const DEFAULT_INDENT: &str = "  ";

/// Elements whose subtree is larger than this many bytes are expanded onto
/// several lines. Start and end tags count.
pub const DEFAULT_SIZE_THRESHOLD: usize = 30;

/// Elements expanded whenever they have content.
pub const DEFAULT_ALWAYS_EXPAND: &[&str] = &["html", "head", "body"];

/// Rewrites the text inside one element, given its raw bytes and the
/// current render depth. The result is written as is.
pub type TextFormatter = Arc<dyn Fn(&str, usize) -> String + Send + Sync>;

/// Chooses a [`TextFormatter`] for an element, e.g. for `<script>` bodies.
pub trait TextFormatterLookup: Send + Sync {
    fn lookup(&self, tag: &Tag) -> Option<TextFormatter>;
}

impl<F> TextFormatterLookup for F
where
    F: Fn(&Tag) -> Option<TextFormatter> + Send + Sync,
{
    fn lookup(&self, tag: &Tag) -> Option<TextFormatter> {
        self(tag)
    }
}

/// Formatting error. Output already written to the sink when one of these
/// is returned is incomplete.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Tokenize(#[from] LexerError),

    #[error("Format error: newline placeholder `{attribute}` is only allowed on void elements, found on <{tag}>")]
    PlaceholderMisuse { attribute: String, tag: String },

    #[error("Format error: failed to write output: {0}")]
    SinkWrite(#[source] io::Error),
}

/// Layout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Written once per level of depth. Also replaces tabs in text.
    pub indent: String,
    /// Attribute that turns a void element into a bare line break, e.g.
    /// `newline` for `<br newline/>`.
    pub newline_placeholder: Option<String>,
    pub size_threshold: usize,
    pub always_expand: Vec<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
            newline_placeholder: None,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            always_expand: DEFAULT_ALWAYS_EXPAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// HTML formatter. Holds configuration only, so one instance can format
/// any number of documents, from any number of threads.
#[derive(Clone, Default)]
pub struct Formatter {
    options: FormatOptions,
    text_formatters: Option<Arc<dyn TextFormatterLookup>>,
    patterns: Arc<PatternCache>,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.options.indent = indent.into();
        self
    }

    /// Indent with one tab per level.
    pub fn with_tab(self) -> Self {
        self.with_indent("\t")
    }

    /// An empty attribute name disables the placeholder.
    pub fn with_newline_placeholder(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.options.newline_placeholder = (!attribute.is_empty()).then_some(attribute);
        self
    }

    pub fn with_text_formatters(mut self, lookup: impl TextFormatterLookup + 'static) -> Self {
        self.text_formatters = Some(Arc::new(lookup));
        self
    }

    pub fn with_size_threshold(mut self, threshold: usize) -> Self {
        self.options.size_threshold = threshold;
        self
    }

    pub fn with_always_expand<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.always_expand = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Read all of `src` and write the formatted document to `dst`.
    pub fn format<W: Write, R: Read>(&self, dst: &mut W, mut src: R) -> Result<(), FormatError> {
        let mut source = Vec::new();
        src.read_to_end(&mut source).map_err(LexerError::Read)?;
        self.format_tokens(dst, Scanner::from_bytes(&source)?)
    }

    pub fn format_str(&self, source: &str) -> Result<String, FormatError> {
        let mut out = Vec::with_capacity(source.len());
        self.format_tokens(&mut out, Scanner::new(source))?;
        String::from_utf8(out)
            .map_err(|e| FormatError::SinkWrite(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Format a document from any token source.
    pub fn format_tokens<W: Write, S: TokenSource>(
        &self,
        dst: &mut W,
        source: S,
    ) -> Result<(), FormatError> {
        let tree = TreeBuilder::new(self.options.indent.as_str()).build(source)?;
        tracing::debug!(target: "htmlfmt", nodes = tree.len(), "formatting document");

        LayoutWriter::new(
            dst,
            &tree,
            &self.options,
            self.text_formatters.as_deref(),
            &self.patterns,
        )
        .run()?;

        tracing::debug!(target: "htmlfmt", "document formatted");
        Ok(())
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("options", &self.options)
            .field("text_formatters", &self.text_formatters.is_some())
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn long_text() -> String {
        "a bba".repeat(12)
    }

    fn long_text_with_newlines() -> String {
        format!("{}\n", "a bba".repeat(5)).repeat(3)
    }

    /// Format twice, feeding the output back in; both passes must match.
    fn check(formatter: &Formatter, input: &str, expected: &str) {
        let mut input = input.to_string();
        for pass in 0..2 {
            let actual = formatter.format_str(&input).unwrap();
            assert_eq!(actual, expected, "pass {}", pass);
            input = actual;
        }
    }

    fn check_default(input: &str, expected: &str) {
        check(&Formatter::new(), input, expected);
    }

    // ====================================================================
    // Blocks
    // ====================================================================

    #[test]
    fn test_sibling_blocks() {
        check_default(
            "<div><div>Hello</div><div>World</div></div>",
            "<div>\n  <div>Hello</div>\n  <div>World</div>\n</div>",
        );
    }

    #[test]
    fn test_nested_expansion() {
        check_default(
            "<div><div>Hello</div><div><span>s1</span><span>s2</span></div></div>",
            "<div>\n  <div>Hello</div>\n  <div>\n    <span>s1</span><span>s2</span>\n  </div>\n</div>",
        );
    }

    #[test]
    fn test_long_attribute_without_content() {
        let input = format!("<div class=\"{}\"></div>", long_text());
        check_default(&input, &input);
    }

    #[test]
    fn test_document_skeleton() {
        check_default(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>",
            "<!DOCTYPE html>\n<html>\n  <head>\n    <title>T</title>\n  </head>\n  <body>\n    <p>x</p>\n  </body>\n</html>",
        );
    }

    // ====================================================================
    // Document boundaries
    // ====================================================================

    #[test]
    fn test_boundary_newlines() {
        check_default("\n<div>Hello</div>\n", "\n<div>Hello</div>\n");
        check_default("\n\n\n<div>Hello</div>\n\n\n\n", "\n<div>Hello</div>\n");
        check_default("<div>Hello</div>\n", "<div>Hello</div>\n");
        check_default("<div>Hello</div>", "<div>Hello</div>");
    }

    #[test]
    fn test_empty_document() {
        check_default("", "");
        check_default("\n\n", "\n");
    }

    // ====================================================================
    // Element types
    // ====================================================================

    #[test]
    fn test_preformatted_is_verbatim() {
        check_default(
            "<pre>  <div>    Hello     </div>  </pre>",
            "<pre>  <div>    Hello     </div>  </pre>",
        );
        check_default(
            "<code>  <div>    Hello     </div>  </code>",
            "<code>  <div>    Hello     </div>  </code>",
        );
    }

    #[test]
    fn test_textarea_is_verbatim() {
        check_default(
            "<textarea>\n   a\n b</textarea>",
            "<textarea>\n   a\n b</textarea>",
        );
    }

    #[test]
    fn test_comments() {
        check_default(
            "<!-- comment1 --><!-- comment2 -->",
            "<!-- comment1 -->\n<!-- comment2 -->",
        );
    }

    #[test]
    fn test_comment_follows_parent_layout() {
        check_default(
            "<div>\n  <!-- c -->\n  <p>a</p>\n</div>",
            "<div><!-- c --><p>a</p></div>",
        );
        check_default(
            "<div><p>a</p><!-- c --><p>b</p></div>",
            "<div>\n  <p>a</p>\n  <!-- c -->\n  <p>b</p>\n</div>",
        );
    }

    #[test]
    fn test_end_tag_after_trailing_void() {
        check_default(
            "<div><img src=a.png><img src=b.png></div>",
            "<div>\n  <img src=a.png>\n  <img src=b.png>\n</div>",
        );
        check_default(
            "<section><p>Paragraph one here.</p><br></section>",
            "<section>\n  <p>Paragraph one here.</p>\n  <br>\n</section>",
        );
    }

    // ====================================================================
    // Text
    // ====================================================================

    #[test]
    fn test_text_next_to_blocks() {
        check_default("<div></div>\nw3", "<div></div>\nw3");
        check_default("w3\n<br>", "w3\n<br>");
        check_default("<br>\nw3", "<br>\nw3");
    }

    #[test]
    fn test_text_around_inline_elements() {
        check_default(
            "Hello <span>World</span> and then.",
            "Hello <span>World</span> and then.",
        );
        check_default(
            "Hello\n<span>World</span>\nand then.",
            "Hello <span>World</span> and then.",
        );
    }

    #[test]
    fn test_size_threshold_boundary() {
        check_default(
            "<div>Hello <span>World</span>s</div>",
            "<div>Hello <span>World</span>s</div>",
        );
    }

    #[test]
    fn test_long_text_is_wrapped() {
        let text = long_text();
        check_default(
            &format!("<div>{}</div>", text),
            &format!("<div>\n  {}\n</div>", text),
        );
        check_default(
            &format!("<div><span>{}</span></div>", text),
            &format!("<div>\n  <span>\n    {}\n  </span>\n</div>", text),
        );
    }

    #[test]
    fn test_multiline_text_is_reindented() {
        check_default(
            &format!("<div>{}</div>", long_text_with_newlines()),
            "<div>\n  a bbaa bbaa bbaa bbaa bba\n  a bbaa bbaa bbaa bbaa bba\n  a bbaa bbaa bbaa bbaa bba\n</div>",
        );
    }

    #[test]
    fn test_multiline_text_keeps_relative_indent() {
        check_default(
            "<div><p>a</p><p>b\n      c\n        d</p></div>",
            "<div>\n  <p>a</p>\n  <p>b\n  c\n    d</p>\n</div>",
        );
    }

    // ====================================================================
    // Options
    // ====================================================================

    #[test]
    fn test_tab_indent() {
        check(
            &Formatter::new().with_tab(),
            "<div><p>a</p><p>b</p></div>",
            "<div>\n\t<p>a</p>\n\t<p>b</p>\n</div>",
        );
    }

    #[test]
    fn test_custom_indent() {
        check(
            &Formatter::new().with_indent("    "),
            "<div><p>a</p><p>b</p></div>",
            "<div>\n    <p>a</p>\n    <p>b</p>\n</div>",
        );
    }

    #[test]
    fn test_size_threshold_option() {
        check(
            &Formatter::new().with_size_threshold(5),
            "<div>Hello</div>",
            "<div>\n  Hello\n</div>",
        );
        check(
            &Formatter::new().with_size_threshold(10),
            "<div>Hello</div>",
            "<div>Hello</div>",
        );
    }

    #[test]
    fn test_always_expand_option() {
        check(
            &Formatter::new().with_always_expand(["p"]),
            "<p>x</p>",
            "<p>\n  x\n</p>",
        );
        check(
            &Formatter::new().with_always_expand(Vec::<String>::new()),
            "<body>x</body>",
            "<body>x</body>",
        );
    }

    #[test]
    fn test_options_round_trip() {
        let options = FormatOptions {
            indent: "\t".into(),
            size_threshold: 80,
            ..FormatOptions::default()
        };
        let formatter = Formatter::new().with_options(options.clone());
        assert_eq!(formatter.options(), &options);
    }

    // ====================================================================
    // Custom text formatters
    // ====================================================================

    fn javascript_upper(tag: &Tag) -> Option<TextFormatter> {
        if tag.name != "script" {
            return None;
        }
        let typ = tag.attributes.by_key("type");
        if !typ.value.is_empty() && typ.value != "text/javascript" {
            return None;
        }
        Some(Arc::new(|text: &str, _depth: usize| text.to_uppercase()))
    }

    #[test]
    fn test_custom_text_formatter() {
        check(
            &Formatter::new().with_text_formatters(javascript_upper),
            r#"<script type="text/javascript">hello</script>"#,
            r#"<script type="text/javascript">HELLO</script>"#,
        );
    }

    #[test]
    fn test_custom_text_formatter_skips_other_types() {
        check(
            &Formatter::new().with_text_formatters(javascript_upper),
            r#"<script type="module">hello</script>"#,
            r#"<script type="module">hello</script>"#,
        );
    }

    #[test]
    fn test_custom_text_formatter_ends_with_element() {
        check(
            &Formatter::new().with_text_formatters(javascript_upper),
            "<script>a</script><p>b</p>",
            "<script>A</script>\n<p>b</p>",
        );
    }

    #[test]
    fn test_custom_text_formatter_receives_depth() {
        let formatter = Formatter::new().with_text_formatters(|tag: &Tag| {
            (tag.name == "style").then(|| {
                Arc::new(|text: &str, depth: usize| format!("{}@{}", text.trim(), depth))
                    as TextFormatter
            })
        });
        assert_eq!(
            formatter
                .format_str("<body><style> a </style></body>")
                .unwrap(),
            "<body>\n  <style>a@1</style>\n</body>"
        );
    }

    // ====================================================================
    // Newline placeholder
    // ====================================================================

    #[test]
    fn test_placeholder_between_blocks() {
        let formatter = Formatter::new().with_newline_placeholder("newline");
        assert_eq!(
            formatter
                .format_str("<div>Hello</div><br newline/><div>World</div>")
                .unwrap(),
            "<div>Hello</div>\n\n<div>World</div>"
        );
        assert_eq!(
            formatter
                .format_str("<div>Hello</div><br newline/><br newline/>World")
                .unwrap(),
            "<div>Hello</div>\n\n\nWorld"
        );
    }

    #[test]
    fn test_placeholder_on_non_void_element() {
        let formatter = Formatter::new().with_newline_placeholder("newline");
        let err = formatter
            .format_str("<div>Hello</div><div newline/><div>World</div>")
            .unwrap_err();
        assert!(matches!(err, FormatError::PlaceholderMisuse { .. }));
        assert_eq!(
            err.to_string(),
            "Format error: newline placeholder `newline` is only allowed on void elements, found on <div>"
        );
    }

    #[test]
    fn test_placeholder_disabled_by_empty_name() {
        let formatter = Formatter::new().with_newline_placeholder("");
        assert_eq!(formatter.options().newline_placeholder, None);
    }

    // ====================================================================
    // Readers, writers and errors
    // ====================================================================

    #[test]
    fn test_format_reader_to_writer() {
        let mut out = Vec::new();
        Formatter::new()
            .format(&mut out, "<div><p>a</p><p>b</p></div>".as_bytes())
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<div>\n  <p>a</p>\n  <p>b</p>\n</div>"
        );
    }

    #[test]
    fn test_invalid_utf8_is_a_tokenize_error() {
        let mut out = Vec::new();
        let err = Formatter::new()
            .format(&mut out, &b"<p>\xff</p>"[..])
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::Tokenize(LexerError::InvalidUtf8 { line: 1, column: 4 })
        ));
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_aborts() {
        let err = Formatter::new()
            .format(&mut BrokenSink, "<p>x</p>".as_bytes())
            .unwrap_err();
        assert!(matches!(err, FormatError::SinkWrite(_)));
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("gone"))
        }
    }

    #[test]
    fn test_read_error_is_a_tokenize_error() {
        let err = Formatter::new()
            .format(&mut Vec::new(), BrokenReader)
            .unwrap_err();
        assert!(matches!(err, FormatError::Tokenize(LexerError::Read(_))));
    }

    #[test]
    fn test_formatter_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Formatter>();

        let formatter = Formatter::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let formatter = formatter.clone();
                std::thread::spawn(move || formatter.format_str("<div>a\nb\nc</div>").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "<div>a\nb\nc</div>");
        }
        assert_eq!(formatter.patterns.len(), 1);
    }
}
