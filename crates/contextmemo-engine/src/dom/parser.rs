//! Tree builder: turns lexer tokens into a [`Document`].
//!
//! This is deliberately much smaller than the HTML5 tree construction
//! algorithm. It never fails on malformed input:
//!
//! - unmatched end tags are ignored
//! - elements still open at end of input are closed implicitly
//! - void elements (`br`, `img`, ...) never receive children
//! - `script`, `style`, `textarea` and `title` hold raw text
//! - an open `<p>` is closed by a block-level start tag, an open `<li>` by
//!   the next `<li>`
//!
//! Comments and markup declarations are dropped; the anchoring code has no
//! use for them.

use std::sync::LazyLock;

use logos::Logos;
use regex::Regex;

use super::lexer::TokenKind;
use super::{Document, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Start tags that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre", "section",
    "table", "ul",
];

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</?([a-zA-Z][a-zA-Z0-9:-]*)").expect("valid regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid regex")
});

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// A start tag split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Parse the source of a start tag token such as `<a href="x" hidden>`.
pub fn parse_start_tag(source: &str) -> Option<StartTag> {
    let captures = TAG_NAME.captures(source)?;
    let name_match = captures.get(1)?;
    let name = name_match.as_str().to_ascii_lowercase();

    let inner = source[name_match.end()..].trim_end_matches('>');
    let self_closing = inner.trim_end().ends_with('/');

    let mut attributes: Vec<(String, String)> = Vec::new();
    for attr in ATTRIBUTE.captures_iter(inner) {
        let Some(key) = attr.get(1) else { continue };
        let key = key.as_str().to_ascii_lowercase();
        // First occurrence wins, as in browsers
        if attributes.iter().any(|(existing, _)| *existing == key) {
            continue;
        }
        let raw_value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        let value = html_escape::decode_html_entities(raw_value).into_owned();
        attributes.push((key, value));
    }

    Some(StartTag {
        name,
        attributes,
        self_closing,
    })
}

fn end_tag_name(source: &str) -> Option<String> {
    TAG_NAME
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

impl Document {
    /// Build a document from HTML source. Never fails; see the module docs
    /// for how malformed markup is handled.
    pub fn parse_html(source: &str) -> Document {
        let mut builder = TreeBuilder::new();
        let mut lexer = TokenKind::lexer(source);

        while let Some(result) = lexer.next() {
            let text = lexer.slice();
            match result.unwrap_or(TokenKind::Text) {
                TokenKind::Comment | TokenKind::Declaration => {}
                TokenKind::Text => builder.text(&html_escape::decode_html_entities(text)),
                TokenKind::EndTag => {
                    if let Some(name) = end_tag_name(text) {
                        builder.close(&name);
                    }
                }
                TokenKind::StartTag => {
                    let Some(tag) = parse_start_tag(text) else {
                        builder.text(text);
                        continue;
                    };
                    if is_raw_text_element(&tag.name) && !tag.self_closing {
                        let element = builder.open(&tag.name, tag.attributes);
                        let raw = take_raw_text(lexer.remainder(), &tag.name);
                        lexer.bump(raw.len());
                        if !raw.is_empty() {
                            let content = if tag.name == "textarea" || tag.name == "title" {
                                html_escape::decode_html_entities(raw).into_owned()
                            } else {
                                raw.to_string()
                            };
                            let text_node = builder.doc.create_text(content);
                            builder.doc.append_child(element, text_node);
                        }
                    } else if is_void_element(&tag.name) || tag.self_closing {
                        let element = builder.doc.create_element(&tag.name, tag.attributes);
                        let parent = builder.current();
                        builder.doc.append_child(parent, element);
                    } else {
                        builder.open(&tag.name, tag.attributes);
                    }
                }
            }
        }

        builder.doc
    }
}

/// Raw text of a `script`-like element up to (not including) its end tag.
fn take_raw_text<'a>(remainder: &'a str, tag: &str) -> &'a str {
    let closing = format!("</{tag}");
    let lowered = remainder.to_ascii_lowercase();
    match lowered.find(&closing) {
        Some(end) => &remainder[..end],
        None => remainder,
    }
}

struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let doc = Document::new();
        let open = vec![doc.root()];
        Self { doc, open }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.doc.root())
    }

    fn current_tag(&self) -> Option<&str> {
        self.doc.tag_name(self.current())
    }

    /// Open a new element under the current one. Raw-text elements are
    /// closed again immediately; their content is attached by the caller.
    fn open(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        if self.current_tag() == Some("p") && CLOSES_PARAGRAPH.contains(&tag) {
            self.close("p");
        }
        if tag == "li" && self.current_tag() == Some("li") {
            self.close("li");
        }

        let element = self.doc.create_element(tag, attributes);
        let parent = self.current();
        self.doc.append_child(parent, element);
        if !is_raw_text_element(tag) {
            self.open.push(element);
        }
        element
    }

    /// Pop up to and including the innermost open element named `tag`.
    fn close(&mut self, tag: &str) {
        let position = self
            .open
            .iter()
            .skip(1)
            .rposition(|&id| self.doc.tag_name(id) == Some(tag));
        if let Some(position) = position {
            self.open.truncate(position + 1);
        }
    }

    /// Append character data, merging with a preceding text sibling.
    fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(&last) = self.doc.children(parent).last()
            && let Some(existing) = self.doc.text(last)
        {
            let merged = format!("{existing}{content}");
            self.doc.set_text(last, merged);
            return;
        }
        let node = self.doc.create_text(content);
        self.doc.append_child(parent, node);
    }
}
