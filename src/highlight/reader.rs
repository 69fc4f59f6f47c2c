//! Pull-style XML token stream with line/column positions
//!
//! The scanner consumes tokens through the [`PullParser`] trait. [`DomReader`]
//! is the bundled implementation: it parses the snapshot with `roxmltree` and
//! replays the tree in document order, reporting positions the way a streaming
//! reader would (element names, attribute names and comment bodies).
//!
//! Two tree features have no place in a source-order stream and are adjusted:
//! namespace declarations, which roxmltree keeps out of `attributes()`, are
//! read back from the start tag, and nodes produced by entity expansion are
//! skipped since their ranges point into the DTD.

use std::ops::Range;

use roxmltree::{Document, Node, NodeId, NodeType, ParsingOptions};
use thiserror::Error;

use super::line_index::TextPos;

/// A structural error reported by the XML parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<roxmltree::Error> for ParseError {
    fn from(err: roxmltree::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// An attribute as seen inside a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute<'t> {
    /// Qualified name exactly as written
    pub name: &'t str,
    /// Value with entities decoded; namespace declarations keep the source text
    pub value: String,
    /// The quote character delimiting the value in the source
    pub quote: char,
    /// Position of the first character of the name
    pub pos: TextPos,
}

/// One node reported by a [`PullParser`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken<'t> {
    /// `<name attr="..">` or `<name/>`; `pos` points at the name
    StartElement {
        name: &'t str,
        pos: TextPos,
        attributes: Vec<XmlAttribute<'t>>,
        /// Self-closing (`/>`); no matching `EndElement` follows
        empty: bool,
    },
    /// `</name>`; `pos` points at the name
    EndElement { name: &'t str, pos: TextPos },
    /// Character data, including whitespace between tags
    Text { pos: TextPos, len: usize },
    /// `<!--body-->`; `pos` points at the body
    Comment { body: &'t str, pos: TextPos },
    /// An attribute visited on its own rather than through its start tag
    Attribute(XmlAttribute<'t>),
    ProcessingInstruction { pos: TextPos },
}

impl XmlToken<'_> {
    pub fn pos(&self) -> TextPos {
        match self {
            XmlToken::StartElement { pos, .. }
            | XmlToken::EndElement { pos, .. }
            | XmlToken::Text { pos, .. }
            | XmlToken::Comment { pos, .. }
            | XmlToken::ProcessingInstruction { pos } => *pos,
            XmlToken::Attribute(attr) => attr.pos,
        }
    }
}

/// A streaming XML parser as the scanner sees it
pub trait PullParser<'t>: Iterator<Item = Result<XmlToken<'t>, ParseError>> {
    /// Whether tokens carry usable line/column positions.
    ///
    /// Without them no token can be mapped to an offset.
    fn has_line_info(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Open(NodeId),
    Close(NodeId),
}

/// Converts byte offsets to positions by walking forward from the last query
#[derive(Debug, Clone, Copy)]
struct LineCursor {
    offset: usize,
    line: usize,
    column: usize,
}

impl Default for LineCursor {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl LineCursor {
    fn pos_at(&mut self, text: &str, offset: usize) -> TextPos {
        if offset < self.offset {
            *self = Self::default();
        }
        let end = offset.min(text.len());
        for &byte in &text.as_bytes()[self.offset..end] {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = end;
        TextPos::new(self.line, self.column)
    }
}

/// [`PullParser`] over a `roxmltree` document.
///
/// Well-formedness errors surface from [`DomReader::parse`], before any token.
pub struct DomReader<'t> {
    text: &'t str,
    doc: Document<'t>,
    next: Option<Step>,
    lines: LineCursor,
}

impl<'t> DomReader<'t> {
    pub fn parse(text: &'t str) -> Result<Self, ParseError> {
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let doc = Document::parse_with_options(text, options)?;
        let root = doc.root().id();

        Ok(Self {
            text,
            doc,
            next: Some(Step::Open(root)),
            lines: LineCursor::default(),
        })
    }

    /// Depth-first walk yielding an open and a close step per node.
    ///
    /// Entity-expanded subtrees are stepped over without being reported.
    fn advance(&mut self) -> Option<Step> {
        loop {
            let step = self.next.take()?;
            let (Step::Open(id) | Step::Close(id)) = step;
            let node = self.doc.get_node(id)?;

            match step {
                Step::Open(_) if is_expanded(node) => {
                    self.next = step_after(node);
                    continue;
                }
                Step::Open(_) => {
                    self.next = match node.first_child() {
                        Some(child) => Some(Step::Open(child.id())),
                        None => Some(Step::Close(id)),
                    };
                }
                Step::Close(_) => self.next = step_after(node),
            }
            return Some(step);
        }
    }

    fn token_for(&mut self, step: Step) -> Option<XmlToken<'t>> {
        let text = self.text;
        let (id, opening) = match step {
            Step::Open(id) => (id, true),
            Step::Close(id) => (id, false),
        };
        let node = self.doc.get_node(id)?;
        let range = node.range();

        match (node.node_type(), opening) {
            (NodeType::Element, true) => {
                let name_start = range.start + 1;
                let name = qualified_name(text, name_start);
                let pos = self.lines.pos_at(text, name_start);

                // Decoded values keyed by where the attribute name starts
                let decoded: Vec<(usize, &str)> = node
                    .attributes()
                    .map(|attr| (attr.range_qname().start, attr.value()))
                    .collect();
                let lines = &mut self.lines;
                let attributes = raw_attributes(text, name_start + name.len())
                    .into_iter()
                    .map(|raw| {
                        let value = decoded
                            .iter()
                            .find(|(start, _)| *start == raw.name.start)
                            .map(|(_, value)| *value)
                            .unwrap_or_else(|| text.get(raw.value.clone()).unwrap_or_default());
                        XmlAttribute {
                            name: text.get(raw.name.clone()).unwrap_or_default(),
                            value: value.to_string(),
                            quote: raw.quote,
                            pos: lines.pos_at(text, raw.name.start),
                        }
                    })
                    .collect();

                Some(XmlToken::StartElement {
                    name,
                    pos,
                    attributes,
                    empty: is_self_closing(text, range.clone()),
                })
            }
            (NodeType::Element, false) => {
                if is_self_closing(text, range.clone()) {
                    return None;
                }
                let element = text.get(range.clone())?;
                let name_start = range.start + element.rfind("</")? + 2;
                Some(XmlToken::EndElement {
                    name: qualified_name(text, name_start),
                    pos: self.lines.pos_at(text, name_start),
                })
            }
            (NodeType::Text, true) => Some(XmlToken::Text {
                pos: self.lines.pos_at(text, range.start),
                len: range.len(),
            }),
            (NodeType::Comment, true) => {
                let body_start = range.start + "<!--".len();
                let body_end = range.end.saturating_sub("-->".len()).max(body_start);
                Some(XmlToken::Comment {
                    body: text.get(body_start..body_end).unwrap_or_default(),
                    pos: self.lines.pos_at(text, body_start),
                })
            }
            (NodeType::PI, true) => Some(XmlToken::ProcessingInstruction {
                pos: self.lines.pos_at(text, range.start),
            }),
            _ => None,
        }
    }
}

impl<'t> Iterator for DomReader<'t> {
    type Item = Result<XmlToken<'t>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = self.advance()?;
            if let Some(token) = self.token_for(step) {
                return Some(Ok(token));
            }
        }
    }
}

impl<'t> PullParser<'t> for DomReader<'t> {
    fn has_line_info(&self) -> bool {
        true
    }
}

/// Name starting at `start`, as written (prefix included)
fn qualified_name(text: &str, start: usize) -> &str {
    let rest = text.get(start..).unwrap_or_default();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// One `name="value"` slot of a start tag, as byte ranges into the source
struct RawAttribute {
    name: Range<usize>,
    quote: char,
    value: Range<usize>,
}

/// Every attribute of the start tag whose name ends at `from`, in source order.
///
/// Unlike `Node::attributes()` this includes `xmlns` and `xmlns:*`. The tag is
/// known to be well-formed, so a plain lexer suffices.
fn raw_attributes(text: &str, from: usize) -> Vec<RawAttribute> {
    let bytes = text.as_bytes();
    let skip_ws = |mut i: usize| {
        while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        i
    };

    let mut attrs = Vec::new();
    let mut i = skip_ws(from);
    while let Some(&b) = bytes.get(i) {
        if b == b'/' || b == b'>' {
            break;
        }
        let name_start = i;
        while bytes
            .get(i)
            .is_some_and(|&b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'/' | b'>'))
        {
            i += 1;
        }
        if i == name_start {
            break;
        }
        let name = name_start..i;

        i = skip_ws(i);
        if bytes.get(i) != Some(&b'=') {
            break;
        }
        i = skip_ws(i + 1);
        let quote = match bytes.get(i) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => break,
        };
        let value_start = i + 1;
        let Some(len) = bytes
            .get(value_start..)
            .and_then(|rest| rest.iter().position(|&b| b == quote))
        else {
            break;
        };
        let value = value_start..value_start + len;
        i = skip_ws(value.end + 1);

        attrs.push(RawAttribute {
            name,
            quote: quote as char,
            value,
        });
    }
    attrs
}

/// Entity replacement nodes keep ranges inside the DTD, outside their parent
fn is_expanded(node: Node<'_, '_>) -> bool {
    let Some(parent) = node.parent_element() else {
        return false;
    };
    let (outer, inner) = (parent.range(), node.range());
    inner.start < outer.start || inner.end > outer.end
}

/// The step that follows closing `node`
fn step_after(node: Node<'_, '_>) -> Option<Step> {
    match node.next_sibling() {
        Some(sibling) => Some(Step::Open(sibling.id())),
        None => node.parent().map(|parent| Step::Close(parent.id())),
    }
}

fn is_self_closing(text: &str, range: Range<usize>) -> bool {
    text.get(range).is_some_and(|element| element.ends_with("/>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<XmlToken<'_>> {
        DomReader::parse(text)
            .expect("well-formed")
            .collect::<Result<Vec<_>, _>>()
            .expect("no token errors")
    }

    #[test]
    fn test_start_and_end_positions_point_at_names() {
        let toks = tokens(r#"<a x="1"><b/></a>"#);
        assert_eq!(toks.len(), 3);

        match &toks[0] {
            XmlToken::StartElement {
                name,
                pos,
                attributes,
                empty,
            } => {
                assert_eq!(*name, "a");
                assert_eq!(*pos, TextPos::new(1, 2));
                assert!(!empty);
                assert_eq!(attributes.len(), 1);
                assert_eq!(attributes[0].name, "x");
                assert_eq!(attributes[0].value, "1");
                assert_eq!(attributes[0].quote, '"');
                assert_eq!(attributes[0].pos, TextPos::new(1, 4));
            }
            other => panic!("expected start element, got {:?}", other),
        }

        assert!(matches!(
            &toks[1],
            XmlToken::StartElement { name: "b", empty: true, .. }
        ));
        assert_eq!(
            toks[2],
            XmlToken::EndElement {
                name: "a",
                pos: TextPos::new(1, 16)
            }
        );
    }

    #[test]
    fn test_comment_and_text_across_lines() {
        let toks = tokens("<r>\n<!-- hi -->\n</r>");
        let comment = toks
            .iter()
            .find(|t| matches!(t, XmlToken::Comment { .. }))
            .expect("comment token");
        assert_eq!(
            *comment,
            XmlToken::Comment {
                body: " hi ",
                pos: TextPos::new(2, 5)
            }
        );
        assert!(toks.iter().any(|t| matches!(t, XmlToken::Text { .. })));
        assert_eq!(
            toks.last(),
            Some(&XmlToken::EndElement {
                name: "r",
                pos: TextPos::new(3, 3)
            })
        );
    }

    #[test]
    fn test_single_quotes_and_decoded_values() {
        let toks = tokens("<a k='x&amp;y'/>");
        let XmlToken::StartElement { attributes, .. } = &toks[0] else {
            panic!("expected start element");
        };
        assert_eq!(attributes[0].quote, '\'');
        assert_eq!(attributes[0].value, "x&y");
    }

    #[test]
    fn test_prefixed_names_are_reported_as_written() {
        let toks = tokens(r#"<p:a xmlns:p="urn:p" p:k="v"></p:a>"#);
        let XmlToken::StartElement {
            name, attributes, ..
        } = &toks[0]
        else {
            panic!("expected start element");
        };
        assert_eq!(*name, "p:a");
        assert!(attributes.iter().any(|a| a.name == "p:k"));
        assert!(matches!(
            toks.last(),
            Some(XmlToken::EndElement { name: "p:a", .. })
        ));
    }

    #[test]
    fn test_namespace_declarations_are_attributes() {
        let toks = tokens(r#"<a xmlns="u>v" xmlns:p='urn:p' p:k="1&amp;"/>"#);
        let XmlToken::StartElement { attributes, .. } = &toks[0] else {
            panic!("expected start element");
        };
        let seen: Vec<_> = attributes
            .iter()
            .map(|a| (a.name, a.value.as_str(), a.quote))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("xmlns", "u>v", '"'),
                ("xmlns:p", "urn:p", '\''),
                ("p:k", "1&", '"'),
            ]
        );
        assert_eq!(attributes[1].pos, TextPos::new(1, 16));
    }

    #[test]
    fn test_entity_expanded_nodes_are_skipped() {
        let text = "<!DOCTYPE r [<!ENTITY e \"<x a='1'/>\">]>\n<r>\n<q/>\n&e;</r>";
        let toks = tokens(text);
        let names: Vec<_> = toks
            .iter()
            .filter_map(|t| match t {
                XmlToken::StartElement { name, .. } | XmlToken::EndElement { name, .. } => {
                    Some(*name)
                }
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["r", "q", "r"]);
        assert!(toks.windows(2).all(|w| w[0].pos() <= w[1].pos()));
    }

    #[test]
    fn test_raw_attributes_spacing_and_quotes() {
        let text = "<a  k = 'v'\n\tj=\"\" >";
        let attrs = raw_attributes(text, 2);
        let slots: Vec<_> = attrs
            .iter()
            .map(|a| (&text[a.name.clone()], a.quote, &text[a.value.clone()]))
            .collect();
        assert_eq!(slots, vec![("k", '\'', "v"), ("j", '"', "")]);
    }

    #[test]
    fn test_mismatched_tags_fail_to_parse() {
        let err = DomReader::parse("<a><b></a>").err().expect("parse error");
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_line_cursor_restarts_for_earlier_offsets() {
        let text = "ab\ncd";
        let mut cursor = LineCursor::default();
        assert_eq!(cursor.pos_at(text, 4), TextPos::new(2, 2));
        assert_eq!(cursor.pos_at(text, 1), TextPos::new(1, 2));
    }
}
