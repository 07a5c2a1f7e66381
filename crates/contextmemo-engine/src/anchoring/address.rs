//! Structural addresses: low-confidence pointers to elements.
//!
//! An address is persisted as an XPath-like string:
//!
//! ```text
//! id("main")                  element carrying id="main"
//! /html[1]/body[1]/p[2]       path from the document root
//! id("main")/div[1]/p[2]      path from the nearest ancestor with an id
//! ```
//!
//! Each path step is a lowercase tag name plus the 1-based ordinal among
//! same-tag element siblings. Lookup fails closed: the first step that
//! cannot be matched ends the lookup with no element. An address is only a
//! hint; after a page changes it may well point at the wrong element.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{DOCUMENT_TAG, Document, NodeId};

static ID_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^id\("(.+?)"\)"#).expect("valid id regex"));

static PATH_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9:-]*)(?:\[(\d+)\])?$").expect("valid step regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("empty structural address")]
    Empty,
    #[error("invalid path step {step:?} in {address:?}")]
    InvalidStep { address: String, step: String },
    #[error("sibling index must start at 1 in {address:?}")]
    ZeroIndex { address: String },
    #[error("unrecognized structural address {0:?}")]
    Unrecognized(String),
}

/// One step of a path: tag name plus 1-based same-tag sibling ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag_name: String,
    pub sibling_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralAddress {
    /// The element carrying this `id`
    Id(String),
    /// Steps from the document root, or from the element with `root_id`
    Path {
        root_id: Option<String>,
        segments: Vec<PathSegment>,
    },
}

/// An address plus a character offset inside the boundary's text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralBoundary {
    pub address: StructuralAddress,
    pub offset: usize,
}

impl StructuralAddress {
    /// Address for `element`: its own id when it has one, otherwise a path
    /// from the nearest ancestor with an id, otherwise a path from the root.
    pub fn for_element(doc: &Document, element: NodeId) -> Option<Self> {
        doc.element(element)?;
        if !doc.is_attached(element) {
            return None;
        }
        if let Some(id) = element_id(doc, element) {
            return Some(Self::Id(id.to_string()));
        }

        let mut segments = Vec::new();
        let mut current = element;
        let mut root_id = None;
        loop {
            let tag = doc.tag_name(current)?;
            if tag == DOCUMENT_TAG {
                break;
            }
            if current != element
                && let Some(id) = element_id(doc, current)
            {
                root_id = Some(id.to_string());
                break;
            }
            segments.push(PathSegment {
                tag_name: tag.to_string(),
                sibling_index: same_tag_ordinal(doc, current)?,
            });
            current = doc.parent(current)?;
        }
        segments.reverse();
        Some(Self::Path { root_id, segments })
    }

    /// Find the element this address points at. Fails closed.
    pub fn lookup(&self, doc: &Document) -> Option<NodeId> {
        match self {
            Self::Id(id) => doc.get_element_by_id(id),
            Self::Path { root_id, segments } => {
                let mut current = match root_id {
                    Some(id) => doc.get_element_by_id(id)?,
                    None => doc.root(),
                };
                for segment in segments {
                    current = doc
                        .children(current)
                        .iter()
                        .copied()
                        .filter(|&child| doc.tag_name(child) == Some(segment.tag_name.as_str()))
                        .nth(segment.sibling_index.checked_sub(1)?)?;
                }
                Some(current)
            }
        }
    }

    /// Render in the persisted XPath-like form.
    pub fn to_xpath(&self) -> String {
        self.to_string()
    }

    pub fn parse_xpath(source: &str) -> Result<Self, AddressError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(AddressError::Empty);
        }

        let (root_id, rest) = match ID_STEP.captures(source) {
            Some(captures) => {
                let whole = captures.get(0).map(|m| m.end()).unwrap_or(0);
                let id = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                (Some(id.to_string()), &source[whole..])
            }
            None => (None, source),
        };

        if rest.is_empty() {
            return match root_id {
                Some(id) => Ok(Self::Id(id)),
                None => Err(AddressError::Empty),
            };
        }
        let Some(steps) = rest.strip_prefix('/') else {
            return Err(AddressError::Unrecognized(source.to_string()));
        };

        let mut segments = Vec::new();
        for step in steps.split('/') {
            let captures = PATH_STEP
                .captures(step)
                .ok_or_else(|| AddressError::InvalidStep {
                    address: source.to_string(),
                    step: step.to_string(),
                })?;
            let sibling_index = match captures.get(2) {
                Some(index) => index
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| AddressError::InvalidStep {
                        address: source.to_string(),
                        step: step.to_string(),
                    })?,
                None => 1,
            };
            if sibling_index == 0 {
                return Err(AddressError::ZeroIndex {
                    address: source.to_string(),
                });
            }
            segments.push(PathSegment {
                tag_name: captures[1].to_ascii_lowercase(),
                sibling_index,
            });
        }

        Ok(Self::Path { root_id, segments })
    }
}

impl fmt::Display for StructuralAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id(\"{id}\")"),
            Self::Path { root_id, segments } => {
                if let Some(id) = root_id {
                    write!(f, "id(\"{id}\")")?;
                }
                for segment in segments {
                    write!(f, "/{}[{}]", segment.tag_name, segment.sibling_index)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for StructuralAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_xpath(s)
    }
}

fn element_id(doc: &Document, element: NodeId) -> Option<&str> {
    doc.attribute(element, "id").filter(|id| !id.is_empty())
}

/// 1-based position of `element` among its parent's children with the
/// same tag.
fn same_tag_ordinal(doc: &Document, element: NodeId) -> Option<usize> {
    let tag = doc.tag_name(element)?;
    let parent = doc.parent(element)?;
    let preceding = doc
        .children(parent)
        .iter()
        .take_while(|&&child| child != element)
        .filter(|&&child| doc.tag_name(child) == Some(tag))
        .count();
    Some(preceding + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const PAGE: &str = "<html><body><div id=main><p>a</p><p>b</p></div><section><p>c</p><p>d</p></section></body></html>";

    fn nth_p(doc: &Document, n: usize) -> NodeId {
        doc.descendants(doc.root())
            .filter(|&id| doc.tag_name(id) == Some("p"))
            .nth(n)
            .unwrap()
    }

    #[test]
    fn test_address_prefers_own_id() {
        let doc = Document::parse_html(PAGE);
        let main = doc.get_element_by_id("main").unwrap();
        let address = StructuralAddress::for_element(&doc, main).unwrap();
        assert_eq!(address, StructuralAddress::Id("main".into()));
        assert_eq!(address.to_xpath(), "id(\"main\")");
    }

    #[test]
    fn test_address_relative_to_ancestor_id() {
        let doc = Document::parse_html(PAGE);
        let address = StructuralAddress::for_element(&doc, nth_p(&doc, 1)).unwrap();
        assert_eq!(address.to_xpath(), "id(\"main\")/p[2]");
        assert_eq!(address.lookup(&doc), Some(nth_p(&doc, 1)));
    }

    #[test]
    fn test_address_from_root() {
        let doc = Document::parse_html(PAGE);
        let address = StructuralAddress::for_element(&doc, nth_p(&doc, 3)).unwrap();
        assert_eq!(address.to_xpath(), "/html[1]/body[1]/section[1]/p[2]");
        assert_eq!(address.lookup(&doc), Some(nth_p(&doc, 3)));
    }

    #[test]
    fn test_address_of_detached_element_is_none() {
        let mut doc = Document::parse_html(PAGE);
        let p = nth_p(&doc, 3);
        let section = doc.parent(p).unwrap();
        doc.detach(section);
        assert_eq!(StructuralAddress::for_element(&doc, p), None);

        // An id inside a detached subtree does not help
        let main = doc.get_element_by_id("main").unwrap();
        let first_p = nth_p(&doc, 0);
        doc.detach(main);
        assert_eq!(StructuralAddress::for_element(&doc, main), None);
        assert_eq!(StructuralAddress::for_element(&doc, first_p), None);
    }

    #[rstest]
    #[case("id(\"main\")", StructuralAddress::Id("main".into()))]
    #[case("/html[1]/body", StructuralAddress::Path {
        root_id: None,
        segments: vec![
            PathSegment { tag_name: "html".into(), sibling_index: 1 },
            PathSegment { tag_name: "body".into(), sibling_index: 1 },
        ],
    })]
    #[case("id(\"x\")/DIV[3]", StructuralAddress::Path {
        root_id: Some("x".into()),
        segments: vec![PathSegment { tag_name: "div".into(), sibling_index: 3 }],
    })]
    fn test_parse_xpath(#[case] source: &str, #[case] expected: StructuralAddress) {
        assert_eq!(StructuralAddress::parse_xpath(source), Ok(expected));
    }

    #[rstest]
    #[case("", AddressError::Empty)]
    #[case("html[1]", AddressError::Unrecognized("html[1]".into()))]
    #[case("/html[0]", AddressError::ZeroIndex { address: "/html[0]".into() })]
    #[case("/html[1]//p[1]", AddressError::InvalidStep { address: "/html[1]//p[1]".into(), step: String::new() })]
    #[case("/text()[1]", AddressError::InvalidStep { address: "/text()[1]".into(), step: "text()[1]".into() })]
    fn test_parse_xpath_errors(#[case] source: &str, #[case] expected: AddressError) {
        assert_eq!(StructuralAddress::parse_xpath(source), Err(expected));
    }

    #[test]
    fn test_lookup_fails_closed_on_missing_step() {
        let doc = Document::parse_html(PAGE);
        let address: StructuralAddress = "/html[1]/body[1]/section[1]/p[3]".parse().unwrap();
        assert_eq!(address.lookup(&doc), None);

        let wrong_tag: StructuralAddress = "/html[1]/body[1]/article[1]/p[1]".parse().unwrap();
        assert_eq!(wrong_tag.lookup(&doc), None);

        let missing_id: StructuralAddress = "id(\"gone\")/p[1]".parse().unwrap();
        assert_eq!(missing_id.lookup(&doc), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let doc = Document::parse_html(PAGE);
        for n in 0..4 {
            let address = StructuralAddress::for_element(&doc, nth_p(&doc, n)).unwrap();
            let reparsed: StructuralAddress = address.to_xpath().parse().unwrap();
            assert_eq!(reparsed, address);
        }
    }
}
