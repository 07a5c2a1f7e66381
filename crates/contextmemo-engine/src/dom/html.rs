//! Serializing a [`Document`] back to HTML.

use super::parser::{is_raw_text_element, is_void_element};
use super::{DOCUMENT_TAG, Document, NodeId, NodeKind};

impl Document {
    /// HTML for the whole document (the synthetic root emits no tag).
    pub fn to_html(&self) -> String {
        self.outer_html(self.root())
    }

    /// HTML for `id` and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    /// HTML for the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag_name(id).is_some_and(is_raw_text_element);
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.kind(id) {
            None => {}
            Some(NodeKind::Text(content)) => {
                if raw_text {
                    out.push_str(content);
                } else {
                    out.push_str(&html_escape::encode_text(content));
                }
            }
            Some(NodeKind::Element(data)) => {
                if data.tag == DOCUMENT_TAG {
                    out.push_str(&self.inner_html(id));
                    return;
                }
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&data.tag) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}
