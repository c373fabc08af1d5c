//! XML input: turn JATS text into a generic [`Node`] tree, and back.
//!
//! ## Mapping
//!
//! | XML                | Node                                          |
//! |--------------------|-----------------------------------------------|
//! | element            | `{type: <qname>, ...attrs, children}`          |
//! | attribute `type`   | stored as `_type` so it cannot clobber the tag |
//! | text               | `{type: text, value}`                          |
//! | CDATA              | `{type: cdata, value}` (trimmed)               |
//! | comment            | `{type: comment, value}`                       |
//! | `<code>`           | `{type: code, value}` (text content)           |
//!
//! Whitespace-only text containing a line break (indentation) is dropped and
//! a trailing newline-plus-indent is trimmed from text runs, so
//! pretty-printed input produces the same tree as compact input. A bare
//! space between inline elements is kept. Processing instructions and the
//! XML declaration are discarded; the DOCTYPE is returned alongside the tree.

use crate::error::JatsError;
use crate::tree::Node;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

/// Parsed XML document: top-level element nodes plus the DOCTYPE text.
#[derive(Debug, Clone)]
pub struct ParsedXml {
    pub doctype: Option<String>,
    pub elements: Vec<Node>,
}

static RE_TRAILING_INDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s+$").unwrap());

/// Parse XML text into generic nodes.
pub fn parse_xml(xml: &str) -> Result<ParsedXml, JatsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut doctype = None;
    let mut stack: Vec<Node> = vec![Node::element("document")];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e)),
            Ok(Event::Empty(e)) => append(&mut stack, finish_element(element_from(&e))),
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(JatsError::XmlParse {
                        detail: format!(
                            "unexpected closing tag at position {}",
                            reader.buffer_position()
                        ),
                    });
                }
                if let Some(node) = stack.pop() {
                    append(&mut stack, finish_element(node));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(text) = text_from(&e) {
                    append(&mut stack, Node::text(text));
                }
            }
            Ok(Event::CData(e)) => {
                let value = String::from_utf8_lossy(&e).trim().to_string();
                append(&mut stack, Node::leaf("cdata").with_value(value));
            }
            Ok(Event::Comment(e)) => {
                let value = String::from_utf8_lossy(&e).to_string();
                append(&mut stack, Node::leaf("comment").with_value(value));
            }
            Ok(Event::DocType(e)) => {
                doctype = Some(String::from_utf8_lossy(&e).trim().to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(JatsError::XmlParse {
                    detail: format!("error at position {}: {e}", reader.error_position()),
                })
            }
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|n| n.kind.clone()).unwrap_or_default();
        return Err(JatsError::XmlParse {
            detail: format!("unclosed element <{open}>"),
        });
    }

    let elements: Vec<Node> = stack
        .pop()
        .and_then(|doc| doc.children)
        .unwrap_or_default()
        .into_iter()
        .filter(|n| !matches!(n.kind.as_str(), "text" | "comment" | "cdata"))
        .collect();
    debug!("Parsed XML with {} top-level elements", elements.len());

    Ok(ParsedXml { doctype, elements })
}

fn append(stack: &mut [Node], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children_mut().push(node);
    }
}

fn element_from(e: &BytesStart<'_>) -> Node {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut node = Node::element(name);
    for attr in e.attributes().flatten() {
        let mut key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if key == "type" {
            key = "_type".to_string();
        }
        let value = match attr.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        };
        node.set_attr(&key, value);
    }
    node
}

/// `code` keeps its text as a scalar value.
fn finish_element(mut node: Node) -> Node {
    if node.kind == "code" {
        let value = node.to_text();
        node.children = None;
        node.value = Some(value);
    }
    node
}

fn text_from(e: &BytesText<'_>) -> Option<String> {
    let text = match e.unescape_with(resolve_entity) {
        Ok(t) => t.to_string(),
        Err(_) => String::from_utf8_lossy(e).to_string(),
    };
    if text.is_empty() || (text.trim().is_empty() && text.contains('\n')) {
        return None;
    }
    Some(RE_TRAILING_INDENT.replace(&text, "").into_owned())
}

/// XML predefined entities plus the handful of HTML names common in JATS.
fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        "thinsp" => Some("\u{2009}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        _ => None,
    }
}

// ── Writer ───────────────────────────────────────────────────────────────

/// Serialise a node back to XML text (inverse of [`parse_xml`]).
pub fn to_xml(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node.kind.as_str() {
        "text" => out.push_str(&quick_xml::escape::escape(node.value.as_deref().unwrap_or(""))),
        "cdata" => {
            out.push_str("<![CDATA[");
            out.push_str(node.value.as_deref().unwrap_or(""));
            out.push_str("]]>");
        }
        "comment" => {
            out.push_str("<!--");
            out.push_str(node.value.as_deref().unwrap_or(""));
            out.push_str("-->");
        }
        name => {
            out.push('<');
            out.push_str(name);
            for (key, value) in &node.attrs {
                let key = if key == "_type" { "type" } else { key.as_str() };
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&quick_xml::escape::escape(value.as_str()));
                out.push('"');
            }
            let has_content = node.value.is_some() || !node.children().is_empty();
            if !has_content {
                out.push_str("/>");
                return;
            }
            out.push('>');
            if let Some(v) = &node.value {
                out.push_str(&quick_xml::escape::escape(v.as_str()));
            }
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_article() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS" "jats.dtd">
<article article-type="research-article">
  <body>
    <p>Hello <italic>world</italic></p>
  </body>
</article>"#;
        let parsed = parse_xml(xml).unwrap();
        assert!(parsed.doctype.as_deref().unwrap().starts_with("article PUBLIC"));
        assert_eq!(parsed.elements.len(), 1);
        let article = &parsed.elements[0];
        assert_eq!(article.kind, "article");
        assert_eq!(article.attr_str("article-type"), Some("research-article"));
        let body = &article.children()[0];
        assert_eq!(body.kind, "body");
        assert_eq!(body.children().len(), 1, "whitespace text dropped");
        assert_eq!(body.to_text(), "Hello world");
    }

    #[test]
    fn test_type_attribute_renamed() {
        let parsed = parse_xml(r#"<list type="order"><item/></list>"#).unwrap();
        let list = &parsed.elements[0];
        assert_eq!(list.attr_str("_type"), Some("order"));
        assert_eq!(list.kind, "list");
    }

    #[test]
    fn test_entities_and_cdata() {
        let parsed =
            parse_xml("<p>a&nbsp;b &amp; c&#x2013;d<tex-math><![CDATA[  x^2  ]]></tex-math></p>")
                .unwrap();
        let p = &parsed.elements[0];
        assert_eq!(p.children()[0].value.as_deref(), Some("a\u{a0}b & c\u{2013}d"));
        let cdata = &p.children()[1].children()[0];
        assert_eq!(cdata.kind, "cdata");
        assert_eq!(cdata.value.as_deref(), Some("x^2"));
    }

    #[test]
    fn test_inline_space_kept() {
        let parsed = parse_xml("<p><bold>a</bold> <italic>b</italic></p>").unwrap();
        assert_eq!(parsed.elements[0].to_text(), "a b");
    }

    #[test]
    fn test_trailing_indent_trimmed() {
        let parsed = parse_xml("<p>text\n      <bold>b</bold></p>").unwrap();
        assert_eq!(parsed.elements[0].children()[0].value.as_deref(), Some("text"));
    }

    #[test]
    fn test_code_keeps_value() {
        let parsed = parse_xml("<code language=\"py\">x = 1</code>").unwrap();
        let code = &parsed.elements[0];
        assert_eq!(code.value.as_deref(), Some("x = 1"));
        assert!(code.children.is_none());
    }

    #[test]
    fn test_malformed_is_error() {
        let err = parse_xml("<article><p></article>").unwrap_err();
        assert!(matches!(err, JatsError::XmlParse { .. }), "got: {err}");
        let err = parse_xml("<article>").unwrap_err();
        assert!(err.to_string().contains("unclosed"), "got: {err}");
    }

    #[test]
    fn test_to_xml_restores_type_and_escapes() {
        let node = Node::parent("mml:mi", vec![Node::text("a<b")]).with_attr("_type", "x");
        assert_eq!(to_xml(&node), r#"<mml:mi type="x">a&lt;b</mml:mi>"#);
        assert_eq!(to_xml(&Node::element("mml:none")), "<mml:none/>");
    }
}
