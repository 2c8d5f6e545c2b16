//! Rich text parsing
//!
//! Converts stored HTML fragments into a simplified node tree:
//!
//! - `P`, `H1`..`H6` become block nodes holding their parsed content
//! - any other element with children is flattened into its parent's
//!   sequence; its tag name is added to the `styles` of every leaf below it
//! - childless elements and text become leaf nodes
//!
//! Markup is read leniently with quick-xml. Unclosed tags are closed at the
//! end of the fragment, stray end tags are ignored, HTML void elements are
//! treated as empty, and a hard syntax error stops the parse with whatever
//! was read so far. The parser never fails.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Tags that become block nodes
pub const BLOCK_TAGS: [&str; 7] = ["P", "H1", "H2", "H3", "H4", "H5", "H6"];

/// Node type reported for text leaves
pub const TEXT_NODE: &str = "#text";

/// Elements that never have content in HTML
const VOID_TAGS: [&str; 14] = [
    "AREA", "BASE", "BR", "COL", "EMBED", "HR", "IMG", "INPUT", "LINK", "META", "PARAM", "SOURCE",
    "TRACK", "WBR",
];

/// Inline tag names active for a leaf
pub type Styles = BTreeMap<String, bool>;

/// Parsed rich text node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RichTextNode {
    Block {
        #[serde(rename = "type")]
        kind: String,
        content: Vec<RichTextNode>,
    },
    Leaf {
        #[serde(rename = "type")]
        kind: String,
        value: String,
        styles: Styles,
    },
}

/// Intermediate element tree built from reader events
#[derive(Debug)]
enum Markup {
    Element { name: String, children: Vec<Markup> },
    Text(String),
}

/// Parse an HTML fragment into rich text nodes
pub fn parse(html: &str) -> Vec<RichTextNode> {
    let tree = read_markup(html);
    let mut out = Vec::new();
    flatten(&tree, &Styles::new(), &mut out);
    out
}

fn flatten(nodes: &[Markup], styles: &Styles, out: &mut Vec<RichTextNode>) {
    for node in nodes {
        match node {
            Markup::Element { name, children } if BLOCK_TAGS.contains(&name.as_str()) => {
                let mut content = Vec::new();
                flatten(children, styles, &mut content);
                out.push(RichTextNode::Block {
                    kind: name.clone(),
                    content,
                });
            }
            Markup::Element { name, children } if children.is_empty() => {
                out.push(RichTextNode::Leaf {
                    kind: name.clone(),
                    value: String::new(),
                    styles: styles.clone(),
                });
            }
            Markup::Element { name, children } => {
                // Styles apply to this subtree only; siblings start from the parent's set
                let mut nested = styles.clone();
                nested.insert(name.clone(), true);
                flatten(children, &nested, out);
            }
            Markup::Text(text) => {
                out.push(RichTextNode::Leaf {
                    kind: TEXT_NODE.to_string(),
                    value: text.clone(),
                    styles: styles.clone(),
                });
            }
        }
    }
}

fn read_markup(html: &str) -> Vec<Markup> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    // Open elements; index 0 is the fragment root
    let mut stack: Vec<(String, Vec<Markup>)> = vec![(String::new(), Vec::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(e.name().as_ref());
                if VOID_TAGS.contains(&name.as_str()) {
                    push_node(&mut stack, Markup::Element { name, children: Vec::new() });
                } else {
                    stack.push((name, Vec::new()));
                }
            }
            Ok(Event::Empty(e)) => {
                let name = tag_name(e.name().as_ref());
                push_node(&mut stack, Markup::Element { name, children: Vec::new() });
            }
            Ok(Event::End(e)) => {
                let name = tag_name(e.name().as_ref());
                close_element(&mut stack, &name);
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape_with(html_entity)
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                if !text.is_empty() {
                    push_node(&mut stack, Markup::Text(text));
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                if !text.is_empty() {
                    push_node(&mut stack, Markup::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    "Rich text markup error at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        }
    }

    while stack.len() > 1 {
        fold_top(&mut stack);
    }

    stack.pop().map(|(_, children)| children).unwrap_or_default()
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_uppercase()
}

fn push_node(stack: &mut [(String, Vec<Markup>)], node: Markup) {
    if let Some((_, children)) = stack.last_mut() {
        children.push(node);
    }
}

/// Close the innermost open element named `name`, implicitly closing anything opened inside it.
fn close_element(stack: &mut Vec<(String, Vec<Markup>)>, name: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|(open, _)| open == name) else {
        return;
    };
    // rposition over skip(1) is relative to index 1
    let target = position + 1;
    while stack.len() > target {
        fold_top(stack);
    }
}

fn fold_top(stack: &mut Vec<(String, Vec<Markup>)>) {
    if let Some((name, children)) = stack.pop() {
        push_node(stack, Markup::Element { name, children });
    }
}

fn html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "copy" => Some("\u{a9}"),
        "reg" => Some("\u{ae}"),
        "hellip" => Some("\u{2026}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "laquo" => Some("\u{ab}"),
        "raquo" => Some("\u{bb}"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(kind: &str, value: &str, styles: &[&str]) -> RichTextNode {
        RichTextNode::Leaf {
            kind: kind.to_string(),
            value: value.to_string(),
            styles: styles.iter().map(|s| (s.to_string(), true)).collect(),
        }
    }

    #[test]
    fn test_paragraph_becomes_block() {
        let nodes = parse("<p>Hello</p>");
        assert_eq!(
            nodes,
            vec![RichTextNode::Block {
                kind: "P".to_string(),
                content: vec![leaf(TEXT_NODE, "Hello", &[])],
            }]
        );
    }

    #[test]
    fn test_inline_styles_are_flattened() {
        let nodes = parse("<p>Hello <strong><em>big</em></strong> world</p>");
        let RichTextNode::Block { content, .. } = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(
            content,
            &vec![
                leaf(TEXT_NODE, "Hello ", &[]),
                leaf(TEXT_NODE, "big", &["STRONG", "EM"]),
                leaf(TEXT_NODE, " world", &[]),
            ]
        );
    }

    #[test]
    fn test_styles_reset_between_siblings() {
        let nodes = parse("<b>one</b><i>two</i>");
        assert_eq!(
            nodes,
            vec![leaf(TEXT_NODE, "one", &["B"]), leaf(TEXT_NODE, "two", &["I"])]
        );
    }

    #[test]
    fn test_headings_and_void_elements() {
        let nodes = parse("<h2>Title</h2><p>line<br>next</p>");
        assert_eq!(nodes.len(), 2);
        let RichTextNode::Block { kind, content } = &nodes[1] else {
            panic!("expected block");
        };
        assert_eq!(kind, "P");
        assert_eq!(content[1], leaf("BR", "", &[]));
        assert_eq!(content[2], leaf(TEXT_NODE, "next", &[]));
    }

    #[test]
    fn test_entities_are_decoded() {
        let nodes = parse("<p>Fish &amp; chips&nbsp;!</p>");
        let RichTextNode::Block { content, .. } = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(content[0], leaf(TEXT_NODE, "Fish & chips\u{a0}!", &[]));
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let nodes = parse("<p>unclosed <b>bold");
        assert_eq!(nodes.len(), 1);
        let RichTextNode::Block { content, .. } = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(content[1], leaf(TEXT_NODE, "bold", &["B"]));

        // Stray end tags are ignored
        assert_eq!(parse("text</div>"), vec![leaf(TEXT_NODE, "text", &[])]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(parse("<p><em>hi</em></p>")).unwrap();
        assert_eq!(
            value,
            json!([{
                "type": "P",
                "content": [{"type": "#text", "value": "hi", "styles": {"EM": true}}]
            }])
        );
    }
}
