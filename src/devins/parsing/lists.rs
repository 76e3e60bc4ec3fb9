//! Indentation-based list grouping
//!
//! Turns a flat run of lines into `ORDERED_LIST` / `UNORDERED_LIST` nodes with
//! `LIST_ITEM` children. A line that is indented deeper than the item above it
//! belongs to that item, so nested bullets end up as a list inside the item.
//! Lines without a list marker are kept as plain `TEXT_SEGMENT` leaves.
//!
//! The same grouping serves plan lists written inside a front-matter header and
//! plain markdown plans (see [`lines_from_markdown`]).

use super::tree::{NodeType, ParseNode};
use crate::devins::token::TokenType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static ORDERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.(\s|$)").unwrap());
static UNORDERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+](\s|$)").unwrap());

/// One source line with its indentation width and the span of its content.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLine {
    pub indent: usize,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Ordered,
    Unordered,
    Plain,
}

fn marker(text: &str) -> Marker {
    if ORDERED_MARKER.is_match(text) {
        Marker::Ordered
    } else if UNORDERED_MARKER.is_match(text) {
        Marker::Unordered
    } else {
        Marker::Plain
    }
}

fn line_text<'a>(line: &ListLine, source: &'a str) -> &'a str {
    source.get(line.span.clone()).unwrap_or_default()
}

fn line_leaf(line: &ListLine, source: &str) -> ParseNode {
    ParseNode::with_span(
        NodeType::Token(TokenType::TextSegment),
        line.span.clone(),
        Vec::new(),
        source,
    )
}

/// Width of leading indentation; a tab counts as four columns.
pub fn indent_width(whitespace: &str) -> usize {
    whitespace
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Split markdown into non-blank lines ready for [`build_lists`].
pub fn lines_from_markdown(source: &str) -> Vec<ListLine> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in source.split_inclusive('\n') {
        let content = raw.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim_start_matches([' ', '\t']);
        let leading = content.len() - trimmed.len();
        let body = trimmed.trim_end();
        if !body.is_empty() {
            lines.push(ListLine {
                indent: indent_width(&content[..leading]),
                span: offset + leading..offset + leading + body.len(),
            });
        }
        offset += raw.len();
    }
    lines
}

/// Group lines into list nodes.
pub fn build_lists(lines: &[ListLine], source: &str) -> Vec<ParseNode> {
    let mut nodes = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let first = &lines[i];
        let kind = marker(line_text(first, source));
        let list_type = match kind {
            Marker::Ordered => NodeType::OrderedList,
            Marker::Unordered => NodeType::UnorderedList,
            Marker::Plain => {
                nodes.push(line_leaf(first, source));
                i += 1;
                continue;
            }
        };

        let base = first.indent;
        let mut items = Vec::new();
        while i < lines.len() && marker(line_text(&lines[i], source)) == kind {
            let head = line_leaf(&lines[i], source);
            i += 1;
            let nested_start = i;
            while i < lines.len() && lines[i].indent > base {
                i += 1;
            }
            let mut children = vec![head];
            children.extend(build_lists(&lines[nested_start..i], source));
            items.push(ParseNode::composite(NodeType::ListItem, children, source));
        }
        nodes.push(ParseNode::composite(list_type, items, source));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(node: &ParseNode, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.node_type.to_string());
        if node.children.is_empty() {
            out.push_str(&format!(" {:?}", node.text));
        }
        out.push('\n');
        for child in &node.children {
            shape(child, depth + 1, out);
        }
    }

    fn render(source: &str) -> String {
        let mut out = String::new();
        for node in build_lists(&lines_from_markdown(source), source) {
            shape(&node, 0, &mut out);
        }
        out
    }

    #[test]
    fn nested_bullets_attach_to_their_section() {
        let source = "1. Explore\n   - [x] read code\n   - [ ] run tests\n2. Fix ✓\n";
        insta::assert_snapshot!(render(source), @r###"
        ORDERED_LIST
          LIST_ITEM
            TEXT_SEGMENT "1. Explore"
            UNORDERED_LIST
              LIST_ITEM
                TEXT_SEGMENT "- [x] read code"
              LIST_ITEM
                TEXT_SEGMENT "- [ ] run tests"
          LIST_ITEM
            TEXT_SEGMENT "2. Fix ✓"
        "###);
    }

    #[test]
    fn plain_lines_break_lists() {
        let source = "# Plan\n1. One\n\n2. Two\nnotes\n- loose\n";
        insta::assert_snapshot!(render(source), @r###"
        TEXT_SEGMENT "# Plan"
        ORDERED_LIST
          LIST_ITEM
            TEXT_SEGMENT "1. One"
          LIST_ITEM
            TEXT_SEGMENT "2. Two"
        TEXT_SEGMENT "notes"
        UNORDERED_LIST
          LIST_ITEM
            TEXT_SEGMENT "- loose"
        "###);
    }

    #[test]
    fn markdown_lines_skip_blanks_and_measure_tabs() {
        let lines = lines_from_markdown("a\r\n\n\t- b  \n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].span, 0..1);
        assert_eq!(lines[1].indent, 4);
        assert_eq!(&"a\r\n\n\t- b  \n"[lines[1].span.clone()], "- b");
    }
}
