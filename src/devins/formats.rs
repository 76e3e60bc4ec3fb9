//! Output formats for tokens, trees and compiled headers
//!
//! Every stage of the pipeline can be printed in one of the
//! [`OutputFormat`]s. `json`, `yaml` and `debug` are generic serializations;
//! `simple` is a line oriented rendering meant for reading in a terminal:
//!
//! - tokens: one `KIND("text")` per line, optionally prefixed with `line:column`
//! - trees: a treeviz outline, one node per line
//! - front matter: one `key: value` per line
//!
//! Treeviz encodes nesting with box drawing connectors, 2 columns per level:
//!
//! ```text
//!     § FRONT_MATTER_HEADER ---
//!     ├─ ◦ FRONTMATTER_START ---
//!     ├─ ≔ FRONT_MATTER_ENTRY name: x
//!     │ ├─ ⊤ FRONT_MATTER_KEY name
//!     ...
//! ```
//!
//! Icons
//!     Document: ⧉
//!     FrontMatterHeader: §
//!     FrontMatterEntry / KeyValue: ≔
//!     FrontMatterKey / LifecycleId: ⊤
//!     Values and expressions: ◇
//!     PatternAction / FunctionStatement / ForeignFunction: ƒ
//!     Lists: ☰
//!     ListItem: •
//!     Tokens: ◦
//!     Error: ∅

use crate::devins::ast::FrontMatter;
use crate::devins::compiling::{format_plan_to_markdown, TaskSection};
use crate::devins::hobbit_hole::HobbitHole;
use crate::devins::parsing::tree::{NodeType, ParseNode};
use crate::devins::token::Token;
use devins_config::{InspectConfig, OutputFormat};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

const LABEL_WIDTH: usize = 30;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown format `{0}` (expected simple, json, yaml or debug)")]
    UnknownFormat(String),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Look up a format by its command-line name.
pub fn output_format(name: &str) -> Result<OutputFormat, FormatError> {
    match name.to_ascii_lowercase().as_str() {
        "simple" => Ok(OutputFormat::Simple),
        "json" => Ok(OutputFormat::Json),
        "yaml" => Ok(OutputFormat::Yaml),
        "debug" => Ok(OutputFormat::Debug),
        _ => Err(FormatError::UnknownFormat(name.to_string())),
    }
}

/// Presentation knobs shared by the token and tree renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectOptions {
    pub include_trivia: bool,
    pub show_positions: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            include_trivia: false,
            show_positions: true,
        }
    }
}

impl From<&InspectConfig> for InspectOptions {
    fn from(config: &InspectConfig) -> Self {
        Self {
            include_trivia: config.include_trivia,
            show_positions: config.show_positions,
        }
    }
}

fn serialize<T>(value: &T, format: OutputFormat) -> Result<Option<String>, FormatError>
where
    T: Serialize + fmt::Debug + ?Sized,
{
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Debug => format!("{:#?}", value),
        OutputFormat::Simple => return Ok(None),
    };
    Ok(Some(out))
}

// ----- tokens -----

pub fn render_tokens(
    tokens: &[Token],
    format: OutputFormat,
    options: InspectOptions,
) -> Result<String, FormatError> {
    let visible: Vec<&Token> = tokens
        .iter()
        .filter(|t| options.include_trivia || !t.is_trivia())
        .collect();
    match serialize(&visible, format)? {
        Some(out) => Ok(out),
        None => Ok(tokens_to_simple(&visible, options.show_positions)),
    }
}

fn tokens_to_simple(tokens: &[&Token], show_positions: bool) -> String {
    let mut out = String::new();
    for token in tokens {
        if show_positions {
            out.push_str(&format!("{}:{} ", token.line, token.column));
        }
        out.push_str(&token.to_string());
        out.push('\n');
    }
    out
}

// ----- trees -----

pub fn render_tree(
    node: &ParseNode,
    source: &str,
    format: OutputFormat,
    options: InspectOptions,
) -> Result<String, FormatError> {
    match serialize(node, format)? {
        Some(out) => Ok(out),
        None if options.show_positions => Ok(to_treeviz_str_with_lines(node, source)),
        None => Ok(to_treeviz_str(node)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut truncated = s.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    } else {
        s.to_string()
    }
}

fn icon(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Document => "⧉",
        NodeType::FrontMatterHeader => "§",
        NodeType::FrontMatterEntry | NodeType::KeyValue => "≔",
        NodeType::FrontMatterKey | NodeType::LifecycleId => "⊤",
        NodeType::PatternAction | NodeType::FunctionStatement | NodeType::ForeignFunction => "ƒ",
        NodeType::OrderedList | NodeType::UnorderedList => "☰",
        NodeType::ListItem => "•",
        NodeType::Token(_) => "◦",
        NodeType::Error => "∅",
        NodeType::FrontMatterValue | NodeType::FrontMatterArray => "◇",
        t if t.is_expression() => "◇",
        _ => "○",
    }
}

fn label(node: &ParseNode) -> String {
    let text = if node.children.is_empty() {
        node.text.replace('\n', "\\n")
    } else {
        node.text.lines().next().unwrap_or_default().trim().to_string()
    };
    if text.is_empty() {
        node.node_type.to_string()
    } else {
        format!("{} {}", node.node_type, truncate(&text, LABEL_WIDTH))
    }
}

/// Offsets of every newline, so a node's line is a binary search away.
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let newlines = source
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i)
            .collect();
        Self { newlines }
    }

    /// 1-based line holding the byte at `offset`.
    fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }
}

fn format_node(
    node: &ParseNode,
    prefix: &str,
    is_last: bool,
    lines: Option<&LineIndex>,
    output: &mut String,
) {
    let connector = if is_last { "└─" } else { "├─" };
    if let Some(lines) = lines {
        output.push_str(&format!("{:02} ", lines.line_of(node.span.start)));
    }
    output.push_str(&format!(
        "{}{} {} {}\n",
        prefix,
        connector,
        icon(node.node_type),
        label(node)
    ));

    let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        format_node(child, &child_prefix, i + 1 == count, lines, output);
    }
}

fn format_root(node: &ParseNode, lines: Option<&LineIndex>) -> String {
    let mut output = format!("{} {}\n", icon(node.node_type), label(node));
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        format_node(child, "", i + 1 == count, lines, &mut output);
    }
    output
}

/// One line per node, nesting drawn with connectors.
pub fn to_treeviz_str(node: &ParseNode) -> String {
    format_root(node, None)
}

/// Like [`to_treeviz_str`] with each descendant prefixed by its source line.
pub fn to_treeviz_str_with_lines(node: &ParseNode, source: &str) -> String {
    format_root(node, Some(&LineIndex::new(source)))
}

// ----- compiled output -----

pub fn render_front_matter(
    front_matter: &FrontMatter,
    format: OutputFormat,
) -> Result<String, FormatError> {
    match serialize(front_matter, format)? {
        Some(out) => Ok(out),
        None => Ok(front_matter_to_simple(front_matter)),
    }
}

fn front_matter_to_simple(front_matter: &FrontMatter) -> String {
    front_matter
        .iter()
        .map(|(key, value)| format!("{}: {}\n", key, value))
        .collect()
}

pub fn render_hobbit_hole(hole: &HobbitHole, format: OutputFormat) -> Result<String, FormatError> {
    match serialize(hole, format)? {
        Some(out) => Ok(out),
        None => Ok(hobbit_hole_to_simple(hole)),
    }
}

fn hobbit_hole_to_simple(hole: &HobbitHole) -> String {
    let mut out = String::new();
    out.push_str(&format!("name: {}\n", hole.name));
    if !hole.description.is_empty() {
        out.push_str(&format!("description: {}\n", hole.description));
    }
    out.push_str(&format!("interaction: {:?}\n", hole.interaction));
    out.push_str(&format!("actionLocation: {:?}\n", hole.action_location));
    out.push_str(&format!("when: {}\n", hole.when));
    out.push_str(&format!("enabled: {}\n", hole.enabled));
    out.push_str(&format!("agentic: {}\n", hole.agentic));
    if let Some(model) = &hole.model {
        out.push_str(&format!("model: {}\n", model));
    }
    for name in hole.functions.keys() {
        out.push_str(&format!("function: {}\n", name));
    }
    if !hole.user_data.is_empty() {
        out.push_str("userData:\n");
        for (key, value) in &hole.user_data {
            out.push_str(&format!("  {}: {}\n", key, value));
        }
    }
    out
}

/// Plans render back to markdown in the simple format.
pub fn render_plan(sections: &[TaskSection], format: OutputFormat) -> Result<String, FormatError> {
    match serialize(sections, format)? {
        Some(out) => Ok(out),
        None => Ok(format_plan_to_markdown(sections)),
    }
}
