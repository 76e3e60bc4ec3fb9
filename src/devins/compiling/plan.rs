//! Markdown task plans
//!
//! A plan is an ordered list of sections, each optionally followed by a bullet
//! list of steps:
//!
//! ```text
//! 1. Explore the code
//!    - [x] read [lexer](src/lexer.rs)
//!    - [*] trace the state stack
//! 2. Fix the bug ✓
//! ```
//!
//! Plans come in two shapes. A *simple* plan has no nested bullets and yields
//! titled sections only. Anything else is read as a *detailed* plan where each
//! section carries its steps and a status derived from them.

use crate::devins::parsing::lists::{build_lists, lines_from_markdown};
use crate::devins::parsing::tree::{NodeType, ParseNode};
use crate::devins::token::TokenType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const CHECKMARK: &str = "✓";

static TASK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-\s*\[\s*([xX!*✓]?)\s*\]\s*(.*)").unwrap());
static SECTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.\s*(?:\[([xX!*✓]?)\]\s*)?(.+?)(?:\s*\[([xX!*✓]?)\])?$").unwrap()
});
static SIMPLE_SECTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s*(.+?)(?:\s*✓)?$").unwrap());
static UNORDERED_ITEM_CLEANER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s+").unwrap());
static CODE_FILE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Status for a checkbox marker: `x`, `X` or `✓` complete, `!` failed,
    /// `*` in progress, anything else todo.
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "x" | "X" | CHECKMARK => TaskStatus::Completed,
            "!" => TaskStatus::Failed,
            "*" => TaskStatus::InProgress,
            _ => TaskStatus::Todo,
        }
    }

    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// `[display](path)` reference inside a step description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFileLink {
    pub display_text: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: String,
    pub completed: bool,
    pub status: TaskStatus,
    pub code_file_links: Vec<CodeFileLink>,
}

impl PlanStep {
    pub fn new(step: impl Into<String>, status: TaskStatus) -> Self {
        let step = step.into();
        let code_file_links = code_file_links(&step);
        Self {
            step,
            completed: status.is_completed(),
            status,
            code_file_links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSection {
    pub title: String,
    pub completed: bool,
    pub status: TaskStatus,
    pub steps: Vec<PlanStep>,
}

impl TaskSection {
    pub fn new(title: impl Into<String>, completed: bool, status: TaskStatus) -> Self {
        Self {
            title: title.into(),
            completed,
            status,
            steps: Vec::new(),
        }
    }

    /// Derive the section status from its steps. Sections without steps keep
    /// the status written on their header line.
    pub fn update_completion_status(&mut self) {
        if self.steps.is_empty() {
            return;
        }
        let all_done = self.steps.iter().all(|s| s.completed);
        let any_failed = self.steps.iter().any(|s| s.status == TaskStatus::Failed);
        let any_started = self
            .steps
            .iter()
            .any(|s| matches!(s.status, TaskStatus::InProgress | TaskStatus::Completed));

        self.status = if all_done {
            TaskStatus::Completed
        } else if any_failed {
            TaskStatus::Failed
        } else if any_started {
            TaskStatus::InProgress
        } else {
            TaskStatus::Todo
        };
        self.completed = all_done;
    }
}

/// Which of the two plan shapes a set of list nodes holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanShape {
    Simple,
    Detailed,
}

fn code_file_links(text: &str) -> Vec<CodeFileLink> {
    CODE_FILE_LINK
        .captures_iter(text)
        .map(|caps| CodeFileLink {
            display_text: caps[1].to_string(),
            file_path: caps[2].to_string(),
        })
        .collect()
}

fn head_text(item: &ParseNode) -> Option<&str> {
    item.token_child(TokenType::TextSegment)
        .map(ParseNode::trimmed_text)
}

/// Shape of the first top-level ordered list, or `None` without one.
pub fn plan_shape(nodes: &[ParseNode]) -> Option<PlanShape> {
    let first = nodes.iter().find(|n| n.is(NodeType::OrderedList))?;
    let nested = first
        .children_of(NodeType::ListItem)
        .any(|item| item.child(NodeType::UnorderedList).is_some());
    Some(if nested {
        PlanShape::Detailed
    } else {
        PlanShape::Simple
    })
}

/// Read plan sections from list nodes.
pub fn sections_from_lists(nodes: &[ParseNode]) -> Vec<TaskSection> {
    match plan_shape(nodes) {
        None => {
            tracing::warn!("no ordered list found, plan is empty");
            Vec::new()
        }
        Some(PlanShape::Simple) => nodes
            .iter()
            .find(|n| n.is(NodeType::OrderedList))
            .map(simple_sections)
            .unwrap_or_default(),
        Some(PlanShape::Detailed) => detailed_sections(nodes),
    }
}

fn simple_sections(list: &ParseNode) -> Vec<TaskSection> {
    list.children_of(NodeType::ListItem)
        .filter_map(|item| {
            let text = head_text(item)?;
            let caps = SIMPLE_SECTION_PATTERN.captures(text)?;
            let completed = text.contains(CHECKMARK);
            let status = if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Todo
            };
            Some(TaskSection::new(caps[2].trim(), completed, status))
        })
        .collect()
}

fn detailed_sections(nodes: &[ParseNode]) -> Vec<TaskSection> {
    let mut sections = Vec::new();
    let mut current: Option<TaskSection> = None;
    for node in nodes {
        visit_detailed(node, &mut current, &mut sections);
    }
    finish_section(&mut current, &mut sections);
    sections
}

fn finish_section(current: &mut Option<TaskSection>, sections: &mut Vec<TaskSection>) {
    if let Some(mut section) = current.take() {
        section.update_completion_status();
        sections.push(section);
    }
}

fn visit_detailed(
    node: &ParseNode,
    current: &mut Option<TaskSection>,
    sections: &mut Vec<TaskSection>,
) {
    match node.node_type {
        NodeType::OrderedList => {
            for item in node.children_of(NodeType::ListItem) {
                let Some(section) = head_text(item).and_then(detailed_header) else {
                    continue;
                };
                finish_section(current, sections);
                let mut section = section;
                for list in item.children_of(NodeType::UnorderedList) {
                    collect_steps(list, &mut section.steps);
                }
                *current = Some(section);
            }
        }
        NodeType::UnorderedList => {
            if let Some(section) = current.as_mut() {
                collect_steps(node, &mut section.steps);
            }
        }
        _ => {
            for child in &node.children {
                visit_detailed(child, current, sections);
            }
        }
    }
}

fn detailed_header(line: &str) -> Option<TaskSection> {
    let caps = SECTION_PATTERN.captures(line)?;
    let start = caps.get(2).map_or("", |m| m.as_str());
    let end = caps.get(4).map_or("", |m| m.as_str());
    let marker = if start.is_empty() { end } else { start };
    let status = TaskStatus::from_marker(marker);
    Some(TaskSection::new(
        caps[3].trim(),
        status.is_completed(),
        status,
    ))
}

fn collect_steps(list: &ParseNode, steps: &mut Vec<PlanStep>) {
    for item in list.children_of(NodeType::ListItem) {
        if let Some(line) = head_text(item) {
            if let Some(caps) = TASK_PATTERN.captures(line) {
                let status = TaskStatus::from_marker(&caps[1]);
                steps.push(PlanStep::new(caps[2].trim(), status));
            } else {
                let cleaned = UNORDERED_ITEM_CLEANER.replace(line, "");
                let cleaned = cleaned.trim();
                if !cleaned.is_empty() {
                    steps.push(PlanStep::new(cleaned, TaskStatus::Todo));
                }
            }
        }
        for nested in item.children_of(NodeType::UnorderedList) {
            collect_steps(nested, steps);
        }
    }
}

/// Parse a markdown plan into sections.
pub fn parse_plan(markdown: &str) -> Vec<TaskSection> {
    let nodes = build_lists(&lines_from_markdown(markdown), markdown);
    sections_from_lists(&nodes)
}

/// Render sections back to markdown, numbering from 1.
pub fn format_plan_to_markdown(sections: &[TaskSection]) -> String {
    let mut out = String::new();
    for (index, section) in sections.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, section.title));
        for step in &section.steps {
            let mark = if step.completed { "x" } else { " " };
            out.push_str(&format!("   - [{}] {}\n", mark, step.step));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(
        marker,
        expected,
        case("x", TaskStatus::Completed),
        case("X", TaskStatus::Completed),
        case("✓", TaskStatus::Completed),
        case("!", TaskStatus::Failed),
        case("*", TaskStatus::InProgress),
        case("", TaskStatus::Todo),
        case("?", TaskStatus::Todo)
    )]
    fn status_markers(marker: &str, expected: TaskStatus) {
        assert_eq!(TaskStatus::from_marker(marker), expected);
    }

    #[test]
    fn simple_plan_has_titles_only() {
        let sections = parse_plan("1. Explore\n2. Fix ✓\n3. Ship\n");
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Explore", "Fix", "Ship"]);
        assert!(sections[1].completed);
        assert!(sections.iter().all(|s| s.steps.is_empty()));
    }

    #[test]
    fn detailed_plan_collects_steps_and_status() {
        let markdown = "\
1. Domain model
   - [✓] merge entities
   - [*] add behaviour
   - [!] fix conflicts
   - [ ] new service
2. Layers
   - [x] clean [entity](src/entity.rs)
";
        let sections = parse_plan(markdown);
        assert_eq!(sections.len(), 2);

        let first = &sections[0];
        assert_eq!(first.title, "Domain model");
        assert_eq!(first.steps.len(), 4);
        assert_eq!(first.steps[1].status, TaskStatus::InProgress);
        assert_eq!(first.status, TaskStatus::Failed);
        assert!(!first.completed);

        let second = &sections[1];
        assert!(second.completed);
        assert_eq!(second.status, TaskStatus::Completed);
        assert_eq!(
            second.steps[0].code_file_links,
            vec![CodeFileLink {
                display_text: "entity".into(),
                file_path: "src/entity.rs".into(),
            }]
        );
    }

    #[test]
    fn header_markers_set_section_status() {
        let sections = parse_plan("1. [*] Build\n   - plain step\n2. Test [x]\n");
        assert_eq!(sections[0].title, "Build");
        assert_eq!(sections[0].steps[0].step, "plain step");
        assert_eq!(sections[0].status, TaskStatus::Todo);
        assert_eq!(sections[1].title, "Test");
        assert!(sections[1].completed);
    }

    #[test]
    fn no_ordered_list_is_empty() {
        assert!(parse_plan("just text\n- loose bullet\n").is_empty());
    }

    #[test]
    fn formats_back_to_markdown() {
        let sections = parse_plan("1. A\n   - [x] one\n   - [ ] two\n");
        insta::assert_snapshot!(format_plan_to_markdown(&sections), @r###"
        1. A
           - [x] one
           - [ ] two
        "###);
    }
}
