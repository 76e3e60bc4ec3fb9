//! End-to-end tests: whole DevIns documents through the pipeline

use devins::devins::ast::{FrontMatterType, Statement};
use devins::devins::hobbit_hole::{ActionLocation, InteractionType};
use devins::devins::pipeline::{compile_source, CompileOptions, Compiled};
use devins::devins::token::TokenType;
use devins::{tokenize, Token};
use rstest::rstest;

fn compile(source: &str) -> Compiled {
    compile_source(source, &CompileOptions::default()).expect("pipeline never fails on text")
}

fn pairs(tokens: &[Token]) -> Vec<(TokenType, &str)> {
    tokens
        .iter()
        .filter(|t| !t.is_trivia())
        .map(|t| (t.kind, t.text.as_str()))
        .collect()
}

const REVIEW: &str = r#"---
name: "Code Review"
description: "Review the selected code"
interaction: ReplaceSelection
actionLocation: ContextMenu
when: $fileName.contains(".rs") && $selection.length > 0
variables:
  "files": /.*\.rs/ { cat | grep("fn ") }
onStreamingEnd: { verifyCode | saveFile("review.md") }
agentic: true
model: "gpt-4"
---
Review $files with @reviewer
"#;

#[test]
fn review_template_compiles_end_to_end() {
    let compiled = compile(REVIEW);
    assert!(compiled.error_keys().is_empty(), "{:?}", compiled.front_matter);

    let hole = &compiled.hobbit_hole;
    assert_eq!(hole.name, "Code Review");
    assert_eq!(hole.description, "Review the selected code");
    assert_eq!(hole.interaction, InteractionType::ReplaceSelection);
    assert_eq!(hole.action_location, ActionLocation::ContextMenu);
    assert!(matches!(hole.when, Statement::LogicalExpression { .. }));
    assert!(hole.agentic);
    assert!(hole.enabled);
    assert_eq!(hole.model.as_deref(), Some("gpt-4"));

    let files = &hole.variables["files"];
    assert_eq!(files.pattern, ".*\\.rs");
    let names: Vec<&str> = files.funcs.iter().map(|f| f.func_name()).collect();
    assert_eq!(names, vec!["cat", "grep"]);

    let hooks: Vec<&str> = hole
        .on_streaming_end
        .iter()
        .map(|s| s.func_name.as_str())
        .collect();
    assert_eq!(hooks, vec!["verifyCode", "saveFile"]);
    assert_eq!(hole.on_streaming_end[1].args, vec!["review.md".to_string()]);

    assert!(!hole.user_data.contains_key("name"));
    assert!(!hole.user_data.contains_key("interaction"));
    assert!(hole.user_data.contains_key("when"));
    assert!(hole.user_data.contains_key("model"));
}

#[test]
fn body_markers_survive_compilation() {
    let compiled = compile(REVIEW);
    let kinds: Vec<TokenType> = compiled
        .tokens
        .iter()
        .skip_while(|t| !t.is(TokenType::FrontMatterEnd))
        .map(|t| t.kind)
        .collect();
    assert!(kinds.contains(&TokenType::VariableStart));
    assert!(kinds.contains(&TokenType::AgentStart));
}

#[test]
fn front_matter_with_when_true() {
    let source = "---\nwhen: true\n---\nHello";
    use TokenType::*;
    assert_eq!(
        pairs(&tokenize(source)),
        vec![
            (FrontMatterStart, "---"),
            (Newline, "\n"),
            (When, "when"),
            (Colon, ":"),
            (Boolean, "true"),
            (Newline, "\n"),
            (FrontMatterEnd, "---"),
            (Newline, "\n"),
            (TextSegment, "Hello"),
            (Eof, ""),
        ]
    );
    assert_eq!(
        compile(source).front_matter["when"],
        FrontMatterType::expression(Statement::value(FrontMatterType::Boolean(true)))
    );
}

#[rstest(
    source,
    expected,
    case(
        "@agent1 do something",
        vec![
            (TokenType::AgentStart, "@"),
            (TokenType::Identifier, "agent1"),
            (TokenType::TextSegment, " do something"),
        ]
    ),
    case(
        "/file:src/a.kt",
        vec![
            (TokenType::CommandStart, "/"),
            (TokenType::Identifier, "file"),
            (TokenType::Colon, ":"),
            (TokenType::CommandProp, "src/a.kt"),
        ]
    )
)]
fn body_marker_tokens(source: &str, expected: Vec<(TokenType, &str)>) {
    let tokens = tokenize(source);
    assert_eq!(pairs(&tokens)[..expected.len()], expected[..]);
}

#[test]
fn malformed_comparison_only_poisons_its_own_key() {
    let compiled = compile("---\nname: \"ok\"\nwhen: $selection.length >=\nenabled: false\n---\n");
    assert!(compiled.front_matter["when"].is_error());
    assert_eq!(compiled.front_matter["name"], FrontMatterType::String("ok".into()));
    assert_eq!(compiled.front_matter["enabled"], FrontMatterType::Boolean(false));
    assert!(!compiled.hobbit_hole.enabled);
    assert!(!compiled.diagnostics.is_empty());
}

#[test]
fn simple_plan_has_no_expressions() {
    let compiled = compile("---\n1. Explore the code\n2. Write the fix\n---\n");
    assert_eq!(compiled.front_matter.len(), 2);
    assert!(compiled
        .front_matter
        .values()
        .all(|v| !v.contains_expression()));
}

#[test]
fn detailed_plan_carries_task_expressions() {
    let source = "---\n1. Explore the code\n   - [x] read main.rs\n2. Write the fix\n   - [ ] edit [main](src/main.rs)\n---\n";
    let compiled = compile(source);
    assert_eq!(compiled.front_matter.len(), 2);
    assert!(compiled.front_matter["2"].contains_expression());
    let FrontMatterType::Object(first) = &compiled.front_matter["1"] else {
        panic!("expected a section object");
    };
    assert_eq!(first["completed"], FrontMatterType::Boolean(true));
}

#[test]
fn document_without_front_matter() {
    let compiled = compile("Just ask: what does $selection do?");
    assert!(compiled.header().is_none());
    assert!(compiled.front_matter.is_empty());
    assert_eq!(
        compiled.hobbit_hole.when,
        Statement::value(FrontMatterType::Boolean(true))
    );
}

#[test]
fn bad_characters_do_not_stop_the_pipeline() {
    let compiled = compile("---\nname: x\n---\n\u{0}\u{1}");
    assert_eq!(compiled.tokens.last().map(|t| t.kind), Some(TokenType::Eof));
    assert_eq!(compiled.hobbit_hole.name, "x");
}

#[rstest(
    value,
    case("(".repeat(5000)),
    case(format!("{}$a{}", "(".repeat(2000), ")".repeat(2000))),
    case("a(".repeat(5000)),
    case("[".repeat(5000)),
    case(format!("$a{}", ".b".repeat(5000))),
    case(format!("a{}", " || a".repeat(5000)))
)]
fn deeply_nested_values_degrade_to_error(value: String) {
    let source = format!("---\nname: \"ok\"\nquery: {}\nenabled: false\n---\nbody\n", value);
    let compiled = compile(&source);
    assert_eq!(compiled.error_keys(), vec!["query"]);
    assert_eq!(compiled.hobbit_hole.name, "ok");
    assert!(!compiled.hobbit_hole.enabled);
    assert!(compiled
        .diagnostics
        .iter()
        .any(|d| d.message.contains("nests deeper")));
}
