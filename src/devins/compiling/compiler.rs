//! Front-matter compiler
//!
//! Walks a `FRONT_MATTER_HEADER` tree and produces the key to value map that
//! [`HobbitHole`](crate::devins::hobbit_hole::HobbitHole) is built from. Each
//! entry compiles on its own: a failure becomes an `ERROR` value carrying the
//! entry's source text and a warning, and the remaining entries are unaffected.

use super::error::CompileError;
use super::plan::{plan_shape, sections_from_lists, PlanShape, PlanStep, TaskSection};
use crate::devins::ast::{
    CaseKeyValue, ForeignFunctionStmt, FrontMatter, FrontMatterType, Operator, OperatorType,
    PatternAction, PatternActionFunc, Statement,
};
use crate::devins::parsing::tree::{NodeType, ParseNode};
use crate::devins::token::TokenType;
use devins_config::CompilerConfig;
use indexmap::IndexMap;

type CompileResult<T> = Result<T, CompileError>;

/// Compiles `from { ... } where { ... } select { ... }` query bodies.
///
/// The query language lives outside this crate; hosts that understand it plug
/// in their own implementation.
pub trait QueryCompiler {
    fn compile_query(&self, query: &ParseNode) -> FrontMatterType;
}

/// Keeps query bodies as raw text.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawQuery;

impl QueryCompiler for RawQuery {
    fn compile_query(&self, query: &ParseNode) -> FrontMatterType {
        tracing::warn!(query = %query.trimmed_text(), "no query compiler installed, keeping raw text");
        FrontMatterType::String(query.trimmed_text().to_string())
    }
}

pub struct FrontMatterCompiler {
    detect_plan_lists: bool,
    warn_unknown_nodes: bool,
    query: Box<dyn QueryCompiler + Send + Sync>,
}

impl Default for FrontMatterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontMatterCompiler {
    pub fn new() -> Self {
        Self {
            detect_plan_lists: true,
            warn_unknown_nodes: true,
            query: Box::new(RawQuery),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            detect_plan_lists: config.detect_plan_lists,
            warn_unknown_nodes: config.warn_unknown_nodes,
            ..Self::new()
        }
    }

    pub fn with_query_compiler(mut self, query: impl QueryCompiler + Send + Sync + 'static) -> Self {
        self.query = Box::new(query);
        self
    }

    pub fn detect_plan_lists(mut self, enabled: bool) -> Self {
        self.detect_plan_lists = enabled;
        self
    }

    /// Compile a `FRONT_MATTER_HEADER` node.
    pub fn compile(&self, header: &ParseNode) -> FrontMatter {
        let mut front_matter = FrontMatter::new();
        if !header.is(NodeType::FrontMatterHeader) {
            tracing::warn!(node = %header.node_type, "expected a front matter header");
            return front_matter;
        }

        let mut lists = Vec::new();
        for child in &header.children {
            match child.node_type {
                NodeType::FrontMatterEntry => {
                    if let Some((key, value)) = self.entry(child) {
                        front_matter.insert(key, value);
                    }
                }
                NodeType::OrderedList | NodeType::UnorderedList => lists.push(child.clone()),
                NodeType::Token(TokenType::TextSegment) => lists.push(child.clone()),
                NodeType::Error => {
                    tracing::warn!(text = %child.trimmed_text(), "skipping malformed front matter line");
                }
                NodeType::Token(_) => {}
                other => self.unknown(other, child),
            }
        }

        if self.detect_plan_lists && !lists.is_empty() {
            for (key, value) in plan_entries(&lists) {
                front_matter.insert(key, value);
            }
        }

        if front_matter.is_empty() {
            tracing::warn!("front matter has no entries");
        }
        front_matter
    }

    fn unknown(&self, node_type: NodeType, node: &ParseNode) {
        if self.warn_unknown_nodes {
            tracing::warn!(node = %node_type, text = %node.trimmed_text(), "unknown front matter node");
        } else {
            tracing::debug!(node = %node_type, text = %node.trimmed_text(), "unknown front matter node");
        }
    }

    /// `key: value` as found in the header and in indented objects.
    fn entry(&self, entry: &ParseNode) -> Option<(String, FrontMatterType)> {
        let key_node = entry.first_child()?;
        let key = unquote(key_node.trimmed_text()).to_string();
        let value = match entry.children.get(2) {
            None => FrontMatterType::Empty,
            Some(node) => match self.value(node, &key) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "front matter entry failed to compile");
                    FrontMatterType::Error(node.trimmed_text().to_string())
                }
            },
        };
        tracing::debug!(key = %key, value = %value, "compiled front matter entry");
        Some((key, value))
    }

    fn value(&self, node: &ParseNode, key: &str) -> CompileResult<FrontMatterType> {
        match node.node_type {
            NodeType::FrontMatterValue => value_literal(node),
            NodeType::FrontMatterArray => array(node),
            NodeType::ObjectKeyValue => {
                let map: IndexMap<String, FrontMatterType> = node
                    .children_of(NodeType::KeyValue)
                    .filter_map(|kv| self.entry(kv))
                    .collect();
                Ok(FrontMatterType::Object(map))
            }
            NodeType::PatternAction => self.pattern_action(node),
            NodeType::FunctionStatement => self.function_statement(node),
            NodeType::ForeignFunction => Ok(FrontMatterType::expression(
                Statement::ForeignFunction(foreign_function(node, key)),
            )),
            NodeType::LiteralExpr => Ok(FrontMatterType::expression(Statement::value(
                literal_expr(node)?,
            ))),
            t if t.is_expression() => Ok(FrontMatterType::expression(statement(node)?)),
            NodeType::Error => Err(CompileError::Malformed(node.trimmed_text().to_string())),
            other => {
                self.unknown(other, node);
                Ok(FrontMatterType::String(String::new()))
            }
        }
    }

    fn pattern_action(&self, node: &ParseNode) -> CompileResult<FrontMatterType> {
        let pattern = node
            .token_child(TokenType::PatternExpr)
            .map(|p| p.text.clone())
            .unwrap_or_default();
        let block = node
            .child(NodeType::ActionBlock)
            .ok_or_else(|| CompileError::MissingActionBlock(pattern.clone()))?;
        let processors = match block.child(NodeType::ActionBody) {
            Some(body) => self.processors(body)?,
            None => Vec::new(),
        };
        Ok(FrontMatterType::Pattern(PatternAction::new(pattern, processors)))
    }

    fn processors(&self, body: &ParseNode) -> CompileResult<Vec<PatternActionFunc>> {
        let mut processors = Vec::new();
        for expr in body.children_of(NodeType::ActionExpr) {
            let Some(inner) = expr.first_child() else {
                continue;
            };
            match inner.node_type {
                NodeType::FuncCall => {
                    let (name, args) = func_call_parts(inner);
                    processors.extend(PatternActionFunc::from_call(&name, args.unwrap_or_default()));
                }
                NodeType::CaseBody => {
                    let (_, cases) = self.case_body(inner)?;
                    processors.push(PatternActionFunc::CaseMatch { key_values: cases });
                }
                other => self.unknown(other, inner),
            }
        }
        Ok(processors)
    }

    /// Conditions (as `EXPRESSION(CaseKeyValue)`) and case arms of a case body.
    fn case_body(&self, node: &ParseNode) -> CompileResult<(Vec<FrontMatterType>, Vec<CaseKeyValue>)> {
        let mut conditions = Vec::new();
        if let Some(flag) = node.child(NodeType::ConditionFlag) {
            for stmt in flag.children_of(NodeType::ConditionStatement) {
                let kv = condition_statement(stmt)?;
                conditions.push(FrontMatterType::expression(Statement::CaseKeyValue(kv)));
            }
        }

        let mut cases = Vec::new();
        for arm in node.children_of(NodeType::CasePatternAction) {
            let key = arm
                .child(NodeType::CaseCondition)
                .map(case_key)
                .transpose()?
                .unwrap_or(FrontMatterType::Empty);
            let calls = match arm.child(NodeType::ActionBody) {
                Some(body) => self.action_calls(body),
                None => Vec::new(),
            };
            cases.push(CaseKeyValue::new(key, FrontMatterType::Array(calls)));
        }
        Ok((conditions, cases))
    }

    /// Every action expression of a body as an `EXPRESSION`, dropping the ones
    /// that fail.
    fn action_calls(&self, body: &ParseNode) -> Vec<FrontMatterType> {
        body.children_of(NodeType::ActionExpr)
            .filter_map(|expr| match self.action_expr(expr) {
                Ok(stmt) => Some(FrontMatterType::expression(stmt)),
                Err(err) => {
                    tracing::warn!(error = %err, text = %expr.trimmed_text(), "dropping action");
                    None
                }
            })
            .collect()
    }

    fn action_expr(&self, expr: &ParseNode) -> CompileResult<Statement> {
        let inner = expr
            .first_child()
            .ok_or(CompileError::UnexpectedNode(NodeType::ActionExpr))?;
        match inner.node_type {
            NodeType::FuncCall => {
                let (name, args) = func_call_parts(inner);
                let args = args.map(|args| args.into_iter().map(FrontMatterType::String).collect());
                Ok(Statement::method_call(
                    FrontMatterType::Identifier(name),
                    FrontMatterType::Empty,
                    args,
                ))
            }
            NodeType::CaseBody => {
                let (conditions, cases) = self.case_body(inner)?;
                let cases = cases
                    .into_iter()
                    .map(|kv| FrontMatterType::expression(Statement::CaseKeyValue(kv)))
                    .collect();
                Ok(Statement::ConditionCase { conditions, cases })
            }
            other => Err(CompileError::UnexpectedNode(other)),
        }
    }

    fn function_statement(&self, node: &ParseNode) -> CompileResult<FrontMatterType> {
        if let Some(error) = node.child(NodeType::Error) {
            return Err(CompileError::Malformed(error.trimmed_text().to_string()));
        }
        let Some(body) = node.child(NodeType::FunctionBody).and_then(ParseNode::first_child) else {
            return Ok(FrontMatterType::Empty);
        };
        match body.node_type {
            NodeType::QueryStatement => Ok(self.query.compile_query(body)),
            NodeType::ActionBody => Ok(FrontMatterType::Array(self.action_calls(body))),
            NodeType::LiteralExpr => Ok(FrontMatterType::expression(Statement::value(
                literal_expr(body)?,
            ))),
            t if t.is_expression() => Ok(FrontMatterType::expression(statement(body)?)),
            NodeType::Error => Err(CompileError::Malformed(body.trimmed_text().to_string())),
            other => Err(CompileError::UnexpectedNode(other)),
        }
    }
}

fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    match chars.next() {
        Some(q @ ('"' | '\'')) => {
            let inner = &text[1..];
            inner.strip_suffix(q).unwrap_or(inner)
        }
        _ => text,
    }
}

fn token_literal(leaf: &ParseNode) -> CompileResult<FrontMatterType> {
    let text = leaf.text.as_str();
    match leaf.node_type.token_type() {
        Some(TokenType::Identifier) => Ok(FrontMatterType::Identifier(text.to_string())),
        Some(TokenType::Date) => Ok(FrontMatterType::Date(text.to_string())),
        Some(TokenType::QuoteString) => Ok(FrontMatterType::String(unquote(text).to_string())),
        Some(TokenType::Number) => text
            .parse::<i64>()
            .map(FrontMatterType::Number)
            .map_err(|_| CompileError::InvalidNumber(text.to_string())),
        Some(TokenType::Boolean) => Ok(FrontMatterType::Boolean(text.eq_ignore_ascii_case("true"))),
        _ => Err(CompileError::UnexpectedNode(leaf.node_type)),
    }
}

fn value_literal(node: &ParseNode) -> CompileResult<FrontMatterType> {
    let leaf = node
        .first_child()
        .ok_or(CompileError::UnexpectedNode(node.node_type))?;
    token_literal(leaf)
}

fn array(node: &ParseNode) -> CompileResult<FrontMatterType> {
    let mut items = Vec::new();
    for child in &node.children {
        match child.node_type {
            NodeType::FrontMatterValue => items.push(value_literal(child)?),
            NodeType::FrontMatterArray => items.push(array(child)?),
            NodeType::Error => {
                return Err(CompileError::Malformed(child.trimmed_text().to_string()))
            }
            _ => {}
        }
    }
    Ok(FrontMatterType::Array(items))
}

fn literal_expr(node: &ParseNode) -> CompileResult<FrontMatterType> {
    let first = node
        .first_child()
        .ok_or(CompileError::UnexpectedNode(node.node_type))?;
    if first.is_token(TokenType::VariableStart) {
        return node
            .token_child(TokenType::Identifier)
            .map(|name| FrontMatterType::Variable(name.text.clone()))
            .ok_or(CompileError::MissingVariableName);
    }
    token_literal(first)
}

/// Exactly two expression children, or a missing-operand error.
fn operands(node: &ParseNode) -> CompileResult<(&ParseNode, &ParseNode)> {
    match node.expression_children().as_slice() {
        [left, right] => Ok((left, right)),
        _ => Err(CompileError::MissingOperand {
            node: node.node_type,
        }),
    }
}

/// Compile an expression node into a statement.
pub(crate) fn statement(node: &ParseNode) -> CompileResult<Statement> {
    match node.node_type {
        NodeType::LogicalAndExpr | NodeType::LogicalOrExpr => {
            let (left, right) = operands(node)?;
            let operator = if node.is(NodeType::LogicalAndExpr) {
                OperatorType::And
            } else {
                OperatorType::Or
            };
            Ok(Statement::LogicalExpression {
                left: Box::new(statement(left)?),
                operator,
                right: Box::new(statement(right)?),
            })
        }
        NodeType::EqComparisonExpr | NodeType::IneqComparisonExpr => {
            let (left, right) = operands(node)?;
            let op_text = node
                .children
                .iter()
                .find(|c| c.node_type.token_type().is_some_and(TokenType::is_comparison))
                .map(|c| c.text.as_str())
                .unwrap_or_default();
            let operator = Operator::from_text(op_text)
                .ok_or_else(|| CompileError::UnknownOperator(op_text.to_string()))?;
            Ok(Statement::Comparison {
                left: operand(left)?,
                operator,
                right: operand(right)?,
            })
        }
        NodeType::CallExpr => call_expr(node),
        NodeType::RefExpr => match ref_parts(node)? {
            (None, name) => Ok(Statement::value(FrontMatterType::Identifier(name))),
            (Some(inner), name) => Ok(Statement::method_call(
                operand(inner)?,
                FrontMatterType::Identifier(name),
                None,
            )),
        },
        NodeType::LiteralExpr => Ok(Statement::value(literal_expr(node)?)),
        other => Err(CompileError::UnexpectedNode(other)),
    }
}

/// Compile one side of a comparison, call receiver or argument.
fn operand(node: &ParseNode) -> CompileResult<FrontMatterType> {
    match node.node_type {
        NodeType::LiteralExpr => literal_expr(node),
        NodeType::RefExpr if node.children.len() == 1 => {
            let (_, name) = ref_parts(node)?;
            Ok(FrontMatterType::Identifier(name))
        }
        _ => Ok(FrontMatterType::expression(statement(node)?)),
    }
}

/// `(inner, member)` of `inner.member`, or `(None, name)` for a bare name.
fn ref_parts(node: &ParseNode) -> CompileResult<(Option<&ParseNode>, String)> {
    match node.children.as_slice() {
        [name] if name.is_token(TokenType::Identifier) => Ok((None, name.text.clone())),
        [inner, dot, name] if dot.is_token(TokenType::Dot) => Ok((Some(inner), name.text.clone())),
        _ => Err(CompileError::MissingMember(node.trimmed_text().to_string())),
    }
}

fn call_expr(node: &ParseNode) -> CompileResult<Statement> {
    if node.token_child(TokenType::RParen).is_none() {
        return Err(CompileError::UnclosedCall(node.trimmed_text().to_string()));
    }
    let callee = node
        .first_child()
        .ok_or(CompileError::UnexpectedNode(node.node_type))?;
    let (receiver, method) = match callee.node_type {
        NodeType::RefExpr => match ref_parts(callee)? {
            (None, name) => (FrontMatterType::Identifier(name), String::new()),
            (Some(inner), name) => (operand(inner)?, name),
        },
        _ => (operand(callee)?, String::new()),
    };
    let args = match node.child(NodeType::ExpressionList) {
        Some(list) => list
            .expression_children()
            .into_iter()
            .map(operand)
            .collect::<CompileResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(Statement::method_call(
        receiver,
        FrontMatterType::Identifier(method),
        Some(args),
    ))
}

/// Name and arguments of a pipeline call. Arguments are `None` without
/// parentheses; string arguments lose their quotes.
fn func_call_parts(call: &ParseNode) -> (String, Option<Vec<String>>) {
    let name = call
        .child(NodeType::FuncName)
        .map(|n| n.trimmed_text().to_string())
        .unwrap_or_default();
    let args = call.child(NodeType::PipelineArgs).map(|args| {
        args.children
            .iter()
            .filter(|a| !a.is_token(TokenType::Comma))
            .map(|a| {
                if a.is_token(TokenType::QuoteString) {
                    unquote(&a.text).to_string()
                } else {
                    a.trimmed_text().to_string()
                }
            })
            .collect()
    });
    (name, args)
}

fn case_key(condition: &ParseNode) -> CompileResult<FrontMatterType> {
    let leaf = condition
        .first_child()
        .ok_or(CompileError::UnexpectedNode(condition.node_type))?;
    token_literal(leaf)
}

fn condition_statement(stmt: &ParseNode) -> CompileResult<CaseKeyValue> {
    let key = stmt
        .child(NodeType::CaseCondition)
        .map(case_key)
        .transpose()?
        .unwrap_or(FrontMatterType::Empty);
    let expr = stmt
        .expression_children()
        .into_iter()
        .next()
        .ok_or(CompileError::MissingOperand {
            node: NodeType::ConditionStatement,
        })?;
    let value = match operand(expr)? {
        expression @ FrontMatterType::Expression(_) => expression,
        other => FrontMatterType::expression(Statement::value(other)),
    };
    Ok(CaseKeyValue::new(key, value))
}

fn foreign_function(node: &ParseNode, key: &str) -> ForeignFunctionStmt {
    let func_path = node
        .child(NodeType::ForeignPath)
        .map(|p| unquote(p.trimmed_text()).to_string())
        .unwrap_or_default();
    let access_func_name = node
        .child(NodeType::ForeignFuncName)
        .map(|n| n.trimmed_text().to_string())
        .unwrap_or_default();
    let input_types = node
        .children_of(NodeType::ForeignType)
        .map(|t| t.trimmed_text().to_string())
        .collect();
    let return_vars = node
        .children_of(NodeType::ForeignOutput)
        .map(|o| (o.trimmed_text().to_string(), String::new()))
        .collect();
    ForeignFunctionStmt {
        func_name: key.to_string(),
        func_path,
        access_func_name,
        input_types,
        return_vars,
    }
}

fn section_object(section: &TaskSection) -> IndexMap<String, FrontMatterType> {
    let mut object = IndexMap::new();
    object.insert("title".to_string(), FrontMatterType::String(section.title.clone()));
    object.insert("completed".to_string(), FrontMatterType::Boolean(section.completed));
    object.insert(
        "status".to_string(),
        FrontMatterType::Identifier(section.status.to_string()),
    );
    object
}

fn step_value(step: &PlanStep) -> FrontMatterType {
    let mut object = IndexMap::new();
    object.insert("step".to_string(), FrontMatterType::String(step.step.clone()));
    object.insert("completed".to_string(), FrontMatterType::Boolean(step.completed));
    object.insert(
        "status".to_string(),
        FrontMatterType::Identifier(step.status.to_string()),
    );
    let links = step
        .code_file_links
        .iter()
        .map(|link| {
            let mut map = IndexMap::new();
            map.insert(
                "displayText".to_string(),
                FrontMatterType::String(link.display_text.clone()),
            );
            map.insert(
                "filePath".to_string(),
                FrontMatterType::String(link.file_path.clone()),
            );
            FrontMatterType::Object(map)
        })
        .collect();
    object.insert("links".to_string(), FrontMatterType::Array(links));
    FrontMatterType::expression(Statement::value(FrontMatterType::Object(object)))
}

/// Plan sections keyed by their position, `"1"`, `"2"`, ...
fn plan_entries(lists: &[ParseNode]) -> Vec<(String, FrontMatterType)> {
    let shape = plan_shape(lists);
    sections_from_lists(lists)
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let mut object = section_object(section);
            if shape == Some(PlanShape::Detailed) {
                let steps = section.steps.iter().map(step_value).collect();
                object.insert("steps".to_string(), FrontMatterType::Array(steps));
            }
            ((index + 1).to_string(), FrontMatterType::Object(object))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devins::lexing::tokenize;
    use crate::devins::parsing::builder::build_document;

    fn compile(source: &str) -> FrontMatter {
        let tokens = tokenize(source);
        let output = build_document(source, &tokens);
        let header = output.front_matter().expect("front matter header");
        FrontMatterCompiler::new().compile(header)
    }

    fn single(source: &str, key: &str) -> FrontMatterType {
        compile(source).get(key).cloned().expect("key present")
    }

    #[test]
    fn when_true_is_a_boolean_value_expression() {
        let value = single("---\nwhen: true\n---\nHello", "when");
        assert_eq!(
            value,
            FrontMatterType::expression(Statement::value(FrontMatterType::Boolean(true)))
        );
    }

    #[test]
    fn scalar_literals() {
        let fm = compile(
            "---\nname: \"Summary\"\ncount: 42\nday: 2024-05-01\nflag: FALSE\nmode: fast\n---\n",
        );
        assert_eq!(fm["name"], FrontMatterType::String("Summary".into()));
        assert_eq!(fm["count"], FrontMatterType::Number(42));
        assert_eq!(fm["day"], FrontMatterType::Date("2024-05-01".into()));
        assert_eq!(fm["flag"], FrontMatterType::Boolean(false));
        assert_eq!(fm["mode"], FrontMatterType::Identifier("fast".into()));
    }

    #[test]
    fn number_overflow_is_an_error_for_that_key_only() {
        let fm = compile("---\nbig: 99999999999999999999\nok: 1\n---\n");
        assert!(fm["big"].is_error());
        assert_eq!(fm["ok"], FrontMatterType::Number(1));
    }

    #[test]
    fn comparison_on_member_access() {
        let value = single("---\nwhen: $selection.length >= 2\n---\n", "when");
        insta::assert_snapshot!(value.to_string(), @"$selection.length >= 2");
        let Some(Statement::Comparison { left, operator, right }) = value.as_statement() else {
            panic!("expected comparison, got {value:?}");
        };
        assert_eq!(operator.kind, OperatorType::GreaterEqual);
        assert_eq!(right, &FrontMatterType::Number(2));
        assert!(matches!(
            left.as_statement(),
            Some(Statement::MethodCall { arguments: None, .. })
        ));
    }

    #[test]
    fn logical_chain() {
        let value = single(
            "---\nwhen: $fileName.contains(\".java\") && $filePath.contains(\"src/main\")\n---\n",
            "when",
        );
        let Some(Statement::LogicalExpression { left, operator, .. }) = value.as_statement() else {
            panic!("expected logical expression, got {value:?}");
        };
        assert_eq!(*operator, OperatorType::And);
        let Statement::MethodCall { method_name, arguments, .. } = left.as_ref() else {
            panic!("expected call");
        };
        assert_eq!(method_name, &FrontMatterType::Identifier("contains".into()));
        assert_eq!(arguments, &Some(vec![FrontMatterType::String(".java".into())]));
    }

    #[test]
    fn empty_parentheses_differ_from_bare_reference() {
        let fm = compile("---\nwhen: $a.b()\nother: { $a.b }\n---\n");
        let Some(Statement::MethodCall { arguments, .. }) = fm["when"].as_statement() else {
            panic!("expected call");
        };
        assert_eq!(arguments, &Some(Vec::new()));
        let Some(Statement::MethodCall { arguments, .. }) = fm["other"].as_statement() else {
            panic!("expected member reference");
        };
        assert_eq!(arguments, &None);
    }

    #[test]
    fn missing_right_operand_degrades_to_error() {
        let fm = compile("---\nname: \"x\"\nwhen: $a ==\ndescription: \"d\"\n---\n");
        assert_eq!(fm["when"], FrontMatterType::Error("$a ==".into()));
        assert_eq!(fm["name"], FrontMatterType::String("x".into()));
        assert_eq!(fm["description"], FrontMatterType::String("d".into()));
    }

    #[test]
    fn pattern_action_variables() {
        let fm = compile(
            "---\nvariables:\n  \"code\": /.*\\.rs/ { cat | grep(\"fn\") | head(5) }\n---\n",
        );
        let FrontMatterType::Object(vars) = &fm["variables"] else {
            panic!("expected object");
        };
        let FrontMatterType::Pattern(action) = &vars["code"] else {
            panic!("expected pattern");
        };
        assert_eq!(action.regex(), ".*\\.rs");
        assert_eq!(
            action.processors,
            vec![
                PatternActionFunc::Cat { paths: vec![] },
                PatternActionFunc::Grep {
                    patterns: vec!["fn".into()]
                },
                PatternActionFunc::Head { number: 5 },
            ]
        );
    }

    #[test]
    fn function_statement_with_calls() {
        let value = single("---\nonStreamingEnd: { verifyCode | runCode(\"x\") }\n---\n", "onStreamingEnd");
        insta::assert_snapshot!(value.to_string(), @r###"[verifyCode, runCode("x")]"###);
    }

    #[test]
    fn empty_function_body_is_empty() {
        assert_eq!(single("---\nbeforeStreaming: { }\n---\n", "beforeStreaming"), FrontMatterType::Empty);
    }

    #[test]
    fn after_streaming_condition_case() {
        let source = "---\nafterStreaming: {\n  condition {\n    \"error\" { output.length < 1 }\n    \"ok\" { \"fine\" }\n  }\n  case condition {\n    \"error\" { notify(\"failed\") }\n    default { execute(\"next.devin\") }\n  }\n}\n---\n";
        let value = single(source, "afterStreaming");
        let FrontMatterType::Array(items) = &value else {
            panic!("expected array, got {value:?}");
        };
        let Some(Statement::ConditionCase { conditions, cases }) = items[0].as_statement() else {
            panic!("expected condition case");
        };
        assert_eq!(conditions.len(), 2);
        assert_eq!(cases.len(), 2);
        let Some(Statement::CaseKeyValue(ok)) = conditions[1].as_statement() else {
            panic!("expected case key value");
        };
        assert_eq!(
            ok.value,
            FrontMatterType::expression(Statement::value(FrontMatterType::String("fine".into())))
        );
    }

    #[test]
    fn foreign_function_declaration() {
        let fm = compile("---\nfunctions:\n  normal: \"defaults.py\"::run(string, int) -> dict\n---\n");
        let FrontMatterType::Object(funcs) = &fm["functions"] else {
            panic!("expected object");
        };
        let Some(Statement::ForeignFunction(func)) = funcs["normal"].as_statement() else {
            panic!("expected foreign function");
        };
        assert_eq!(func.func_name, "normal");
        assert_eq!(func.func_path, "defaults.py");
        assert_eq!(func.access_func_name, "run");
        assert_eq!(func.input_types, vec!["string", "int"]);
        assert!(func.return_vars.contains_key("dict"));
    }

    #[test]
    fn simple_plan_has_no_expressions() {
        let fm = compile("---\n1. Explore\n2. Fix ✓\n---\n");
        assert_eq!(fm.len(), 2);
        assert!(fm.values().all(|v| !v.contains_expression()));
        let FrontMatterType::Object(second) = &fm["2"] else {
            panic!("expected object");
        };
        assert_eq!(second["completed"], FrontMatterType::Boolean(true));
    }

    #[test]
    fn detailed_plan_has_step_expressions() {
        let fm = compile("---\n1. Explore\n   - [x] read\n   - [ ] test\n2. Fix\n---\n");
        assert!(fm["1"].contains_expression());
        let FrontMatterType::Object(first) = &fm["1"] else {
            panic!("expected object");
        };
        assert_eq!(first["status"], FrontMatterType::Identifier("IN_PROGRESS".into()));
    }

    #[test]
    fn plan_detection_can_be_disabled() {
        let source = "---\n1. Explore\n---\n";
        let tokens = tokenize(source);
        let output = build_document(source, &tokens);
        let header = output.front_matter().expect("header");
        let fm = FrontMatterCompiler::new().detect_plan_lists(false).compile(header);
        assert!(fm.is_empty());
    }

    struct CountingQuery;

    impl QueryCompiler for CountingQuery {
        fn compile_query(&self, query: &ParseNode) -> FrontMatterType {
            FrontMatterType::Number(query.children.len() as i64)
        }
    }

    #[test]
    fn query_bodies_use_the_installed_compiler() {
        let source = "---\nq: {\n  from { PsiClass clazz }\n}\n---\n";
        let tokens = tokenize(source);
        let output = build_document(source, &tokens);
        let header = output.front_matter().expect("header");
        let fm = FrontMatterCompiler::new()
            .with_query_compiler(CountingQuery)
            .compile(header);
        assert!(matches!(fm["q"], FrontMatterType::Number(n) if n > 0));

        let raw = FrontMatterCompiler::new().compile(header);
        assert_eq!(raw["q"], FrontMatterType::String("from { PsiClass clazz }".into()));
    }
}
