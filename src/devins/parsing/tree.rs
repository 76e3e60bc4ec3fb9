//! Generic parse tree
//!
//! The compiler never looks at tokens directly. It walks [`ParseNode`]s: a type
//! tag, the byte span the node covers, its source text and ordered children.
//! Leaves wrap single tokens and carry [`NodeType::Token`]. Trivia (whitespace
//! and comments) is not kept as children, but composite spans and text still
//! cover it.

use crate::devins::token::{Token, TokenType};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Document,
    FrontMatterHeader,
    FrontMatterEntry,
    FrontMatterKey,
    LifecycleId,
    FrontMatterValue,
    FrontMatterArray,
    ObjectKeyValue,
    KeyValue,
    PatternAction,
    ActionBlock,
    ActionBody,
    ActionExpr,
    FuncCall,
    FuncName,
    PipelineArgs,
    CaseBody,
    ConditionFlag,
    ConditionStatement,
    CaseCondition,
    CasePatternAction,
    LogicalAndExpr,
    LogicalOrExpr,
    EqComparisonExpr,
    IneqComparisonExpr,
    CallExpr,
    RefExpr,
    LiteralExpr,
    ExpressionList,
    ForeignFunction,
    ForeignPath,
    ForeignFuncName,
    ForeignType,
    ForeignOutput,
    FunctionStatement,
    FunctionBody,
    QueryStatement,
    OrderedList,
    UnorderedList,
    ListItem,
    Used,
    CodeBlock,
    Error,
    Token(TokenType),
}

impl NodeType {
    /// Node kinds that compile to a [`Statement`](crate::devins::ast::Statement).
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeType::LogicalAndExpr
                | NodeType::LogicalOrExpr
                | NodeType::EqComparisonExpr
                | NodeType::IneqComparisonExpr
                | NodeType::CallExpr
                | NodeType::RefExpr
                | NodeType::LiteralExpr
        )
    }

    pub fn token_type(self) -> Option<TokenType> {
        match self {
            NodeType::Token(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Token(kind) => write!(f, "{}", kind),
            other => {
                let debug = format!("{:?}", other);
                let mut name = String::with_capacity(debug.len() + 4);
                for (i, c) in debug.chars().enumerate() {
                    if c.is_uppercase() && i > 0 {
                        name.push('_');
                    }
                    name.push(c.to_ascii_uppercase());
                }
                f.write_str(&name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNode {
    pub node_type: NodeType,
    pub span: Range<usize>,
    pub text: String,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn leaf(token: &Token) -> Self {
        Self {
            node_type: NodeType::Token(token.kind),
            span: token.start_offset..token.end_offset,
            text: token.text.clone(),
            children: Vec::new(),
        }
    }

    /// Composite node spanning from the first to the last child.
    pub fn composite(node_type: NodeType, children: Vec<ParseNode>, source: &str) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => first.span.start..last.span.end,
            _ => 0..0,
        };
        Self::with_span(node_type, span, children, source)
    }

    pub fn with_span(
        node_type: NodeType,
        span: Range<usize>,
        children: Vec<ParseNode>,
        source: &str,
    ) -> Self {
        let text = source.get(span.clone()).unwrap_or_default().to_string();
        Self {
            node_type,
            span,
            text,
            children,
        }
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type == node_type
    }

    pub fn is_token(&self, kind: TokenType) -> bool {
        self.node_type == NodeType::Token(kind)
    }

    pub fn first_child(&self) -> Option<&ParseNode> {
        self.children.first()
    }

    pub fn child(&self, node_type: NodeType) -> Option<&ParseNode> {
        self.children.iter().find(|c| c.is(node_type))
    }

    pub fn children_of(&self, node_type: NodeType) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter(move |c| c.is(node_type))
    }

    pub fn token_child(&self, kind: TokenType) -> Option<&ParseNode> {
        self.child(NodeType::Token(kind))
    }

    /// Children that are expression nodes, in order.
    pub fn expression_children(&self) -> Vec<&ParseNode> {
        self.children
            .iter()
            .filter(|c| c.node_type.is_expression())
            .collect()
    }

    /// Depth-first search including `self`.
    pub fn find(&self, node_type: NodeType) -> Option<&ParseNode> {
        if self.is(node_type) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(node_type))
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_names_are_screaming_snake() {
        assert_eq!(NodeType::LogicalAndExpr.to_string(), "LOGICAL_AND_EXPR");
        assert_eq!(NodeType::FrontMatterHeader.to_string(), "FRONT_MATTER_HEADER");
        assert_eq!(NodeType::Token(TokenType::QuoteString).to_string(), "QUOTE_STRING");
    }

    #[test]
    fn composite_text_covers_trivia_between_children() {
        let source = "a   ==  b";
        let left = Token::new(TokenType::Identifier, "a", 0, 1, 1, 1);
        let right = Token::new(TokenType::Identifier, "b", 8, 9, 1, 9);
        let node = ParseNode::composite(
            NodeType::EqComparisonExpr,
            vec![ParseNode::leaf(&left), ParseNode::leaf(&right)],
            source,
        );
        assert_eq!(node.span, 0..9);
        assert_eq!(node.text, source);
        assert!(node.token_child(TokenType::Identifier).is_some());
    }
}
