//! Values produced by compiling a front-matter header

use super::pattern_action::PatternAction;
use super::statement::Statement;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compiled header: entry key to value, in source order.
pub type FrontMatter = IndexMap<String, FrontMatterType>;

/// A compiled front-matter value.
///
/// `Error` carries a message (usually the offending source text) so one bad
/// entry can be reported without losing its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrontMatterType {
    Identifier(String),
    String(String),
    Number(i64),
    Boolean(bool),
    Date(String),
    Variable(String),
    Array(Vec<FrontMatterType>),
    Object(IndexMap<String, FrontMatterType>),
    Pattern(PatternAction),
    Expression(Box<Statement>),
    Error(String),
    Empty,
}

impl FrontMatterType {
    pub fn expression(statement: Statement) -> Self {
        FrontMatterType::Expression(Box::new(statement))
    }

    /// `Empty`, or an identifier or string with no text.
    pub fn is_blank(&self) -> bool {
        match self {
            FrontMatterType::Empty => true,
            FrontMatterType::Identifier(s) | FrontMatterType::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FrontMatterType::Error(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, FrontMatterType::Expression(_))
    }

    /// Text of scalar values, without quoting.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FrontMatterType::Identifier(s)
            | FrontMatterType::String(s)
            | FrontMatterType::Date(s)
            | FrontMatterType::Variable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FrontMatterType::Boolean(b) => Some(*b),
            FrontMatterType::Expression(stmt) => match stmt.as_ref() {
                Statement::Value {
                    value: FrontMatterType::Boolean(b),
                } => Some(*b),
                _ => None,
            },
            FrontMatterType::Identifier(s) | FrontMatterType::String(s) => {
                match s.to_ascii_lowercase().as_str() {
                    "true" => Some(true),
                    "false" => Some(false),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn as_statement(&self) -> Option<&Statement> {
        match self {
            FrontMatterType::Expression(stmt) => Some(stmt),
            _ => None,
        }
    }

    /// Returns true when this value or anything nested in it is an expression.
    pub fn contains_expression(&self) -> bool {
        match self {
            FrontMatterType::Expression(_) => true,
            FrontMatterType::Array(items) => items.iter().any(Self::contains_expression),
            FrontMatterType::Object(map) => map.values().any(Self::contains_expression),
            _ => false,
        }
    }
}

impl fmt::Display for FrontMatterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterType::Identifier(s) | FrontMatterType::Date(s) => f.write_str(s),
            FrontMatterType::String(s) => write!(f, "\"{}\"", s),
            FrontMatterType::Number(n) => write!(f, "{}", n),
            FrontMatterType::Boolean(b) => write!(f, "{}", b),
            FrontMatterType::Variable(name) => write!(f, "${}", name),
            FrontMatterType::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            FrontMatterType::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            FrontMatterType::Pattern(action) => write!(f, "{}", action),
            FrontMatterType::Expression(stmt) => write!(f, "{}", stmt),
            FrontMatterType::Error(message) => write!(f, "<error: {}>", message),
            FrontMatterType::Empty => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars_and_containers() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), FrontMatterType::Number(2));
        map.insert("a".to_string(), FrontMatterType::String("x".into()));
        let value = FrontMatterType::Array(vec![
            FrontMatterType::Variable("input".into()),
            FrontMatterType::Object(map),
            FrontMatterType::Date("2024-01-02".into()),
        ]);
        assert_eq!(value.to_string(), "[$input, {b: 2, a: \"x\"}, 2024-01-02]");
        assert_eq!(FrontMatterType::Empty.to_string(), "");
    }

    #[test]
    fn boolean_views() {
        let wrapped = FrontMatterType::expression(Statement::value(FrontMatterType::Boolean(false)));
        assert_eq!(wrapped.as_bool(), Some(false));
        assert_eq!(FrontMatterType::Identifier("TRUE".into()).as_bool(), Some(true));
        assert_eq!(FrontMatterType::Number(1).as_bool(), None);
    }

    #[test]
    fn nested_expression_detection() {
        let nested = FrontMatterType::Array(vec![FrontMatterType::expression(Statement::value(
            FrontMatterType::Identifier("x".into()),
        ))]);
        assert!(nested.contains_expression());
        assert!(!FrontMatterType::Array(vec![FrontMatterType::Number(1)]).contains_expression());
    }

    #[test]
    fn serializes_with_type_tags() {
        let value = FrontMatterType::Boolean(true);
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"type":"BOOLEAN","value":true}"#);
        let back: FrontMatterType = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, value);
    }
}
