//! Expression statements of the front-matter language
//!
//! Statements are produced by the compiler and evaluated elsewhere. Their
//! [`Display`](fmt::Display) output reads like the source expression they came
//! from, which is what error messages and tooling show to users.

use super::front_matter::FrontMatterType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    Or,
    And,
    Not,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl OperatorType {
    /// Fixed lookup from operator spelling.
    pub fn lookup(text: &str) -> Option<Self> {
        match text {
            "||" => Some(OperatorType::Or),
            "&&" => Some(OperatorType::And),
            "!" => Some(OperatorType::Not),
            "==" => Some(OperatorType::Equal),
            "!=" => Some(OperatorType::NotEqual),
            "<" => Some(OperatorType::Less),
            ">" => Some(OperatorType::Greater),
            "<=" => Some(OperatorType::LessEqual),
            ">=" => Some(OperatorType::GreaterEqual),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OperatorType::Or => "||",
            OperatorType::And => "&&",
            OperatorType::Not => "!",
            OperatorType::Equal => "==",
            OperatorType::NotEqual => "!=",
            OperatorType::Less => "<",
            OperatorType::Greater => ">",
            OperatorType::LessEqual => "<=",
            OperatorType::GreaterEqual => ">=",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, OperatorType::And | OperatorType::Or)
    }

    pub fn is_comparison(self) -> bool {
        !self.is_logical() && self != OperatorType::Not
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(rename = "type")]
    pub kind: OperatorType,
}

impl Operator {
    pub fn new(kind: OperatorType) -> Self {
        Self { kind }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        OperatorType::lookup(text).map(Self::new)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// One arm of a case body: a key to match and the value it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseKeyValue {
    pub key: FrontMatterType,
    pub value: FrontMatterType,
}

impl CaseKeyValue {
    pub fn new(key: FrontMatterType, value: FrontMatterType) -> Self {
        Self { key, value }
    }
}

impl fmt::Display for CaseKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ {} }}", self.key, self.value)
    }
}

/// Declaration binding a key to an externally implemented function.
///
/// `normal: "defaults.py"::run(string, int) -> dict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignFunctionStmt {
    pub func_name: String,
    pub func_path: String,
    pub access_func_name: String,
    pub input_types: Vec<String>,
    pub return_vars: IndexMap<String, String>,
}

impl fmt::Display for ForeignFunctionStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\"", self.func_name, self.func_path)?;
        if !self.access_func_name.is_empty() {
            write!(f, "::{}", self.access_func_name)?;
        }
        write!(f, "({})", self.input_types.join(", "))?;
        if !self.return_vars.is_empty() {
            let outputs: Vec<&str> = self.return_vars.keys().map(String::as_str).collect();
            write!(f, " -> {}", outputs.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Value {
        value: FrontMatterType,
    },
    Comparison {
        left: FrontMatterType,
        operator: Operator,
        right: FrontMatterType,
    },
    LogicalExpression {
        left: Box<Statement>,
        operator: OperatorType,
        right: Box<Statement>,
    },
    MethodCall {
        receiver: FrontMatterType,
        method_name: FrontMatterType,
        arguments: Option<Vec<FrontMatterType>>,
    },
    ConditionCase {
        conditions: Vec<FrontMatterType>,
        cases: Vec<FrontMatterType>,
    },
    CaseKeyValue(CaseKeyValue),
    ForeignFunction(ForeignFunctionStmt),
    Operator(Operator),
}

impl Statement {
    pub fn value(value: FrontMatterType) -> Self {
        Statement::Value { value }
    }

    pub fn method_call(
        receiver: FrontMatterType,
        method_name: FrontMatterType,
        arguments: Option<Vec<FrontMatterType>>,
    ) -> Self {
        Statement::MethodCall {
            receiver,
            method_name,
            arguments,
        }
    }

    /// Name of the called function for calls written as `name(args)`.
    pub fn call_name(&self) -> Option<String> {
        match self {
            Statement::MethodCall {
                receiver,
                method_name,
                ..
            } if method_name.is_blank() => Some(receiver.to_string()),
            Statement::MethodCall { method_name, .. } => Some(method_name.to_string()),
            _ => None,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[FrontMatterType]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Value { value } => write!(f, "{}", value),
            Statement::Comparison {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            Statement::LogicalExpression {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            Statement::MethodCall {
                receiver,
                method_name,
                arguments,
            } => {
                write!(f, "{}", receiver)?;
                if !method_name.is_blank() {
                    write!(f, ".{}", method_name)?;
                }
                if let Some(args) = arguments {
                    f.write_str("(")?;
                    write_list(f, args)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Statement::ConditionCase { conditions, cases } => {
                f.write_str("condition { ")?;
                write_list(f, conditions)?;
                f.write_str(" } case { ")?;
                write_list(f, cases)?;
                f.write_str(" }")
            }
            Statement::CaseKeyValue(kv) => write!(f, "{}", kv),
            Statement::ForeignFunction(func) => write!(f, "{}", func),
            Statement::Operator(op) => write!(f, "{}", op),
        }
    }
}
