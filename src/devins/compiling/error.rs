use crate::devins::parsing::tree::NodeType;
use thiserror::Error;

/// Why one front-matter entry failed to compile.
///
/// These never escape [`FrontMatterCompiler::compile`](super::FrontMatterCompiler::compile):
/// the failing entry becomes a `FrontMatterType::Error` and the rest of the
/// header compiles as usual.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A binary expression is missing its left or right side
    #[error("{node} is missing an operand")]
    MissingOperand { node: NodeType },

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),

    #[error("`$` is not followed by a variable name")]
    MissingVariableName,

    #[error("member access `{0}` has no member name")]
    MissingMember(String),

    #[error("call `{0}` is missing its closing parenthesis")]
    UnclosedCall(String),

    #[error("pattern `{0}` has no action block")]
    MissingActionBlock(String),

    /// Tokens the tree builder could not place
    #[error("malformed value `{0}`")]
    Malformed(String),

    #[error("unexpected {0} node")]
    UnexpectedNode(NodeType),
}
