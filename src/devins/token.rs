//! Token definitions for DevIns documents
//!
//! A [`Token`] is one lexical unit: a [`TokenType`] tag plus the exact slice of
//! source it covers. Token text is always a verbatim slice, so concatenating the
//! text of every token (see [`detokenize`]) reproduces the source byte for byte.
//!
//! Offsets are byte offsets into the source. `line` and `column` are 1-based,
//! with columns counted in characters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every tag the lexer can produce.
///
/// The [`fmt::Display`] names are the stable vocabulary used by tooling
/// (`FRONTMATTER_START`, `WHEN`, `BAD_CHARACTER`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    // Structural
    Newline,
    WhiteSpace,
    #[serde(rename = "FRONTMATTER_START")]
    FrontMatterStart,
    #[serde(rename = "FRONTMATTER_END")]
    FrontMatterEnd,
    CodeBlockStart,
    CodeBlockEnd,
    OpenBrace,
    CloseBrace,
    #[serde(rename = "LPAREN")]
    LParen,
    #[serde(rename = "RPAREN")]
    RParen,
    #[serde(rename = "LBRACKET")]
    LBracket,
    #[serde(rename = "RBRACKET")]
    RBracket,
    Comma,
    Colon,
    Dot,
    Pipe,

    // Markers
    AgentStart,
    CommandStart,
    VariableStart,

    // Literals
    Identifier,
    Number,
    QuoteString,
    Boolean,
    Date,
    PatternExpr,
    TextSegment,
    CodeContent,
    LanguageId,
    CommandProp,

    // Comments
    BlockComment,
    Comments,
    ContentComments,

    // Operators
    Access,
    Process,
    #[serde(rename = "EQEQ")]
    EqEq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    #[serde(rename = "ANDAND")]
    AndAnd,
    #[serde(rename = "OROR")]
    OrOr,
    Not,

    // Lifecycle keywords
    When,
    OnStreaming,
    BeforeStreaming,
    OnStreamingEnd,
    AfterStreaming,
    Functions,

    // Sentinels
    Eof,
    BadCharacter,
}

impl TokenType {
    /// Whitespace and comments: tokens a parser may skip.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenType::WhiteSpace
                | TokenType::BlockComment
                | TokenType::Comments
                | TokenType::ContentComments
        )
    }

    pub fn is_lifecycle_keyword(self) -> bool {
        matches!(
            self,
            TokenType::When
                | TokenType::OnStreaming
                | TokenType::BeforeStreaming
                | TokenType::OnStreamingEnd
                | TokenType::AfterStreaming
                | TokenType::Functions
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenType::EqEq
                | TokenType::Neq
                | TokenType::Lt
                | TokenType::Gt
                | TokenType::Lte
                | TokenType::Gte
        )
    }

    /// Tag for one of the six lifecycle keywords, spelled exactly.
    pub fn lifecycle_keyword(word: &str) -> Option<TokenType> {
        match word {
            "when" => Some(TokenType::When),
            "onStreaming" => Some(TokenType::OnStreaming),
            "beforeStreaming" => Some(TokenType::BeforeStreaming),
            "onStreamingEnd" => Some(TokenType::OnStreamingEnd),
            "afterStreaming" => Some(TokenType::AfterStreaming),
            "functions" => Some(TokenType::Functions),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenType::Newline => "NEWLINE",
            TokenType::WhiteSpace => "WHITE_SPACE",
            TokenType::FrontMatterStart => "FRONTMATTER_START",
            TokenType::FrontMatterEnd => "FRONTMATTER_END",
            TokenType::CodeBlockStart => "CODE_BLOCK_START",
            TokenType::CodeBlockEnd => "CODE_BLOCK_END",
            TokenType::OpenBrace => "OPEN_BRACE",
            TokenType::CloseBrace => "CLOSE_BRACE",
            TokenType::LParen => "LPAREN",
            TokenType::RParen => "RPAREN",
            TokenType::LBracket => "LBRACKET",
            TokenType::RBracket => "RBRACKET",
            TokenType::Comma => "COMMA",
            TokenType::Colon => "COLON",
            TokenType::Dot => "DOT",
            TokenType::Pipe => "PIPE",
            TokenType::AgentStart => "AGENT_START",
            TokenType::CommandStart => "COMMAND_START",
            TokenType::VariableStart => "VARIABLE_START",
            TokenType::Identifier => "IDENTIFIER",
            TokenType::Number => "NUMBER",
            TokenType::QuoteString => "QUOTE_STRING",
            TokenType::Boolean => "BOOLEAN",
            TokenType::Date => "DATE",
            TokenType::PatternExpr => "PATTERN_EXPR",
            TokenType::TextSegment => "TEXT_SEGMENT",
            TokenType::CodeContent => "CODE_CONTENT",
            TokenType::LanguageId => "LANGUAGE_ID",
            TokenType::CommandProp => "COMMAND_PROP",
            TokenType::BlockComment => "BLOCK_COMMENT",
            TokenType::Comments => "COMMENTS",
            TokenType::ContentComments => "CONTENT_COMMENTS",
            TokenType::Access => "ACCESS",
            TokenType::Process => "PROCESS",
            TokenType::EqEq => "EQEQ",
            TokenType::Neq => "NEQ",
            TokenType::Lt => "LT",
            TokenType::Gt => "GT",
            TokenType::Lte => "LTE",
            TokenType::Gte => "GTE",
            TokenType::AndAnd => "ANDAND",
            TokenType::OrOr => "OROR",
            TokenType::Not => "NOT",
            TokenType::When => "WHEN",
            TokenType::OnStreaming => "ON_STREAMING",
            TokenType::BeforeStreaming => "BEFORE_STREAMING",
            TokenType::OnStreamingEnd => "ON_STREAMING_END",
            TokenType::AfterStreaming => "AFTER_STREAMING",
            TokenType::Functions => "FUNCTIONS",
            TokenType::Eof => "EOF",
            TokenType::BadCharacter => "BAD_CHARACTER",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lexical unit. Created once by the lexer and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenType,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        kind: TokenType,
        text: impl Into<String>,
        start_offset: usize,
        end_offset: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start_offset,
            end_offset,
            line,
            column,
        }
    }

    pub fn is(&self, kind: TokenType) -> bool {
        self.kind == kind
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.text)
    }
}

/// Reassemble source text from a token stream.
pub fn detokenize<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens.into_iter().map(|t| t.text.as_str()).collect()
}

/// Drop trivia (whitespace and comments) from a token stream.
pub fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|t| !t.is_trivia()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_keywords_are_spelled_exactly() {
        assert_eq!(TokenType::lifecycle_keyword("when"), Some(TokenType::When));
        assert_eq!(
            TokenType::lifecycle_keyword("onStreamingEnd"),
            Some(TokenType::OnStreamingEnd)
        );
        assert_eq!(TokenType::lifecycle_keyword("When"), None);
        assert_eq!(TokenType::lifecycle_keyword("onstreaming"), None);
    }

    #[test]
    fn display_uses_vocabulary_names() {
        assert_eq!(TokenType::FrontMatterStart.to_string(), "FRONTMATTER_START");
        assert_eq!(TokenType::OnStreamingEnd.to_string(), "ON_STREAMING_END");
        let token = Token::new(TokenType::Identifier, "agent1", 1, 7, 1, 2);
        assert_eq!(token.to_string(), "IDENTIFIER(\"agent1\")");
    }

    #[test]
    fn trivia_filtering_keeps_order() {
        let tokens = vec![
            Token::new(TokenType::Identifier, "a", 0, 1, 1, 1),
            Token::new(TokenType::WhiteSpace, " ", 1, 2, 1, 2),
            Token::new(TokenType::Comments, "// x", 2, 6, 1, 3),
            Token::new(TokenType::Eof, "", 6, 6, 1, 7),
        ];
        let kinds: Vec<_> = significant(&tokens).iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenType::Identifier, TokenType::Eof]);
        assert_eq!(detokenize(&tokens), "a // x");
    }
}
