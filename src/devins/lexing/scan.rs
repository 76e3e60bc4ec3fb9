//! Context-free scanners shared by the lexer states
//!
//! Each scanner looks at the start of a string slice and returns the length in
//! bytes of the lexeme found there (or `None`). They never look behind and never
//! mutate anything; the state machine in [`super::lexer`] decides what the
//! lexeme means.
//!
//! Fixed-spelling symbols, integers and dates go through the logos generated
//! [`Symbol`] scanner. Longest match makes `2024-01-02` a date rather than the
//! number `2024` followed by garbage.

use crate::devins::token::TokenType;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symbol {
    #[token("::")]
    Access,
    #[token("->")]
    Process,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Lte,
    #[token(">=")]
    Gte,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("|")]
    Pipe,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("$")]
    Dollar,
    #[regex(r"[0-9]{4}-[0-9]{2}-[0-9]{2}")]
    Date,
    #[regex(r"[0-9]+")]
    Number,
}

impl Symbol {
    pub(crate) fn token_type(self) -> TokenType {
        match self {
            Symbol::Access => TokenType::Access,
            Symbol::Process => TokenType::Process,
            Symbol::EqEq => TokenType::EqEq,
            Symbol::Neq => TokenType::Neq,
            Symbol::Lte => TokenType::Lte,
            Symbol::Gte => TokenType::Gte,
            Symbol::AndAnd => TokenType::AndAnd,
            Symbol::OrOr => TokenType::OrOr,
            Symbol::Lt => TokenType::Lt,
            Symbol::Gt => TokenType::Gt,
            Symbol::Not => TokenType::Not,
            Symbol::Pipe => TokenType::Pipe,
            Symbol::OpenBrace => TokenType::OpenBrace,
            Symbol::CloseBrace => TokenType::CloseBrace,
            Symbol::LParen => TokenType::LParen,
            Symbol::RParen => TokenType::RParen,
            Symbol::LBracket => TokenType::LBracket,
            Symbol::RBracket => TokenType::RBracket,
            Symbol::Comma => TokenType::Comma,
            Symbol::Colon => TokenType::Colon,
            Symbol::Dot => TokenType::Dot,
            Symbol::Dollar => TokenType::VariableStart,
            Symbol::Date => TokenType::Date,
            Symbol::Number => TokenType::Number,
        }
    }
}

/// Recognize one symbol, number or date at the start of `rest`.
pub(crate) fn symbol(rest: &str) -> Option<(Symbol, usize)> {
    let mut lexer = Symbol::lexer(rest);
    match lexer.next() {
        Some(Ok(sym)) if lexer.span().start == 0 => Some((sym, lexer.span().end)),
        _ => None,
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Identifier: a letter or `_`, then letters, digits, `_` or `-`.
///
/// A `-` directly followed by `>` is left out so `name->out` splits at the arrow.
pub(crate) fn identifier(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().peekable();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return None,
    }
    let mut end = rest.len();
    while let Some((idx, c)) = chars.next() {
        if !is_ident_part(c) {
            end = idx;
            break;
        }
        if c == '-' && matches!(chars.peek(), Some((_, '>'))) {
            end = idx;
            break;
        }
    }
    Some(end)
}

/// Quoted string in `'` or `"`, honoring backslash escapes.
///
/// An unterminated string runs to the end of input.
pub(crate) fn quoted_string(rest: &str) -> Option<usize> {
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let mut escaped = false;
    for (idx, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(idx + c.len_utf8());
        }
    }
    Some(rest.len())
}

/// Pattern literal `/.../` with backslash escapes.
///
/// An unterminated pattern stops at the end of the line.
pub(crate) fn pattern(rest: &str) -> Option<usize> {
    if !rest.starts_with('/') {
        return None;
    }
    let mut escaped = false;
    for (idx, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '/' {
            return Some(idx + 1);
        } else if c == '\n' {
            return Some(idx);
        }
    }
    Some(rest.len())
}

/// Run of spaces, tabs and carriage returns.
pub(crate) fn whitespace(rest: &str) -> Option<usize> {
    let len = rest
        .find(|c: char| !matches!(c, ' ' | '\t' | '\r'))
        .unwrap_or(rest.len());
    (len > 0).then_some(len)
}

/// Everything up to, not including, the next newline.
pub(crate) fn rest_of_line(rest: &str) -> usize {
    rest.find('\n').unwrap_or(rest.len())
}

/// Block comment `/* ... */`; unterminated comments run to the end of input.
pub(crate) fn block_comment(rest: &str) -> Option<usize> {
    if !rest.starts_with("/*") {
        return None;
    }
    Some(rest[2..].find("*/").map_or(rest.len(), |idx| idx + 4))
}

/// Content comment label `[label]: ...` spanning the rest of the line.
pub(crate) fn content_comment(rest: &str) -> Option<usize> {
    let line = &rest[..rest_of_line(rest)];
    let close = line.strip_prefix('[')?.find(']')?;
    line[close + 2..].starts_with(':').then_some(line.len())
}
