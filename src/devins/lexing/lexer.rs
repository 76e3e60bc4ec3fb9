//! The DevIns state-machine lexer
//!
//! [`Lexer::next_token`] dispatches on the active [`LexerState`] to one handler
//! per state. Every handler either emits a token covering at least one byte of
//! input, or switches state and re-dispatches without consuming anything. The
//! re-dispatch targets always consume, so every call before end of input makes
//! progress. Input no handler recognizes becomes a one-character
//! `BAD_CHARACTER` token; the lexer itself never fails.
//!
//! Whitespace inside the front matter is kept as `WHITE_SPACE` trivia, so the
//! text of all tokens concatenated is exactly the source.

use super::scan::{self, Symbol};
use super::state::{LexerContext, LexerState};
use crate::devins::token::{Token, TokenType};

const FRONT_MATTER_FENCE: &str = "---";
const CODE_FENCE: &str = "```";

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    context: LexerContext,
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            context: LexerContext::new(),
            eof_emitted: false,
        }
    }

    pub fn context(&self) -> &LexerContext {
        &self.context
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Scan one token. At end of input this returns `EOF` on every call.
    pub fn next_token(&mut self) -> Token {
        if self.pos >= self.source.len() {
            return Token::new(TokenType::Eof, "", self.pos, self.pos, self.line, self.column);
        }
        self.dispatch()
    }

    /// Drain the source. The last token is always `EOF`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenType::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_line_start(&self) -> bool {
        self.column == 1
    }

    fn emit(&mut self, kind: TokenType, len: usize) -> Token {
        let start = self.pos;
        let end = (start + len).min(self.source.len());
        let text = &self.source[start..end];
        let token = Token::new(kind, text, start, end, self.line, self.column);
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
        token
    }

    /// Emit the next character alone.
    fn emit_char(&mut self, kind: TokenType) -> Token {
        let len = self.peek().map_or(1, char::len_utf8);
        self.emit(kind, len)
    }

    fn redispatch(&mut self, next: LexerState) -> Token {
        self.context.switch_to(next);
        self.dispatch()
    }

    fn dispatch(&mut self) -> Token {
        match self.context.current_state() {
            LexerState::Initial => self.lex_initial(),
            LexerState::FrontMatterBlock => self.lex_front_matter(),
            LexerState::FrontMatterValueBlock => self.lex_front_matter_value(),
            LexerState::PatternActionBlock => self.lex_pattern_action(),
            LexerState::FunctionDeclBlock => self.lex_function_decl(),
            LexerState::AgentBlock => self.lex_agent(),
            LexerState::VariableBlock => self.lex_variable(),
            LexerState::CommandBlock => self.lex_command(),
            LexerState::CommandValueBlock => self.lex_command_value(),
            LexerState::ContentCommentBlock => self.lex_content_comment(),
            LexerState::CodeBlock => self.lex_code_block(),
            LexerState::LangId => self.lex_lang_id(),
            LexerState::ExprBlock => self.lex_expr(),
            LexerState::LineBlock => self.lex_line(),
            LexerState::FrontMatterValObject | LexerState::SingleCommentBlock => {
                self.lex_default()
            }
        }
    }

    fn lex_default(&mut self) -> Token {
        self.emit_char(TokenType::BadCharacter)
    }

    fn is_front_matter_fence(&self) -> bool {
        let rest = self.rest();
        self.at_line_start()
            && rest.starts_with(FRONT_MATTER_FENCE)
            && matches!(rest[3..].chars().next(), None | Some('\n') | Some('\r'))
    }

    fn lex_initial(&mut self) -> Token {
        let rest = self.rest();
        if self.is_front_matter_fence() && !self.context.is_code_start() {
            if self.context.is_inside_front_matter() {
                self.context.close_front_matter();
                return self.emit(TokenType::FrontMatterEnd, FRONT_MATTER_FENCE.len());
            }
            if !self.context.has_front_matter() && self.source[..self.pos].trim().is_empty() {
                self.context.open_front_matter();
                return self.emit(TokenType::FrontMatterStart, FRONT_MATTER_FENCE.len());
            }
        }
        if rest.starts_with(CODE_FENCE) {
            self.context.open_code_fence();
            return self.emit(TokenType::CodeBlockStart, CODE_FENCE.len());
        }
        if let Some(len) = scan::block_comment(rest) {
            return self.emit(TokenType::BlockComment, len);
        }
        if rest.starts_with("//") {
            let len = scan::rest_of_line(rest);
            return self.emit(TokenType::Comments, len);
        }
        match self.peek() {
            Some('\n') => self.emit(TokenType::Newline, 1),
            Some('[') => self.redispatch(LexerState::ContentCommentBlock),
            Some('@') => {
                self.context.switch_to(LexerState::AgentBlock);
                self.emit(TokenType::AgentStart, 1)
            }
            Some('/') => {
                self.context.switch_to(LexerState::CommandBlock);
                self.emit(TokenType::CommandStart, 1)
            }
            Some('$') => {
                self.context.switch_to(LexerState::VariableBlock);
                self.emit(TokenType::VariableStart, 1)
            }
            _ => self.lex_text_segment(),
        }
    }

    /// Free text up to the next marker. Always consumes at least one character.
    fn lex_text_segment(&mut self) -> Token {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        let mut end = rest.len();
        let mut escaped = false;
        if let Some((_, first)) = chars.next() {
            escaped = first == '\\';
        }
        for (idx, c) in chars {
            if escaped {
                escaped = false;
                continue;
            }
            if matches!(c, '@' | '/' | '$' | '#' | '\n') || rest[idx..].starts_with(CODE_FENCE) {
                end = idx;
                break;
            }
            escaped = c == '\\';
        }
        self.emit(TokenType::TextSegment, end)
    }

    fn lex_content_comment(&mut self) -> Token {
        self.context.switch_to(LexerState::Initial);
        match scan::content_comment(self.rest()) {
            Some(len) => self.emit(TokenType::ContentComments, len),
            None => self.lex_text_segment(),
        }
    }

    fn lex_lang_id(&mut self) -> Token {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.')))
            .unwrap_or(rest.len());
        if len == 0 {
            return self.redispatch(LexerState::CodeBlock);
        }
        self.context.switch_to(LexerState::CodeBlock);
        self.emit(TokenType::LanguageId, len)
    }

    /// Raw content until a closing fence at the start of a line.
    fn lex_code_block(&mut self) -> Token {
        let rest = self.rest();
        if rest.starts_with(CODE_FENCE) {
            self.context.close_code_fence();
            return self.emit(TokenType::CodeBlockEnd, CODE_FENCE.len());
        }
        let len = rest
            .match_indices("\n```")
            .next()
            .map_or(rest.len(), |(idx, _)| idx + 1);
        self.emit(TokenType::CodeContent, len)
    }

    fn lex_agent(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::identifier(rest) {
            self.context.switch_to(LexerState::Initial);
            return self.emit(TokenType::Identifier, len);
        }
        if let Some(len) = scan::quoted_string(rest) {
            self.context.switch_to(LexerState::Initial);
            return self.emit(TokenType::QuoteString, len);
        }
        self.redispatch(LexerState::Initial)
    }

    fn lex_variable(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::identifier(rest) {
            return self.emit(TokenType::Identifier, len);
        }
        match self.peek() {
            Some('{') => self.emit(TokenType::OpenBrace, 1),
            Some('}') => self.emit(TokenType::CloseBrace, 1),
            Some('.') => self.emit(TokenType::Dot, 1),
            Some('(') => self.emit(TokenType::LParen, 1),
            Some(')') => self.emit(TokenType::RParen, 1),
            _ => self.redispatch(LexerState::Initial),
        }
    }

    fn lex_command(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::identifier(rest) {
            return self.emit(TokenType::Identifier, len);
        }
        if rest.starts_with(':') {
            self.context.switch_to(LexerState::CommandValueBlock);
            return self.emit(TokenType::Colon, 1);
        }
        self.redispatch(LexerState::Initial)
    }

    fn lex_command_value(&mut self) -> Token {
        let rest = self.rest();
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if len == 0 {
            return self.redispatch(LexerState::Initial);
        }
        self.context.switch_to(LexerState::Initial);
        self.emit(TokenType::CommandProp, len)
    }

    /// Emit `{` and enter a brace block that returns to `return_to`.
    fn open_brace(&mut self, return_to: LexerState) -> Token {
        self.context.enter_brace(return_to);
        self.emit(TokenType::OpenBrace, 1)
    }

    fn lex_front_matter(&mut self) -> Token {
        let rest = self.rest();
        if self.is_front_matter_fence() {
            self.context.close_front_matter();
            return self.emit(TokenType::FrontMatterEnd, FRONT_MATTER_FENCE.len());
        }
        if let Some(len) = scan::whitespace(rest) {
            return self.emit(TokenType::WhiteSpace, len);
        }
        if let Some(len) = scan::identifier(rest) {
            let kind = TokenType::lifecycle_keyword(&rest[..len]).unwrap_or(TokenType::Identifier);
            return self.emit(kind, len);
        }
        if let Some(len) = scan::quoted_string(rest) {
            return self.emit(TokenType::QuoteString, len);
        }
        if rest.starts_with("//") {
            let len = scan::rest_of_line(rest);
            return self.emit(TokenType::Comments, len);
        }
        if let Some(len) = scan::pattern(rest) {
            return self.emit(TokenType::PatternExpr, len);
        }
        match self.peek() {
            Some('\n') => self.emit(TokenType::Newline, 1),
            Some(':') => {
                self.context.switch_to(LexerState::FrontMatterValueBlock);
                self.emit(TokenType::Colon, 1)
            }
            Some('{') => self.open_brace(LexerState::FrontMatterBlock),
            _ => self.redispatch(LexerState::LineBlock),
        }
    }

    /// One free-form line inside the front matter, such as a plan list item.
    fn lex_line(&mut self) -> Token {
        self.context.switch_to(LexerState::FrontMatterBlock);
        let len = scan::rest_of_line(self.rest());
        if len == 0 {
            return self.emit_char(TokenType::Newline);
        }
        self.emit(TokenType::TextSegment, len)
    }

    fn lex_front_matter_value(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::whitespace(rest) {
            return self.emit(TokenType::WhiteSpace, len);
        }
        if let Some(len) = scan::identifier(rest) {
            return self.emit(word_kind(&rest[..len], false), len);
        }
        if let Some(len) = scan::quoted_string(rest) {
            return self.emit(TokenType::QuoteString, len);
        }
        if rest.starts_with("//") {
            let len = scan::rest_of_line(rest);
            return self.emit(TokenType::Comments, len);
        }
        if let Some(len) = scan::pattern(rest) {
            self.context.switch_to(LexerState::PatternActionBlock);
            return self.emit(TokenType::PatternExpr, len);
        }
        match scan::symbol(rest) {
            Some((
                sym @ (Symbol::Date
                | Symbol::Number
                | Symbol::Access
                | Symbol::Process
                | Symbol::LBracket
                | Symbol::RBracket
                | Symbol::Comma),
                len,
            )) => self.emit(sym.token_type(), len),
            Some((Symbol::OpenBrace, _)) => self.open_brace(LexerState::FrontMatterBlock),
            _ => match self.peek() {
                Some('$' | '(' | '!' | '=' | '<' | '>' | '&' | '|' | '.') => {
                    self.redispatch(LexerState::ExprBlock)
                }
                _ => self.redispatch(LexerState::FrontMatterBlock),
            },
        }
    }

    fn lex_expr(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::whitespace(rest) {
            return self.emit(TokenType::WhiteSpace, len);
        }
        if let Some(len) = scan::identifier(rest) {
            return self.emit(word_kind(&rest[..len], false), len);
        }
        if let Some(len) = scan::quoted_string(rest) {
            return self.emit(TokenType::QuoteString, len);
        }
        if rest.starts_with("//") {
            let len = scan::rest_of_line(rest);
            return self.emit(TokenType::Comments, len);
        }
        if rest.starts_with('\n') {
            let next = self.context.block_return_state();
            return self.redispatch(next);
        }
        match scan::symbol(rest) {
            Some((Symbol::OpenBrace, _)) => {
                let back = self.context.block_return_state();
                self.open_brace(back)
            }
            Some((Symbol::CloseBrace, _)) | None => self.emit_char(TokenType::BadCharacter),
            Some((sym, len)) => self.emit(sym.token_type(), len),
        }
    }

    fn lex_pattern_action(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::whitespace(rest) {
            return self.emit(TokenType::WhiteSpace, len);
        }
        let back = self.context.block_return_state();
        match self.peek() {
            Some('{') => self.open_brace(back),
            Some('\n') => {
                self.context.switch_to(back);
                self.emit(TokenType::Newline, 1)
            }
            _ => self.redispatch(back),
        }
    }

    fn lex_function_decl(&mut self) -> Token {
        let rest = self.rest();
        if let Some(len) = scan::whitespace(rest) {
            return self.emit(TokenType::WhiteSpace, len);
        }
        if let Some(len) = scan::identifier(rest) {
            return self.emit(word_kind(&rest[..len], true), len);
        }
        if let Some(len) = scan::quoted_string(rest) {
            return self.emit(TokenType::QuoteString, len);
        }
        if rest.starts_with("//") {
            let len = scan::rest_of_line(rest);
            return self.emit(TokenType::Comments, len);
        }
        if let Some(len) = scan::pattern(rest) {
            return self.emit(TokenType::PatternExpr, len);
        }
        if rest.starts_with('\n') {
            return self.emit(TokenType::Newline, 1);
        }
        match scan::symbol(rest) {
            Some((Symbol::OpenBrace, _)) => self.open_brace(LexerState::FunctionDeclBlock),
            Some((Symbol::CloseBrace, _)) => {
                self.context.leave_brace();
                self.emit(TokenType::CloseBrace, 1)
            }
            Some((sym, len)) => self.emit(sym.token_type(), len),
            None => self.emit_char(TokenType::BadCharacter),
        }
    }
}

/// Booleans are recognized by exact spelling; inside brace blocks only the
/// lowercase forms count.
fn word_kind(word: &str, lowercase_only: bool) -> TokenType {
    match word {
        "true" | "false" => TokenType::Boolean,
        "TRUE" | "FALSE" if !lowercase_only => TokenType::Boolean,
        _ => TokenType::Identifier,
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token including a single trailing `EOF`, then stops.
    fn next(&mut self) -> Option<Token> {
        if self.eof_emitted {
            return None;
        }
        let token = self.next_token();
        if token.is(TokenType::Eof) {
            self.eof_emitted = true;
        }
        Some(token)
    }
}

/// Tokenize a whole document.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
