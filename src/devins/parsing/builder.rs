//! Recursive-descent tree builder
//!
//! Builds a [`ParseNode`] tree from the lexer's token stream. The front matter
//! is read line by line: each `key: value` line becomes a `FRONT_MATTER_ENTRY`,
//! runs of free-form lines become plan lists, and a key with nothing after the
//! colon takes the more deeply indented `key: value` lines below it as an
//! object.
//!
//! Value expressions use the usual precedence, loosest first:
//!
//! ```text
//!     ||   &&   == !=   < > <= >=   postfix (.name, call(...))   primary
//! ```
//!
//! The builder never fails. What it cannot place is kept as leaves under an
//! `ERROR` node and reported as a [`ParseDiagnostic`], so a single bad entry
//! degrades to an error value for that key only.

use super::lists::{build_lists, indent_width, ListLine};
use super::tree::{NodeType, ParseNode};
use crate::devins::token::{Token, TokenType};
use std::fmt;

const CASE_KEYWORD: &str = "case";
const CONDITION_KEYWORD: &str = "condition";
const QUERY_KEYWORD: &str = "from";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub document: ParseNode,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseOutput {
    /// The `FRONT_MATTER_HEADER` node, if the document has one.
    pub fn front_matter(&self) -> Option<&ParseNode> {
        self.document.child(NodeType::FrontMatterHeader)
    }
}

/// Build the whole document tree: an optional header followed by body nodes.
pub fn build_document(source: &str, tokens: &[Token]) -> ParseOutput {
    let mut builder = TreeBuilder::new(source, tokens);
    let document = builder.document();
    ParseOutput {
        document,
        diagnostics: builder.diagnostics,
    }
}

/// Build only the header tree. `None` when the document does not open with
/// a front matter.
pub fn build_front_matter(source: &str, tokens: &[Token]) -> Option<ParseNode> {
    let mut builder = TreeBuilder::new(source, tokens);
    if builder.lookahead_raw_skipping_newlines() != TokenType::FrontMatterStart {
        return None;
    }
    Some(builder.header())
}

/// How deep parentheses, call arguments, arrays and operator chains may nest
/// inside one value before the rest of the line is given up as an error.
const MAX_NESTING: usize = 128;

struct TreeBuilder<'a> {
    source: &'a str,
    tokens: &'a [Token],
    eof: Token,
    pos: usize,
    brace_depth: usize,
    nesting: usize,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let eof = Token::new(TokenType::Eof, "", source.len(), source.len(), 0, 0);
        Self {
            source,
            tokens,
            eof,
            pos: 0,
            brace_depth: 0,
            nesting: 0,
            diagnostics: Vec::new(),
        }
    }

    // ----- token navigation -----

    fn raw(&self, idx: usize) -> &Token {
        self.tokens.get(idx).unwrap_or(&self.eof)
    }

    fn skippable(&self, kind: TokenType) -> bool {
        kind.is_trivia() || (self.brace_depth > 0 && kind == TokenType::Newline)
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.skippable(self.tokens[self.pos].kind) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Token {
        self.skip_trivia();
        self.raw(self.pos).clone()
    }

    fn peek_kind(&mut self) -> TokenType {
        self.skip_trivia();
        self.raw(self.pos).kind
    }

    fn peek_is_word(&mut self, word: &str) -> bool {
        let token = self.peek();
        token.is(TokenType::Identifier) && token.text == word
    }

    /// Kind of the `n`th significant token ahead, without consuming.
    fn lookahead(&self, n: usize) -> TokenType {
        let mut idx = self.pos;
        let mut seen = 0;
        while idx < self.tokens.len() {
            let kind = self.tokens[idx].kind;
            if !self.skippable(kind) {
                if seen == n {
                    return kind;
                }
                seen += 1;
            }
            idx += 1;
        }
        TokenType::Eof
    }

    fn bump(&mut self) -> ParseNode {
        self.skip_trivia();
        let leaf = ParseNode::leaf(self.raw(self.pos));
        if self.pos < self.tokens.len() && !self.raw(self.pos).is(TokenType::Eof) {
            self.pos += 1;
        }
        leaf
    }

    fn eat(&mut self, kind: TokenType) -> Option<ParseNode> {
        (self.peek_kind() == kind).then(|| self.bump())
    }

    fn at_line_end(&mut self) -> bool {
        matches!(
            self.peek_kind(),
            TokenType::Newline | TokenType::Eof | TokenType::FrontMatterEnd
        )
    }

    fn at_block_end(&mut self) -> bool {
        matches!(
            self.peek_kind(),
            TokenType::CloseBrace | TokenType::Eof | TokenType::FrontMatterEnd
        )
    }

    fn node(&self, node_type: NodeType, children: Vec<ParseNode>) -> ParseNode {
        ParseNode::composite(node_type, children, self.source)
    }

    fn error(&mut self, message: impl Into<String>) {
        let token = self.peek();
        self.diagnostics.push(ParseDiagnostic {
            message: message.into(),
            line: token.line,
            column: token.column,
        });
    }

    /// Everything left before the end of the line, as leaves.
    fn rest_of_line(&mut self) -> Vec<ParseNode> {
        let mut leaves = Vec::new();
        while !self.at_line_end() {
            leaves.push(self.bump());
        }
        leaves
    }

    /// Everything left before the `}` closing the current block, as leaves.
    fn rest_of_block(&mut self) -> Vec<ParseNode> {
        let mut leaves = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenType::Eof | TokenType::FrontMatterEnd => break,
                TokenType::CloseBrace if depth == 0 => break,
                TokenType::CloseBrace => depth -= 1,
                TokenType::OpenBrace => depth += 1,
                _ => {}
            }
            leaves.push(self.bump());
        }
        leaves
    }

    /// Go one nesting level deeper, or report that the value nests too deeply.
    fn descend(&mut self) -> bool {
        if self.nesting >= MAX_NESTING {
            self.error(format!("value nests deeper than {} levels", MAX_NESTING));
            return false;
        }
        self.nesting += 1;
        true
    }

    fn open_brace(&mut self) -> Option<ParseNode> {
        let brace = self.eat(TokenType::OpenBrace)?;
        self.brace_depth += 1;
        Some(brace)
    }

    fn close_brace(&mut self, children: &mut Vec<ParseNode>) {
        match self.eat(TokenType::CloseBrace) {
            Some(brace) => children.push(brace),
            None => self.error("expected '}' to close block"),
        }
        self.brace_depth = self.brace_depth.saturating_sub(1);
    }

    // ----- document -----

    fn document(&mut self) -> ParseNode {
        let mut children = Vec::new();
        if self.lookahead_raw_skipping_newlines() == TokenType::FrontMatterStart {
            children.push(self.header());
        }
        while !self.raw(self.pos).is(TokenType::Eof) && self.pos < self.tokens.len() {
            if let Some(node) = self.body_element() {
                children.push(node);
            }
        }
        let end = self.source.len();
        ParseNode::with_span(NodeType::Document, 0..end, children, self.source)
    }

    fn lookahead_raw_skipping_newlines(&self) -> TokenType {
        self.tokens
            .iter()
            .map(|t| t.kind)
            .find(|k| !k.is_trivia() && *k != TokenType::Newline)
            .unwrap_or(TokenType::Eof)
    }

    fn body_element(&mut self) -> Option<ParseNode> {
        let token = self.raw(self.pos).clone();
        if token.is_trivia() {
            self.pos += 1;
            return None;
        }
        match token.kind {
            TokenType::AgentStart | TokenType::CommandStart | TokenType::VariableStart => {
                Some(self.used())
            }
            TokenType::CodeBlockStart => Some(self.code_block()),
            _ => Some(self.bump()),
        }
    }

    /// `@agent`, `/command:prop` or `$variable.member`.
    fn used(&mut self) -> ParseNode {
        let marker = self.bump();
        let kind = marker.node_type;
        let mut children = vec![marker];
        match self.raw(self.pos).kind {
            TokenType::Identifier | TokenType::QuoteString => children.push(self.bump()),
            _ => return self.node(NodeType::Used, children),
        }
        if kind == NodeType::Token(TokenType::CommandStart) && self.raw(self.pos).is(TokenType::Colon)
        {
            children.push(self.bump());
            if self.raw(self.pos).is(TokenType::CommandProp) {
                children.push(self.bump());
            }
        }
        if kind == NodeType::Token(TokenType::VariableStart) {
            while self.raw(self.pos).is(TokenType::Dot)
                && self.raw(self.pos + 1).is(TokenType::Identifier)
            {
                children.push(self.bump());
                children.push(self.bump());
            }
        }
        self.node(NodeType::Used, children)
    }

    fn code_block(&mut self) -> ParseNode {
        let mut children = vec![self.bump()];
        for kind in [
            TokenType::LanguageId,
            TokenType::CodeContent,
            TokenType::CodeBlockEnd,
        ] {
            if self.raw(self.pos).is(kind) {
                children.push(self.bump());
            }
        }
        self.node(NodeType::CodeBlock, children)
    }

    // ----- front matter -----

    /// Consume indentation at the start of a line and return its width.
    fn line_indent(&mut self) -> usize {
        let token = self.raw(self.pos);
        if token.is(TokenType::WhiteSpace) {
            let width = indent_width(&token.text);
            self.pos += 1;
            width
        } else {
            0
        }
    }

    fn header(&mut self) -> ParseNode {
        let mut children = Vec::new();
        while self.peek_kind() == TokenType::Newline {
            self.bump();
        }
        children.push(self.bump());
        let mut list_lines: Vec<ListLine> = Vec::new();

        loop {
            let indent = self.line_indent();
            match self.peek_kind() {
                TokenType::Eof => {
                    self.error("expected '---' to close front matter");
                    break;
                }
                TokenType::FrontMatterEnd => {
                    children.extend(build_lists(&list_lines, self.source));
                    list_lines.clear();
                    children.push(self.bump());
                    break;
                }
                TokenType::Newline => {
                    self.bump();
                }
                TokenType::TextSegment => {
                    let line = self.bump();
                    list_lines.push(ListLine {
                        indent,
                        span: line.span,
                    });
                }
                _ => {
                    children.extend(build_lists(&list_lines, self.source));
                    list_lines.clear();
                    children.push(self.entry(NodeType::FrontMatterEntry, indent));
                }
            }
        }
        children.extend(build_lists(&list_lines, self.source));
        self.node(NodeType::FrontMatterHeader, children)
    }

    fn is_key_token(kind: TokenType) -> bool {
        kind.is_lifecycle_keyword()
            || matches!(
                kind,
                TokenType::Identifier | TokenType::QuoteString | TokenType::PatternExpr
            )
    }

    /// `key: value` for header entries and object members.
    fn entry(&mut self, node_type: NodeType, indent: usize) -> ParseNode {
        let first = self.peek_kind();
        if !Self::is_key_token(first) {
            self.error(format!("expected a key, found {}", first));
            let leaves = self.rest_of_line();
            return self.node(NodeType::Error, leaves);
        }
        let key_leaf = self.bump();
        let is_when = key_leaf.is_token(TokenType::When);
        let key = if first.is_lifecycle_keyword() && node_type == NodeType::FrontMatterEntry {
            self.node(NodeType::LifecycleId, vec![key_leaf])
        } else {
            self.node(NodeType::FrontMatterKey, vec![key_leaf])
        };

        let Some(colon) = self.eat(TokenType::Colon) else {
            self.error("expected ':' after front matter key");
            let mut children = vec![key];
            children.extend(self.rest_of_line());
            return self.node(NodeType::Error, children);
        };

        let mut children = vec![key, colon];
        if self.at_line_end() {
            if let Some(object) = self.indented_object(indent) {
                children.push(object);
            }
            return self.node(node_type, children);
        }

        let value = self.value(is_when);
        if !self.at_line_end() {
            self.error("unexpected tokens after value");
        }
        let leftovers = self.rest_of_line();
        if leftovers.is_empty() {
            children.push(value);
        } else {
            let mut wrapped = vec![value];
            wrapped.extend(leftovers);
            children.push(self.node(NodeType::Error, wrapped));
        }
        self.node(node_type, children)
    }

    /// Next non-blank line: (indent, index of its first significant token).
    fn next_line(&self) -> Option<(usize, usize)> {
        let mut idx = self.pos;
        while idx < self.tokens.len() && self.tokens[idx].is_trivia() {
            idx += 1;
        }
        if !self.raw(idx).is(TokenType::Newline) {
            return None;
        }
        loop {
            idx += 1;
            let mut indent = 0;
            if self.raw(idx).is(TokenType::WhiteSpace) {
                indent = indent_width(&self.raw(idx).text);
                idx += 1;
            }
            while self.raw(idx).is_trivia() {
                idx += 1;
            }
            if !self.raw(idx).is(TokenType::Newline) {
                return Some((indent, idx));
            }
        }
    }

    fn starts_key_value(&self, idx: usize) -> bool {
        if !Self::is_key_token(self.raw(idx).kind) {
            return false;
        }
        let mut next = idx + 1;
        while self.raw(next).is_trivia() {
            next += 1;
        }
        self.raw(next).is(TokenType::Colon)
    }

    /// Members indented below a key whose value is left empty.
    fn indented_object(&mut self, parent_indent: usize) -> Option<ParseNode> {
        let mut members = Vec::new();
        while let Some((indent, idx)) = self.next_line() {
            if indent <= parent_indent || !self.starts_key_value(idx) {
                break;
            }
            self.pos = idx;
            members.push(self.entry(NodeType::KeyValue, indent));
        }
        (!members.is_empty()).then(|| self.node(NodeType::ObjectKeyValue, members))
    }

    fn value(&mut self, is_when: bool) -> ParseNode {
        match self.peek_kind() {
            TokenType::PatternExpr => self.pattern_action(),
            TokenType::OpenBrace => self.function_statement(),
            TokenType::LBracket if !is_when => self.array(),
            TokenType::QuoteString
                if matches!(self.lookahead(1), TokenType::Access | TokenType::LParen) =>
            {
                self.foreign_function()
            }
            TokenType::Number
            | TokenType::QuoteString
            | TokenType::Boolean
            | TokenType::Date
            | TokenType::Identifier
                if !is_when
                    && matches!(
                        self.lookahead(1),
                        TokenType::Newline | TokenType::Eof | TokenType::FrontMatterEnd
                    ) =>
            {
                let leaf = self.bump();
                self.node(NodeType::FrontMatterValue, vec![leaf])
            }
            _ => self.expression_or_error(),
        }
    }

    fn expression_or_error(&mut self) -> ParseNode {
        match self.expression() {
            Some(expr) => expr,
            None => {
                let found = self.peek_kind();
                self.error(format!("expected an expression, found {}", found));
                let leaf = self.bump();
                self.node(NodeType::Error, vec![leaf])
            }
        }
    }

    fn array(&mut self) -> ParseNode {
        let mut children = vec![self.bump()];
        loop {
            match self.peek_kind() {
                TokenType::RBracket => {
                    children.push(self.bump());
                    break;
                }
                TokenType::Comma => children.push(self.bump()),
                TokenType::LBracket if self.descend() => {
                    children.push(self.array());
                    self.nesting -= 1;
                }
                TokenType::LBracket => {
                    let leaves = self.rest_of_line();
                    children.push(self.node(NodeType::Error, leaves));
                    break;
                }
                TokenType::Number
                | TokenType::QuoteString
                | TokenType::Boolean
                | TokenType::Date
                | TokenType::Identifier => {
                    let leaf = self.bump();
                    children.push(self.node(NodeType::FrontMatterValue, vec![leaf]));
                }
                _ => {
                    self.error("expected ']' to close array");
                    break;
                }
            }
        }
        self.node(NodeType::FrontMatterArray, children)
    }

    // ----- pattern actions and brace blocks -----

    fn pattern_action(&mut self) -> ParseNode {
        let mut children = vec![self.bump()];
        if self.peek_kind() == TokenType::OpenBrace {
            children.push(self.action_block());
        }
        self.node(NodeType::PatternAction, children)
    }

    fn action_block(&mut self) -> ParseNode {
        let mut children = Vec::new();
        children.extend(self.open_brace());
        if let Some(body) = self.action_body() {
            children.push(body);
        }
        let junk = self.rest_of_block();
        if !junk.is_empty() {
            self.error("unexpected tokens in action block");
            children.push(self.node(NodeType::Error, junk));
        }
        self.close_brace(&mut children);
        self.node(NodeType::ActionBlock, children)
    }

    /// `expr | expr | ...` where each expr is a call or a case body.
    fn action_body(&mut self) -> Option<ParseNode> {
        let mut children = Vec::new();
        loop {
            let Some(expr) = self.action_expr() else {
                break;
            };
            children.push(expr);
            if let Some(pipe) = self.eat(TokenType::Pipe) {
                children.push(pipe);
            } else if self.peek_kind() != TokenType::Identifier {
                break;
            }
        }
        (!children.is_empty()).then(|| self.node(NodeType::ActionBody, children))
    }

    fn action_expr(&mut self) -> Option<ParseNode> {
        if self.peek_kind() != TokenType::Identifier {
            return None;
        }
        let starts_case = self.peek_is_word(CASE_KEYWORD)
            || (self.peek_is_word(CONDITION_KEYWORD) && self.lookahead(1) == TokenType::OpenBrace);
        let inner = if starts_case {
            self.case_body()
        } else {
            self.func_call()
        };
        Some(self.node(NodeType::ActionExpr, vec![inner]))
    }

    fn func_call(&mut self) -> ParseNode {
        let name = self.bump();
        let mut children = vec![self.node(NodeType::FuncName, vec![name])];
        if let Some(lparen) = self.eat(TokenType::LParen) {
            let args_start = lparen.span.end;
            children.push(lparen);
            let mut args = Vec::new();
            loop {
                match self.peek_kind() {
                    TokenType::QuoteString
                    | TokenType::Identifier
                    | TokenType::Number
                    | TokenType::Boolean
                    | TokenType::Date
                    | TokenType::PatternExpr
                    | TokenType::Comma => args.push(self.bump()),
                    TokenType::VariableStart => {
                        let mut parts = vec![self.bump()];
                        parts.extend(self.eat(TokenType::Identifier));
                        args.push(self.node(NodeType::LiteralExpr, parts));
                    }
                    _ => break,
                }
            }
            let pipeline_args = if args.is_empty() {
                ParseNode::with_span(
                    NodeType::PipelineArgs,
                    args_start..args_start,
                    args,
                    self.source,
                )
            } else {
                self.node(NodeType::PipelineArgs, args)
            };
            children.push(pipeline_args);
            match self.eat(TokenType::RParen) {
                Some(rparen) => children.push(rparen),
                None => self.error("expected ')' after arguments"),
            }
        }
        self.node(NodeType::FuncCall, children)
    }

    /// `[condition { ... }] case target { arm ... }`
    fn case_body(&mut self) -> ParseNode {
        let mut children = Vec::new();
        if self.peek_is_word(CONDITION_KEYWORD) && self.lookahead(1) == TokenType::OpenBrace {
            children.push(self.condition_flag());
        }
        if self.peek_is_word(CASE_KEYWORD) {
            children.push(self.bump());
            match self.peek_kind() {
                TokenType::QuoteString | TokenType::Identifier => children.push(self.bump()),
                TokenType::VariableStart => {
                    if let Some(expr) = self.expression() {
                        children.push(expr);
                    }
                }
                _ => self.error("expected a case target"),
            }
            if let Some(open) = self.open_brace() {
                children.push(open);
                while matches!(
                    self.peek_kind(),
                    TokenType::QuoteString | TokenType::Identifier
                ) {
                    children.push(self.case_pattern_action());
                }
                let junk = self.rest_of_block();
                if !junk.is_empty() {
                    self.error("unexpected tokens in case body");
                    children.push(self.node(NodeType::Error, junk));
                }
                self.close_brace(&mut children);
            } else {
                self.error("expected '{' after case target");
            }
        }
        self.node(NodeType::CaseBody, children)
    }

    fn condition_flag(&mut self) -> ParseNode {
        let mut children = vec![self.bump()];
        children.extend(self.open_brace());
        while matches!(
            self.peek_kind(),
            TokenType::QuoteString | TokenType::Identifier
        ) {
            children.push(self.condition_statement());
        }
        self.close_brace(&mut children);
        self.node(NodeType::ConditionFlag, children)
    }

    /// `"key" { expression }`
    fn condition_statement(&mut self) -> ParseNode {
        let key = self.bump();
        let mut children = vec![self.node(NodeType::CaseCondition, vec![key])];
        if let Some(open) = self.open_brace() {
            children.push(open);
            if !self.at_block_end() {
                children.push(self.expression_or_error());
            }
            let junk = self.rest_of_block();
            if !junk.is_empty() {
                children.push(self.node(NodeType::Error, junk));
            }
            self.close_brace(&mut children);
        }
        self.node(NodeType::ConditionStatement, children)
    }

    /// `"key" { action | action }` or `default { ... }`
    fn case_pattern_action(&mut self) -> ParseNode {
        let key = self.bump();
        let mut children = vec![self.node(NodeType::CaseCondition, vec![key])];
        if let Some(open) = self.open_brace() {
            children.push(open);
            if let Some(body) = self.action_body() {
                children.push(body);
            }
            let junk = self.rest_of_block();
            if !junk.is_empty() {
                children.push(self.node(NodeType::Error, junk));
            }
            self.close_brace(&mut children);
        }
        self.node(NodeType::CasePatternAction, children)
    }

    fn function_statement(&mut self) -> ParseNode {
        let mut children = Vec::new();
        children.extend(self.open_brace());
        if !self.at_block_end() {
            let body = self.function_body();
            children.push(body);
        }
        let junk = self.rest_of_block();
        if !junk.is_empty() {
            self.error("unexpected tokens in function body");
            children.push(self.node(NodeType::Error, junk));
        }
        self.close_brace(&mut children);
        self.node(NodeType::FunctionStatement, children)
    }

    fn function_body(&mut self) -> ParseNode {
        if self.peek_is_word(QUERY_KEYWORD) && self.lookahead(1) == TokenType::OpenBrace {
            let leaves = self.rest_of_block();
            let query = self.node(NodeType::QueryStatement, leaves);
            return self.node(NodeType::FunctionBody, vec![query]);
        }

        let saved = (self.pos, self.diagnostics.len(), self.brace_depth);
        if let Some(body) = self.action_body() {
            if self.peek_kind() == TokenType::CloseBrace {
                return self.node(NodeType::FunctionBody, vec![body]);
            }
        }
        (self.pos, self.brace_depth) = (saved.0, saved.2);
        self.diagnostics.truncate(saved.1);

        let expr = self.expression_or_error();
        self.node(NodeType::FunctionBody, vec![expr])
    }

    /// `"path.py"::name(type, ...) -> output`
    fn foreign_function(&mut self) -> ParseNode {
        let path = self.bump();
        let mut children = vec![self.node(NodeType::ForeignPath, vec![path])];
        if let Some(access) = self.eat(TokenType::Access) {
            children.push(access);
            match self.eat(TokenType::Identifier) {
                Some(name) => children.push(self.node(NodeType::ForeignFuncName, vec![name])),
                None => self.error("expected a function name after '::'"),
            }
        }
        if let Some(lparen) = self.eat(TokenType::LParen) {
            children.push(lparen);
            loop {
                match self.peek_kind() {
                    TokenType::Identifier => {
                        let ty = self.bump();
                        children.push(self.node(NodeType::ForeignType, vec![ty]));
                    }
                    TokenType::Comma => children.push(self.bump()),
                    _ => break,
                }
            }
            match self.eat(TokenType::RParen) {
                Some(rparen) => children.push(rparen),
                None => self.error("expected ')' after input types"),
            }
        }
        if let Some(arrow) = self.eat(TokenType::Process) {
            children.push(arrow);
            let grouped = self.eat(TokenType::LParen);
            let is_grouped = grouped.is_some();
            children.extend(grouped);
            loop {
                match self.peek_kind() {
                    TokenType::Identifier => {
                        let out = self.bump();
                        children.push(self.node(NodeType::ForeignOutput, vec![out]));
                    }
                    TokenType::Comma if is_grouped => children.push(self.bump()),
                    _ => break,
                }
                if !is_grouped {
                    break;
                }
            }
            if is_grouped {
                match self.eat(TokenType::RParen) {
                    Some(rparen) => children.push(rparen),
                    None => self.error("expected ')' after outputs"),
                }
            }
        }
        self.node(NodeType::ForeignFunction, children)
    }

    // ----- expressions -----

    fn expression(&mut self) -> Option<ParseNode> {
        if !self.descend() {
            return None;
        }
        let expr = self.or_expr();
        self.nesting -= 1;
        expr
    }

    // Each link of a left-nested chain counts as one level, so operands
    // parsed further along the chain have less room to nest.

    fn or_expr(&mut self) -> Option<ParseNode> {
        let mut left = self.and_expr()?;
        let entry = self.nesting;
        while self.peek_kind() == TokenType::OrOr && self.descend() {
            let operator = self.bump();
            match self.and_expr() {
                Some(right) => {
                    left = self.node(NodeType::LogicalOrExpr, vec![left, operator, right])
                }
                None => {
                    self.error("expected an operand after '||'");
                    left = self.node(NodeType::LogicalOrExpr, vec![left, operator]);
                    break;
                }
            }
        }
        self.nesting = entry;
        Some(left)
    }

    fn and_expr(&mut self) -> Option<ParseNode> {
        let mut left = self.equality()?;
        let entry = self.nesting;
        while self.peek_kind() == TokenType::AndAnd && self.descend() {
            let operator = self.bump();
            match self.equality() {
                Some(right) => {
                    left = self.node(NodeType::LogicalAndExpr, vec![left, operator, right])
                }
                None => {
                    self.error("expected an operand after '&&'");
                    left = self.node(NodeType::LogicalAndExpr, vec![left, operator]);
                    break;
                }
            }
        }
        self.nesting = entry;
        Some(left)
    }

    fn equality(&mut self) -> Option<ParseNode> {
        let left = self.relational()?;
        if !matches!(self.peek_kind(), TokenType::EqEq | TokenType::Neq) {
            return Some(left);
        }
        let operator = self.bump();
        let mut children = vec![left, operator];
        match self.relational() {
            Some(right) => children.push(right),
            None => self.error("expected a right operand"),
        }
        Some(self.node(NodeType::EqComparisonExpr, children))
    }

    fn relational(&mut self) -> Option<ParseNode> {
        let left = self.postfix()?;
        if !matches!(
            self.peek_kind(),
            TokenType::Lt | TokenType::Gt | TokenType::Lte | TokenType::Gte
        ) {
            return Some(left);
        }
        let operator = self.bump();
        let mut children = vec![left, operator];
        match self.postfix() {
            Some(right) => children.push(right),
            None => self.error("expected a right operand"),
        }
        Some(self.node(NodeType::IneqComparisonExpr, children))
    }

    fn postfix(&mut self) -> Option<ParseNode> {
        let mut node = self.primary()?;
        let entry = self.nesting;
        loop {
            match self.peek_kind() {
                TokenType::Dot | TokenType::LParen if !self.descend() => break,
                TokenType::Dot => {
                    let dot = self.bump();
                    match self.eat(TokenType::Identifier) {
                        Some(name) => node = self.node(NodeType::RefExpr, vec![node, dot, name]),
                        None => {
                            self.error("expected a member name after '.'");
                            node = self.node(NodeType::RefExpr, vec![node, dot]);
                            break;
                        }
                    }
                }
                TokenType::LParen => {
                    let lparen = self.bump();
                    let list = self.expression_list(lparen.span.end);
                    let mut children = vec![node, lparen, list];
                    match self.eat(TokenType::RParen) {
                        Some(rparen) => children.push(rparen),
                        None => self.error("expected ')' after arguments"),
                    }
                    node = self.node(NodeType::CallExpr, children);
                }
                _ => break,
            }
        }
        self.nesting = entry;
        Some(node)
    }

    fn expression_list(&mut self, start: usize) -> ParseNode {
        let mut children = Vec::new();
        while let Some(expr) = self.expression() {
            children.push(expr);
            match self.eat(TokenType::Comma) {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        if children.is_empty() {
            ParseNode::with_span(NodeType::ExpressionList, start..start, children, self.source)
        } else {
            self.node(NodeType::ExpressionList, children)
        }
    }

    fn primary(&mut self) -> Option<ParseNode> {
        match self.peek_kind() {
            TokenType::VariableStart => {
                let mut children = vec![self.bump()];
                children.extend(self.eat(TokenType::Identifier));
                Some(self.node(NodeType::LiteralExpr, children))
            }
            TokenType::Number | TokenType::QuoteString | TokenType::Boolean | TokenType::Date => {
                let leaf = self.bump();
                Some(self.node(NodeType::LiteralExpr, vec![leaf]))
            }
            TokenType::Identifier => {
                let leaf = self.bump();
                Some(self.node(NodeType::RefExpr, vec![leaf]))
            }
            TokenType::LParen => {
                let saved = self.pos;
                self.bump();
                let inner = self.expression();
                if inner.is_some() && self.eat(TokenType::RParen).is_some() {
                    inner
                } else {
                    self.pos = saved;
                    None
                }
            }
            _ => None,
        }
    }
}
