//! Lexer modes and the mutable context that drives them
//!
//! The lexer is a pushdown automaton: exactly one [`LexerState`] is active, and
//! brace blocks push the state to return to on an explicit stack. Closing the
//! outermost brace pops back to whichever state opened it, which is either the
//! front matter or the document body.

use serde::Serialize;
use std::fmt;

/// Every mode the lexer can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LexerState {
    Initial,
    FrontMatterBlock,
    FrontMatterValueBlock,
    FrontMatterValObject,
    PatternActionBlock,
    FunctionDeclBlock,
    AgentBlock,
    VariableBlock,
    CommandBlock,
    CommandValueBlock,
    ContentCommentBlock,
    SingleCommentBlock,
    CodeBlock,
    LangId,
    ExprBlock,
    LineBlock,
}

impl LexerState {
    pub const ALL: [LexerState; 16] = [
        LexerState::Initial,
        LexerState::FrontMatterBlock,
        LexerState::FrontMatterValueBlock,
        LexerState::FrontMatterValObject,
        LexerState::PatternActionBlock,
        LexerState::FunctionDeclBlock,
        LexerState::AgentBlock,
        LexerState::VariableBlock,
        LexerState::CommandBlock,
        LexerState::CommandValueBlock,
        LexerState::ContentCommentBlock,
        LexerState::SingleCommentBlock,
        LexerState::CodeBlock,
        LexerState::LangId,
        LexerState::ExprBlock,
        LexerState::LineBlock,
    ];
}

impl fmt::Display for LexerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LexerState::Initial => "INITIAL",
            LexerState::FrontMatterBlock => "FRONT_MATTER_BLOCK",
            LexerState::FrontMatterValueBlock => "FRONT_MATTER_VALUE_BLOCK",
            LexerState::FrontMatterValObject => "FRONT_MATTER_VAL_OBJECT",
            LexerState::PatternActionBlock => "PATTERN_ACTION_BLOCK",
            LexerState::FunctionDeclBlock => "FUNCTION_DECL_BLOCK",
            LexerState::AgentBlock => "AGENT_BLOCK",
            LexerState::VariableBlock => "VARIABLE_BLOCK",
            LexerState::CommandBlock => "COMMAND_BLOCK",
            LexerState::CommandValueBlock => "COMMAND_VALUE_BLOCK",
            LexerState::ContentCommentBlock => "CONTENT_COMMENT_BLOCK",
            LexerState::SingleCommentBlock => "SINGLE_COMMENT_BLOCK",
            LexerState::CodeBlock => "CODE_BLOCK",
            LexerState::LangId => "LANG_ID",
            LexerState::ExprBlock => "EXPR_BLOCK",
            LexerState::LineBlock => "LINE_BLOCK",
        };
        f.write_str(name)
    }
}

/// State-machine context owned by a single [`Lexer`](super::Lexer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerContext {
    current_state: LexerState,
    state_stack: Vec<LexerState>,
    pattern_action_brace_level: usize,
    is_code_start: bool,
    is_inside_front_matter: bool,
    has_front_matter: bool,
}

impl Default for LexerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LexerContext {
    pub fn new() -> Self {
        Self {
            current_state: LexerState::Initial,
            state_stack: Vec::new(),
            pattern_action_brace_level: 0,
            is_code_start: false,
            is_inside_front_matter: false,
            has_front_matter: false,
        }
    }

    pub fn current_state(&self) -> LexerState {
        self.current_state
    }

    pub fn pattern_action_brace_level(&self) -> usize {
        self.pattern_action_brace_level
    }

    pub fn is_code_start(&self) -> bool {
        self.is_code_start
    }

    pub fn is_inside_front_matter(&self) -> bool {
        self.is_inside_front_matter
    }

    pub fn has_front_matter(&self) -> bool {
        self.has_front_matter
    }

    pub fn stack_depth(&self) -> usize {
        self.state_stack.len()
    }

    pub fn state_stack(&self) -> &[LexerState] {
        &self.state_stack
    }

    /// Switch the active state without touching the stack.
    pub fn switch_to(&mut self, next: LexerState) {
        if next != self.current_state {
            tracing::trace!(from = %self.current_state, to = %next, "lexer state transition");
        }
        self.current_state = next;
    }

    /// State a closed block hands control back to when nothing was pushed.
    pub fn block_return_state(&self) -> LexerState {
        if self.is_inside_front_matter {
            LexerState::FrontMatterBlock
        } else {
            LexerState::Initial
        }
    }

    /// Remember `return_to` and switch to `next`.
    pub fn push_state(&mut self, return_to: LexerState, next: LexerState) {
        self.state_stack.push(return_to);
        self.switch_to(next);
    }

    /// Restore the most recently pushed state, or the block return state when
    /// the stack is empty.
    pub fn pop_state(&mut self) -> LexerState {
        let next = self
            .state_stack
            .pop()
            .unwrap_or_else(|| self.block_return_state());
        self.switch_to(next);
        next
    }

    /// Open a brace block: remember `return_to` and enter function-declaration mode.
    pub fn enter_brace(&mut self, return_to: LexerState) {
        self.pattern_action_brace_level += 1;
        self.push_state(return_to, LexerState::FunctionDeclBlock);
    }

    /// Close a brace block and restore the state that opened it.
    pub fn leave_brace(&mut self) {
        self.pattern_action_brace_level = self.pattern_action_brace_level.saturating_sub(1);
        self.pop_state();
    }

    pub fn open_front_matter(&mut self) {
        self.is_inside_front_matter = true;
        self.switch_to(LexerState::FrontMatterBlock);
    }

    pub fn close_front_matter(&mut self) {
        self.is_inside_front_matter = false;
        self.has_front_matter = true;
        self.switch_to(LexerState::Initial);
    }

    pub fn open_code_fence(&mut self) {
        self.is_code_start = true;
        self.switch_to(LexerState::LangId);
    }

    pub fn close_code_fence(&mut self) {
        self.is_code_start = false;
        self.switch_to(LexerState::Initial);
    }
}
