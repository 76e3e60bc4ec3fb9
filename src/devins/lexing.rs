//! Lexer
//!
//! DevIns is context sensitive: the same character means different things in
//! free text, in the front-matter header, inside a brace block or inside a code
//! fence. Tokenization is therefore a hand-written state machine
//! ([`lexer::Lexer`]) driven by an explicit [`state::LexerContext`], with a
//! logos generated scanner for the fixed-spelling symbols, numbers and dates.
//!
//! The lexer never fails. Unknown input becomes `BAD_CHARACTER` tokens and the
//! stream always ends with `EOF`.

pub mod lexer;
pub(crate) mod scan;
pub mod state;

pub use lexer::{tokenize, Lexer};
pub use state::{LexerContext, LexerState};
