//! # devins
//!
//! Lexer and front-matter compiler for DevIns templates.
//!
//! A DevIns document is free text with `@agent`, `/command:prop` and
//! `$variable` markers, fenced code blocks and an optional `---` delimited
//! front matter at the top. The header configures how a template runs: when
//! it is offered, what it does with the selection, which hooks fire while the
//! model streams.
//!
//! ```text
//! ---
//! name: "Summarize"
//! when: $selection.length >= 1
//! variables:
//!   "files": /.*\.rs/ { cat | grep("fn ") }
//! ---
//! Summarize $selection
//! ```
//!
//! [`pipeline::compile_source`] runs every stage: [`lexing`] turns source into
//! tokens, [`parsing`] builds a tree, [`compiling`] turns the header into
//! typed [`ast`] values and [`hobbit_hole`] reads the well-known keys.

pub mod devins;

pub use devins::ast::{FrontMatter, FrontMatterType, Statement};
pub use devins::hobbit_hole::HobbitHole;
pub use devins::lexing::tokenize;
pub use devins::pipeline::{compile_file, compile_source, CompileOptions, Compiled, PipelineError};
pub use devins::token::{Token, TokenType};
