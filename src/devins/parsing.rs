//! Parse tree construction
//!
//! [`tree`] defines the generic node type, [`builder`] turns lexer tokens into
//! a document tree and [`lists`] groups indented lines into list nodes.

pub mod builder;
pub mod lists;
pub mod tree;

pub use builder::{build_document, build_front_matter, ParseDiagnostic, ParseOutput};
pub use tree::{NodeType, ParseNode};
