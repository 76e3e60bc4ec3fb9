//! Typed model of compiled front matter
//!
//! [`FrontMatterType`] is the value of one header entry, [`Statement`] the
//! expression language nested inside it. Both are closed sum types matched
//! exhaustively by consumers.

pub mod front_matter;
pub mod pattern_action;
pub mod statement;

pub use front_matter::{FrontMatter, FrontMatterType};
pub use pattern_action::{PatternAction, PatternActionFunc};
pub use statement::{CaseKeyValue, ForeignFunctionStmt, Operator, OperatorType, Statement};
