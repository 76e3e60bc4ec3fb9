//! Front-matter compilation
//!
//! [`FrontMatterCompiler`] turns a header tree into typed values. [`plan`]
//! reads markdown task plans, both inside a header and on their own.

mod compiler;
mod error;
pub mod plan;

pub use compiler::{FrontMatterCompiler, QueryCompiler, RawQuery};
pub use error::CompileError;
pub use plan::{format_plan_to_markdown, parse_plan, PlanStep, TaskSection, TaskStatus};
