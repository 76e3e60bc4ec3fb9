//! Main module for DevIns library functionality

pub mod ast;
pub mod compiling;
pub mod formats;
pub mod hobbit_hole;
pub mod lexing;
pub mod parsing;
pub mod pipeline;
pub mod token;
