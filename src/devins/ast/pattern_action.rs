//! Pattern actions: `/regex/ { func | func(args) | ... }`
//!
//! The body of a pattern action is a pipeline of built-in functions. Each call
//! is resolved by name into a [`PatternActionFunc`]; names that are not
//! built-ins become a [`PatternActionFunc::ToolchainFunction`] so that host
//! tooling can provide them. Calls with the wrong arity are dropped with a
//! warning.

use super::statement::CaseKeyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_LINE_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "func", rename_all = "camelCase")]
pub enum PatternActionFunc {
    Grep {
        patterns: Vec<String>,
    },
    Find {
        text: String,
    },
    Sed {
        pattern: String,
        replacements: String,
        is_regex: bool,
    },
    Sort {
        arguments: Vec<String>,
    },
    Uniq {
        texts: Vec<String>,
    },
    Head {
        number: usize,
    },
    Tail {
        number: usize,
    },
    Xargs {
        variables: Vec<String>,
    },
    Print {
        texts: Vec<String>,
    },
    Cat {
        paths: Vec<String>,
    },
    Execute {
        filename: String,
        variable_names: Vec<String>,
    },
    ApprovalExecute {
        filename: String,
        variable_names: Vec<String>,
    },
    Notify {
        message: String,
    },
    CaseMatch {
        key_values: Vec<CaseKeyValue>,
    },
    Crawl {
        urls: Vec<String>,
    },
    Capture {
        file_name: String,
        node_type: String,
    },
    Thread {
        file_name: String,
        variable_names: Vec<String>,
    },
    JsonPath {
        obj: Option<String>,
        path: String,
        sse_mode: bool,
    },
    Batch {
        file_name: String,
        inputs: Vec<String>,
        batch_size: usize,
    },
    Destroy,
    LineNo {
        text: String,
    },
    ToolchainFunction {
        func_name: String,
        args: Vec<String>,
    },
}

fn require(name: &str, args: &[String], min: usize) -> Option<()> {
    if args.len() < min {
        tracing::warn!(func = name, expected = min, found = args.len(), "pattern function called with too few arguments");
        return None;
    }
    Some(())
}

fn line_count(name: &str, args: &[String]) -> usize {
    match args.first() {
        None => DEFAULT_LINE_COUNT,
        Some(arg) => arg.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(func = name, arg = %arg, "line count is not a number, using default");
            DEFAULT_LINE_COUNT
        }),
    }
}

fn split_first(args: Vec<String>) -> (String, Vec<String>) {
    let mut iter = args.into_iter();
    let first = iter.next().unwrap_or_default();
    (first, iter.collect())
}

impl PatternActionFunc {
    /// Resolve a pipeline call by name. Returns `None` when the arguments do
    /// not satisfy the function's arity.
    pub fn from_call(func_name: &str, args: Vec<String>) -> Option<Self> {
        let func = match func_name {
            "grep" => {
                require(func_name, &args, 1)?;
                PatternActionFunc::Grep { patterns: args }
            }
            "find" => {
                require(func_name, &args, 1)?;
                PatternActionFunc::Find {
                    text: split_first(args).0,
                }
            }
            "sed" => {
                require(func_name, &args, 2)?;
                let mut iter = args.into_iter();
                let pattern = iter.next().unwrap_or_default();
                let replacements = iter.next().unwrap_or_default();
                let is_regex = pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/');
                PatternActionFunc::Sed {
                    pattern,
                    replacements,
                    is_regex,
                }
            }
            "sort" => PatternActionFunc::Sort { arguments: args },
            "uniq" => PatternActionFunc::Uniq { texts: args },
            "head" => PatternActionFunc::Head {
                number: line_count(func_name, &args),
            },
            "tail" => PatternActionFunc::Tail {
                number: line_count(func_name, &args),
            },
            "xargs" => PatternActionFunc::Xargs { variables: args },
            "print" => PatternActionFunc::Print { texts: args },
            "cat" => PatternActionFunc::Cat { paths: args },
            "execute" => {
                let (filename, variable_names) = split_first(args);
                PatternActionFunc::Execute {
                    filename,
                    variable_names,
                }
            }
            "approvalExecute" => {
                let (filename, variable_names) = split_first(args);
                PatternActionFunc::ApprovalExecute {
                    filename,
                    variable_names,
                }
            }
            "notify" => PatternActionFunc::Notify {
                message: split_first(args).0,
            },
            "crawl" => PatternActionFunc::Crawl {
                urls: args.into_iter().filter(|u| !u.trim().is_empty()).collect(),
            },
            "capture" => {
                require(func_name, &args, 2)?;
                let mut iter = args.into_iter();
                PatternActionFunc::Capture {
                    file_name: iter.next().unwrap_or_default(),
                    node_type: iter.next().unwrap_or_default(),
                }
            }
            "thread" => {
                require(func_name, &args, 1)?;
                let (file_name, variable_names) = split_first(args);
                PatternActionFunc::Thread {
                    file_name,
                    variable_names,
                }
            }
            "jsonpath" => {
                require(func_name, &args, 1)?;
                let mut iter = args.into_iter();
                let first = iter.next().unwrap_or_default();
                match iter.next() {
                    None => PatternActionFunc::JsonPath {
                        obj: None,
                        path: first,
                        sse_mode: false,
                    },
                    Some(flag) if flag == "true" => PatternActionFunc::JsonPath {
                        obj: None,
                        path: first,
                        sse_mode: true,
                    },
                    Some(path) => PatternActionFunc::JsonPath {
                        obj: Some(first),
                        path,
                        sse_mode: false,
                    },
                }
            }
            "batch" => {
                require(func_name, &args, 1)?;
                let (file_name, inputs) = split_first(args);
                PatternActionFunc::Batch {
                    file_name,
                    inputs,
                    batch_size: 1,
                }
            }
            "destroy" => PatternActionFunc::Destroy,
            "lineNo" => {
                require(func_name, &args, 1)?;
                PatternActionFunc::LineNo {
                    text: split_first(args).0,
                }
            }
            _ => PatternActionFunc::ToolchainFunction {
                func_name: func_name.to_string(),
                args,
            },
        };
        Some(func)
    }

    pub fn func_name(&self) -> &str {
        match self {
            PatternActionFunc::Grep { .. } => "grep",
            PatternActionFunc::Find { .. } => "find",
            PatternActionFunc::Sed { .. } => "sed",
            PatternActionFunc::Sort { .. } => "sort",
            PatternActionFunc::Uniq { .. } => "uniq",
            PatternActionFunc::Head { .. } => "head",
            PatternActionFunc::Tail { .. } => "tail",
            PatternActionFunc::Xargs { .. } => "xargs",
            PatternActionFunc::Print { .. } => "print",
            PatternActionFunc::Cat { .. } => "cat",
            PatternActionFunc::Execute { .. } => "execute",
            PatternActionFunc::ApprovalExecute { .. } => "approvalExecute",
            PatternActionFunc::Notify { .. } => "notify",
            PatternActionFunc::CaseMatch { .. } => "switch",
            PatternActionFunc::Crawl { .. } => "crawl",
            PatternActionFunc::Capture { .. } => "capture",
            PatternActionFunc::Thread { .. } => "thread",
            PatternActionFunc::JsonPath { .. } => "jsonpath",
            PatternActionFunc::Batch { .. } => "batch",
            PatternActionFunc::Destroy => "destroy",
            PatternActionFunc::LineNo { .. } => "lineNo",
            PatternActionFunc::ToolchainFunction { func_name, .. } => func_name,
        }
    }
}

impl fmt::Display for PatternActionFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternActionFunc::CaseMatch { key_values } => {
                f.write_str("case { ")?;
                for kv in key_values {
                    write!(f, "{} ", kv)?;
                }
                f.write_str("}")
            }
            PatternActionFunc::Destroy => f.write_str("destroy"),
            PatternActionFunc::Head { number } | PatternActionFunc::Tail { number } => {
                write!(f, "{}({})", self.func_name(), number)
            }
            other => f.write_str(other.func_name()),
        }
    }
}

/// Pattern text (with its `/` delimiters) and the pipeline applied to matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAction {
    pub pattern: String,
    pub processors: Vec<PatternActionFunc>,
}

impl PatternAction {
    pub fn new(pattern: impl Into<String>, processors: Vec<PatternActionFunc>) -> Self {
        Self {
            pattern: pattern.into(),
            processors,
        }
    }

    /// Pattern text without the surrounding slashes.
    pub fn regex(&self) -> &str {
        let trimmed = self.pattern.strip_prefix('/').unwrap_or(&self.pattern);
        trimmed.strip_suffix('/').unwrap_or(trimmed)
    }
}

impl fmt::Display for PatternAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.pattern)?;
        for (i, func) in self.processors.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", func)?;
        }
        f.write_str(" }")
    }
}
