//! Pipeline that runs every stage on one document
//!
//! source -> tokens -> document tree -> compiled front matter -> [`HobbitHole`]
//!
//! Lexing, tree building and compiling never fail; problems along the way are
//! kept as `BAD_CHARACTER` tokens, [`ParseDiagnostic`]s and `ERROR` values. The
//! only hard errors are I/O and, when asked for, a missing front matter.

use crate::devins::ast::FrontMatter;
use crate::devins::compiling::FrontMatterCompiler;
use crate::devins::hobbit_hole::HobbitHole;
use crate::devins::lexing::tokenize;
use crate::devins::parsing::{build_document, NodeType, ParseDiagnostic, ParseNode};
use crate::devins::token::Token;
use devins_config::{CompilerConfig, DevinsConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document has no front matter")]
    MissingFrontMatter,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub compiler: CompilerConfig,
    /// Fail instead of producing a default [`HobbitHole`] when the document
    /// has no header.
    pub require_front_matter: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig {
                detect_plan_lists: true,
                warn_unknown_nodes: true,
            },
            require_front_matter: false,
        }
    }
}

impl CompileOptions {
    pub fn from_config(config: &DevinsConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            ..Self::default()
        }
    }

    pub fn require_front_matter(mut self, required: bool) -> Self {
        self.require_front_matter = required;
        self
    }
}

/// Everything the pipeline produced for one document.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub tokens: Vec<Token>,
    pub document: ParseNode,
    pub diagnostics: Vec<ParseDiagnostic>,
    pub front_matter: FrontMatter,
    pub hobbit_hole: HobbitHole,
}

impl Compiled {
    /// The `FRONT_MATTER_HEADER` node, if any.
    pub fn header(&self) -> Option<&ParseNode> {
        self.document.child(NodeType::FrontMatterHeader)
    }

    /// Keys whose value failed to compile.
    pub fn error_keys(&self) -> Vec<&str> {
        self.front_matter
            .iter()
            .filter(|(_, value)| value.is_error())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Runs the stages with a configured compiler.
pub struct Pipeline {
    compiler: FrontMatterCompiler,
    require_front_matter: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&CompileOptions::default())
    }
}

impl Pipeline {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            compiler: FrontMatterCompiler::from_config(&options.compiler),
            require_front_matter: options.require_front_matter,
        }
    }

    /// Replace the compiler, e.g. to install a query compiler.
    pub fn with_compiler(mut self, compiler: FrontMatterCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn run(&self, source: &str) -> Result<Compiled, PipelineError> {
        let tokens = tokenize(source);
        tracing::debug!(count = tokens.len(), "tokenized");

        let output = build_document(source, &tokens);
        for diagnostic in &output.diagnostics {
            tracing::warn!(%diagnostic, "parse problem");
        }

        let front_matter = match output.front_matter() {
            Some(header) => self.compiler.compile(header),
            None if self.require_front_matter => return Err(PipelineError::MissingFrontMatter),
            None => {
                tracing::debug!("no front matter, using defaults");
                FrontMatter::new()
            }
        };
        let hobbit_hole = HobbitHole::from_front_matter(&front_matter);

        Ok(Compiled {
            tokens,
            document: output.document,
            diagnostics: output.diagnostics,
            front_matter,
            hobbit_hole,
        })
    }

    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<Compiled, PipelineError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.run(&source)
    }
}

pub fn compile_source(source: &str, options: &CompileOptions) -> Result<Compiled, PipelineError> {
    Pipeline::new(options).run(source)
}

pub fn compile_file(
    path: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<Compiled, PipelineError> {
    Pipeline::new(options).run_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devins::ast::{FrontMatterType, Statement};
    use crate::devins::compiling::QueryCompiler;
    use crate::devins::hobbit_hole::InteractionType;

    #[test]
    fn runs_every_stage() {
        let source = "---\nname: \"Summary\"\ninteraction: AppendCursor\n---\nSummarize $selection\n";
        let compiled = compile_source(source, &CompileOptions::default()).expect("compile");

        assert!(compiled.tokens.last().expect("eof").is(crate::devins::token::TokenType::Eof));
        assert!(compiled.header().is_some());
        assert!(compiled.diagnostics.is_empty());
        assert_eq!(compiled.hobbit_hole.name, "Summary");
        assert_eq!(compiled.hobbit_hole.interaction, InteractionType::AppendCursor);
    }

    #[test]
    fn document_without_header_gets_defaults() {
        let compiled = compile_source("just text", &CompileOptions::default()).expect("compile");
        assert!(compiled.front_matter.is_empty());
        assert_eq!(compiled.hobbit_hole, HobbitHole::default());
    }

    #[test]
    fn header_can_be_required() {
        let options = CompileOptions::default().require_front_matter(true);
        let err = compile_source("just text", &options).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFrontMatter));
    }

    #[test]
    fn bad_entry_is_listed_but_siblings_survive() {
        let source = "---\nname: ok\nwhen: $a ==\n---\n";
        let compiled = compile_source(source, &CompileOptions::default()).expect("compile");
        assert_eq!(compiled.error_keys(), vec!["when"]);
        assert_eq!(compiled.hobbit_hole.name, "ok");
        assert_eq!(
            compiled.hobbit_hole.when,
            Statement::value(FrontMatterType::Error("$a ==".into()))
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = compile_file("/nonexistent/devins.devin", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/devins.devin"));
    }

    #[test]
    fn custom_compiler_is_used() {
        struct Upper;
        impl QueryCompiler for Upper {
            fn compile_query(&self, query: &ParseNode) -> FrontMatterType {
                FrontMatterType::String(query.trimmed_text().to_uppercase())
            }
        }

        let pipeline = Pipeline::default()
            .with_compiler(FrontMatterCompiler::new().with_query_compiler(Upper));
        let compiled = pipeline
            .run("---\nq: {\n  from { PsiClass clazz }\n}\n---\n")
            .expect("compile");
        assert_eq!(
            compiled.front_matter["q"],
            FrontMatterType::String("FROM { PSICLASS CLAZZ }".into())
        );
    }
}
