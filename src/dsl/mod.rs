//! Track language compiler — source → tokens → AST → checked AST → Program IR.

pub mod ast;
pub mod builtins;
pub mod checker;
pub mod error;
pub mod generate;
pub mod ir;
pub mod lexer;
pub mod note;
pub mod parser;
pub mod schema;
pub mod scope;
pub mod token;
pub mod types;

pub use ast::Program;
pub use builtins::Registry;
pub use error::{CompileError, CompileFailure, ErrorKind, InternalError, SourceRange};
pub use types::{Number, Type, Unit, Value};

use crate::config::CompileOptions;
use lexer::Lexer;
use parser::Parser;

/// The track language compiler.
///
/// Each call builds its own [`Registry`] and scope tables, so nothing is
/// shared between compiles.
pub struct Compiler;

impl Compiler {
    /// Parse source text into a Program AST.
    pub fn parse(source: &str) -> Result<Program, CompileError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens);
        let program = parser.parse()?;
        log::debug!("parsed {} statements", program.statements.len());
        Ok(program)
    }

    /// Parse and check source text, returning every diagnostic found.
    ///
    /// Lex and parse errors stop at the first one; an empty list means the
    /// program is safe to generate.
    pub fn check(source: &str) -> Vec<CompileError> {
        match Self::parse(source) {
            Ok(program) => checker::check(&program, &Registry::standard()),
            Err(err) => vec![err],
        }
    }

    /// Compile source text into the Program IR.
    ///
    /// Either every stage succeeds and the IR is returned, or the failure
    /// carries the diagnostics (or the internal error) and no IR.
    pub fn compile(
        source: &str,
        options: &CompileOptions,
    ) -> Result<ir::Program, CompileFailure> {
        let program = Self::parse(source)?;
        let registry = Registry::standard();

        let errors = checker::check(&program, &registry);
        if !errors.is_empty() {
            return Err(CompileFailure::Diagnostics(errors));
        }

        let ir = generate::generate(&program, &registry, options)?;
        Ok(ir)
    }
}
