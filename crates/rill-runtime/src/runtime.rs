//! Pipeline driver
//!
//! Ties the phases together: lex, parse, resolve, type-check, compile, run.
//! Each phase must be clean before the next one starts; static errors abort
//! with the collected diagnostics and nothing downstream runs.

use crate::bytecode::Bytecode;
use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::typechecker::TypeChecker;
use crate::value::RuntimeError;
use crate::vm::VM;
use std::io::Write;
use thiserror::Error;

/// Failure of a full source-to-output run
#[derive(Debug, Error)]
pub enum ExecError {
    /// One or more static-phase diagnostics
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Compile(Vec<Diagnostic>),
    /// A runtime fault
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Compile source text to bytecode, running every static phase
pub fn compile_source(source: &str) -> Result<Bytecode, Vec<Diagnostic>> {
    let (tokens, diagnostics) = Lexer::tokenize(source);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    let (program, diagnostics) = Parser::parse(tokens);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    let resolution = Resolver::new().resolve(&program)?;
    TypeChecker::new().check(&program)?;
    Compiler::new(&resolution).compile(&program)
}

/// Run all static phases without executing
pub fn check_source(source: &str) -> Result<(), Vec<Diagnostic>> {
    compile_source(source).map(|_| ())
}

/// Compile and execute, writing `print` output to `out`
pub fn run_source(source: &str, out: &mut dyn Write) -> Result<(), ExecError> {
    let bytecode = compile_source(source).map_err(ExecError::Compile)?;
    VM::new(&bytecode, out).run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_source_produces_output() {
        let mut out = Vec::new();
        run_source("print 1 + 1;", &mut out).expect("runs");
        assert_eq!(String::from_utf8(out).expect("utf8"), "2\n");
    }

    #[test]
    fn static_errors_stop_before_execution() {
        let mut out = Vec::new();
        let err = run_source("print missing;", &mut out).expect_err("should fail");
        match err {
            ExecError::Compile(diags) => assert_eq!(diags[0].code, "RL2001"),
            ExecError::Runtime(_) => panic!("expected compile error"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn check_source_reports_type_errors() {
        let diags = check_source("let x: bool = 1;").expect_err("should fail");
        assert_eq!(diags[0].code, "RL3003");
    }
}
