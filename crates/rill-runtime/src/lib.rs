//! Rill Runtime - Core language implementation
//!
//! This library provides the complete Rill language toolchain:
//! - Lexical analysis and parsing
//! - Scope resolution (lexical addressing) and type checking
//! - Bytecode compilation
//! - Stack-based virtual machine execution

/// Rill runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod runtime;
pub mod token;
pub mod typechecker;
pub mod types;
pub mod value;
pub mod vm;

// Re-export commonly used types
pub use bytecode::{disasm::disassemble, Bytecode, FunctionInfo, Instruction};
pub use compiler::Compiler;
pub use diagnostic::{Diagnostic, DiagnosticLevel};
pub use lexer::Lexer;
pub use parser::Parser;
pub use resolver::{Resolution, Resolver, ScopeTable, SlotRef};
pub use runtime::{check_source, compile_source, run_source, ExecError};
pub use token::{Token, TokenKind};
pub use typechecker::TypeChecker;
pub use types::Type;
pub use value::{RuntimeError, Value};
pub use vm::VM;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        // Smoke test to verify the crate builds and tests run
        assert_eq!(VERSION, "0.1.0");
    }
}
