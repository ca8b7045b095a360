//! Scope resolution
//!
//! Walks the AST once in evaluation order and assigns every identifier
//! occurrence a lexical address. Results go into a [`Resolution`] side table
//! keyed by `NodeId`; the AST itself is never mutated. Duplicate
//! declarations (innermost scope only) and undeclared references are
//! reported as diagnostics, and any error aborts the pipeline before code
//! generation.

mod scope;

pub use scope::{BindingKind, ScopeTable, SlotRef};

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use std::collections::HashMap;

/// Output of the resolution pass, consumed by the compiler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Lexical address of every identifier occurrence (uses and declarations)
    slots: HashMap<NodeId, SlotRef>,
    /// For identifier uses that name a function: the function's declaring
    /// NodeId
    callees: HashMap<NodeId, NodeId>,
    /// Local slot count per function declaration (parameters included)
    function_locals: HashMap<NodeId, usize>,
    /// Number of global slots the program needs
    global_slots: usize,
}

impl Resolution {
    pub fn slot_of(&self, id: NodeId) -> Option<SlotRef> {
        self.slots.get(&id).copied()
    }

    /// The function declaration a callee identifier resolved to
    pub fn callee_of(&self, id: NodeId) -> Option<NodeId> {
        self.callees.get(&id).copied()
    }

    pub fn locals_of(&self, func_decl: NodeId) -> Option<usize> {
        self.function_locals.get(&func_decl).copied()
    }

    pub fn global_slots(&self) -> usize {
        self.global_slots
    }
}

pub struct Resolver {
    table: ScopeTable,
    resolution: Resolution,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            table: ScopeTable::new(),
            resolution: Resolution::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Resolve a whole program. Errors abort the pipeline: on failure no
    /// partial resolution is exposed.
    pub fn resolve(mut self, program: &Program) -> Result<Resolution, Vec<Diagnostic>> {
        for decl in &program.decls {
            self.resolve_decl(decl);
        }
        self.resolution.global_slots = self.table.global_watermark();
        if self.diagnostics.is_empty() {
            Ok(self.resolution)
        } else {
            Err(self.diagnostics)
        }
    }

    fn resolve_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(var) => self.resolve_var_decl(var),
            Decl::Function(func) => self.resolve_function_decl(func),
            Decl::Stmt(stmt) => self.resolve_stmt(stmt),
        }
    }

    fn resolve_var_decl(&mut self, var: &VarDecl) {
        // Initializer first: the variable is not in scope inside it
        self.resolve_expr(&var.init);
        self.declare(&var.name, BindingKind::Variable);
    }

    fn resolve_function_decl(&mut self, func: &FunctionDecl) {
        // The name lives in the enclosing scope, declared before the frame
        // is entered, so the function can call itself
        self.declare(&func.name, BindingKind::Function);

        // Default-value expressions are compiled at call sites, so they
        // resolve in the enclosing (global) scope, not the function frame
        for param in &func.params {
            if let Some(default) = &param.default {
                self.resolve_expr(default);
            }
        }

        let checkpoint = self.table.enter_function();
        for param in &func.params {
            self.declare(&param.name, BindingKind::Variable);
        }
        self.resolve_block(&func.body);
        let local_slots = self.table.exit_function(checkpoint);
        self.resolution
            .function_locals
            .insert(func.name.id, local_slots);
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Print(expr, _) | Stmt::Expr(expr, _) => self.resolve_expr(expr),
            Stmt::Block(block) => {
                self.table.enter_scope();
                self.resolve_block(block);
                self.table.exit_scope();
            }
            Stmt::If(if_stmt) => {
                self.resolve_expr(&if_stmt.cond);
                self.table.enter_scope();
                self.resolve_block(&if_stmt.then_block);
                self.table.exit_scope();
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.resolve_expr(&while_stmt.cond);
                self.table.enter_scope();
                self.resolve_block(&while_stmt.body);
                self.table.exit_scope();
            }
            Stmt::For(for_stmt) => {
                // The loop variable lives in a scope wrapping the whole loop
                self.table.enter_scope();
                self.resolve_var_decl(&for_stmt.init);
                self.resolve_expr(&for_stmt.cond);
                self.table.enter_scope();
                self.resolve_block(&for_stmt.body);
                self.table.exit_scope();
                self.resolve_expr(&for_stmt.step);
                self.table.exit_scope();
            }
            Stmt::Return(value, _) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn resolve_block(&mut self, block: &Block) {
        for decl in &block.decls {
            self.resolve_decl(decl);
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_, _) => {}
            Expr::Ident(ident) => self.resolve_use(ident),
            Expr::Assign { target, value, .. } => {
                // Evaluation order: right-hand side first
                self.resolve_expr(value);
                self.resolve_use(target);
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { expr, .. } => self.resolve_expr(expr),
            Expr::Call(call) => {
                self.resolve_use(&call.callee);
                for arg in &call.args {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    fn declare(&mut self, ident: &Ident, kind: BindingKind) {
        match self.table.declare(&ident.name, ident.id, kind) {
            Ok(slot) => {
                self.resolution.slots.insert(ident.id, slot);
            }
            Err(_previous) => {
                self.diagnostics.push(
                    Diagnostic::error_with_code(
                        "RL2002",
                        format!("'{}' is already declared in this scope", ident.name),
                        ident.line,
                    )
                    .with_help("shadowing is allowed in a nested scope, but not a redeclaration"),
                );
            }
        }
    }

    fn resolve_use(&mut self, ident: &Ident) {
        match self.table.resolve(&ident.name) {
            Some((slot, decl, kind)) => {
                self.resolution.slots.insert(ident.id, slot);
                if kind == BindingKind::Function {
                    self.resolution.callees.insert(ident.id, decl);
                }
            }
            None => {
                self.diagnostics.push(Diagnostic::error_with_code(
                    "RL2001",
                    format!("'{}' is not declared", ident.name),
                    ident.line,
                ));
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        let (tokens, diags) = Lexer::tokenize(source);
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let (program, diags) = Parser::parse(tokens);
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        program
    }

    fn resolve(source: &str) -> Resolution {
        Resolver::new()
            .resolve(&parse(source))
            .expect("resolution should succeed")
    }

    fn resolve_err(source: &str) -> Vec<Diagnostic> {
        Resolver::new()
            .resolve(&parse(source))
            .expect_err("resolution should fail")
    }

    #[test]
    fn undeclared_identifier_is_rl2001() {
        let diags = resolve_err("print missing;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "RL2001");
        assert_eq!(diags[0].line, 1);
    }

    #[test]
    fn duplicate_in_same_scope_is_rl2002() {
        let diags = resolve_err("let x = 1; let x = 2;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "RL2002");
    }

    #[test]
    fn shadowing_in_nested_scope_is_allowed() {
        resolve("let x = 1; { let x = 2; print x; } print x;");
    }

    #[test]
    fn variable_not_visible_in_own_initializer() {
        let diags = resolve_err("let x = x + 1;");
        assert_eq!(diags[0].code, "RL2001");
    }

    #[test]
    fn function_can_call_itself() {
        resolve("fn f(n: number) -> number { return f(n); } ");
    }

    #[test]
    fn function_locals_count_params_and_body_vars() {
        let program = parse("fn f(a: number, b: number) { let c = a + b; print c; }");
        let resolution = Resolver::new().resolve(&program).expect("resolves");
        let Decl::Function(func) = &program.decls[0] else {
            panic!()
        };
        assert_eq!(resolution.locals_of(func.name.id), Some(3));
    }

    #[test]
    fn globals_counted_across_block_reuse() {
        let resolution = resolve("let a = 1; { let b = 2; print b; } { let c = 3; print c; }");
        // b and c reuse slot 1
        assert_eq!(resolution.global_slots(), 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let program = parse("let x = 1; fn f(a: number) -> number { return a + x; } print f(2);");
        let first = Resolver::new().resolve(&program).expect("resolves");
        let second = Resolver::new().resolve(&program).expect("resolves");
        assert_eq!(first, second);
    }

    #[test]
    fn all_errors_reported_in_one_pass() {
        let diags = resolve_err("print a; print b;");
        assert_eq!(diags.len(), 2);
    }
}
