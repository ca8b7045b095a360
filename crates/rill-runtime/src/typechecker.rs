//! Structural type checking
//!
//! A scoped name-to-type walk over the AST, run after resolution. The
//! compiler and VM assume a type-correct program: operator operand types,
//! conditions, call signatures (including default parameters), return types,
//! and loop-control placement are all validated here.

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::types::{FunctionType, Type};
use std::collections::HashMap;

pub struct TypeChecker {
    scopes: Vec<HashMap<String, Type>>,
    diagnostics: Vec<Diagnostic>,
    /// Declared return type while inside a function body
    current_return: Option<Type>,
    loop_depth: usize,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            diagnostics: Vec::new(),
            current_return: None,
            loop_depth: 0,
        }
    }

    pub fn check(mut self, program: &Program) -> Result<(), Vec<Diagnostic>> {
        for decl in &program.decls {
            self.check_decl(decl);
        }
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(self.diagnostics)
        }
    }

    fn check_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(var) => self.check_var_decl(var),
            Decl::Function(func) => self.check_function_decl(func),
            Decl::Stmt(stmt) => self.check_stmt(stmt),
        }
    }

    fn check_var_decl(&mut self, var: &VarDecl) {
        let init_ty = self.check_expr(&var.init);
        let declared = match var.ty {
            Some(annotation) => {
                let annotated = Type::from_ref(annotation);
                if !annotated.compatible(&init_ty) {
                    self.error(
                        "RL3003",
                        format!(
                            "cannot initialize '{}' of type {} with a value of type {}",
                            var.name.name, annotated, init_ty
                        ),
                        var.line,
                    );
                }
                annotated
            }
            None => {
                if init_ty == Type::Unit {
                    self.error(
                        "RL3002",
                        format!("'{}' cannot hold a unit value", var.name.name),
                        var.line,
                    );
                    Type::Unknown
                } else {
                    init_ty
                }
            }
        };
        self.define(&var.name.name, declared);
    }

    fn check_function_decl(&mut self, func: &FunctionDecl) {
        let ret = func
            .return_ty
            .map(Type::from_ref)
            .unwrap_or(Type::Unit);

        let mut params = Vec::new();
        let mut required = 0;
        let mut seen_default = false;
        for param in &func.params {
            if param.default.is_some() {
                seen_default = true;
            } else {
                if seen_default {
                    self.error(
                        "RL3010",
                        format!(
                            "parameter '{}' without a default follows a defaulted parameter",
                            param.name.name
                        ),
                        param.name.line,
                    );
                }
                required += 1;
            }
            params.push(Type::from_ref(param.ty));
        }

        let signature = Type::Function(Box::new(FunctionType {
            params: params.clone(),
            required,
            ret: ret.clone(),
        }));
        // Visible before the defaults and the body are checked, matching
        // where the resolver declares the name; recursion typechecks, and a
        // default may reference the declaring function itself
        self.define(&func.name.name, signature);

        // Defaults are evaluated at call sites, in the enclosing scope;
        // check them before entering the function scope
        for param in &func.params {
            if let Some(default) = &param.default {
                let param_ty = Type::from_ref(param.ty);
                let default_ty = self.check_expr(default);
                if !param_ty.compatible(&default_ty) {
                    self.error(
                        "RL3003",
                        format!(
                            "default value for '{}' has type {}, expected {}",
                            param.name.name, default_ty, param_ty
                        ),
                        param.name.line,
                    );
                }
            }
        }

        let saved_return = self.current_return.replace(ret);
        let saved_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.scopes.push(HashMap::new());
        for (param, ty) in func.params.iter().zip(params) {
            self.define(&param.name.name, ty);
        }
        self.check_block(&func.body);
        self.scopes.pop();
        self.loop_depth = saved_depth;
        self.current_return = saved_return;
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Print(expr, _) => {
                // Any printable value is fine, including unit
                self.check_expr(expr);
            }
            Stmt::Expr(expr, _) => {
                self.check_expr(expr);
            }
            Stmt::Block(block) => {
                self.scopes.push(HashMap::new());
                self.check_block(block);
                self.scopes.pop();
            }
            Stmt::If(if_stmt) => {
                self.check_condition(&if_stmt.cond, if_stmt.line);
                self.scopes.push(HashMap::new());
                self.check_block(&if_stmt.then_block);
                self.scopes.pop();
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.check_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.check_condition(&while_stmt.cond, while_stmt.line);
                self.loop_depth += 1;
                self.scopes.push(HashMap::new());
                self.check_block(&while_stmt.body);
                self.scopes.pop();
                self.loop_depth -= 1;
            }
            Stmt::For(for_stmt) => {
                self.scopes.push(HashMap::new());
                self.check_var_decl(&for_stmt.init);
                self.check_condition(&for_stmt.cond, for_stmt.line);
                self.loop_depth += 1;
                self.scopes.push(HashMap::new());
                self.check_block(&for_stmt.body);
                self.scopes.pop();
                self.loop_depth -= 1;
                self.check_expr(&for_stmt.step);
                self.scopes.pop();
            }
            Stmt::Return(value, line) => {
                let value_ty = match value {
                    Some(expr) => self.check_expr(expr),
                    None => Type::Unit,
                };
                match self.current_return.clone() {
                    Some(expected) => {
                        if !expected.compatible(&value_ty) {
                            self.error(
                                "RL3007",
                                format!("return type mismatch: expected {}, found {}", expected, value_ty),
                                *line,
                            );
                        }
                    }
                    None => {
                        self.error("RL3008", "'return' outside of a function", *line);
                    }
                }
            }
            Stmt::Break(line) => {
                if self.loop_depth == 0 {
                    self.error("RL3009", "'break' outside of a loop", *line);
                }
            }
            Stmt::Continue(line) => {
                if self.loop_depth == 0 {
                    self.error("RL3009", "'continue' outside of a loop", *line);
                }
            }
        }
    }

    fn check_block(&mut self, block: &Block) {
        for decl in &block.decls {
            self.check_decl(decl);
        }
    }

    fn check_condition(&mut self, cond: &Expr, line: u32) {
        let ty = self.check_expr(cond);
        if !ty.compatible(&Type::Bool) {
            self.error(
                "RL3004",
                format!("condition must be bool, found {}", ty),
                line,
            );
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Literal(lit, _) => match lit {
                Literal::Number(_) => Type::Number,
                Literal::Str(_) => Type::String,
                Literal::Bool(_) => Type::Bool,
            },
            Expr::Ident(ident) => self.lookup(ident),
            Expr::Assign {
                target,
                value,
                line,
            } => {
                let value_ty = self.check_expr(value);
                let target_ty = self.lookup(target);
                if matches!(target_ty, Type::Function(_)) {
                    self.error(
                        "RL3005",
                        format!("cannot assign to function '{}'", target.name),
                        *line,
                    );
                    return Type::Unknown;
                }
                if !target_ty.compatible(&value_ty) {
                    self.error(
                        "RL3003",
                        format!(
                            "cannot assign value of type {} to '{}' of type {}",
                            value_ty, target.name, target_ty
                        ),
                        *line,
                    );
                }
                target_ty
            }
            Expr::Binary {
                op,
                left,
                right,
                line,
            } => self.check_binary(*op, left, right, *line),
            Expr::Unary { op, expr, line } => {
                let ty = self.check_expr(expr);
                let expected = match op {
                    UnaryOp::Negate => Type::Number,
                    UnaryOp::Not => Type::Bool,
                };
                if !ty.compatible(&expected) {
                    self.error(
                        "RL3001",
                        format!("unary operator expects {}, found {}", expected, ty),
                        *line,
                    );
                }
                expected
            }
            Expr::Call(call) => self.check_call(call),
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, line: u32) -> Type {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);
        match op {
            BinaryOp::Add => {
                // Numeric addition or string concatenation
                if lt.compatible(&Type::Number) && rt.compatible(&Type::Number) {
                    Type::Number
                } else if lt.compatible(&Type::String) && rt.compatible(&Type::String) {
                    Type::String
                } else {
                    self.error(
                        "RL3001",
                        format!("'+' expects two numbers or two strings, found {} and {}", lt, rt),
                        line,
                    );
                    Type::Unknown
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.expect_operands(&lt, &rt, Type::Number, op_symbol(op), line);
                Type::Number
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.expect_operands(&lt, &rt, Type::Number, op_symbol(op), line);
                Type::Bool
            }
            BinaryOp::And | BinaryOp::Or => {
                self.expect_operands(&lt, &rt, Type::Bool, op_symbol(op), line);
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !lt.compatible(&rt) {
                    self.error(
                        "RL3001",
                        format!("cannot compare {} with {}", lt, rt),
                        line,
                    );
                }
                Type::Bool
            }
        }
    }

    fn check_call(&mut self, call: &CallExpr) -> Type {
        let callee_ty = self.lookup(&call.callee);
        let func = match callee_ty {
            Type::Function(func) => func,
            Type::Unknown => return Type::Unknown,
            other => {
                self.error(
                    "RL3005",
                    format!("'{}' has type {} and is not callable", call.callee.name, other),
                    call.line,
                );
                return Type::Unknown;
            }
        };
        if call.args.len() > func.params.len() || call.args.len() < func.required {
            let expected = if func.required == func.params.len() {
                format!("{}", func.required)
            } else {
                format!("{} to {}", func.required, func.params.len())
            };
            self.error(
                "RL3006",
                format!(
                    "'{}' expects {} argument(s), found {}",
                    call.callee.name,
                    expected,
                    call.args.len()
                ),
                call.line,
            );
        }
        for (arg, param_ty) in call.args.iter().zip(&func.params) {
            let arg_ty = self.check_expr(arg);
            if !param_ty.compatible(&arg_ty) {
                self.error(
                    "RL3003",
                    format!("argument has type {}, expected {}", arg_ty, param_ty),
                    arg.line(),
                );
            }
        }
        // Still visit surplus arguments so their own errors surface
        for arg in call.args.iter().skip(func.params.len()) {
            self.check_expr(arg);
        }
        func.ret
    }

    fn lookup(&mut self, ident: &Ident) -> Type {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(&ident.name) {
                return ty.clone();
            }
        }
        // The resolver runs first and reports undeclared names; reaching
        // this means the two passes disagree about scoping
        self.error(
            "RL9001",
            format!("internal: '{}' missing from type environment", ident.name),
            ident.line,
        );
        Type::Unknown
    }

    fn define(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn error(&mut self, code: &str, message: impl Into<String>, line: u32) {
        self.diagnostics
            .push(Diagnostic::error_with_code(code, message, line));
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

impl TypeChecker {
    fn expect_operands(&mut self, lt: &Type, rt: &Type, expected: Type, op: &str, line: u32) {
        if !lt.compatible(&expected) || !rt.compatible(&expected) {
            self.error(
                "RL3001",
                format!("'{}' expects {} operands, found {} and {}", op, expected, lt, rt),
                line,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn check(source: &str) -> Result<(), Vec<Diagnostic>> {
        let (tokens, diags) = Lexer::tokenize(source);
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let (program, diags) = Parser::parse(tokens);
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        TypeChecker::new().check(&program)
    }

    fn first_code(source: &str) -> String {
        check(source).expect_err("expected a type error")[0].code.clone()
    }

    #[test]
    fn well_typed_program_passes() {
        check(
            "let x: number = 1;\n\
             fn add(a: number, b: number = 2) -> number { return a + b; }\n\
             if (add(x) > 2) { print \"big\"; } else { print \"small\"; }",
        )
        .expect("should typecheck");
    }

    #[test]
    fn plus_rejects_mixed_operands() {
        assert_eq!(first_code("print 1 + \"a\";"), "RL3001");
    }

    #[test]
    fn string_concatenation_is_allowed() {
        check("print \"a\" + \"b\";").expect("should typecheck");
    }

    #[test]
    fn condition_must_be_bool() {
        assert_eq!(first_code("if (1) { }"), "RL3004");
    }

    #[test]
    fn annotation_mismatch_rejected() {
        assert_eq!(first_code("let x: bool = 1;"), "RL3003");
    }

    #[test]
    fn call_arity_respects_defaults() {
        check("fn f(a: number, b: number = 1) -> number { return a + b; } print f(1);")
            .expect("omitting defaulted arg is fine");
        assert_eq!(
            first_code("fn f(a: number, b: number = 1) -> number { return a + b; } print f();"),
            "RL3006"
        );
    }

    #[test]
    fn default_may_reference_the_declaring_function() {
        check("fn f(a: number, b: number = f(1, 2)) -> number { return a + b; } print f(3);")
            .expect("should typecheck");
    }

    #[test]
    fn non_trailing_default_rejected() {
        assert_eq!(
            first_code("fn f(a: number = 1, b: number) -> number { return a + b; }"),
            "RL3010"
        );
    }

    #[test]
    fn calling_a_variable_rejected() {
        assert_eq!(first_code("let x = 1; print x();"), "RL3005");
    }

    #[test]
    fn return_type_checked() {
        assert_eq!(
            first_code("fn f() -> number { return true; }"),
            "RL3007"
        );
    }

    #[test]
    fn return_outside_function_rejected() {
        assert_eq!(first_code("return 1;"), "RL3008");
    }

    #[test]
    fn break_outside_loop_rejected() {
        assert_eq!(first_code("break;"), "RL3009");
    }

    #[test]
    fn assignment_to_function_rejected() {
        assert_eq!(first_code("fn f() { } f = 1;"), "RL3005");
    }
}
