//! Expression compilation
//!
//! Every expression compiles to instructions that leave exactly one value on
//! the operand stack. Stores leave the assigned value in place, so an
//! assignment is itself an expression.

use crate::ast::*;
use crate::bytecode::Instruction;
use crate::compiler::{internal, Compiler};
use crate::diagnostic::Diagnostic;
use crate::value::Value;

impl<'a> Compiler<'a> {
    pub(super) fn compile_expr(&mut self, expr: &Expr) -> Result<(), Vec<Diagnostic>> {
        match expr {
            Expr::Literal(lit, line) => {
                let value = match lit {
                    Literal::Number(n) => Value::Number(*n),
                    Literal::Str(s) => Value::string(s.clone()),
                    Literal::Bool(b) => Value::Bool(*b),
                };
                self.bytecode.emit(Instruction::PushConst(value), *line);
                Ok(())
            }
            Expr::Ident(ident) => {
                let slot = self.slot_of(ident)?;
                self.emit_load(slot, ident.line);
                Ok(())
            }
            Expr::Assign {
                target,
                value,
                line,
            } => {
                self.compile_expr(value)?;
                let slot = self.slot_of(target)?;
                self.emit_store(slot, *line);
                Ok(())
            }
            Expr::Binary {
                op,
                left,
                right,
                line,
            } => {
                // Left first: the opcode pops right, then left
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                let instr = match op {
                    BinaryOp::Add => Instruction::Add,
                    BinaryOp::Sub => Instruction::Sub,
                    BinaryOp::Mul => Instruction::Mul,
                    BinaryOp::Div => Instruction::Div,
                    BinaryOp::Mod => Instruction::Mod,
                    BinaryOp::Eq => Instruction::Equal,
                    BinaryOp::Ne => Instruction::NotEqual,
                    BinaryOp::Lt => Instruction::Less,
                    BinaryOp::Le => Instruction::LessEqual,
                    BinaryOp::Gt => Instruction::Greater,
                    BinaryOp::Ge => Instruction::GreaterEqual,
                    BinaryOp::And => Instruction::And,
                    BinaryOp::Or => Instruction::Or,
                };
                self.bytecode.emit(instr, *line);
                Ok(())
            }
            Expr::Unary { op, expr, line } => {
                self.compile_expr(expr)?;
                let instr = match op {
                    UnaryOp::Negate => Instruction::Negate,
                    UnaryOp::Not => Instruction::Not,
                };
                self.bytecode.emit(instr, *line);
                Ok(())
            }
            Expr::Call(call) => self.compile_call(call),
        }
    }

    /// Arguments left-to-right, then call-site defaults for omitted trailing
    /// parameters, so `CALL` always carries the full parameter count
    fn compile_call(&mut self, call: &CallExpr) -> Result<(), Vec<Diagnostic>> {
        let decl_id = self
            .resolution
            .callee_of(call.callee.id)
            .ok_or_else(|| internal(format!("'{}' is not a function", call.callee.name), call.line))?;
        let func_id = *self
            .func_ids
            .get(&decl_id)
            .ok_or_else(|| internal("callee has no descriptor", call.line))?;
        let func = self.functions[func_id];

        if call.args.len() > func.params.len() {
            return Err(internal("more arguments than parameters", call.line));
        }
        for arg in &call.args {
            self.compile_expr(arg)?;
        }
        for param in &func.params[call.args.len()..] {
            match &param.default {
                Some(default) => self.compile_expr(default)?,
                None => {
                    return Err(internal(
                        format!("missing argument for parameter '{}'", param.name.name),
                        call.line,
                    ))
                }
            }
        }

        self.bytecode.emit(
            Instruction::Call {
                func: func_id,
                argc: func.params.len(),
            },
            call.line,
        );
        Ok(())
    }
}
