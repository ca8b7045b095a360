//! Statement compilation
//!
//! Every statement compiles to instructions with zero net stack effect:
//! values produced by inner expressions are consumed by `POP`, `PRINT`, or a
//! store-then-pop pair.

use crate::ast::*;
use crate::bytecode::{Instruction, PATCH_PLACEHOLDER};
use crate::compiler::{internal, Compiler, LoopContext};
use crate::diagnostic::Diagnostic;
use crate::value::Value;

impl<'a> Compiler<'a> {
    pub(super) fn compile_decl(&mut self, decl: &Decl) -> Result<(), Vec<Diagnostic>> {
        match decl {
            Decl::Var(var) => self.compile_var_decl(var),
            // The declaration site emits nothing; the descriptor was
            // reserved up front and the body is compiled after top level
            Decl::Function(_) => Ok(()),
            Decl::Stmt(stmt) => self.compile_stmt(stmt),
        }
    }

    fn compile_var_decl(&mut self, var: &VarDecl) -> Result<(), Vec<Diagnostic>> {
        self.compile_expr(&var.init)?;
        let slot = self.slot_of(&var.name)?;
        self.emit_store(slot, var.line);
        self.bytecode.emit(Instruction::Pop, var.line);
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), Vec<Diagnostic>> {
        match stmt {
            Stmt::Print(expr, line) => {
                self.compile_expr(expr)?;
                self.bytecode.emit(Instruction::Print, *line);
                Ok(())
            }
            Stmt::Expr(expr, line) => {
                self.compile_expr(expr)?;
                self.bytecode.emit(Instruction::Pop, *line);
                Ok(())
            }
            Stmt::Block(block) => self.compile_block(block),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::While(while_stmt) => self.compile_while(while_stmt),
            Stmt::For(for_stmt) => self.compile_for(for_stmt),
            Stmt::Return(value, line) => {
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => {
                        self.bytecode.emit(Instruction::PushConst(Value::Null), *line);
                    }
                }
                self.bytecode.emit(Instruction::Return, *line);
                Ok(())
            }
            Stmt::Break(line) => {
                let jump = self
                    .bytecode
                    .emit(Instruction::Jump(PATCH_PLACEHOLDER), *line);
                match self.loops.last_mut() {
                    Some(ctx) => {
                        ctx.break_jumps.push(jump);
                        Ok(())
                    }
                    None => Err(internal("'break' outside of a loop", *line)),
                }
            }
            Stmt::Continue(line) => {
                let jump = self
                    .bytecode
                    .emit(Instruction::Jump(PATCH_PLACEHOLDER), *line);
                match self.loops.last_mut() {
                    Some(ctx) => {
                        ctx.continue_jumps.push(jump);
                        Ok(())
                    }
                    None => Err(internal("'continue' outside of a loop", *line)),
                }
            }
        }
    }

    pub(super) fn compile_block(&mut self, block: &Block) -> Result<(), Vec<Diagnostic>> {
        for decl in &block.decls {
            self.compile_decl(decl)?;
        }
        Ok(())
    }

    fn compile_if(&mut self, if_stmt: &IfStmt) -> Result<(), Vec<Diagnostic>> {
        self.compile_expr(&if_stmt.cond)?;
        let skip_then = self
            .bytecode
            .emit(Instruction::JumpIfFalse(PATCH_PLACEHOLDER), if_stmt.line);
        self.compile_block(&if_stmt.then_block)?;

        match &if_stmt.else_branch {
            Some(else_branch) => {
                let skip_else = self
                    .bytecode
                    .emit(Instruction::Jump(PATCH_PLACEHOLDER), if_stmt.line);
                let else_start = self.bytecode.current_offset();
                self.patch_jump(skip_then, else_start, if_stmt.line)?;
                self.compile_stmt(else_branch)?;
                let end = self.bytecode.current_offset();
                self.patch_jump(skip_else, end, if_stmt.line)?;
            }
            None => {
                let end = self.bytecode.current_offset();
                self.patch_jump(skip_then, end, if_stmt.line)?;
            }
        }
        Ok(())
    }

    fn compile_while(&mut self, while_stmt: &WhileStmt) -> Result<(), Vec<Diagnostic>> {
        let loop_start = self.bytecode.current_offset();
        self.compile_expr(&while_stmt.cond)?;
        let exit = self
            .bytecode
            .emit(Instruction::JumpIfFalse(PATCH_PLACEHOLDER), while_stmt.line);

        self.loops.push(LoopContext::default());
        self.compile_block(&while_stmt.body)?;
        let ctx = self.pop_loop(while_stmt.line)?;

        // continue re-tests the condition
        for jump in ctx.continue_jumps {
            self.patch_jump(jump, loop_start, while_stmt.line)?;
        }
        self.bytecode
            .emit(Instruction::Jump(loop_start), while_stmt.line);

        let end = self.bytecode.current_offset();
        self.patch_jump(exit, end, while_stmt.line)?;
        for jump in ctx.break_jumps {
            self.patch_jump(jump, end, while_stmt.line)?;
        }
        Ok(())
    }

    /// `for` is a while-loop with the initializer hoisted out and the step
    /// appended to the body; `continue` targets the step, not the condition
    fn compile_for(&mut self, for_stmt: &ForStmt) -> Result<(), Vec<Diagnostic>> {
        self.compile_var_decl(&for_stmt.init)?;

        let loop_start = self.bytecode.current_offset();
        self.compile_expr(&for_stmt.cond)?;
        let exit = self
            .bytecode
            .emit(Instruction::JumpIfFalse(PATCH_PLACEHOLDER), for_stmt.line);

        self.loops.push(LoopContext::default());
        self.compile_block(&for_stmt.body)?;
        let ctx = self.pop_loop(for_stmt.line)?;

        let step_start = self.bytecode.current_offset();
        for jump in ctx.continue_jumps {
            self.patch_jump(jump, step_start, for_stmt.line)?;
        }
        self.compile_expr(&for_stmt.step)?;
        self.bytecode
            .emit(Instruction::Pop, for_stmt.step.line());
        self.bytecode
            .emit(Instruction::Jump(loop_start), for_stmt.line);

        let end = self.bytecode.current_offset();
        self.patch_jump(exit, end, for_stmt.line)?;
        for jump in ctx.break_jumps {
            self.patch_jump(jump, end, for_stmt.line)?;
        }
        Ok(())
    }

    fn pop_loop(&mut self, line: u32) -> Result<LoopContext, Vec<Diagnostic>> {
        self.loops
            .pop()
            .ok_or_else(|| internal("loop context stack underflow", line))
    }
}

impl Default for LoopContext {
    fn default() -> Self {
        Self {
            break_jumps: Vec::new(),
            continue_jumps: Vec::new(),
        }
    }
}
