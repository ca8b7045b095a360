//! Bytecode compiler
//!
//! Walks the resolved AST and emits a flat instruction array. All name
//! lookup happened in the resolver; load/store instructions use the lexical
//! addresses from the [`Resolution`] side table. Function bodies are
//! appended after the top-level program, with descriptors reserved up front
//! so any call site can reference any top-level function.
//!
//! Errors produced here (`RL9002`) are compiler invariant violations, not
//! user mistakes: a resolver-clean, type-correct AST never triggers them.

mod expr;
mod stmt;

use crate::ast::*;
use crate::bytecode::{Bytecode, FunctionInfo, Instruction};
use crate::diagnostic::Diagnostic;
use crate::resolver::{Resolution, SlotRef};
use crate::value::Value;
use std::collections::HashMap;

/// Pending forward jumps of the innermost enclosing loop
pub(crate) struct LoopContext {
    break_jumps: Vec<usize>,
    continue_jumps: Vec<usize>,
}

pub struct Compiler<'a> {
    resolution: &'a Resolution,
    bytecode: Bytecode,
    /// Top-level function declarations, indexed by descriptor id
    functions: Vec<&'a FunctionDecl>,
    /// Function declaration NodeId -> descriptor id
    func_ids: HashMap<NodeId, usize>,
    loops: Vec<LoopContext>,
}

impl<'a> Compiler<'a> {
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            resolution,
            bytecode: Bytecode::new(),
            functions: Vec::new(),
            func_ids: HashMap::new(),
            loops: Vec::new(),
        }
    }

    /// Compile a resolved program into bytecode
    pub fn compile(mut self, program: &'a Program) -> Result<Bytecode, Vec<Diagnostic>> {
        // Reserve every descriptor before emitting any code
        for decl in &program.decls {
            if let Decl::Function(func) = decl {
                let local_slots = self
                    .resolution
                    .locals_of(func.name.id)
                    .ok_or_else(|| internal("function missing from resolution", func.line))?;
                self.func_ids.insert(func.name.id, self.functions.len());
                self.functions.push(func);
                self.bytecode.functions.push(FunctionInfo {
                    name: func.name.name.clone(),
                    entry: 0,
                    param_count: func.params.len(),
                    local_slots,
                });
            }
        }

        for decl in &program.decls {
            self.compile_decl(decl)?;
        }
        self.bytecode.top_level_end = self.bytecode.current_offset();

        // Function bodies go after the top-level program
        let functions = self.functions.clone();
        for (id, func) in functions.iter().enumerate() {
            self.bytecode.functions[id].entry = self.bytecode.current_offset();
            self.compile_block(&func.body)?;
            // Implicit return for bodies that fall off the end
            self.bytecode.emit(Instruction::PushConst(Value::Null), func.line);
            self.bytecode.emit(Instruction::Return, func.line);
        }

        self.bytecode.global_slots = self.resolution.global_slots();
        Ok(self.bytecode)
    }

    /// Lexical address of an identifier occurrence
    fn slot_of(&self, ident: &Ident) -> Result<SlotRef, Vec<Diagnostic>> {
        self.resolution
            .slot_of(ident.id)
            .ok_or_else(|| internal(format!("'{}' has no lexical address", ident.name), ident.line))
    }

    fn emit_load(&mut self, slot: SlotRef, line: u32) {
        let instr = if slot.is_local {
            Instruction::LoadLocal(slot.offset)
        } else {
            Instruction::LoadGlobal(slot.offset)
        };
        self.bytecode.emit(instr, line);
    }

    fn emit_store(&mut self, slot: SlotRef, line: u32) {
        let instr = if slot.is_local {
            Instruction::StoreLocal(slot.offset)
        } else {
            Instruction::StoreGlobal(slot.offset)
        };
        self.bytecode.emit(instr, line);
    }

    /// Back-patch a forward jump; a non-jump patch site is a compiler bug
    fn patch_jump(
        &mut self,
        at: usize,
        target: usize,
        line: u32,
    ) -> Result<(), Vec<Diagnostic>> {
        if self.bytecode.patch_jump(at, target) {
            Ok(())
        } else {
            Err(internal(format!("patch site {} is not a jump", at), line))
        }
    }
}

pub(crate) fn internal(msg: impl Into<String>, line: u32) -> Vec<Diagnostic> {
    vec![Diagnostic::error_with_code("RL9002", msg, line)
        .with_label("compiler invariant violated")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction as I;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use pretty_assertions::assert_eq;

    fn compile_source(source: &str) -> Bytecode {
        let (tokens, diags) = Lexer::tokenize(source);
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        let (program, diags) = Parser::parse(tokens);
        assert!(diags.is_empty(), "parse errors: {:?}", diags);
        let resolution = Resolver::new().resolve(&program).expect("resolves");
        Compiler::new(&resolution)
            .compile(&program)
            .expect("compiles")
    }

    #[test]
    fn var_declaration_stores_then_pops() {
        let bc = compile_source("let x = 1;");
        assert_eq!(
            bc.code,
            vec![
                I::PushConst(Value::Number(1.0)),
                I::StoreGlobal(0),
                I::Pop,
            ]
        );
        assert_eq!(bc.global_slots, 1);
        assert_eq!(bc.top_level_end, 3);
    }

    #[test]
    fn binary_operands_push_left_then_right() {
        let bc = compile_source("print 2 + 3 * 4;");
        assert_eq!(
            bc.code,
            vec![
                I::PushConst(Value::Number(2.0)),
                I::PushConst(Value::Number(3.0)),
                I::PushConst(Value::Number(4.0)),
                I::Mul,
                I::Add,
                I::Print,
            ]
        );
    }

    #[test]
    fn if_else_patches_both_jumps() {
        let bc = compile_source("if (true) { print 1; } else { print 2; }");
        assert_eq!(
            bc.code,
            vec![
                I::PushConst(Value::Bool(true)),
                I::JumpIfFalse(5),
                I::PushConst(Value::Number(1.0)),
                I::Print,
                I::Jump(7),
                I::PushConst(Value::Number(2.0)),
                I::Print,
            ]
        );
    }

    #[test]
    fn while_jumps_back_to_condition() {
        let bc = compile_source("let i = 0; while (i < 3) { i = i + 1; }");
        assert_eq!(bc.code[6], I::JumpIfFalse(13));
        assert_eq!(bc.code[12], I::Jump(3));
        // Assignment inside the loop keeps its value; the statement pops it
        assert_eq!(bc.code[10], I::StoreGlobal(0));
        assert_eq!(bc.code[11], I::Pop);
    }

    #[test]
    fn break_jumps_past_loop_end() {
        let bc = compile_source("while (true) { break; }");
        assert_eq!(
            bc.code,
            vec![
                I::PushConst(Value::Bool(true)),
                I::JumpIfFalse(4),
                I::Jump(4),
                I::Jump(0),
            ]
        );
    }

    #[test]
    fn for_continue_targets_the_step() {
        let bc = compile_source("for (let i = 0; i < 2; i = i + 1) { continue; }");
        // Layout: init 0..=2, cond 3..=5, exit 6, body 7, step 8..=12, back 13
        assert_eq!(bc.code[6], I::JumpIfFalse(14));
        assert_eq!(bc.code[7], I::Jump(8), "continue jumps to the step");
        assert_eq!(bc.code[13], I::Jump(3));
    }

    #[test]
    fn function_bodies_follow_top_level() {
        let bc =
            compile_source("fn add(a: number, b: number) -> number { return a + b; } print add(3, 4);");
        assert_eq!(bc.top_level_end, 4);
        assert_eq!(
            &bc.code[..4],
            &[
                I::PushConst(Value::Number(3.0)),
                I::PushConst(Value::Number(4.0)),
                I::Call { func: 0, argc: 2 },
                I::Print,
            ]
        );
        let func = &bc.functions[0];
        assert_eq!(func.name, "add");
        assert_eq!(func.entry, 4);
        assert_eq!(func.param_count, 2);
        assert_eq!(func.local_slots, 2);
        assert_eq!(
            &bc.code[4..],
            &[
                I::LoadLocal(0),
                I::LoadLocal(1),
                I::Add,
                I::Return,
                I::PushConst(Value::Null),
                I::Return,
            ]
        );
    }

    #[test]
    fn omitted_arguments_fill_from_defaults_at_call_site() {
        let bc = compile_source(
            "fn f(a: number, b: number = 10) -> number { return a + b; } print f(1);",
        );
        assert_eq!(
            &bc.code[..4],
            &[
                I::PushConst(Value::Number(1.0)),
                I::PushConst(Value::Number(10.0)),
                I::Call { func: 0, argc: 2 },
                I::Print,
            ]
        );
    }

    #[test]
    fn locals_in_blocks_use_frame_relative_offsets() {
        let bc = compile_source("fn f(a: number) { let b = a; print b; }");
        assert_eq!(
            &bc.code[bc.top_level_end..],
            &[
                I::LoadLocal(0),
                I::StoreLocal(1),
                I::Pop,
                I::LoadLocal(1),
                I::Print,
                I::PushConst(Value::Null),
                I::Return,
            ]
        );
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let source = "let x = 1; fn f(a: number) -> number { return a * x; } print f(2);";
        assert_eq!(compile_source(source), compile_source(source));
    }
}
