//! Bytecode representation
//!
//! A compiled program is a flat, zero-indexed instruction array plus the
//! function descriptors looked up at call sites. Instructions carry their
//! operands inline; jump targets are absolute instruction indices. A
//! parallel `lines` table maps each instruction back to its source line for
//! fault reporting.

pub mod disasm;

use crate::value::Value;
use std::fmt;

/// Placeholder target for forward jumps until they are back-patched
pub const PATCH_PLACEHOLDER: usize = usize::MAX;

/// One bytecode instruction with its operand
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Push the embedded constant
    PushConst(Value),
    /// Push a copy of the slot at base + offset
    LoadLocal(usize),
    /// Push a copy of the slot at the absolute offset
    LoadGlobal(usize),
    /// Pop, write to base + offset, push the value back
    StoreLocal(usize),
    /// Pop, write to the absolute offset, push the value back
    StoreGlobal(usize),
    /// Discard the top of the stack
    Pop,
    /// Pop and write one value as a line of program output
    Print,
    /// Unconditional jump to an absolute instruction index
    Jump(usize),
    /// Pop a boolean; jump when it is false
    JumpIfFalse(usize),
    /// Call function descriptor `func` with `argc` arguments on the stack
    Call { func: usize, argc: usize },
    /// Pop the return value, unwind the frame, push the value back
    Return,

    // Binary: pop right, pop left, push result
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,

    // Unary: pop one, push result
    Negate,
    Not,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushConst(v) => write!(f, "PUSH_CONST {:?}", v),
            Instruction::LoadLocal(n) => write!(f, "LOAD_LOCAL {}", n),
            Instruction::LoadGlobal(n) => write!(f, "LOAD_GLOBAL {}", n),
            Instruction::StoreLocal(n) => write!(f, "STORE_LOCAL {}", n),
            Instruction::StoreGlobal(n) => write!(f, "STORE_GLOBAL {}", n),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Print => write!(f, "PRINT"),
            Instruction::Jump(t) => write!(f, "JUMP {}", t),
            Instruction::JumpIfFalse(t) => write!(f, "JUMP_IF_FALSE {}", t),
            Instruction::Call { func, argc } => write!(f, "CALL {} {}", func, argc),
            Instruction::Return => write!(f, "RETURN"),
            Instruction::Add => write!(f, "ADD"),
            Instruction::Sub => write!(f, "SUB"),
            Instruction::Mul => write!(f, "MUL"),
            Instruction::Div => write!(f, "DIV"),
            Instruction::Mod => write!(f, "MOD"),
            Instruction::Equal => write!(f, "EQUAL"),
            Instruction::NotEqual => write!(f, "NOT_EQUAL"),
            Instruction::Less => write!(f, "LESS"),
            Instruction::LessEqual => write!(f, "LESS_EQUAL"),
            Instruction::Greater => write!(f, "GREATER"),
            Instruction::GreaterEqual => write!(f, "GREATER_EQUAL"),
            Instruction::And => write!(f, "AND"),
            Instruction::Or => write!(f, "OR"),
            Instruction::Negate => write!(f, "NEGATE"),
            Instruction::Not => write!(f, "NOT"),
        }
    }
}

/// Descriptor of one compiled function, looked up at call sites
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    /// Entry instruction index (patched once the body is emitted)
    pub entry: usize,
    pub param_count: usize,
    /// Stack slots the frame needs, parameters included
    pub local_slots: usize,
}

/// A complete compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub code: Vec<Instruction>,
    /// Source line of each instruction, parallel to `code`
    pub lines: Vec<u32>,
    pub functions: Vec<FunctionInfo>,
    /// Global slots to reserve before execution starts
    pub global_slots: usize,
    /// Index one past the last top-level instruction; function bodies
    /// follow. The VM halts normally when the program counter reaches this
    /// in the global frame.
    pub top_level_end: usize,
}

impl Bytecode {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            lines: Vec::new(),
            functions: Vec::new(),
            global_slots: 0,
            top_level_end: 0,
        }
    }

    /// Append an instruction, returning its index
    pub fn emit(&mut self, instr: Instruction, line: u32) -> usize {
        let at = self.code.len();
        self.code.push(instr);
        self.lines.push(line);
        at
    }

    /// Index the next emitted instruction will have
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Resolve a previously-emitted forward jump to `target`. Returns false
    /// when the site does not hold a jump instruction, leaving it untouched.
    #[must_use]
    pub fn patch_jump(&mut self, at: usize, target: usize) -> bool {
        match self.code.get_mut(at) {
            Some(Instruction::Jump(t)) | Some(Instruction::JumpIfFalse(t)) => {
                *t = target;
                true
            }
            _ => false,
        }
    }
}

impl Default for Bytecode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emit_returns_consecutive_indices() {
        let mut bc = Bytecode::new();
        assert_eq!(bc.emit(Instruction::PushConst(Value::Number(1.0)), 1), 0);
        assert_eq!(bc.emit(Instruction::Pop, 1), 1);
        assert_eq!(bc.current_offset(), 2);
        assert_eq!(bc.lines, vec![1, 1]);
    }

    #[test]
    fn patch_jump_rewrites_placeholder() {
        let mut bc = Bytecode::new();
        let at = bc.emit(Instruction::JumpIfFalse(PATCH_PLACEHOLDER), 1);
        bc.emit(Instruction::Pop, 1);
        assert!(bc.patch_jump(at, bc.current_offset()));
        assert_eq!(bc.code[at], Instruction::JumpIfFalse(2));
    }

    #[test]
    fn patching_a_non_jump_site_is_refused() {
        let mut bc = Bytecode::new();
        let at = bc.emit(Instruction::Pop, 1);
        assert!(!bc.patch_jump(at, 0));
        assert!(!bc.patch_jump(7, 0));
        assert_eq!(bc.code[at], Instruction::Pop);
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(Instruction::LoadLocal(3).to_string(), "LOAD_LOCAL 3");
        assert_eq!(
            Instruction::Call { func: 0, argc: 2 }.to_string(),
            "CALL 0 2"
        );
        assert_eq!(
            Instruction::PushConst(Value::Number(5.0)).to_string(),
            "PUSH_CONST Number(5)"
        );
    }
}
