//! Stack-based virtual machine
//!
//! Executes a compiled program against a single stack that holds globals,
//! frame locals, and expression temporaries. Slots are empty until first
//! written; reading an empty slot is an `UninitializedSlot` fault. All
//! faults are fatal: the VM halts at the faulting instruction.

mod frame;

pub use frame::CallFrame;

use crate::bytecode::{Bytecode, Instruction};
use crate::value::{RuntimeError, Value};
use std::io::Write;

/// A storage cell: empty until the program first writes it
type Slot = Option<Value>;

pub struct VM<'a> {
    stack: Vec<Slot>,
    frames: Vec<CallFrame>,
    bytecode: &'a Bytecode,
    pc: usize,
    /// Print output sink; injectable so tests can capture output
    output: &'a mut dyn Write,
}

impl<'a> VM<'a> {
    pub fn new(bytecode: &'a Bytecode, output: &'a mut dyn Write) -> Self {
        let mut stack = Vec::with_capacity(bytecode.global_slots.max(64));
        stack.resize(bytecode.global_slots, None);
        Self {
            stack,
            frames: vec![CallFrame::global()],
            bytecode,
            pc: 0,
            output,
        }
    }

    /// Run to completion or the first fault
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            // Normal halt: the top-level program ran off its last
            // instruction (function bodies live past top_level_end)
            if self.frames.len() == 1 && self.pc == self.bytecode.top_level_end {
                return Ok(());
            }
            let Some(instr) = self.bytecode.code.get(self.pc) else {
                return Err(RuntimeError::MalformedProgram {
                    msg: "program counter ran past the end of the code".to_string(),
                    line: self.bytecode.lines.last().copied().unwrap_or(0),
                });
            };
            let line = self.bytecode.lines[self.pc];
            self.pc += 1;

            match instr {
                Instruction::PushConst(value) => self.push(value.clone()),
                Instruction::LoadLocal(offset) => {
                    let value = self.read_slot(self.base() + offset, line)?;
                    self.push(value);
                }
                Instruction::LoadGlobal(offset) => {
                    let value = self.read_slot(*offset, line)?;
                    self.push(value);
                }
                Instruction::StoreLocal(offset) => {
                    let index = self.base() + offset;
                    let value = self.pop(line)?;
                    self.write_slot(index, value.clone(), line)?;
                    self.push(value);
                }
                Instruction::StoreGlobal(offset) => {
                    let index = *offset;
                    let value = self.pop(line)?;
                    self.write_slot(index, value.clone(), line)?;
                    self.push(value);
                }
                Instruction::Pop => {
                    self.pop(line)?;
                }
                Instruction::Print => {
                    let value = self.pop(line)?;
                    writeln!(self.output, "{}", value)
                        .map_err(|e| RuntimeError::Output(e.to_string()))?;
                }
                Instruction::Jump(target) => self.pc = *target,
                Instruction::JumpIfFalse(target) => {
                    let target = *target;
                    let value = self.pop(line)?;
                    match value {
                        Value::Bool(false) => self.pc = target,
                        Value::Bool(true) => {}
                        other => {
                            return Err(RuntimeError::TypeMismatch {
                                msg: format!("condition must be bool, found {}", other.type_name()),
                                line,
                            })
                        }
                    }
                }
                Instruction::Call { func, argc } => self.call(*func, *argc, line)?,
                Instruction::Return => {
                    let value = self.pop(line)?;
                    if self.frames.len() <= 1 {
                        return Err(RuntimeError::MalformedProgram {
                            msg: "return with no active call frame".to_string(),
                            line,
                        });
                    }
                    let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow { line })?;
                    self.stack.truncate(frame.base);
                    self.push(value);
                    self.pc = frame.return_pc;
                }

                Instruction::Add => {
                    let right = self.pop(line)?;
                    let left = self.pop(line)?;
                    let result = match (left, right) {
                        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                        (Value::String(a), Value::String(b)) => {
                            Value::string(format!("{}{}", a, b))
                        }
                        (a, b) => {
                            return Err(RuntimeError::TypeMismatch {
                                msg: format!(
                                    "cannot add {} and {}",
                                    a.type_name(),
                                    b.type_name()
                                ),
                                line,
                            })
                        }
                    };
                    self.push(result);
                }
                Instruction::Sub => self.numeric_binop(line, |a, b| a - b)?,
                Instruction::Mul => self.numeric_binop(line, |a, b| a * b)?,
                Instruction::Div => {
                    let right = self.pop_number(line)?;
                    let left = self.pop_number(line)?;
                    if right == 0.0 {
                        return Err(RuntimeError::DivisionByZero { line });
                    }
                    self.push(Value::Number(left / right));
                }
                Instruction::Mod => {
                    let right = self.pop_number(line)?;
                    let left = self.pop_number(line)?;
                    if right == 0.0 {
                        return Err(RuntimeError::DivisionByZero { line });
                    }
                    self.push(Value::Number(left % right));
                }
                Instruction::Equal => {
                    let right = self.pop(line)?;
                    let left = self.pop(line)?;
                    self.push(Value::Bool(left == right));
                }
                Instruction::NotEqual => {
                    let right = self.pop(line)?;
                    let left = self.pop(line)?;
                    self.push(Value::Bool(left != right));
                }
                Instruction::Less => self.comparison(line, |a, b| a < b)?,
                Instruction::LessEqual => self.comparison(line, |a, b| a <= b)?,
                Instruction::Greater => self.comparison(line, |a, b| a > b)?,
                Instruction::GreaterEqual => self.comparison(line, |a, b| a >= b)?,
                Instruction::And => {
                    let right = self.pop_bool(line)?;
                    let left = self.pop_bool(line)?;
                    self.push(Value::Bool(left && right));
                }
                Instruction::Or => {
                    let right = self.pop_bool(line)?;
                    let left = self.pop_bool(line)?;
                    self.push(Value::Bool(left || right));
                }
                Instruction::Negate => {
                    let value = self.pop_number(line)?;
                    self.push(Value::Number(-value));
                }
                Instruction::Not => {
                    let value = self.pop_bool(line)?;
                    self.push(Value::Bool(!value));
                }
            }
        }
    }

    fn call(&mut self, func: usize, argc: usize, line: u32) -> Result<(), RuntimeError> {
        let descriptor =
            self.bytecode
                .functions
                .get(func)
                .ok_or_else(|| RuntimeError::MalformedProgram {
                    msg: format!("no function descriptor {}", func),
                    line,
                })?;
        if argc != descriptor.param_count {
            return Err(RuntimeError::MalformedProgram {
                msg: format!(
                    "'{}' called with {} arguments, descriptor says {}",
                    descriptor.name, argc, descriptor.param_count
                ),
                line,
            });
        }
        if self.stack.len() < argc {
            return Err(RuntimeError::StackUnderflow { line });
        }
        // Arguments already on the stack become the first local slots
        let base = self.stack.len() - argc;
        self.stack.resize(base + descriptor.local_slots, None);
        self.frames.push(CallFrame {
            function_name: descriptor.name.clone(),
            return_pc: self.pc,
            base,
        });
        self.pc = descriptor.entry;
        Ok(())
    }

    fn numeric_binop(
        &mut self,
        line: u32,
        op: impl FnOnce(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let right = self.pop_number(line)?;
        let left = self.pop_number(line)?;
        self.push(Value::Number(op(left, right)));
        Ok(())
    }

    fn comparison(
        &mut self,
        line: u32,
        op: impl FnOnce(f64, f64) -> bool,
    ) -> Result<(), RuntimeError> {
        let right = self.pop_number(line)?;
        let left = self.pop_number(line)?;
        self.push(Value::Bool(op(left, right)));
        Ok(())
    }

    fn base(&self) -> usize {
        match self.frames.last() {
            Some(frame) => frame.base,
            None => 0,
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(Some(value));
    }

    fn pop(&mut self, line: u32) -> Result<Value, RuntimeError> {
        match self.stack.pop() {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(RuntimeError::UninitializedSlot { line }),
            None => Err(RuntimeError::StackUnderflow { line }),
        }
    }

    fn pop_number(&mut self, line: u32) -> Result<f64, RuntimeError> {
        match self.pop(line)? {
            Value::Number(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                msg: format!("expected number, found {}", other.type_name()),
                line,
            }),
        }
    }

    fn pop_bool(&mut self, line: u32) -> Result<bool, RuntimeError> {
        match self.pop(line)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::TypeMismatch {
                msg: format!("expected bool, found {}", other.type_name()),
                line,
            }),
        }
    }

    fn read_slot(&self, index: usize, line: u32) -> Result<Value, RuntimeError> {
        match self.stack.get(index) {
            Some(Some(value)) => Ok(value.clone()),
            _ => Err(RuntimeError::UninitializedSlot { line }),
        }
    }

    fn write_slot(&mut self, index: usize, value: Value, line: u32) -> Result<(), RuntimeError> {
        match self.stack.get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(RuntimeError::MalformedProgram {
                msg: format!("store to unreserved slot {}", index),
                line,
            }),
        }
    }

    /// Current operand stack height (used by stack-balance tests)
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }
}
