//! Bytecode disassembler
//!
//! Produces a human-readable listing of a compiled program for the CLI
//! `disasm` command and for snapshot tests.

use super::Bytecode;

pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut out = String::new();

    out.push_str("=== functions ===\n");
    if bytecode.functions.is_empty() {
        out.push_str("(none)\n");
    }
    for (i, func) in bytecode.functions.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {} entry={} params={} locals={}\n",
            i, func.name, func.entry, func.param_count, func.local_slots
        ));
    }

    out.push_str("=== code ===\n");
    for (i, instr) in bytecode.code.iter().enumerate() {
        if i == bytecode.top_level_end && i != 0 {
            out.push_str("-- function bodies --\n");
        }
        out.push_str(&format!("{:04} {}\n", i, instr));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Instruction;
    use crate::value::Value;

    #[test]
    fn listing_numbers_instructions() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::PushConst(Value::Number(1.0)), 1);
        bc.emit(Instruction::Print, 1);
        bc.top_level_end = 2;
        let listing = disassemble(&bc);
        assert!(listing.contains("0000 PUSH_CONST Number(1)"));
        assert!(listing.contains("0001 PRINT"));
        assert!(listing.contains("(none)"));
    }
}
