//! Disassembler listing snapshots

use rill_runtime::{compile_source, disassemble};

fn listing(source: &str) -> String {
    let bytecode = compile_source(source).expect("program should compile");
    disassemble(&bytecode)
}

#[test]
fn straight_line_program_listing() {
    insta::assert_snapshot!(listing("let x = 1; print x;").trim_end(), @r"
    === functions ===
    (none)
    === code ===
    0000 PUSH_CONST Number(1)
    0001 STORE_GLOBAL 0
    0002 POP
    0003 LOAD_GLOBAL 0
    0004 PRINT
    ");
}

#[test]
fn function_bodies_listed_after_top_level() {
    insta::assert_snapshot!(
        listing("fn one() -> number { return 1; } print one();").trim_end(),
        @r"
    === functions ===
    [0] one entry=2 params=0 locals=0
    === code ===
    0000 CALL 0 0
    0001 PRINT
    -- function bodies --
    0002 PUSH_CONST Number(1)
    0003 RETURN
    0004 PUSH_CONST Null
    0005 RETURN
    "
    );
}

#[test]
fn jumps_show_absolute_targets() {
    insta::assert_snapshot!(
        listing("if (true) { print 1; } else { print 2; }").trim_end(),
        @r"
    === functions ===
    (none)
    === code ===
    0000 PUSH_CONST Bool(true)
    0001 JUMP_IF_FALSE 5
    0002 PUSH_CONST Number(1)
    0003 PRINT
    0004 JUMP 7
    0005 PUSH_CONST Number(2)
    0006 PRINT
    "
    );
}
