//! Scope-resolution behavior observed end to end

use pretty_assertions::assert_eq;
use rill_runtime::{check_source, run_source};

fn run(source: &str) -> String {
    let mut out = Vec::new();
    run_source(source, &mut out).expect("program should run");
    String::from_utf8(out).expect("output should be utf8")
}

fn error_codes(source: &str) -> Vec<String> {
    check_source(source)
        .expect_err("expected diagnostics")
        .into_iter()
        .map(|d| d.code)
        .collect()
}

#[test]
fn block_shadow_restores_outer_binding_on_exit() {
    let source = "let x = 1;\n\
                  { let x = 5; print x; }\n\
                  print x;";
    assert_eq!(run(source), "5\n1\n");
}

#[test]
fn assignment_in_block_targets_innermost_binding() {
    let source = "let x = 1;\n\
                  { let x = 2; x = 5; print x; }\n\
                  print x;";
    assert_eq!(run(source), "5\n1\n");
}

#[test]
fn assignment_without_shadow_reaches_outer_binding() {
    let source = "let x = 1;\n\
                  { x = 5; }\n\
                  print x;";
    assert_eq!(run(source), "5\n");
}

#[test]
fn parameter_shadows_global() {
    let source = "let x = 1;\n\
                  fn show(x: number) { print x; }\n\
                  show(9);\n\
                  print x;";
    assert_eq!(run(source), "9\n1\n");
}

#[test]
fn sibling_blocks_reuse_slots_without_interference() {
    let source = "let a = 1;\n\
                  { let b = 2; print b; }\n\
                  { let c = 3; print c; }\n\
                  print a;";
    assert_eq!(run(source), "2\n3\n1\n");
}

#[test]
fn duplicate_declaration_in_same_scope_rejected() {
    assert_eq!(error_codes("let x = 1; let x = 2;"), vec!["RL2002"]);
}

#[test]
fn duplicate_parameter_rejected() {
    assert_eq!(
        error_codes("fn f(a: number, a: number) { print a; }"),
        vec!["RL2002"]
    );
}

#[test]
fn shadowing_in_nested_scope_accepted() {
    check_source("let x = 1; { let x = 2; print x; }").expect("shadowing should resolve");
}

#[test]
fn undeclared_reference_rejected() {
    assert_eq!(error_codes("print missing;"), vec!["RL2001"]);
}

#[test]
fn undeclared_assignment_target_rejected() {
    assert_eq!(error_codes("missing = 1;"), vec!["RL2001"]);
}

#[test]
fn loop_variable_not_visible_after_loop() {
    let codes = error_codes("for (let i = 0; i < 3; i = i + 1) { }\nprint i;");
    assert_eq!(codes, vec!["RL2001"]);
}

#[test]
fn default_value_may_call_the_declaring_function() {
    let source = "fn f(a: number, b: number = f(1, 2)) -> number { return a + b; }\n\
                  print f(1);";
    // b defaults to f(1, 2) = 3, so f(1) = 4
    assert_eq!(run(source), "4\n");
}

#[test]
fn function_name_visible_before_and_inside_its_body() {
    check_source(
        "fn even(n: number) -> bool {\n\
             if (n == 0) { return true; }\n\
             return !even(n - 1);\n\
         }\n\
         print even(4);",
    )
    .expect("self-recursion should resolve");
}
