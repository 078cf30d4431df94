//! Whole-pipeline tests: source text through scan, parse, resolve and
//! interpret, with `print` output captured in memory.

use crate::language::parser::parse_source;
use crate::language::resolver::Resolver;
use crate::runtime::Interpreter;
use crate::runtime::error::RuntimeError;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedSink {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn run(source: &str) -> Result<String, RuntimeError> {
    let sink = SharedSink::default();
    let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));
    let parse = parse_source(source, 0).expect("parse");
    Resolver::new(&mut interpreter)
        .resolve(&parse.statements)
        .expect("resolve");
    interpreter.interpret(&parse.statements)?;
    Ok(sink.text())
}

fn run_output(source: &str) -> String {
    run(source).expect("program should run")
}

fn run_error(source: &str) -> RuntimeError {
    run(source).expect_err("program should fail")
}

#[test]
fn prints_arithmetic() {
    assert_eq!(run_output("print 1 + 2;"), "3 \n");
}

#[test]
fn prints_multiple_values_space_separated() {
    assert_eq!(run_output("print 1, 2, \"x\";"), "1 2 x \n");
}

#[test]
fn numbers_print_without_trailing_zero() {
    assert_eq!(run_output("print 3.0; print 2.5;"), "3 \n2.5 \n");
}

#[test]
fn block_shadowing_restores_outer_binding() {
    assert_eq!(
        run_output("var a = 1; { var a = 2; print a; } print a;"),
        "2 \n1 \n"
    );
}

#[test]
fn closures_capture_their_defining_environment() {
    let source = "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; } \
                  var f = make(); print f(); print f();";
    assert_eq!(run_output(source), "1 \n2 \n");
}

#[test]
fn closures_see_assignments_made_after_definition() {
    let source = "fun make() { var n = 1; fun get() { return n; } n = 5; return get; } \
                  print make()();";
    assert_eq!(run_output(source), "5 \n");
}

#[test]
fn separate_closures_share_one_captured_frame() {
    let source = "fun make() { var n = 0; fun bump() { n = n + 1; } fun get() { return n; } \
                  bump(); bump(); return get; } print make()();";
    assert_eq!(run_output(source), "2 \n");
}

#[test]
fn continue_still_runs_the_for_increment() {
    let source = "for (var i = 0; i < 3; i = i + 1) { if (i == 1) continue; print i; }";
    assert_eq!(run_output(source), "0 \n2 \n");
}

#[test]
fn for_loop_variable_does_not_leak() {
    let err = run_error("for (var i = 0; i < 1; i = i + 1) {} print i;");
    assert!(matches!(err, RuntimeError::UndefinedVariable { ref name, .. } if name == "i"));
}

#[test]
fn while_continue_reevaluates_the_condition() {
    let source = "var i = 0; var hits = 0; while (i < 3) { i = i + 1; \
                  if (i == 2) continue; hits = hits + 1; } print i, hits;";
    assert_eq!(run_output(source), "3 2 \n");
}

#[test]
fn break_exits_only_the_nearest_loop() {
    let source = "var total = 0; for (var i = 0; i < 2; i = i + 1) { \
                  while (true) { break; } total = total + 1; } print total;";
    assert_eq!(run_output(source), "2 \n");
}

#[test]
fn break_skips_the_increment() {
    let source = "var i = 0; for (; true; i = i + 1) { if (i == 0) break; } print i;";
    assert_eq!(run_output(source), "0 \n");
}

#[test]
fn return_unwinds_through_loops() {
    let source = "fun f() { for (var i = 0; i < 10; i = i + 1) { if (i == 2) return i; } } \
                  print f();";
    assert_eq!(run_output(source), "2 \n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run_output("fun f() {} print f();"), "nil \n");
}

#[test]
fn recursion_resolves_through_the_global_frame() {
    let source = "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
                  print fib(10);";
    assert_eq!(run_output(source), "55 \n");
}

#[test]
fn top_level_names_bind_late() {
    assert_eq!(
        run_output("fun f() { return x; } var x = 5; print f();"),
        "5 \n"
    );
}

#[test]
fn string_comparison_is_lexicographic() {
    assert_eq!(run_output("print \"a\" < \"b\";"), "true \n");
    assert_eq!(run_output("print \"b\" <= \"ab\";"), "false \n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_output("print \"foo\" + \"bar\";"), "foobar \n");
}

#[test]
fn division_by_zero_is_an_error() {
    let err = run_error("var x = 1 / 0;");
    assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    assert_eq!(err.line(), 1);
}

#[test]
fn adding_mixed_operands_is_a_type_error() {
    let err = run_error("1 + \"a\";");
    assert!(matches!(err, RuntimeError::Type { .. }));
    assert!(err.to_string().contains("two numbers or two strings"));
}

#[test]
fn negating_a_string_is_a_type_error() {
    let err = run_error("-\"a\";");
    assert!(err.to_string().contains("must be a number"));
}

#[test]
fn or_short_circuits_without_evaluating_the_right_side() {
    let source = "var calls = 0; fun mark() { calls = calls + 1; return true; } \
                  true or mark(); false and mark(); print calls;";
    assert_eq!(run_output(source), "0 \n");
}

#[test]
fn logical_operators_yield_operands_not_bools() {
    assert_eq!(run_output("print nil or \"fallback\";"), "fallback \n");
    assert_eq!(run_output("print 1 and 2;"), "2 \n");
    assert_eq!(run_output("print false and 2;"), "false \n");
}

#[test]
fn ternary_evaluates_a_single_branch() {
    let source = "var n = 0; fun bump() { n = n + 1; return n; } \
                  print true ? 1 : bump(); print n;";
    assert_eq!(run_output(source), "1 \n0 \n");
}

#[test]
fn comma_evaluates_both_and_yields_the_right() {
    assert_eq!(run_output("var a = 0; print (a = 1, a + 1); print a;"), "2 \n1 \n");
}

#[test]
fn assignment_yields_the_assigned_value() {
    assert_eq!(run_output("var a; print a = 5;"), "5 \n");
}

#[test]
fn equality_follows_variant_rules() {
    assert_eq!(run_output("print nil == nil;"), "true \n");
    assert_eq!(run_output("print nil == 0;"), "false \n");
    assert_eq!(run_output("print \"1\" == 1;"), "false \n");
    assert_eq!(run_output("print 2 == 2;"), "true \n");
}

#[test]
fn class_constructs_instances_with_fresh_fields() {
    let source = "class Point {} var p = Point(); p.x = 3; print p.x; print Point; print p;";
    assert_eq!(run_output(source), "3 \n<class Point> \nPoint instance \n");
}

#[test]
fn instance_fields_are_shared_through_every_handle() {
    let source = "class Box {} var a = Box(); var b = a; b.value = 7; print a.value;";
    assert_eq!(run_output(source), "7 \n");
}

#[test]
fn reading_an_unset_field_is_an_error() {
    let err = run_error("class Box {} var b = Box(); print b.missing;");
    assert!(matches!(err, RuntimeError::UndefinedProperty { ref name, .. } if name == "missing"));
}

#[test]
fn property_access_on_non_instances_is_a_type_error() {
    let err = run_error("var x = 1; print x.y;");
    assert!(err.to_string().contains("Only instances have properties"));
}

#[test]
fn class_bodies_can_reference_the_class_name() {
    // The name is defined before the class object is assigned to it.
    assert_eq!(
        run_output("class Chain { link() { return Chain; } } print Chain;"),
        "<class Chain> \n"
    );
}

#[test]
fn classes_take_no_constructor_arguments() {
    let err = run_error("class Point {} Point(1);");
    assert!(matches!(
        err,
        RuntimeError::Arity {
            expected: 0,
            received: 1,
            ..
        }
    ));
}

#[test]
fn calling_with_wrong_arity_fails() {
    let err = run_error("fun f(a) { return a; } f(1, 2);");
    assert!(matches!(
        err,
        RuntimeError::Arity {
            expected: 1,
            received: 2,
            ..
        }
    ));
}

#[test]
fn calling_a_non_callable_fails() {
    let err = run_error("var x = 1; x();");
    assert!(err.to_string().contains("Can only call functions and classes"));
}

#[test]
fn undefined_variable_reports_its_name() {
    let err = run_error("print ghost;");
    assert!(matches!(err, RuntimeError::UndefinedVariable { ref name, .. } if name == "ghost"));
}

#[test]
fn array_syntax_is_parsed_but_unimplemented() {
    assert!(matches!(
        run_error("var a = [1, 2];"),
        RuntimeError::Unimplemented { .. }
    ));
    assert!(matches!(
        run_error("var a; a[0];"),
        RuntimeError::Unimplemented { .. }
    ));
}

#[test]
fn natives_are_installed_in_the_global_frame() {
    assert_eq!(run_output("print str(12) + \"!\";"), "12! \n");
    assert_eq!(run_output("print clock() > 0;"), "true \n");
}

#[test]
fn native_arity_is_checked_like_any_call() {
    assert!(matches!(
        run_error("str(1, 2);"),
        RuntimeError::Arity { expected: 1, .. }
    ));
}

#[test]
fn environment_is_restored_after_a_runtime_error() {
    let sink = SharedSink::default();
    let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

    let first = parse_source("var a = 1; { var a = 2; -\"boom\"; }", 0).expect("parse");
    Resolver::new(&mut interpreter)
        .resolve(&first.statements)
        .expect("resolve");
    interpreter
        .interpret(&first.statements)
        .expect_err("should fail inside the block");

    // The failed block's frame must be gone: `a` resolves to the global.
    let second = parse_source("print a;", first.next_id).expect("parse");
    Resolver::new(&mut interpreter)
        .resolve(&second.statements)
        .expect("resolve");
    interpreter.interpret(&second.statements).expect("run");
    assert_eq!(sink.text(), "1 \n");
}

#[test]
fn interpreter_state_persists_across_runs() {
    let sink = SharedSink::default();
    let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));
    let mut next_id = 0;
    for source in ["var a = 1;", "fun double(x) { return x + x; }", "print double(a + 2);"] {
        let parse = parse_source(source, next_id).expect("parse");
        next_id = parse.next_id;
        Resolver::new(&mut interpreter)
            .resolve(&parse.statements)
            .expect("resolve");
        interpreter.interpret(&parse.statements).expect("run");
    }
    assert_eq!(sink.text(), "6 \n");
}
