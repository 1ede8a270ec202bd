use sforth::core::VM;
use sforth::exception::Exception;

fn vm() -> VM {
    let mut vm = VM::new(4, 4);
    vm.begin();
    vm.take_output();
    vm
}

#[test]
fn adds_and_prints() {
    let mut vm = vm();
    vm.evaluate("2 3 + .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "5\n");
}

#[test]
fn subtracts_in_source_order() {
    let mut vm = vm();
    vm.evaluate("10 3 - .");
    assert_eq!(vm.take_output(), "7\n");
}

#[test]
fn variables_store_and_fetch() {
    let mut vm = vm();
    vm.evaluate("variable x  42 x ! x @ .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "42\n");
}

#[test]
fn colon_definitions_run_natively() {
    let mut vm = vm();
    vm.evaluate(": double dup + ; 7 double .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "14\n");
}

#[test]
fn compiled_words_call_earlier_compiled_words() {
    let mut vm = vm();
    vm.evaluate(": five 5 ; five five + .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "10\n");
}

#[test]
fn undefined_words_are_diagnosed() {
    let mut vm = vm();
    vm.evaluate("notaword");
    let e = vm.last_error().expect("expected an error");
    assert_eq!(e.kind(), Exception::UndefinedWord);
    assert_eq!(vm.take_output(), "Error: undefined word, notaword\n");
}

#[test]
fn underflow_is_diagnosed_and_recovers() {
    let mut vm = vm();
    vm.evaluate(".");
    assert_eq!(vm.take_output(), "Error: dataStackUnderflow, in dStackPop\n");
    // the stack behaves as freshly reset afterwards
    vm.evaluate("1 2 + .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "3\n");
}

#[test]
fn compiling_a_program_preserves_its_stack_effect() {
    // the same token sequence, interpreted and compiled, must agree
    let program = "1 9 3 << swap - .";
    let mut a = vm();
    a.evaluate(program);
    assert!(a.last_error().is_none());
    let interpreted = a.take_output();

    let mut b = vm();
    b.evaluate(&format!(": probe {} ; probe", program));
    assert!(b.last_error().is_none());
    assert_eq!(b.take_output(), interpreted);
}

#[test]
fn compiled_variables_resolve_to_the_same_cell() {
    let mut vm = vm();
    vm.evaluate("variable counter");
    vm.evaluate(": bump counter @ 1 + counter ! ;");
    vm.evaluate("bump bump bump counter @ .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "3\n");
}

#[test]
fn shadowing_rebinds_lookup_but_not_compiled_calls() {
    let mut vm = vm();
    vm.evaluate(": n 1 ;");
    vm.evaluate(": m n ;");
    vm.evaluate(": n 2 ;");
    // interpretation sees the new n, m keeps the old resolution
    vm.evaluate("n m + .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "3\n");
}

#[test]
fn hex_and_decimal_numbers() {
    let mut vm = vm();
    vm.evaluate("0x10 16 + .");
    assert_eq!(vm.take_output(), "32\n");
    vm.evaluate("0xffffffff .x");
    assert_eq!(vm.take_output(), "0xffffffff\n");
}

#[test]
fn arithmetic_wraps_at_32_bits() {
    let mut vm = vm();
    vm.evaluate("0xffffffff 1 + .");
    assert_eq!(vm.take_output(), "0\n");
    vm.evaluate("0 1 - .s");
    assert_eq!(vm.take_output(), "-1\n");
}

#[test]
fn deep_stacks_cross_block_boundaries() {
    let mut vm = vm();
    // 600 pushes spill into a second block; drain them all back
    let mut line = String::new();
    for i in 0..600 {
        line.push_str(&format!("{} ", i));
    }
    vm.evaluate(&line);
    assert!(vm.last_error().is_none());
    for i in (0..600u32).rev() {
        assert_eq!(vm.pop().unwrap(), i);
    }
    assert!(vm.stack().is_empty());
}

#[test]
fn a_failing_word_stops_the_line() {
    let mut vm = vm();
    vm.evaluate("1 . missing 2 .");
    assert_eq!(vm.take_output(), "1\nError: undefined word, missing\n");
    assert!(vm.stack().is_empty());
}

#[test]
fn definitions_survive_across_lines_and_compose() {
    let mut vm = vm();
    vm.evaluate(": inc 1 + ;");
    vm.evaluate(": inc2 inc inc ;");
    vm.evaluate(": inc4 inc2 inc2 ;");
    vm.evaluate("0 inc4 .");
    assert!(vm.last_error().is_none());
    assert_eq!(vm.take_output(), "4\n");
}
