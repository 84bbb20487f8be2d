use proptest::prelude::*;

use stackc::sim::{format_float, Machine};
use stackc::{compile_script, ArithOp, Compiler, Op, Symbol, TargetConfig, Type};

fn run(compiler: &Compiler, input: &[&str]) -> String {
    let artifact = compiler.compile_to_string();
    Machine::load(&artifact, compiler.config())
        .unwrap()
        .run(input)
        .unwrap()
        .stdout
}

type Snapshot = (Vec<Symbol>, Vec<(String, Type)>, usize);

fn snapshot(c: &Compiler) -> Snapshot {
    (
        c.stack().as_slice().to_vec(),
        c.symbols()
            .iter()
            .map(|(name, var)| (name.to_string(), var.ty))
            .collect(),
        c.instructions().len(),
    )
}

// ============================================================================
// Artifacts
// ============================================================================

#[test]
fn product_is_stored_and_printed() {
    let mut c = Compiler::new();
    c.push(3);
    c.push(4);
    c.triplet(ArithOp::Mul).unwrap();
    c.assign("result").unwrap();
    c.push(Symbol::ident("result"));
    c.print().unwrap();

    let artifact = c.compile_to_string();
    insta::assert_snapshot!(artifact, @r"
    .data
        temp_1: .word 0
        result: .word 0

    .text
        li $t0, 3
        li $t1, 4
        mul $t0, $t0, $t1
        sw $t0, temp_1
        lw $t0, temp_1
        sw $t0, result
        li $v0, 1
        lw $a0, result
        syscall
    ");
    assert_eq!(run(&c, &[]), "12");
    assert!(c.diagnostics().is_empty());
}

#[test]
fn artifact_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("avg.asm");

    let mut c = Compiler::new();
    c.read("a", Type::F32).unwrap();
    c.read("b", Type::F32).unwrap();
    c.push(Symbol::ident("a"));
    c.push(Symbol::ident("b"));
    c.triplet(ArithOp::Add).unwrap();
    c.push(2);
    c.triplet(ArithOp::Div).unwrap();
    c.print().unwrap();
    c.compile_to_path(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, c.compile_to_string());
    let out = Machine::load(&written, &TargetConfig::mips())
        .unwrap()
        .run(&["3.0", "4.5"])
        .unwrap();
    assert_eq!(out.stdout, "3.75");
}

#[test]
fn script_with_strings_and_reads() {
    let source = "\
# greet and double
push \"n? \"
print
read n int
push n
push 2
mul
assign doubled
push \"2n = \"
print
push doubled
print
push \"\\n\"
print
";
    let artifact = compile_script(source, "double.stk").unwrap();
    assert!(artifact.contains("    str_1: .asciiz \"n? \"\n"));
    assert!(artifact.contains("    str_3: .asciiz \"\\n\"\n"));
    let out = Machine::load(&artifact, &TargetConfig::mips())
        .unwrap()
        .run(&["21"])
        .unwrap();
    assert_eq!(out.stdout, "n? 2n = 42\n");
}

#[test]
fn failed_script_returns_spanned_errors() {
    let source = "push 1\nassign x\npush \"s\"\nassign y\n";
    let errors = compile_script(source, "bad.stk").unwrap_err();
    assert_eq!(errors.len(), 1);
    let span = errors[0].span;
    assert_eq!(&source[span.start as usize..span.end as usize], "assign y");
}

// ============================================================================
// Properties
// ============================================================================

fn arb_op() -> impl Strategy<Value = Op> {
    let names = || prop::sample::select(vec!["a", "b", "temp_1", "str_1"]);
    prop_oneof![
        (-50i32..50).prop_map(|v| Op::Push(Symbol::from(v))),
        (-8.0f32..8.0).prop_map(|v| Op::Push(Symbol::from(v))),
        names().prop_map(|n| Op::Push(Symbol::ident(n))),
        Just(Op::Push(Symbol::text("s"))),
        prop::sample::select(vec![ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div])
            .prop_map(Op::Triplet),
        names().prop_map(|n| Op::Assign(n.to_string())),
        Just(Op::Print),
        (names(), prop::sample::select(vec![Type::I32, Type::F32, Type::Str]))
            .prop_map(|(n, ty)| Op::Read(n.to_string(), ty)),
    ]
}

proptest! {
    /// Summing a list with left-folded triplets prints the sum.
    #[test]
    fn int_left_fold_prints_sum(values in prop::collection::vec(-1000i32..1000, 1..12)) {
        let mut c = Compiler::new();
        c.push(values[0]);
        for &v in &values[1..] {
            c.push(v);
            c.triplet(ArithOp::Add).unwrap();
        }
        c.print().unwrap();
        let expected: i32 = values.iter().sum();
        prop_assert_eq!(run(&c, &[]), expected.to_string());
        prop_assert_eq!(c.symbols().len(), values.len() - 1);
    }

    /// Pushing every value first and then reducing from the top leaves a
    /// single sum on the stack.
    #[test]
    fn deep_stack_reduces_to_sum(values in prop::collection::vec(-1000i32..1000, 1..12)) {
        let mut c = Compiler::new();
        for &v in &values {
            c.push(v);
        }
        for _ in 1..values.len() {
            c.triplet(ArithOp::Add).unwrap();
        }
        prop_assert_eq!(c.stack().depth(), 1);
        c.print().unwrap();
        let expected = values.iter().fold(0i32, |acc, v| acc + v);
        prop_assert_eq!(run(&c, &[]), expected.to_string());
        prop_assert!(c.stack().is_empty());
    }

    /// Float folds are bit-exact through memory round trips.
    #[test]
    fn float_left_fold_matches_host(values in prop::collection::vec(-100.0f32..100.0, 1..8)) {
        let mut c = Compiler::new();
        c.push(values[0]);
        let mut expected = values[0];
        for &v in &values[1..] {
            c.push(v);
            c.triplet(ArithOp::Sub).unwrap();
            expected -= v;
        }
        c.print().unwrap();
        prop_assert_eq!(run(&c, &[]), format_float(expected));
    }

    /// A failing operation leaves stack, symbols and instructions untouched,
    /// and whatever succeeds still yields a loadable artifact.
    #[test]
    fn failures_do_not_mutate(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut c = Compiler::new();
        for op in &ops {
            let before = snapshot(&c);
            if c.apply(op).is_err() {
                prop_assert_eq!(snapshot(&c), before);
            } else {
                prop_assert!(c.instructions().len() >= before.2);
            }
        }
        let artifact = c.compile_to_string();
        prop_assert!(Machine::load(&artifact, c.config()).is_ok());
    }
}
