use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sforth::core::VM;

fn ready() -> VM {
    let mut vm = VM::new(16, 16);
    vm.begin();
    vm.take_output();
    vm
}

fn bench_push_pop(c: &mut Criterion) {
    let mut vm = ready();
    c.bench_function("push_pop", |b| {
        b.iter(|| {
            vm.push(black_box(42));
            vm.pop().unwrap()
        })
    });
}

fn bench_find(c: &mut Criterion) {
    let vm = ready();
    c.bench_function("find_newest", |b| b.iter(|| vm.find(black_box(":"))));
    c.bench_function("find_oldest", |b| b.iter(|| vm.find(black_box("+"))));
    c.bench_function("find_missing", |b| b.iter(|| vm.find(black_box("unknown"))));
}

fn bench_evaluate(c: &mut Criterion) {
    let mut vm = ready();
    c.bench_function("evaluate_arith", |b| {
        b.iter(|| {
            vm.evaluate(black_box("2 3 + 4 - ."));
            vm.take_output()
        })
    });
}

fn bench_compiled_word(c: &mut Criterion) {
    let mut vm = ready();
    vm.evaluate(": double dup + ;");
    assert!(vm.last_error().is_none());
    c.bench_function("run_compiled_word", |b| {
        b.iter(|| {
            vm.evaluate(black_box("21 double ."));
            vm.take_output()
        })
    });
}

fn bench_compile(c: &mut Criterion) {
    let mut vm = ready();
    c.bench_function("compile_definition", |b| {
        b.iter(|| {
            // re-begin so the code space never fills, whatever the sample count
            vm.begin();
            vm.take_output();
            vm.evaluate(black_box(": probe 1 2 + dup swap - ;"));
        })
    });
}

criterion_group!(
    benches,
    bench_push_pop,
    bench_find,
    bench_evaluate,
    bench_compiled_word,
    bench_compile
);
criterion_main!(benches);
