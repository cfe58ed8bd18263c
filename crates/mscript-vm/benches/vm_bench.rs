use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mscript_types::{Object, Value};
use mscript_vm::{
    compile_source, create_runtime, extend_globals, CodeLocation, VirtualMachine, VmConfig,
};
use std::rc::Rc;

const FIB: &str = "fib = (n) => if (n < 2) n else fib(n - 1) + fib(n - 2)\nfib(k)";
const LOOP: &str = "for (s = 0, i: 1..k) { s = s + i * i; s }";

/// Runtime library plus the global `k`
fn runtime_with_k(k: i64) -> Value {
    let extra = Object::from_pairs([(Rc::from("k"), Value::from(k))]);
    extend_globals(&create_runtime(), &Value::Object(extra))
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile fib", |b| {
        b.iter(|| {
            compile_source(
                black_box(FIB),
                CodeLocation::new("bench", 1),
                create_runtime(),
                VmConfig::default(),
            )
        })
    });
}

fn bench_exec(c: &mut Criterion) {
    for (name, source, k) in [("exec fib(15)", FIB, 15), ("exec loop 1..1000", LOOP, 1000)] {
        // `k` is unknown while compiling, so the work is left for run time
        let globals = runtime_with_k(k);
        let block = compile_source(
            source,
            CodeLocation::new("bench", 1),
            create_runtime(),
            VmConfig::default(),
        )
        .unwrap();
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut vm = VirtualMachine::new();
                vm.set_global_scope(globals.clone());
                vm.exec_block(black_box(&block)).unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_compile, bench_exec);
criterion_main!(benches);
