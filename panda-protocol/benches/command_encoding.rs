use criterion::{Criterion, criterion_group, criterion_main};
use panda_protocol::{Command, TableOp};
use std::hint::black_box;

fn encode_query(c: &mut Criterion) {
    let command = Command::query("TTLIN1.TERM");
    c.bench_function("encode query", |b| {
        b.iter(|| {
            let mut wire = Vec::with_capacity(32);
            black_box(&command).write_to(&mut wire).unwrap();
            black_box(wire)
        })
    });
}

fn encode_table_assignment(c: &mut Criterion) {
    let rows: Vec<String> = (0..4096).map(|row| format!("{row} 0 1 2")).collect();
    let command = Command::assign_table("SEQ1.TABLE", TableOp::Overwrite, rows);
    c.bench_function("encode 4096-row table assignment", |b| {
        b.iter(|| {
            let mut wire = Vec::with_capacity(64 * 1024);
            black_box(&command).write_to(&mut wire).unwrap();
            black_box(wire)
        })
    });
}

criterion_group!(benches, encode_query, encode_table_assignment);
criterion_main!(benches);
