//! Sweep-line attribution benchmark
//!
//! Measures one full recomputation pass (event aggregation + chunk
//! materialization) over a synthetic code unit. Watch mode runs this in a
//! tight loop per tracked file, so the pass cost bounds the update latency
//! a remote observer sees.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench sweep_overhead
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use avivar::opcodes::OpcodeTable;
use avivar::records::{CodeUnit, InstructionRecord};
use avivar::sweep::{collect_events, materialize_chunks};

const OPCODES: &[&str] = &[
    "BINARY_OP_ADD_INT",
    "LOAD_ATTR_ADAPTIVE",
    "LOAD_FAST__LOAD_FAST",
    "LOAD_CONST",
    "POP_TOP",
];

/// Build a unit with `count` instructions spread over `count / 4` lines.
fn synthetic_unit(count: usize) -> CodeUnit {
    let instructions = (0..count)
        .map(|i| {
            let line = (i / 4 + 1) as u32;
            let col = ((i % 4) * 8) as u32;
            InstructionRecord {
                opname: OPCODES[i % OPCODES.len()].to_string(),
                is_jump_target: i % 16 == 0,
                lineno: Some(line),
                end_lineno: Some(line),
                col_offset: Some(col),
                end_col_offset: Some(col + 7),
            }
        })
        .collect();
    CodeUnit {
        name: "<module>".to_string(),
        instructions,
        children: vec![],
    }
}

fn bench_sweep_pass(c: &mut Criterion) {
    let table = OpcodeTable::new();
    let mut group = c.benchmark_group("sweep_pass");
    for count in [100usize, 1_000, 10_000] {
        let unit = synthetic_unit(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &unit,
            |b, unit| {
                b.iter(|| {
                    let events = collect_events(black_box(unit), &table);
                    black_box(materialize_chunks(&events))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sweep_pass);
criterion_main!(benches);
