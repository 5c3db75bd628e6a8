//! Sweep-line attribution: position events and chunk materialization
//!
//! Overlapping per-instruction ranges are reduced to a contiguous,
//! non-overlapping partition of the source file via a difference map: each
//! classified instruction adds its singleton at its start position and
//! subtracts it at its end position. One sorted pass over the map with a
//! running cumulative then yields the chunk sequence. Because every add has
//! a matching subtract, the deltas sum to zero and the chunks exactly cover
//! the sentinel-to-sentinel range.

use std::collections::BTreeMap;

use crate::opcodes::OpcodeTable;
use crate::records::CodeUnit;
use crate::stats::{SourceChunk, SourcePosition, StatsDelta, FIRST_POSITION, LAST_POSITION};

/// Signed difference map over source positions. `BTreeMap` keeps the keys
/// in (line, column) order for the materialization sweep.
pub type EventMap = BTreeMap<SourcePosition, StatsDelta>;

/// Collect position events for every instruction reachable from `root`,
/// including all lexically nested units.
///
/// Instructions with any unresolved position coordinate contribute no event
/// but remain available as preceding-instruction context, and that context
/// carries across unit boundaries — the walk is one flat pass in bytecode
/// order.
pub fn collect_events(root: &CodeUnit, table: &OpcodeTable) -> EventMap {
    let mut events = EventMap::new();
    // Zero-delta sentinels pin the partition to the whole file.
    events.insert(FIRST_POSITION, StatsDelta::default());
    events.insert(LAST_POSITION, StatsDelta::default());

    let mut previous = None;
    for unit in root.walk() {
        for instruction in &unit.instructions {
            if let Some((start, stop)) = instruction.range() {
                let stats = table.classify(instruction, previous);
                events.entry(start).or_default().add(stats);
                events.entry(stop).or_default().subtract(stats);
            }
            previous = Some(instruction);
        }
    }
    events
}

/// Sweep the sorted event map into the chunk partition. Each adjacent key
/// pair becomes one chunk whose stats are the cumulative sum after the
/// first key's delta is applied.
pub fn materialize_chunks(events: &EventMap) -> Vec<SourceChunk> {
    let mut chunks = Vec::with_capacity(events.len().saturating_sub(1));
    let mut cumulative = StatsDelta::default();
    let mut iter = events.iter().peekable();
    while let Some((&start, &delta)) = iter.next() {
        let Some(stop) = iter.peek().map(|(key, _)| **key) else {
            break;
        };
        cumulative.accumulate(delta);
        chunks.push(SourceChunk {
            start,
            stop,
            stats: cumulative.as_stats(),
        });
    }
    chunks
}
