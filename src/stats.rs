//! Per-chunk classification statistics and source positions
//!
//! `Stats` counts how many instructions attributed to a span of source text
//! were specialized, adaptive, or unquickened. It forms a commutative group
//! under pointwise add/subtract; subtraction is tracked through the signed
//! `StatsDelta` so intermediate sweep values may dip negative.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A source position as (line, column). Lines are 1-based, columns are
/// 0-based UTF-8 byte offsets within the line, matching CPython's
/// `co_positions()` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub col: u32,
}

impl SourcePosition {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// First position of any source file.
pub const FIRST_POSITION: SourcePosition = SourcePosition::new(1, 0);

/// A position guaranteed to be past the end of any source file.
pub const LAST_POSITION: SourcePosition = SourcePosition::new(u32::MAX, 0);

/// Classification counts for a span of source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub specialized: u64,
    pub adaptive: u64,
    pub unquickened: u64,
}

impl Stats {
    /// Singleton for one specialized instruction.
    pub const SPECIALIZED: Stats = Stats {
        specialized: 1,
        adaptive: 0,
        unquickened: 0,
    };

    /// Singleton for one adaptive instruction.
    pub const ADAPTIVE: Stats = Stats {
        specialized: 0,
        adaptive: 1,
        unquickened: 0,
    };

    /// Singleton for one unquickened instruction.
    pub const UNQUICKENED: Stats = Stats {
        specialized: 0,
        adaptive: 0,
        unquickened: 1,
    };

    /// True if no instruction was attributed to the span.
    pub fn is_zero(&self) -> bool {
        *self == Stats::default()
    }

    /// Total number of attributed instructions.
    pub fn total(&self) -> u64 {
        self.specialized + self.adaptive + self.unquickened
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, other: Stats) -> Stats {
        Stats {
            specialized: self.specialized + other.specialized,
            adaptive: self.adaptive + other.adaptive,
            unquickened: self.unquickened + other.unquickened,
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Stats) {
        *self = *self + other;
    }
}

/// Signed difference of `Stats`, used as the event delta during the sweep.
/// The running cumulative over a sorted event map is always non-negative,
/// but individual entries and partial sums may not be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub specialized: i64,
    pub adaptive: i64,
    pub unquickened: i64,
}

impl StatsDelta {
    pub fn add(&mut self, stats: Stats) {
        self.specialized += stats.specialized as i64;
        self.adaptive += stats.adaptive as i64;
        self.unquickened += stats.unquickened as i64;
    }

    pub fn subtract(&mut self, stats: Stats) {
        self.specialized -= stats.specialized as i64;
        self.adaptive -= stats.adaptive as i64;
        self.unquickened -= stats.unquickened as i64;
    }

    pub fn accumulate(&mut self, other: StatsDelta) {
        self.specialized += other.specialized;
        self.adaptive += other.adaptive;
        self.unquickened += other.unquickened;
    }

    pub fn is_zero(&self) -> bool {
        *self == StatsDelta::default()
    }

    /// Convert a cumulative value back to unsigned counts. The sweep
    /// guarantees the cumulative never goes negative; a negative component
    /// here means the event map was not balanced.
    pub fn as_stats(&self) -> Stats {
        debug_assert!(
            self.specialized >= 0 && self.adaptive >= 0 && self.unquickened >= 0,
            "cumulative classification count went negative: {self:?}"
        );
        Stats {
            specialized: self.specialized.max(0) as u64,
            adaptive: self.adaptive.max(0) as u64,
            unquickened: self.unquickened.max(0) as u64,
        }
    }
}

/// A contiguous range of source text with its cumulative classification
/// counts. `stop` is exclusive. A materialized chunk sequence fully
/// partitions `[FIRST_POSITION, LAST_POSITION)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChunk {
    pub start: SourcePosition,
    pub stop: SourcePosition,
    pub stats: Stats,
}
