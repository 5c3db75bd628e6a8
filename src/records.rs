//! Trace ingestion: instruction records, code unit trees, and the registry
//!
//! The execution harness that actually runs the instrumented program lives
//! outside this crate. It serializes, per executed source file, the
//! depth-first tree of code units it observed, each carrying its adaptive
//! bytecode in execution order. This module deserializes that trace and
//! exposes it as an explicit `CodeUnitRegistry` handed to analysis by
//! reference, so there is no process-global registry of executed code.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::stats::SourcePosition;

/// One instruction of a code unit's adaptive bytecode.
///
/// Position fields mirror CPython's `co_positions()` tuple and are
/// individually optional; an instruction with any missing coordinate
/// contributes no attribution event but still serves as classification
/// context for its successor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    /// Opcode name as reported by the adaptive disassembly (e.g.
    /// "LOAD_ATTR_INSTANCE_VALUE").
    pub opname: String,
    /// Whether any jump in the unit targets this instruction.
    #[serde(default)]
    pub is_jump_target: bool,
    #[serde(default)]
    pub lineno: Option<u32>,
    #[serde(default)]
    pub end_lineno: Option<u32>,
    #[serde(default)]
    pub col_offset: Option<u32>,
    #[serde(default)]
    pub end_col_offset: Option<u32>,
}

impl InstructionRecord {
    /// The instruction's source range, if every coordinate is resolved.
    pub fn range(&self) -> Option<(SourcePosition, SourcePosition)> {
        Some((
            SourcePosition::new(self.lineno?, self.col_offset?),
            SourcePosition::new(self.end_lineno?, self.end_col_offset?),
        ))
    }
}

/// One executable unit (module, function, comprehension, ...) with its
/// lexically nested sub-units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Co_name of the unit ("<module>" for roots).
    pub name: String,
    /// Instructions in bytecode execution order.
    pub instructions: Vec<InstructionRecord>,
    /// Nested units, in the order their code constants appear.
    #[serde(default)]
    pub children: Vec<CodeUnit>,
}

impl CodeUnit {
    /// Depth-first preorder walk: the unit itself, then each child subtree.
    pub fn walk(&self) -> CodeUnitWalk<'_> {
        CodeUnitWalk { stack: vec![self] }
    }
}

/// Preorder iterator over a code unit tree.
pub struct CodeUnitWalk<'a> {
    stack: Vec<&'a CodeUnit>,
}

impl<'a> Iterator for CodeUnitWalk<'a> {
    type Item = &'a CodeUnit;

    fn next(&mut self) -> Option<&'a CodeUnit> {
        let unit = self.stack.pop()?;
        // Push in reverse so children are visited in declaration order.
        for child in unit.children.iter().rev() {
            self.stack.push(child);
        }
        Some(unit)
    }
}

/// A root code unit together with the source file it was compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedUnit {
    pub path: PathBuf,
    pub root: CodeUnit,
}

/// On-disk trace produced by the execution harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFile {
    pub version: u32,
    /// Interpreter version the trace was captured under (e.g. "3.11.9").
    #[serde(default)]
    pub python: Option<String>,
    /// Message of the exception the traced program died with, if any.
    /// Analysis still proceeds over whatever code did execute; this is
    /// re-surfaced to the caller once reporting is done.
    #[serde(default)]
    pub error: Option<String>,
    pub units: Vec<TracedUnit>,
}

/// Current trace format version.
pub const TRACE_VERSION: u32 = 1;

impl TraceFile {
    /// Load a trace from disk. JSON and MessagePack are supported,
    /// selected by file extension (`.json` vs `.msgpack`/`.mp`).
    pub fn load(path: &Path) -> Result<TraceFile, AnalysisError> {
        let bytes = fs::read(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trace: TraceFile = match path.extension().and_then(|e| e.to_str()) {
            Some("msgpack") | Some("mp") => {
                rmp_serde::from_slice(&bytes).map_err(|e| AnalysisError::TraceLoad {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            _ => serde_json::from_slice(&bytes).map_err(|e| AnalysisError::TraceLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };
        if trace.version != TRACE_VERSION {
            return Err(AnalysisError::TraceLoad {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported trace version {} (expected {})",
                    trace.version, TRACE_VERSION
                ),
            });
        }
        Ok(trace)
    }
}

/// Explicit provider of executed code units, passed to analysis by
/// reference. Replaces any ambient global registry.
#[derive(Debug, Clone)]
pub struct CodeUnitRegistry {
    units: Vec<TracedUnit>,
}

impl CodeUnitRegistry {
    pub fn new(units: Vec<TracedUnit>) -> Self {
        Self { units }
    }

    pub fn from_trace(trace: &TraceFile) -> Self {
        Self::new(trace.units.clone())
    }

    /// Look up the root unit compiled from `path`. Paths are compared
    /// canonicalized where possible, falling back to literal comparison for
    /// files that no longer exist.
    pub fn unit_for_path(&self, path: &Path) -> Option<&CodeUnit> {
        let canonical = path.canonicalize().ok();
        self.units
            .iter()
            .find(|unit| {
                if let (Some(a), Ok(b)) = (&canonical, unit.path.canonicalize()) {
                    *a == b
                } else {
                    unit.path == path
                }
            })
            .map(|unit| &unit.root)
    }

    /// All file paths the registry has code for.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.units.iter().map(|unit| unit.path.as_path())
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
