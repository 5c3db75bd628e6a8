//! Batch analysis: resolve targets, run the pipeline per file
//!
//! One pass per file: aggregate position events from the file's code unit
//! tree, materialize the chunk partition, then slice the raw source bytes
//! into (text, stats) pairs. Nothing is patched incrementally — every pass
//! rebuilds the partition from scratch.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalysisError;
use crate::opcodes::OpcodeTable;
use crate::records::{CodeUnit, CodeUnitRegistry, TraceFile};
use crate::slicer::SourceSlicer;
use crate::stats::Stats;
use crate::sweep::{collect_events, materialize_chunks};

/// Ordered (text, stats) pairs covering one whole file.
pub type FileResults = Vec<(String, Stats)>;

/// Results of one batch analysis invocation.
#[derive(Debug)]
pub struct AnalysisReport {
    pub files: Vec<(PathBuf, FileResults)>,
}

/// Run the full pipeline for one file against its code unit tree.
pub fn read_file(
    path: &Path,
    unit: &CodeUnit,
    table: &OpcodeTable,
) -> Result<FileResults, AnalysisError> {
    let bytes = fs::read(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let chunks = materialize_chunks(&collect_events(unit, table));
    SourceSlicer::new(path.to_path_buf(), bytes, chunks).collect()
}

/// Resolve the requested targets against the registry.
///
/// With explicit targets, keep those the registry has executed code for;
/// without any, analyze every file the registry knows. An empty result is
/// fatal: there is nothing to attribute.
pub fn resolve_targets(
    registry: &CodeUnitRegistry,
    targets: &[PathBuf],
) -> Result<Vec<PathBuf>, AnalysisError> {
    let paths: Vec<PathBuf> = if targets.is_empty() {
        registry.paths().map(Path::to_path_buf).collect()
    } else {
        targets
            .iter()
            .filter(|target| registry.unit_for_path(target).is_some())
            .cloned()
            .collect()
    };
    if paths.is_empty() {
        return Err(AnalysisError::MissingTarget);
    }
    Ok(paths)
}

/// Analyze every resolved target in the registry.
pub fn analyze(
    registry: &CodeUnitRegistry,
    targets: &[PathBuf],
    table: &OpcodeTable,
) -> Result<AnalysisReport, AnalysisError> {
    let paths = resolve_targets(registry, targets)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let unit = registry
            .unit_for_path(&path)
            .ok_or(AnalysisError::MissingTarget)?;
        let results = read_file(&path, unit, table)?;
        files.push((path, results));
    }
    Ok(AnalysisReport { files })
}

/// Surface a captured failure of the traced program, after reporting.
///
/// The trace carries the exception the program under analysis died with, if
/// any. Analysis proceeds over whatever code did execute; callers invoke
/// this once results have been emitted, turning the run into a failure.
pub fn check_upstream(trace: &TraceFile) -> Result<(), AnalysisError> {
    match &trace.error {
        Some(message) => Err(AnalysisError::UpstreamFailure(message.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{InstructionRecord, TracedUnit};

    fn specialized_instr(start: (u32, u32), stop: (u32, u32)) -> InstructionRecord {
        InstructionRecord {
            opname: "BINARY_OP_ADD_INT".to_string(),
            is_jump_target: false,
            lineno: Some(start.0),
            end_lineno: Some(stop.0),
            col_offset: Some(start.1),
            end_col_offset: Some(stop.1),
        }
    }

    fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn registry_for(path: &Path, unit: CodeUnit) -> CodeUnitRegistry {
        CodeUnitRegistry::new(vec![TracedUnit {
            path: path.to_path_buf(),
            root: unit,
        }])
    }

    #[test]
    fn test_read_file_concrete_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "example.py", "x = 1\ny = 2\n");
        let unit = CodeUnit {
            name: "<module>".to_string(),
            instructions: vec![specialized_instr((1, 0), (1, 5))],
            children: vec![],
        };
        let table = OpcodeTable::new();
        let results = read_file(&path, &unit, &table).unwrap();
        assert_eq!(
            results,
            vec![
                ("x = 1".to_string(), Stats::SPECIALIZED),
                ("\ny = 2\n".to_string(), Stats::default()),
            ]
        );
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "mod.py", "a = b + c\n");
        let unit = CodeUnit {
            name: "<module>".to_string(),
            instructions: vec![specialized_instr((1, 4), (1, 9))],
            children: vec![],
        };
        let registry = registry_for(&path, unit);
        let table = OpcodeTable::new();
        let first = analyze(&registry, &[], &table).unwrap();
        let second = analyze(&registry, &[], &table).unwrap();
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn test_resolve_targets_filters_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let known = write_source(&dir, "known.py", "pass\n");
        let unknown = write_source(&dir, "unknown.py", "pass\n");
        let registry = registry_for(
            &known,
            CodeUnit {
                name: "<module>".to_string(),
                instructions: vec![],
                children: vec![],
            },
        );
        let resolved =
            resolve_targets(&registry, &[known.clone(), unknown]).unwrap();
        assert_eq!(resolved, vec![known]);
    }

    #[test]
    fn test_no_targets_found_is_fatal() {
        let registry = CodeUnitRegistry::new(vec![]);
        let err = resolve_targets(&registry, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTarget));
    }

    #[test]
    fn test_upstream_failure_reported_after_analysis() {
        let trace = TraceFile {
            version: crate::records::TRACE_VERSION,
            python: None,
            error: Some("ZeroDivisionError: division by zero".to_string()),
            units: vec![],
        };
        let err = check_upstream(&trace).unwrap_err();
        assert!(err.to_string().contains("ZeroDivisionError"));
    }
}
