//! Error types for the attribution pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::stats::SourcePosition;

/// Errors surfaced by trace loading, analysis, and slicing.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A chunk boundary did not line up with the byte walk of the source
    /// file. This means the upstream position metadata is wrong (typically
    /// for synthetic cache-slot instructions) and must never be papered
    /// over: recovering silently would attribute counts to the wrong text.
    #[error(
        "position metadata inconsistent for {}: expected chunk to start at \
         {expected_line}:{expected_col}, byte walk is at {actual_line}:{actual_col}",
        path.display()
    )]
    PositionInconsistency {
        path: PathBuf,
        expected_line: u32,
        expected_col: u32,
        actual_line: u32,
        actual_col: u32,
    },

    /// None of the requested targets had executed code in the trace.
    #[error("no source files found")]
    MissingTarget,

    /// The program under analysis raised while running. Reported only after
    /// analysis of whatever code did execute has completed.
    #[error("traced program failed: {0}")]
    UpstreamFailure(String),

    /// The trace file could not be decoded.
    #[error("failed to load trace {}: {message}", path.display())]
    TraceLoad { path: PathBuf, message: String },

    /// Source text was not valid UTF-8 at a chunk boundary.
    #[error("source file {} is not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub(crate) fn position_inconsistency(
        path: PathBuf,
        expected: SourcePosition,
        actual: SourcePosition,
    ) -> Self {
        AnalysisError::PositionInconsistency {
            path,
            expected_line: expected.line,
            expected_col: expected.col,
            actual_line: actual.line,
            actual_col: actual.col,
        }
    }
}
