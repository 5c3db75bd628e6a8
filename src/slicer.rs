//! Walks raw source bytes against a chunk partition
//!
//! `SourceSlicer` is a lazy, forward-only iterator producing (decoded text,
//! stats) pairs that cover the whole file in order. It tracks (line, column)
//! per scanned byte and flushes the pending buffer whenever the current
//! chunk's stop boundary is reached. A boundary that does not line up
//! exactly with the byte walk is a fatal consistency error: it means the
//! position metadata upstream is wrong, and recovering silently would
//! attribute classification counts to the wrong text.

use std::path::PathBuf;
use std::vec::IntoIter;

use crate::error::AnalysisError;
use crate::stats::{SourceChunk, SourcePosition, Stats};

pub struct SourceSlicer {
    path: PathBuf,
    bytes: Vec<u8>,
    chunks: IntoIter<SourceChunk>,
    current: Option<SourceChunk>,
    /// Byte index of the next unscanned byte.
    offset: usize,
    position: SourcePosition,
    pending: Vec<u8>,
    finished: bool,
}

impl SourceSlicer {
    pub fn new(path: PathBuf, bytes: Vec<u8>, chunks: Vec<SourceChunk>) -> Self {
        let mut chunks = chunks.into_iter();
        let current = chunks.next();
        Self {
            path,
            bytes,
            chunks,
            current,
            offset: 0,
            position: SourcePosition::new(1, 0),
            pending: Vec::new(),
            finished: false,
        }
    }

    fn decode_pending(&mut self) -> Result<String, AnalysisError> {
        let group = std::mem::take(&mut self.pending);
        String::from_utf8(group).map_err(|_| AnalysisError::InvalidUtf8 {
            path: self.path.clone(),
        })
    }

    /// Move to the next chunk, verifying its start boundary matches the
    /// current scan position exactly.
    fn advance_chunk(&mut self) -> Result<(), AnalysisError> {
        let next = self.chunks.next().ok_or_else(|| {
            AnalysisError::position_inconsistency(
                self.path.clone(),
                SourcePosition::new(u32::MAX, 0),
                self.position,
            )
        })?;
        if next.start != self.position {
            return Err(AnalysisError::position_inconsistency(
                self.path.clone(),
                next.start,
                self.position,
            ));
        }
        self.current = Some(next);
        Ok(())
    }
}

impl Iterator for SourceSlicer {
    type Item = Result<(String, Stats), AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let current = match self.current {
            Some(chunk) => chunk,
            // No chunks at all: nothing to attribute.
            None => {
                self.finished = true;
                return None;
            }
        };

        while self.offset < self.bytes.len() {
            if current.stop == self.position {
                // Flush before consuming the boundary byte.
                let text = match self.decode_pending() {
                    Ok(text) => text,
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                };
                if let Err(err) = self.advance_chunk() {
                    self.finished = true;
                    return Some(Err(err));
                }
                return Some(Ok((text, current.stats)));
            }
            let byte = self.bytes[self.offset];
            self.pending.push(byte);
            self.offset += 1;
            if byte == b'\n' {
                self.position = SourcePosition::new(self.position.line + 1, 0);
            } else {
                self.position.col += 1;
            }
        }

        // End of file. A stop boundary the byte walk never reached means the
        // position metadata is misaligned (e.g. for synthetic cache-slot
        // instructions) — never silently truncated. A boundary landing
        // exactly on the end-of-file position is fine; any chunks past it
        // cover zero bytes.
        self.finished = true;
        if !self.chunks.as_slice().is_empty() && current.stop != self.position {
            return Some(Err(AnalysisError::position_inconsistency(
                self.path.clone(),
                current.stop,
                self.position,
            )));
        }
        match self.decode_pending() {
            Ok(text) => Some(Ok((text, current.stats))),
            Err(err) => Some(Err(err)),
        }
    }
}
