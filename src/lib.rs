//! Avivar - Source-aware viewer for CPython's specializing adaptive interpreter
//!
//! This library attributes per-instruction execution-quality classifications
//! (specialized / adaptive / unquickened) back onto exact ranges of the
//! original source text, renders the attribution as HTML or JSON, and can
//! stream live re-renders of tracked files to remote observers over a
//! length-framed MessagePack socket.

pub mod analysis;
pub mod cli;
pub mod error;
pub mod opcodes;
pub mod records;
pub mod slicer;
pub mod stats;
pub mod sweep;
pub mod watch;
pub mod writers;
