//! Wire payload for watch mode
//!
//! One payload is one full re-render of a tracked file. On the wire it is
//! a MessagePack map `{path, results: [{source, stats}, ...]}` prefixed
//! with a 4-byte unsigned big-endian length. No handshake, heartbeat, or
//! acknowledgment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::FileResults;
use crate::stats::Stats;

/// One attributed chunk of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub source: String,
    pub stats: Stats,
}

/// A full re-render of one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchPayload {
    pub path: String,
    pub results: Vec<ChunkResult>,
}

impl WatchPayload {
    pub fn new(path: &Path, results: &FileResults) -> Self {
        Self {
            path: path.display().to_string(),
            results: results
                .iter()
                .map(|(source, stats)| ChunkResult {
                    source: source.clone(),
                    stats: *stats,
                })
                .collect(),
        }
    }

    /// Encode as a length-framed MessagePack message. `to_vec_named` keeps
    /// the encoding self-describing (string-keyed maps, not tuples).
    pub fn frame(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        let body = rmp_serde::to_vec_named(self)?;
        let mut message = Vec::with_capacity(4 + body.len());
        message.extend_from_slice(&(body.len() as u32).to_be_bytes());
        message.extend_from_slice(&body);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn payload() -> WatchPayload {
        WatchPayload::new(
            &PathBuf::from("/tmp/mod.py"),
            &vec![
                ("x = 1".to_string(), Stats::SPECIALIZED),
                ("\n".to_string(), Stats::default()),
            ],
        )
    }

    #[test]
    fn test_frame_length_prefix() {
        let framed = payload().frame().unwrap();
        let length = u32::from_be_bytes(framed[..4].try_into().unwrap()) as usize;
        assert_eq!(length, framed.len() - 4);
    }

    #[test]
    fn test_frame_body_is_named_map() {
        let framed = payload().frame().unwrap();
        let value: serde_json::Value = rmp_serde::from_slice(&framed[4..]).unwrap();
        assert_eq!(value["path"], "/tmp/mod.py");
        assert_eq!(value["results"][0]["source"], "x = 1");
        assert_eq!(value["results"][0]["stats"]["specialized"], 1);
        assert_eq!(value["results"][1]["stats"]["unquickened"], 0);
    }

    #[test]
    fn test_frame_round_trips() {
        let original = payload();
        let framed = original.frame().unwrap();
        let decoded: WatchPayload = rmp_serde::from_slice(&framed[4..]).unwrap();
        assert_eq!(decoded, original);
    }
}
