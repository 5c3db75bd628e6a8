//! Change detector: recompute, diff, enqueue
//!
//! The monitor thread owns the previous-results cache exclusively; no other
//! thread reads it, so it needs no locking. Files are recomputed round-robin
//! in a tight loop with no fixed delay. A recomputation failure for one file
//! is logged and isolated — the loop keeps going for the other files and on
//! later iterations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::queue::SegQueue;

use crate::analysis::{read_file, FileResults};
use crate::opcodes::OpcodeTable;
use crate::records::CodeUnitRegistry;
use crate::watch::payload::WatchPayload;

pub struct WatchMonitor {
    registry: Arc<CodeUnitRegistry>,
    targets: Vec<PathBuf>,
    table: Arc<OpcodeTable>,
    queue: Arc<SegQueue<WatchPayload>>,
    running: Arc<AtomicBool>,
}

impl WatchMonitor {
    pub fn new(
        registry: Arc<CodeUnitRegistry>,
        targets: Vec<PathBuf>,
        table: Arc<OpcodeTable>,
        queue: Arc<SegQueue<WatchPayload>>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            targets,
            table,
            queue,
            running,
        }
    }

    /// Start the detector loop on its own thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("avivar.watch.monitor".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        let mut previous: HashMap<PathBuf, FileResults> = HashMap::new();

        while self.running.load(Ordering::SeqCst) {
            for target in &self.targets {
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                match self.recompute(target) {
                    Ok(results) => self.detect(target, results, &mut previous),
                    Err(err) => {
                        // Isolated: other files and later iterations continue.
                        tracing::warn!(
                            target_path = %target.display(),
                            error = %err,
                            "watch recomputation failed"
                        );
                    }
                }
            }
        }
        tracing::info!("watch monitor stopped");
    }

    fn recompute(&self, target: &PathBuf) -> Result<FileResults, crate::error::AnalysisError> {
        let unit = self
            .registry
            .unit_for_path(target)
            .ok_or(crate::error::AnalysisError::MissingTarget)?;
        read_file(target, unit, &self.table)
    }

    fn detect(
        &self,
        target: &PathBuf,
        results: FileResults,
        previous: &mut HashMap<PathBuf, FileResults>,
    ) {
        let changed = match previous.get(target) {
            Some(stored) => *stored != results,
            None => true,
        };
        if changed {
            let payload = WatchPayload::new(target, &results);
            previous.insert(target.clone(), results);
            self.queue.push(payload);
        }
    }
}
