//! Live watch mode: continuous re-attribution streamed over TCP
//!
//! A dedicated monitor thread recomputes the attribution for every tracked
//! file in a tight loop, diffs each result against the previous one, and
//! enqueues a payload only on change. A socket server accepts arbitrarily
//! many observers; per-connection workers drain one shared FIFO queue and
//! write length-framed MessagePack messages. Draining is destructive and
//! shared: concurrent observers compete for payloads rather than each
//! receiving a copy.

pub mod monitor;
pub mod payload;
pub mod socket;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;
use crossbeam::queue::SegQueue;

use crate::opcodes::OpcodeTable;
use crate::records::CodeUnitRegistry;

pub use monitor::WatchMonitor;
pub use payload::{ChunkResult, WatchPayload};
pub use socket::WatchServer;

/// Default TCP port for the analysis socket.
pub const DEFAULT_WATCH_PORT: u16 = 9001;

/// A running watch session: monitor thread, accept thread, and the shared
/// stop signal. Dropping without `stop()` still shuts everything down.
pub struct WatchHandle {
    running: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
    server: WatchServer,
}

impl WatchHandle {
    /// Port the analysis socket is listening on (useful with port 0).
    pub fn port(&self) -> u16 {
        self.server.port()
    }

    /// Signal cooperative shutdown and wait for the monitor and server
    /// threads to exit.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
        self.server.shutdown();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
    }
}

/// Start watch mode: bind the analysis socket, then start the monitor loop
/// over the tracked targets.
pub fn watch(
    registry: Arc<CodeUnitRegistry>,
    targets: Vec<PathBuf>,
    table: Arc<OpcodeTable>,
    port: u16,
) -> Result<WatchHandle> {
    let queue = Arc::new(SegQueue::new());
    let running = Arc::new(AtomicBool::new(true));

    let server = WatchServer::bind(port, Arc::clone(&queue), Arc::clone(&running))?;
    let monitor = WatchMonitor::new(registry, targets, table, queue, Arc::clone(&running));
    let monitor = monitor.spawn()?;

    Ok(WatchHandle {
        running,
        monitor: Some(monitor),
        server,
    })
}
