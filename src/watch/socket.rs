//! Analysis socket: accept loop and per-connection workers
//!
//! The listener accepts arbitrarily many concurrent observers. Each
//! accepted connection gets its own worker thread that drains the shared
//! payload queue and writes length-framed MessagePack messages. A write
//! failure terminates only that connection's worker; the queue, the other
//! workers, and the accept loop are unaffected.

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::queue::SegQueue;

use crate::watch::payload::WatchPayload;

/// Poll interval for the non-blocking accept loop and for workers waiting
/// on an empty queue. Short enough that the stop signal is observed
/// promptly, long enough not to spin.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct WatchServer {
    port: u16,
    accept: Option<JoinHandle<()>>,
}

impl WatchServer {
    /// Bind the analysis socket and start the accept loop. Port 0 binds an
    /// ephemeral port; `port()` reports the actual one.
    pub fn bind(
        port: u16,
        queue: Arc<SegQueue<WatchPayload>>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
        let port = listener.local_addr()?.port();
        // Non-blocking so the accept loop can observe the stop signal
        // before every blocking step.
        listener.set_nonblocking(true)?;

        let accept = thread::Builder::new()
            .name("avivar.watch.socket".to_string())
            .spawn(move || Self::accept_loop(listener, queue, running))?;

        Ok(Self {
            port,
            accept: Some(accept),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the accept loop to exit. Callers clear the shared running
    /// flag first; worker threads exit on their own once they observe it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.accept.take() {
            let _ = handle.join();
        }
    }

    fn accept_loop(
        listener: TcpListener,
        queue: Arc<SegQueue<WatchPayload>>,
        running: Arc<AtomicBool>,
    ) {
        while running.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    tracing::info!(%peer, "watch client connected");
                    if stream.set_nonblocking(false).is_err() {
                        continue;
                    }
                    let queue = Arc::clone(&queue);
                    let running = Arc::clone(&running);
                    let spawned = thread::Builder::new()
                        .name("avivar.watch.stream".to_string())
                        .spawn(move || Self::stream_loop(stream, queue, running));
                    if let Err(err) = spawned {
                        tracing::warn!(error = %err, "failed to spawn watch worker");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
        tracing::info!("watch socket stopped");
        // The listener drops here, releasing the port deterministically.
    }

    /// Per-connection worker: pop, frame, write. Shared destructive drain —
    /// a payload popped here is gone for every other worker.
    fn stream_loop(
        mut stream: TcpStream,
        queue: Arc<SegQueue<WatchPayload>>,
        running: Arc<AtomicBool>,
    ) {
        while running.load(Ordering::SeqCst) {
            let Some(payload) = queue.pop() else {
                thread::sleep(POLL_INTERVAL);
                continue;
            };
            let message = match payload.frame() {
                Ok(message) => message,
                Err(err) => {
                    tracing::warn!(error = %err, "payload encoding failed");
                    continue;
                }
            };
            if let Err(err) = stream.write_all(&message) {
                // No retry, no reconnect: this worker is done.
                tracing::warn!(error = %err, "watch client write failed");
                return;
            }
        }
    }
}

impl Drop for WatchServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use std::io::Read;
    use std::path::PathBuf;

    fn payload(text: &str) -> WatchPayload {
        WatchPayload::new(
            &PathBuf::from("/tmp/mod.py"),
            &vec![(text.to_string(), Stats::SPECIALIZED)],
        )
    }

    fn read_frame(stream: &mut TcpStream) -> WatchPayload {
        let mut length = [0u8; 4];
        stream.read_exact(&mut length).unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(length) as usize];
        stream.read_exact(&mut body).unwrap();
        rmp_serde::from_slice(&body).unwrap()
    }

    #[test]
    fn test_client_receives_framed_payload() {
        let queue = Arc::new(SegQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        let mut server =
            WatchServer::bind(0, Arc::clone(&queue), Arc::clone(&running)).unwrap();

        let mut client =
            TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).unwrap();
        queue.push(payload("x = 1"));

        let received = read_frame(&mut client);
        assert_eq!(received.path, "/tmp/mod.py");
        assert_eq!(received.results[0].source, "x = 1");

        running.store(false, Ordering::SeqCst);
        server.shutdown();
    }

    #[test]
    fn test_worker_fifo_order_for_single_client() {
        let queue = Arc::new(SegQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        let mut server =
            WatchServer::bind(0, Arc::clone(&queue), Arc::clone(&running)).unwrap();

        let mut client =
            TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).unwrap();
        // Give the worker a moment to attach before enqueueing, so a single
        // worker observes the whole sequence.
        thread::sleep(Duration::from_millis(50));
        for text in ["first", "second", "third"] {
            queue.push(payload(text));
        }

        let sources: Vec<String> = (0..3)
            .map(|_| read_frame(&mut client).results[0].source.clone())
            .collect();
        assert_eq!(sources, ["first", "second", "third"]);

        running.store(false, Ordering::SeqCst);
        server.shutdown();
    }

    #[test]
    fn test_disconnected_client_does_not_stop_server() {
        let queue = Arc::new(SegQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        let mut server =
            WatchServer::bind(0, Arc::clone(&queue), Arc::clone(&running)).unwrap();

        {
            let _client =
                TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).unwrap();
            thread::sleep(Duration::from_millis(50));
            // Dropped here: the dead worker may swallow a payload or two
            // before its write fails and it exits.
        }

        // A new client must still get served. Keep feeding payloads until
        // one makes it through, since the dying worker races for them.
        let mut client =
            TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).unwrap();
        let feeding = Arc::new(AtomicBool::new(true));
        let feeder = {
            let queue = Arc::clone(&queue);
            let feeding = Arc::clone(&feeding);
            thread::spawn(move || {
                while feeding.load(Ordering::SeqCst) {
                    queue.push(payload("fresh"));
                    thread::sleep(Duration::from_millis(20));
                }
            })
        };
        let received = read_frame(&mut client);
        feeding.store(false, Ordering::SeqCst);
        feeder.join().unwrap();
        assert_eq!(received.results[0].source, "fresh");

        running.store(false, Ordering::SeqCst);
        server.shutdown();
    }
}
