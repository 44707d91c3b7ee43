//! Write-through sink for child output that watches for a marker substring.
//!
//! Every chunk read from the child is first written to the real destination
//! (the developer's terminal) and then scanned for the armed marker. When the
//! marker shows up the armed [`MarkerWait`] resolves exactly once and scanning
//! pauses until the sink is re-armed for the next phase (startup marker,
//! then shutdown marker).
//!
//! Scanning spans chunk boundaries: the last `marker.len() - 1` bytes of each
//! chunk are carried into the next scan, so a marker split across two reads
//! is still found.

use std::sync::Arc;

use memchr::memmem;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tracing::debug;

const READ_BUFFER: usize = 8 * 1024;

#[derive(Debug, Default)]
struct Armed {
    marker: Vec<u8>,
    notify: Option<oneshot::Sender<()>>,
    carry: Vec<u8>,
}

/// Shared output sink for both streams of one child process.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    armed: Arc<Mutex<Armed>>,
}

/// Resolves once the marker armed with [`OutputSink::arm`] has been seen.
#[derive(Debug)]
pub struct MarkerWait {
    rx: oneshot::Receiver<()>,
}

impl MarkerWait {
    /// Wait for the marker.
    ///
    /// If the sink is re-armed or dropped before the marker appears this
    /// never resolves, leaving the caller's other race branches to decide.
    pub async fn seen(self) {
        if self.rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch for `marker`, replacing whatever marker was armed before.
    ///
    /// An empty marker is satisfied immediately.
    pub fn arm(&self, marker: &str) -> MarkerWait {
        let (tx, rx) = oneshot::channel();
        let mut armed = self.armed.lock();
        armed.carry.clear();
        if marker.is_empty() {
            armed.marker.clear();
            armed.notify = None;
            let _ = tx.send(());
        } else {
            armed.marker = marker.as_bytes().to_vec();
            armed.notify = Some(tx);
        }
        MarkerWait { rx }
    }

    /// Whether a marker is armed and not yet seen.
    pub fn is_armed(&self) -> bool {
        self.armed.lock().notify.is_some()
    }

    /// Scan one chunk of output for the armed marker.
    pub fn observe(&self, chunk: &[u8]) {
        let mut armed = self.armed.lock();
        if armed.notify.is_none() {
            return;
        }

        let mut window = std::mem::take(&mut armed.carry);
        window.extend_from_slice(chunk);

        if memmem::find(&window, &armed.marker).is_some() {
            if let Some(tx) = armed.notify.take() {
                let _ = tx.send(());
            }
            return;
        }

        let keep = armed.marker.len().saturating_sub(1).min(window.len());
        armed.carry = window.split_off(window.len() - keep);
    }

    /// Copy `reader` into `writer` until EOF, scanning everything that passes.
    ///
    /// Write failures on the terminal side do not stop scanning; a child whose
    /// output cannot be displayed must still be able to signal readiness.
    pub async fn forward<R, W>(self, mut reader: R, mut writer: W)
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER];
        let mut display = true;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    debug!(%err, "child output stream closed with error");
                    break;
                }
            };

            if display {
                let written = writer.write_all(&buf[..n]).await;
                let flushed = match written {
                    Ok(()) => writer.flush().await,
                    Err(err) => Err(err),
                };
                if let Err(err) = flushed {
                    debug!(%err, "terminal write failed, output no longer displayed");
                    display = false;
                }
            }

            self.observe(&buf[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn resolves(wait: MarkerWait) -> bool {
        tokio::time::timeout(Duration::from_millis(50), wait.seen())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn test_marker_in_single_chunk() {
        let sink = OutputSink::new();
        let wait = sink.arm("server listening");

        sink.observe(b"booting\n");
        assert!(sink.is_armed());
        sink.observe(b"2024/01/01 server listening on :8080\n");
        assert!(!sink.is_armed());
        assert!(resolves(wait).await);
    }

    #[tokio::test]
    async fn test_marker_split_across_chunks() {
        let sink = OutputSink::new();
        let wait = sink.arm("server listening");

        sink.observe(b"... server lis");
        sink.observe(b"tening on :8080");
        assert!(resolves(wait).await);
    }

    #[tokio::test]
    async fn test_no_match_keeps_waiting() {
        let sink = OutputSink::new();
        let wait = sink.arm("shutdown complete");

        sink.observe(b"shutdown started\n");
        sink.observe(b"closing listeners\n");
        assert!(sink.is_armed());
        assert!(!resolves(wait).await);
    }

    #[tokio::test]
    async fn test_rearm_switches_phase() {
        let sink = OutputSink::new();
        let ready = sink.arm("ready");
        sink.observe(b"ready\n");
        assert!(resolves(ready).await);

        // Later output containing the old marker must not satisfy the new one
        let shutdown = sink.arm("bye");
        sink.observe(b"ready again\n");
        assert!(sink.is_armed());
        sink.observe(b"bye\n");
        assert!(resolves(shutdown).await);
    }

    #[tokio::test]
    async fn test_empty_marker_is_immediately_seen() {
        let sink = OutputSink::new();
        let wait = sink.arm("");
        assert!(!sink.is_armed());
        assert!(resolves(wait).await);
    }

    #[tokio::test]
    async fn test_forward_writes_through_and_detects() {
        let sink = OutputSink::new();
        let wait = sink.arm("listening");

        let input: &[u8] = b"line one\nnow listening on 127.0.0.1:4000\n";
        let mut output = Vec::new();
        sink.clone().forward(input, &mut output).await;

        assert_eq!(output, input);
        assert!(resolves(wait).await);
    }
}
