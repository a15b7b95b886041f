use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

use crate::reporter::render_line;

/// A consistent read of a counter's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Bytes accepted by the destination so far
    pub bytes_written: u64,
    /// Declared size of the transfer, 0 when unknown
    pub total_expected: u64,
    /// Decimal digits needed to print `total_expected`
    pub width: usize,
}

impl Snapshot {
    /// Render this snapshot as a progress line
    pub fn line(&self) -> String {
        render_line(self.bytes_written, self.total_expected, self.width)
    }
}

#[derive(Debug)]
struct Shared {
    bytes_written: AtomicU64,
    total_expected: u64,
    width: usize,
}

impl Shared {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bytes_written: self.bytes_written.load(Ordering::Acquire),
            total_expected: self.total_expected,
            width: self.width,
        }
    }
}

/// Read-only view of a [`ByteCounter`], safe to poll from another task
#[derive(Debug, Clone)]
pub struct CounterHandle {
    shared: Arc<Shared>,
}

impl CounterHandle {
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }
}

/// Write-through wrapper that counts the bytes its destination accepts
///
/// The count only grows: a failed write forwards the error and records
/// nothing, a short write records only what the destination took.
#[derive(Debug)]
pub struct ByteCounter<W> {
    destination: W,
    shared: Arc<Shared>,
}

impl<W> ByteCounter<W> {
    /// Wrap `destination`; `total_expected` is 0 when the size is unknown
    pub fn new(destination: W, total_expected: u64) -> Self {
        Self {
            destination,
            shared: Arc::new(Shared {
                bytes_written: AtomicU64::new(0),
                total_expected,
                width: decimal_width(total_expected),
            }),
        }
    }

    /// Handle for a concurrent observer
    pub fn handle(&self) -> CounterHandle {
        CounterHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    pub fn get_ref(&self) -> &W {
        &self.destination
    }

    /// Give the destination back once the transfer is over
    pub fn into_inner(self) -> W {
        self.destination
    }

    fn record(&self, n: usize) {
        self.shared
            .bytes_written
            .fetch_add(n as u64, Ordering::Release);
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ByteCounter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.destination).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.record(n);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().destination).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().destination).poll_shutdown(cx)
    }
}

/// Number of characters in the decimal rendering of `n`
fn decimal_width(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |digits| digits as usize + 1)
}
