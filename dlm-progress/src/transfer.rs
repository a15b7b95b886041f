use std::io::{self, Write};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::counter::ByteCounter;
use crate::error::{Result, TransferError};
use crate::reporter::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, ProgressReporter};

/// Upper bound for a single copy buffer (1 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1 << 20;

/// Tuning knobs for [`copy_with_progress`]
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Interval between two progress ticks
    pub poll_interval: Duration,
    /// Largest buffer used for one read/write round
    pub max_chunk_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval, raised to at least [`MIN_POLL_INTERVAL`]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size.max(1);
        self
    }

    /// Buffer size for a transfer of `total_expected` bytes (0 = unknown)
    pub fn chunk_size(&self, total_expected: u64) -> usize {
        let cap = self.max_chunk_size.max(1);
        if total_expected == 0 {
            return cap;
        }
        usize::try_from(total_expected).map_or(cap, |total| total.min(cap))
    }
}

/// What a finished transfer hands back to its caller
#[derive(Debug)]
pub struct TransferOutcome<D, O> {
    pub bytes_written: u64,
    pub total_expected: u64,
    pub destination: D,
    /// The progress sink, `None` if the reporter task died holding it
    pub output: Option<O>,
}

/// Copy `source` into `destination` while reporting progress into `output`.
///
/// The reporter runs as its own task for the whole copy. Whatever way the copy
/// ends, the reporter is stopped first and the final line is written exactly
/// once, so a failed transfer still shows how far it got. Bytes already written
/// stay in the destination. The reporter never turns a transfer into a failure:
/// if its task dies, the copy result stands and only the sink is lost.
pub async fn copy_with_progress<S, D, O>(
    mut source: S,
    total_expected: u64,
    destination: D,
    output: O,
    options: &TransferOptions,
) -> Result<TransferOutcome<D, O>>
where
    S: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
    O: Write + Send + 'static,
{
    let mut counter = ByteCounter::new(destination, total_expected);
    let reporter = ProgressReporter::spawn(counter.handle(), output, options.poll_interval);

    let copied = pump(
        &mut source,
        &mut counter,
        options.chunk_size(total_expected),
    )
    .await;
    let output = reporter.finish().await;
    let bytes_written = copied?;

    let mut destination = counter.into_inner();
    if let Err(source) = destination.flush().await {
        return Err(TransferError::DestinationWrite {
            written: bytes_written,
            source,
        });
    }

    tracing::debug!(bytes_written, total_expected, "transfer complete");
    Ok(TransferOutcome {
        bytes_written,
        total_expected,
        destination,
        output,
    })
}

async fn pump<S, D>(source: &mut S, counter: &mut ByteCounter<D>, chunk_size: usize) -> Result<u64>
where
    S: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size];

    loop {
        let read = match source.read(&mut buf).await {
            Ok(0) => return Ok(counter.snapshot().bytes_written),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(TransferError::SourceRead {
                    written: counter.snapshot().bytes_written,
                    source,
                });
            }
        };

        let result = counter.write_all(&buf[..read]).await;
        if let Err(source) = result {
            return Err(TransferError::DestinationWrite {
                written: counter.snapshot().bytes_written,
                source,
            });
        }
    }
}
