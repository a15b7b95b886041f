//! Progress-tracked streaming transfers.
//!
//! A [`ByteCounter`] wraps the destination sink and counts every byte the sink
//! accepts. A [`ProgressReporter`] runs as a separate tokio task, polls the
//! counter through a read-only [`CounterHandle`] and rewrites a single terminal
//! line in place. [`copy_with_progress`] ties the two together and guarantees
//! exactly one final report once the copy has finished.
//!
//! ```no_run
//! # async fn demo() -> dlm_progress::Result<()> {
//! use dlm_progress::{TransferOptions, copy_with_progress};
//!
//! let body: &[u8] = b"hello world";
//! let outcome = copy_with_progress(
//!     body,
//!     body.len() as u64,
//!     Vec::<u8>::new(),
//!     std::io::stdout(),
//!     &TransferOptions::default(),
//! )
//! .await?;
//! assert_eq!(outcome.bytes_written, 11);
//! # Ok(())
//! # }
//! ```

pub mod counter;
pub mod error;
pub mod reporter;
pub mod transfer;

pub use counter::{ByteCounter, CounterHandle, Snapshot};
pub use error::{Result, TransferError};
pub use reporter::{
    DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, ProgressReporter, render_line, report_final,
};
pub use transfer::{DEFAULT_MAX_CHUNK_SIZE, TransferOptions, TransferOutcome, copy_with_progress};
