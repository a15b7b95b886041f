use std::io;

use thiserror::Error;

/// Errors that abort a progress-tracked transfer
#[derive(Error, Debug)]
pub enum TransferError {
    /// The destination sink rejected or failed a write
    #[error("write to destination failed after {written} bytes: {source}")]
    DestinationWrite { written: u64, source: io::Error },

    /// The source stream failed mid-read
    #[error("read from source failed after {written} bytes: {source}")]
    SourceRead { written: u64, source: io::Error },
}

impl TransferError {
    /// Bytes forwarded to the destination before the failure
    pub fn bytes_written(&self) -> u64 {
        match self {
            Self::DestinationWrite { written, .. } | Self::SourceRead { written, .. } => *written,
        }
    }
}

/// Type alias for Results using TransferError
pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_byte_count() {
        let err = TransferError::DestinationWrite {
            written: 500,
            source: io::Error::other("disk full"),
        };

        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("disk full"));
        assert_eq!(err.bytes_written(), 500);
    }

    #[test]
    fn test_source_error_exposes_io_source() {
        let err = TransferError::SourceRead {
            written: 12,
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };

        let source = std::error::Error::source(&err).expect("io source");
        assert_eq!(source.to_string(), "reset");
        assert_eq!(err.bytes_written(), 12);
    }
}
