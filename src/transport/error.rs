//! Transport layer error types.

use std::io;

use thiserror::Error;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection or it broke mid-frame.
    #[error("connection closed")]
    ConnectionClosed,

    /// Payload exceeds what the length prefix or the receiver accepts.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Announced or actual payload length.
        len: usize,
        /// Applicable limit.
        max: usize,
    },

    /// A bounded wait elapsed.
    #[error("timed out")]
    Timeout,
}

impl TransportError {
    /// Map a socket error, folding disconnect-style kinds into `ConnectionClosed`.
    pub fn from_io(err: io::Error) -> Self {
        if is_disconnect(&err) {
            TransportError::ConnectionClosed
        } else {
            TransportError::Io(err)
        }
    }

    /// Check if the peer went away.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, TransportError::ConnectionClosed)
    }

    /// Check if this error is fatal to the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Timeout)
    }
}

/// Check whether an I/O error means the other side is gone.
pub(crate) fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::WriteZero
    )
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
