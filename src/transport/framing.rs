//! Length-prefixed framing over stream connections.
//!
//! Wire format:
//! ```text
//! +----------------------+---------------------+
//! | Length (u32, BE)     | Payload             |
//! | 4 bytes              | `Length` bytes      |
//! +----------------------+---------------------+
//! ```
//!
//! The free functions enforce no size limit; [`FramedConnection`] applies an
//! optional cap before allocating, for callers facing untrusted peers.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{TransportError, TransportResult, is_disconnect};
use crate::core::Message;
use crate::core::constants::FRAME_HEADER_SIZE;

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);

    writer
        .write_all(&frame)
        .await
        .map_err(TransportError::from_io)?;
    writer.flush().await.map_err(TransportError::from_io)
}

/// Read one frame.
///
/// Returns `Ok(None)` if the peer closes before the header or the payload is
/// complete.
pub async fn read_frame<R>(reader: &mut R) -> TransportResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    read_frame_limited(reader, None).await
}

/// Read one frame, rejecting announced lengths above `max`.
pub async fn read_frame_limited<R>(
    reader: &mut R,
    max: Option<usize>,
) -> TransportResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    if !read_full(reader, &mut header).await? {
        return Ok(None);
    }

    let len = u32::from_be_bytes(header) as usize;
    match max {
        Some(max) if len > max => return Err(TransportError::FrameTooLarge { len, max }),
        _ => {}
    }

    let mut payload = vec![0u8; len];
    if !read_full(reader, &mut payload).await? {
        return Ok(None);
    }
    Ok(Some(payload))
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> TransportResult<bool>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if is_disconnect(&e) => Ok(false),
        Err(e) => Err(TransportError::Io(e)),
    }
}

/// A stream connection speaking length-prefixed frames.
#[derive(Debug)]
pub struct FramedConnection<S> {
    stream: S,
    max_payload: Option<usize>,
}

impl<S> FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream without a payload cap.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_payload: None,
        }
    }

    /// Reject incoming payloads larger than `max` bytes.
    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload = Some(max);
        self
    }

    /// Incoming payload cap, if any.
    pub fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }

    /// Send raw payload bytes.
    pub async fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        write_frame(&mut self.stream, payload).await
    }

    /// Send a typed message.
    pub async fn send_message(&mut self, message: &Message) -> TransportResult<()> {
        self.send(message.as_bytes()).await
    }

    /// Receive raw payload bytes; a clean close is `ConnectionClosed`.
    pub async fn recv(&mut self) -> TransportResult<Vec<u8>> {
        read_frame_limited(&mut self.stream, self.max_payload)
            .await?
            .ok_or(TransportError::ConnectionClosed)
    }

    /// Receive and classify a message.
    pub async fn recv_message(&mut self) -> TransportResult<Message> {
        Ok(Message::classify(self.recv().await?))
    }

    /// Shut down the write half; errors from an already-dead peer are ignored.
    pub async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
