//! Length-prefixed framing over an ordered byte stream.
//!
//! Every frame on the wire is:
//!
//! ```text
//! ┌──────────────────────┬───────────────────────────┐
//! │ len: u32 big-endian  │ payload: exactly len bytes │
//! └──────────────────────┴───────────────────────────┘
//! ```
//!
//! The framing layer knows nothing about what the payload means. It only
//! guarantees that one `write_frame` on one side comes out as exactly one
//! `read_frame` on the other.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Size of the length prefix in bytes.
pub const LEN_PREFIX: usize = 4;

/// Largest payload a single frame may carry.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` if the stream ends cleanly on a frame boundary.
///
/// # Errors
/// - [`TransportError::ConnectionClosed`] if the stream ends partway
///   through the length prefix or the payload.
/// - [`TransportError::FrameTooLarge`] if the prefix exceeds
///   [`MAX_FRAME_LEN`].
/// - [`TransportError::ReceiveFailed`] for any other I/O error.
pub async fn read_frame<R>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LEN_PREFIX];
    let mut filled = 0;

    // `read_exact` can't tell "nothing arrived" from "half a prefix arrived",
    // so the prefix is read by hand.
    while filled < LEN_PREFIX {
        let n = reader
            .read(&mut prefix[filled..])
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::ConnectionClosed(format!(
                "stream ended after {filled} of {LEN_PREFIX} prefix bytes"
            )));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed(format!(
                "stream ended inside a {len} byte payload"
            ))
        } else {
            TransportError::ReceiveFailed(e)
        }
    })?;

    Ok(Some(payload))
}

/// Writes `payload` as one frame and flushes the writer.
///
/// # Errors
/// - [`TransportError::FrameTooLarge`] if `payload` exceeds
///   [`MAX_FRAME_LEN`]. Nothing is written in that case.
/// - [`TransportError::SendFailed`] if the underlying write fails.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);

    writer
        .write_all(&frame)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}
