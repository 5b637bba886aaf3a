//! Message Frame Codec
//!
//! Every message is stored on disk as a frame: a 4-byte big-endian unsigned
//! length followed by exactly that many payload bytes. A segment file is a
//! packed sequence of frames: no magic bytes, no checksum, no version field.
//!
//! ```text
//! ┌─────────────┬──────────────┐
//! │ Length (u32)│ Payload      │
//! │ big-endian  │ L bytes      │
//! └─────────────┴──────────────┘
//! ```
//!
//! The writer validates payload sizes against the queue's configured bounds
//! before any bytes hit disk. The reader validates the length prefix before
//! trusting it: a zero length or one above the configured maximum means the
//! bytes under the cursor are not a frame, and the reader resynchronizes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Size of the length prefix preceding every payload.
pub const FRAME_HEADER_LEN: usize = 4;

/// Total on-disk size of a frame carrying `msg`.
pub fn frame_len(msg: &[u8]) -> usize {
    FRAME_HEADER_LEN + msg.len()
}

/// Append one encoded frame to `buf`.
///
/// Fails with `InvalidMessageSize` when the payload is outside
/// `[min_msg_size, max_msg_size]`; nothing is written in that case.
pub fn encode_frame(
    buf: &mut BytesMut,
    msg: &[u8],
    min_msg_size: i32,
    max_msg_size: i32,
) -> Result<()> {
    let size = msg.len() as i64;
    if size < min_msg_size as i64 || size > max_msg_size as i64 {
        return Err(Error::InvalidMessageSize {
            size: msg.len(),
            min: min_msg_size,
            max: max_msg_size,
        });
    }

    buf.reserve(frame_len(msg));
    buf.put_u32(msg.len() as u32);
    buf.put_slice(msg);
    Ok(())
}

/// Validate a length prefix read off disk, returning the payload length.
///
/// A zero length or one exceeding `max_msg_size` cannot have been produced by
/// `encode_frame` and is reported as `BadFrameLength`.
pub fn validate_frame_len(len: u32, max_msg_size: i32) -> Result<usize> {
    if len == 0 || len as i64 > max_msg_size as i64 {
        return Err(Error::BadFrameLength {
            len,
            max: max_msg_size,
        });
    }
    Ok(len as usize)
}

/// Decode one frame from the front of `src`.
///
/// Returns the payload and the number of bytes consumed (header + payload).
/// Fails with `BadFrameLength` on an invalid prefix and `ShortRead` when
/// `src` ends before the frame does.
pub fn decode_frame(src: &[u8], max_msg_size: i32) -> Result<(Bytes, usize)> {
    if src.len() < FRAME_HEADER_LEN {
        return Err(Error::ShortRead {
            wanted: FRAME_HEADER_LEN,
            got: src.len(),
        });
    }

    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
    let payload_len = validate_frame_len(len, max_msg_size)?;

    let total = FRAME_HEADER_LEN + payload_len;
    if src.len() < total {
        return Err(Error::ShortRead {
            wanted: total,
            got: src.len(),
        });
    }

    Ok((Bytes::copy_from_slice(&src[FRAME_HEADER_LEN..total]), total))
}
