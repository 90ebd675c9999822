//! Frame codec
//!
//! Wire layout of one frame:
//!
//! ```text
//! [ A T <token: 12 bytes> <length: 4 hex digits> <JSON content: length bytes> ]
//! ```
//!
//! The token region is echoed from configuration on send and ignored on
//! receive. The length field is upper-case, zero-padded hex on send; any hex
//! digits are accepted on receive.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{FrameError, ProtocolResult};
use crate::message::{Message, Token};

/// Frame start marker
pub const FRAME_START: u8 = b'[';
/// Frame end marker
pub const FRAME_END: u8 = b']';
/// Vendor tag following the start marker
pub const VENDOR_TAG: &[u8; 2] = b"AT";
/// Length of the token region
pub const TOKEN_LEN: usize = 12;
/// Number of hex digits in the length field
pub const LENGTH_DIGITS: usize = 4;
/// Largest content length the length field can express
pub const MAX_CONTENT_LEN: usize = 0xFFFF;

const VENDOR_OFFSET: usize = 1;
const LENGTH_OFFSET: usize = VENDOR_OFFSET + VENDOR_TAG.len() + TOKEN_LEN;
/// Bytes preceding the JSON content
pub const PREAMBLE_LEN: usize = LENGTH_OFFSET + LENGTH_DIGITS;

/// Total frame size for a given content length
pub const fn frame_len(content_len: usize) -> usize {
    PREAMBLE_LEN + content_len + 1
}

/// Encode a message into a complete frame
pub fn encode_frame(token: &Token, message: &Message) -> ProtocolResult<Bytes> {
    let content = message.to_vec()?;
    let mut dst = BytesMut::with_capacity(frame_len(content.len()));
    write_frame(token, &content, &mut dst)?;
    Ok(dst.freeze())
}

/// Decode exactly one frame from the front of `src`
///
/// Returns the message and the number of bytes consumed. A buffer that ends
/// before the frame is complete is reported as [`FrameError::Truncated`].
pub fn decode_frame(src: &[u8]) -> ProtocolResult<(Message, usize)> {
    let mut buf = BytesMut::from(src);
    let before = buf.len();
    match FrameCodec::decode_inner(&mut buf)? {
        Some(message) => Ok((message, before - buf.len())),
        None => Err(truncated(&buf)),
    }
}

fn write_frame(token: &Token, content: &[u8], dst: &mut BytesMut) -> ProtocolResult<()> {
    if content.len() > MAX_CONTENT_LEN {
        return Err(FrameError::TooLarge(content.len()));
    }
    dst.reserve(frame_len(content.len()));
    dst.put_u8(FRAME_START);
    dst.put_slice(VENDOR_TAG);
    dst.put_slice(token.as_bytes());
    dst.put_slice(format!("{:04X}", content.len()).as_bytes());
    dst.put_slice(content);
    dst.put_u8(FRAME_END);
    Ok(())
}

fn parse_length(field: &[u8]) -> ProtocolResult<usize> {
    let invalid = || FrameError::InvalidLength(String::from_utf8_lossy(field).into_owned());
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let text = std::str::from_utf8(field).map_err(|_| invalid())?;
    usize::from_str_radix(text, 16).map_err(|_| invalid())
}

fn truncated(buf: &BytesMut) -> FrameError {
    let expected = if buf.len() >= PREAMBLE_LEN {
        parse_length(&buf[LENGTH_OFFSET..PREAMBLE_LEN])
            .map(frame_len)
            .unwrap_or(PREAMBLE_LEN)
    } else {
        PREAMBLE_LEN
    };
    FrameError::Truncated {
        expected,
        actual: buf.len(),
    }
}

/// Streaming codec for `FramedRead` / `FramedWrite`
#[derive(Debug, Clone)]
pub struct FrameCodec {
    token: Token,
}

impl FrameCodec {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    fn decode_inner(src: &mut BytesMut) -> ProtocolResult<Option<Message>> {
        if src.is_empty() {
            return Ok(None);
        }
        if src[0] != FRAME_START {
            return Err(FrameError::InvalidStart(src[0]));
        }
        let vendor_end = VENDOR_OFFSET + VENDOR_TAG.len();
        if src.len() >= vendor_end && &src[VENDOR_OFFSET..vendor_end] != VENDOR_TAG {
            return Err(FrameError::InvalidVendor(
                String::from_utf8_lossy(&src[VENDOR_OFFSET..vendor_end]).into_owned(),
            ));
        }
        if src.len() < PREAMBLE_LEN {
            src.reserve(PREAMBLE_LEN - src.len());
            return Ok(None);
        }

        let length = parse_length(&src[LENGTH_OFFSET..PREAMBLE_LEN])?;
        let total = frame_len(length);
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let end = src[total - 1];
        if end != FRAME_END {
            return Err(FrameError::InvalidEnd(end));
        }

        let frame = src.split_to(total);
        trace!(length, "Decoded frame");
        Message::from_slice(&frame[PREAMBLE_LEN..total - 1]).map(Some)
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        Self::decode_inner(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        match Self::decode_inner(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(truncated(src)),
        }
    }
}

impl<'a> Encoder<&'a Message> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        let content = item.to_vec()?;
        write_frame(&self.token, &content, dst)
    }
}
