use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;
use tokio_util::codec::Decoder;

use crate::frame::{self, Frame};

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Splits the byte stream of a connection into requests.
///
/// Requests come in two framings. A leading `*` starts a RESP array which is decoded with
/// [`Frame::parse`]. Anything else is an inline command: a single line, split on spaces. Both are
/// yielded as a `Frame::Array` of bulk strings, the only shape the command dispatcher accepts.
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> FrameCodec {
        FrameCodec { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = frame::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.is_empty() {
                return Ok(None);
            }

            // Check if the frame size exceeds a certain limit to prevent DoS attacks
            if src.len() > self.max_frame_size {
                return Err(frame::Error::InvalidInput(format!(
                    "request exceeds {} bytes",
                    self.max_frame_size
                )));
            }

            let (frame, position) = if src[0] == b'*' {
                let mut cursor = Cursor::new(&src[..]);
                let frame = match Frame::parse(&mut cursor) {
                    Ok(frame) => frame,
                    Err(frame::Error::Incomplete) => return Ok(None), // Not enough data to parse a frame.
                    Err(err) => return Err(err),
                };

                (frame, cursor.position() as usize)
            } else {
                match parse_inline(src) {
                    Some(parsed) => parsed,
                    None => return Ok(None),
                }
            };

            // Remove the parsed frame from the buffer.
            src.advance(position);

            // Blank lines and empty arrays carry no command, skip them like Redis does.
            match frame {
                Frame::Array(ref parts) if parts.is_empty() => continue,
                frame => return validate_request(frame).map(Some),
            }
        }
    }
}

/// Reads one inline command. Returns the arguments along with the number of bytes consumed, or
/// `None` when the line is not complete yet.
fn parse_inline(src: &[u8]) -> Option<(Frame, usize)> {
    let line_end = src.iter().position(|&b| b == b'\n')?;

    let mut line = &src[..line_end];
    if let [rest @ .., b'\r'] = line {
        line = rest;
    }

    if line.is_empty() {
        return Some((Frame::Array(vec![]), line_end + 1));
    }

    let args = line
        .split(|&b| b == b' ')
        .map(|arg| Frame::Bulk(Bytes::copy_from_slice(arg)))
        .collect();

    Some((Frame::Array(args), line_end + 1))
}

/// Requests must be arrays of present strings, absent values never reach the dispatcher.
fn validate_request(frame: Frame) -> Result<Frame, frame::Error> {
    match frame {
        Frame::Array(parts)
            if parts
                .iter()
                .all(|part| matches!(part, Frame::Bulk(_) | Frame::Simple(_))) =>
        {
            Ok(Frame::Array(parts))
        }
        frame => Err(frame::Error::InvalidInput(format!(
            "expected an array of bulk strings, got {}",
            frame
        ))),
    }
}
