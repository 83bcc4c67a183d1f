use bytes::{Buf, BytesMut};
use std::io;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, Decoded, Frame};

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error(transparent)]
    Frame(#[from] frame::Error),
    #[error("frame size exceeds limit of {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("io error; {0}")]
    Io(#[from] io::Error),
}

/// Splits a byte stream into RESP frames and writes frames back out.
#[derive(Debug, Clone)]
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
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // An incomplete frame is parsed again from its first byte on every call, so the work
        // spent on one frame grows with the square of the reads it arrives in. `max_frame_size`
        // bounds that window.
        match Frame::decode(&src[..]) {
            Decoded::Complete { frame, consumed } => {
                // Remove the parsed frame from the buffer.
                src.advance(consumed);
                Ok(Some(frame))
            }
            // Keep what we have; the caller reads more and calls us again.
            Decoded::NeedMoreData { .. } => {
                if src.len() > self.max_frame_size {
                    return Err(CodecError::FrameTooLarge {
                        limit: self.max_frame_size,
                    });
                }
                Ok(None)
            }
            Decoded::Fatal(err) => Err(err.into()),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match Frame::decode(&src[..]) {
            Decoded::Complete { frame, consumed } => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            Decoded::NeedMoreData { truncation } => Err(truncation.into()),
            Decoded::Fatal(err) => Err(err.into()),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        frame.write_to(dst);
        Ok(())
    }
}
