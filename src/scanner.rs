use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::{CodecError, FrameCodec};
use crate::frame::Frame;

/// Steps through the RESP frames of a byte stream, one per call to [`Scanner::advance`].
///
/// Bytes are read into an internal buffer only as needed. A frame split across any number of
/// reads is reassembled; bytes belonging to a frame that was already produced are never parsed
/// again.
pub struct Scanner<R> {
    frames: FramedRead<R, FrameCodec>,
    current: Option<Frame>,
    error: Option<CodecError>,
    done: bool,
}

impl<R: AsyncRead + Unpin> Scanner<R> {
    pub fn new(reader: R) -> Scanner<R> {
        Scanner::with_codec(reader, FrameCodec::default())
    }

    pub fn with_codec(reader: R, codec: FrameCodec) -> Scanner<R> {
        Scanner {
            // Allocate the read buffer with 4kb of capacity.
            frames: FramedRead::with_capacity(reader, codec, 4096),
            current: None,
            error: None,
            done: false,
        }
    }

    /// Reads until the next frame is available. Returns `false` once the stream is exhausted
    /// or a terminal error was hit, see [`Scanner::last_error`].
    pub async fn advance(&mut self) -> bool {
        self.current = None;

        if self.done {
            return false;
        }

        match self.frames.next().await {
            Some(Ok(frame)) => {
                self.current = Some(frame);
                true
            }
            Some(Err(err)) => {
                self.error = Some(err);
                self.done = true;
                false
            }
            None => {
                self.done = true;
                false
            }
        }
    }

    /// The frame produced by the last successful [`Scanner::advance`].
    pub fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&CodecError> {
        self.error.as_ref()
    }

    /// Moves the terminal error out of the scanner. Later calls return `None`.
    pub fn take_error(&mut self) -> Option<CodecError> {
        self.error.take()
    }
}
