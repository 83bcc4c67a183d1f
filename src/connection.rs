use futures::SinkExt;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{CodecError, FrameCodec};
use crate::commands;
use crate::frame::Frame;
use crate::scanner::Scanner;
use crate::store::Store;
use crate::Error;

/// One client connection. Requests are served strictly in order: a response is written before
/// the next request is read.
pub struct Connection<R, W> {
    pub id: Uuid,
    pub client_address: Option<SocketAddr>,
    scanner: Scanner<R>,
    writer: FramedWrite<W, FrameCodec>,
}

impl Connection<OwnedReadHalf, OwnedWriteHalf> {
    pub fn new(stream: TcpStream, max_frame_size: usize) -> Self {
        let client_address = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();

        let mut conn = Connection::from_parts(reader, writer, max_frame_size);
        conn.client_address = client_address;
        conn
    }
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn from_parts(reader: R, writer: W, max_frame_size: usize) -> Self {
        let codec = FrameCodec::new(max_frame_size);

        Connection {
            id: Uuid::new_v4(),
            client_address: None,
            scanner: Scanner::with_codec(reader, codec.clone()),
            writer: FramedWrite::new(writer, codec),
        }
    }

    /// Reads the next frame. Returns `Ok(None)` when the peer closed the stream cleanly.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        if self.scanner.advance().await {
            return Ok(self.scanner.current().cloned());
        }

        match self.scanner.take_error() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
        self.writer.send(frame).await
    }

    /// Serves requests until the peer disconnects. A framing error is answered with one final
    /// error frame, after which the connection is dropped.
    pub async fn serve(mut self, store: Store) -> Result<(), Error> {
        while self.scanner.advance().await {
            let Some(request) = self.scanner.current().cloned() else {
                continue;
            };

            debug!("Received frame from client: {}", request);
            let res = commands::dispatch(request, store.clone());
            debug!("Sending response to client: {}", res);

            self.write_frame(res).await?;
        }

        let err = match self.scanner.take_error() {
            Some(err) => err,
            None => {
                info!("Connection closed");
                return Ok(());
            }
        };

        warn!(error = %err, "Closing connection after protocol error");
        self.write_frame(Frame::Error(format!("ERR {err}"))).await?;

        Err(err.into())
    }
}
