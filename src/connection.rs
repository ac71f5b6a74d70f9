use futures::StreamExt;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::frame::{self, Frame};

/// One client session. Requests are decoded from the read half as they arrive, replies are written
/// to the write half in the same order.
pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr, codec: FrameCodec) -> Connection {
        let (reader, writer) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            client_address,
            reader: FramedRead::new(reader, codec),
            writer,
        }
    }

    /// Waits for the next request. `None` means the client closed the connection.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, frame::Error> {
        self.reader.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        self.writer.write_all(&frame.serialize()).await?;
        self.writer.flush().await
    }
}
