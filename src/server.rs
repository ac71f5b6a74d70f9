use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::codec::FrameCodec;
use crate::commands;
use crate::config::Config;
use crate::connection::Connection;
use crate::frame::{self, Frame};
use crate::store::Store;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    // A snapshot that exists but cannot be read is fatal, starting empty would lose its data on the
    // next SAVE.
    let store = Store::open(&config.dbfilename)?;

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    serve(listener, store, config.max_frame_size).await
}

/// Accepts connections on `listener` forever, each one served by its own task sharing `store`.
pub async fn serve(listener: TcpListener, store: Store, max_frame_size: usize) -> Result<(), Error> {
    loop {
        let (socket, client_address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            let codec = FrameCodec::new(max_frame_size);
            if let Err(e) = handle_connection(socket, client_address, store, codec).await {
                error!("Connection error: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, store, codec),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    codec: FrameCodec,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, client_address, codec);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    loop {
        let frame = match conn.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(frame::Error::Io(e)) => return Err(e.into()),
            Err(e) => {
                // The stream cannot be resynchronized after a malformed request.
                warn!("Protocol error: {}", e);
                let msg = format!("ERR Protocol error: {}", e).replace(['\r', '\n'], " ");
                conn.write_frame(&Frame::Error(msg)).await?;
                break;
            }
        };

        debug!("Received frame from client: {:?}", frame);
        let res = commands::execute(&store, frame);
        debug!("Sending response to client: {:?}", res);

        conn.write_frame(&res).await?;
    }

    info!("Connection closed");
    Ok(())
}
