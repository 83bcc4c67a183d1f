use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::connection::Connection;
use crate::store::Store;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;

    info!("Server listening on {}", listener.local_addr()?);

    serve(listener, Store::new(), config.max_frame_size).await
}

/// Accepts connections forever, serving each one on its own task.
pub async fn serve(listener: TcpListener, store: Store, max_frame_size: usize) -> Result<(), Error> {
    loop {
        let (socket, client_address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store, max_frame_size).await {
                error!("Connection terminated: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, store, max_frame_size),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    max_frame_size: usize,
) -> Result<(), Error> {
    let conn = Connection::new(stream, max_frame_size);

    tracing::Span::current()
        .record("connection_id", tracing::field::display(conn.id))
        .record("client_address", tracing::field::display(client_address));

    conn.serve(store).await
}
