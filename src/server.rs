//! TCP listener and connection dispatcher.
//!
//! Accepts connections without bound and spawns one independent task per
//! connection. A failing connection is logged and forgotten; a failing
//! listener ends the process.

use crate::config::{Config, ProtocolType};
use crate::error::{ServeError, WorkerError};
use crate::protocols::chat::{ChatSession, Room};
use crate::protocols::echo;
use crate::protocols::means::{parser::MESSAGE_LEN, MeansHandler};
use crate::protocols::prime::PrimeHandler;
use crate::runtime::{run_framed, Framing};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Bind and serve the configured protocol until the listener fails.
pub async fn run(config: Config) -> Result<(), ServeError> {
    let listener = bind(&config.listen, config.backlog).await?;
    info!(address = %config.listen, protocol = ?config.protocol, "Server listening");

    serve_protocol(listener, config.protocol).await
}

/// Serve one of the built-in protocols on an already bound listener.
pub async fn serve_protocol(listener: TcpListener, protocol: ProtocolType) -> Result<(), ServeError> {
    match protocol {
        ProtocolType::Echo => serve(listener, echo::handle_connection::<TcpStream>).await,

        ProtocolType::Prime => {
            serve(listener, |stream| {
                run_framed(stream, Framing::Line, |_| PrimeHandler::new())
            })
            .await
        }

        ProtocolType::Means => {
            serve(listener, |stream| {
                run_framed(stream, Framing::Fixed(MESSAGE_LEN), |_| MeansHandler::new())
            })
            .await
        }

        ProtocolType::Chat => {
            let room = Room::new();
            serve(listener, move |stream| {
                let room = Arc::clone(&room);
                run_framed(stream, Framing::Line, move |outbox| {
                    ChatSession::new(room, outbox)
                })
            })
            .await
        }
    }
}

/// Resolve `address` and bind a listener to the first resulting address.
pub async fn bind(address: &str, backlog: u32) -> Result<TcpListener, ServeError> {
    let addr = lookup_host(address)
        .await
        .map_err(|source| ServeError::Resolve {
            address: address.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ServeError::Resolve {
            address: address.to_string(),
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses found"),
        })?;

    create_listener(addr, backlog)
        .and_then(TcpListener::from_std)
        .map_err(|source| ServeError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Create a non-blocking listener with SO_REUSEADDR so restarts can rebind
/// while old connections sit in TIME_WAIT.
fn create_listener(addr: SocketAddr, backlog: u32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;

    Ok(socket.into())
}

/// Bind `address` and serve connections with `worker`.
pub async fn listen_and_serve<W, Fut>(address: &str, backlog: u32, worker: W) -> Result<(), ServeError>
where
    W: Fn(TcpStream) -> Fut,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    let listener = bind(address, backlog).await?;
    info!(address, "Server listening");
    serve(listener, worker).await
}

/// Accept connections forever, spawning `worker` for each one.
///
/// Never waits for a worker and never limits how many run at once. Only
/// an accept failure returns.
pub async fn serve<W, Fut>(listener: TcpListener, worker: W) -> Result<(), ServeError>
where
    W: Fn(TcpStream) -> Fut,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| {
            error!(error = %e, "Failed to accept connection");
            ServeError::Accept(e)
        })?;
        debug!(%peer, "New connection");

        let connection = worker(stream);
        tokio::spawn(async move {
            match connection.await {
                Ok(()) => debug!(%peer, "Connection closed"),
                Err(e) => warn!(%peer, error = %e, "Connection handler returned an error"),
            }
        });
    }
}
