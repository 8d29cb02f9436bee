//! Connection worker: drives one accepted connection from accept to close.
//!
//! The worker splits the stream into a reader loop and a writer loop that
//! run concurrently inside the connection's task. When the reader stops,
//! for any reason, the writer still drains what was already queued before
//! the worker reports the reader's outcome. The reader loop extracts
//! frames with a [`Framing`] strategy and hands them, one at a time and in
//! arrival order, to the connection's [`FrameHandler`]. Everything written to
//! the peer goes through the connection's [`Outbox`], so handler replies and
//! messages pushed by other connections (chat broadcasts) never interleave
//! mid-frame.

use crate::error::{HandlerError, WorkerError};
use crate::runtime::framing::{Decoder, Framing};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::trace;

/// Read buffer size
const BUFFER_SIZE: usize = 16 * 1024;

/// Handle for queueing bytes to be written to one connection.
pub type Outbox = mpsc::UnboundedSender<Bytes>;

/// What the worker should do after a frame was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to write.
    Silent,
    /// Write this frame followed by the framing delimiter.
    Frame(Bytes),
    /// Stop reading and close the connection once queued output is flushed.
    Close,
}

/// Per-connection protocol logic.
///
/// A handler is created once per connection and owns all per-connection
/// state. It is called synchronously for each frame; it is never called
/// concurrently with itself.
pub trait FrameHandler: Send {
    fn handle(&mut self, frame: Bytes) -> Result<Reply, HandlerError>;
}

/// Drive a connection with the given framing strategy.
///
/// `factory` builds the handler and receives a clone of the connection's
/// outbox for handlers that write outside the request/response cycle.
pub async fn run_framed<S, H, F>(stream: S, framing: Framing, factory: F) -> Result<(), WorkerError>
where
    S: AsyncRead + AsyncWrite,
    H: FrameHandler,
    F: FnOnce(Outbox) -> H,
{
    let (reader, writer) = tokio::io::split(stream);
    let (outbox, queue) = mpsc::unbounded_channel();
    let handler = factory(outbox.clone());

    let read = read_frames(reader, framing, handler, outbox);
    let write = write_frames(writer, queue);
    tokio::pin!(read);
    tokio::pin!(write);

    tokio::select! {
        read_result = &mut read => {
            // Replies queued before the reader stopped are still flushed
            let write_result = write.await;
            read_result.and(write_result)
        }
        write_result = &mut write => match write_result {
            Err(e) => Err(e),
            Ok(()) => read.await,
        },
    }
}

/// Reader loop. Returning drops the handler and this loop's outbox, which
/// lets the writer loop finish once nothing else holds a sender.
async fn read_frames<R, H>(
    mut reader: R,
    framing: Framing,
    mut handler: H,
    outbox: Outbox,
) -> Result<(), WorkerError>
where
    R: AsyncRead + Unpin,
    H: FrameHandler,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
    let mut decoder = Decoder::new(framing);
    let mut eof = false;

    loop {
        let frame = match decoder.decode(&mut buffer, eof)? {
            Some(frame) => frame,
            None if eof => {
                trace!("Connection closed by client");
                return Ok(());
            }
            None => {
                if reader.read_buf(&mut buffer).await? == 0 {
                    eof = true;
                }
                continue;
            }
        };

        trace!(len = frame.len(), "Handling frame");

        match handler.handle(frame)? {
            Reply::Silent => {}
            Reply::Frame(payload) => {
                let delimiter = framing.delimiter();
                let mut response = BytesMut::with_capacity(payload.len() + delimiter.len());
                response.extend_from_slice(&payload);
                response.extend_from_slice(delimiter);
                outbox
                    .send(response.freeze())
                    .map_err(|_| WorkerError::OutboxClosed)?;
            }
            Reply::Close => {
                trace!("Handler closed the connection");
                return Ok(());
            }
        }
    }
}

/// Writer loop. Drains the outbox until every sender is gone, then shuts
/// the write half down.
async fn write_frames<W>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
) -> Result<(), WorkerError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(data) = queue.recv().await {
        writer.write_all(&data).await?;
    }
    writer.shutdown().await?;
    Ok(())
}
