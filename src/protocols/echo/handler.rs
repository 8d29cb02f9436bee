//! Echo protocol handler for the Tokio runtime.

use crate::error::WorkerError;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Handle an echo protocol connection.
///
/// Copies everything read back to the peer until end of stream.
pub async fn handle_connection<S>(stream: S) -> Result<(), WorkerError>
where
    S: AsyncRead + AsyncWrite,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let echoed = tokio::io::copy(&mut reader, &mut writer).await?;
    trace!(bytes = echoed, "Echo stream finished");

    writer.shutdown().await?;
    Ok(())
}
