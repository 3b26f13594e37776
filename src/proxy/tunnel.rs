//! Bidirectional byte relay for established `CONNECT` tunnels.
//!
//! Each direction copies until its source reaches EOF (or fails) and then
//! half-closes its destination, so the far side sees EOF on that direction
//! while the opposite direction keeps flowing. [`transfer`] returns only
//! once both directions have finished; both streams are dropped, and so
//! closed, on every path out of it.
//!
//! No idle timeout is applied: a peer that neither sends nor closes keeps
//! the tunnel open.

use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt};

/// Bytes relayed in each direction of a finished tunnel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transferred {
    pub client_to_destination: u64,
    pub destination_to_client: u64,
}

/// Relays bytes between `client` and `destination` until both directions
/// drain.
///
/// When both directions fail, the client-to-destination error is the one
/// returned.
pub async fn transfer<C, D>(client: C, destination: D) -> io::Result<Transferred>
where
    C: AsyncRead + AsyncWrite,
    D: AsyncRead + AsyncWrite,
{
    let (mut client_read, mut client_write) = io::split(client);
    let (mut dest_read, mut dest_write) = io::split(destination);

    let (upstream, downstream) = tokio::join!(
        relay(&mut client_read, &mut dest_write),
        relay(&mut dest_read, &mut client_write),
    );

    Ok(Transferred {
        client_to_destination: upstream?,
        destination_to_client: downstream?,
    })
}

async fn relay<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = io::copy(reader, writer).await;
    if let Err(e) = writer.shutdown().await {
        tracing::debug!(error = %e, "half-close failed");
    }
    copied
}
