use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::{protocol_error, NetworkResult};
use super::packet::{Packet, ServerPacket};
use super::protocol::MAX_PACKET_SIZE;
use crate::presence::{ConnectionHandle, ConnectionId};

/// Namespace for identities derived from usernames
const OFFLINE_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

/// Stable identity for a username when there is no authentication
pub fn offline_uuid(username: &str) -> Uuid {
    Uuid::new_v5(&OFFLINE_NAMESPACE, format!("OfflinePlayer:{}", username).as_bytes())
}

/// Send a packet as one length-prefixed frame
pub async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, packet: &Packet) -> NetworkResult<usize> {
    let data = packet
        .to_bytes()
        .map_err(|e| protocol_error(format!("cannot encode packet: {}", e)))?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(protocol_error(format!("packet of {} bytes exceeds the frame limit", data.len())));
    }

    // Length prefix (4 bytes)
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;

    Ok(data.len() + 4)
}

/// Read one frame. Returns `None` when the stream ends between frames.
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> NetworkResult<Option<Packet>> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_PACKET_SIZE {
        return Err(protocol_error("Packet too large"));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Packet::from_bytes(&data)
        .map(Some)
        .map_err(|e| protocol_error(format!("cannot decode packet: {}", e)))
}

/// Connection statistics
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub packets_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub packets_received: AtomicU64,
}

enum Outbound {
    Packet(ServerPacket),
    Close(String),
}

/// A logged-in TCP connection
///
/// Sends go through an unbounded queue drained by a dedicated writer task, so callers never
/// wait on the socket.
pub struct TcpConnectionHandle {
    id: ConnectionId,
    uuid: Uuid,
    username: String,
    remote_addr: SocketAddr,
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<Notify>,
    stats: Arc<ConnectionStats>,
}

impl TcpConnectionHandle {
    /// Wrap the write half of a socket and start its writer task
    pub fn spawn(
        id: ConnectionId,
        username: String,
        remote_addr: SocketAddr,
        writer: OwnedWriteHalf,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Notify::new());
        let stats = Arc::new(ConnectionStats::default());

        let task = tokio::spawn(run_writer(writer, rx, closed.clone(), stats.clone(), remote_addr));
        let handle = Arc::new(Self {
            id,
            uuid: offline_uuid(&username),
            username,
            remote_addr,
            tx,
            closed,
            stats,
        });

        (handle, task)
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Resolves once the connection was closed from the server side or the writer failed
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}

impl ConnectionHandle for TcpConnectionHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn send(&self, packet: ServerPacket) {
        // A closed queue means the writer is gone; the reader will notice shortly
        let _ = self.tx.send(Outbound::Packet(packet));
    }

    fn close(&self, reason: &str) {
        let _ = self.tx.send(Outbound::Close(reason.to_string()));
    }
}

async fn run_writer(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    closed: Arc<Notify>,
    stats: Arc<ConnectionStats>,
    remote_addr: SocketAddr,
) {
    while let Some(outbound) = rx.recv().await {
        let (packet, last) = match outbound {
            Outbound::Packet(packet) => (packet, false),
            Outbound::Close(reason) => (ServerPacket::Kick { reason }, true),
        };

        match write_packet(&mut writer, &Packet::Server(packet)).await {
            Ok(bytes) => {
                stats.packets_sent.fetch_add(1, Ordering::Relaxed);
                stats.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Failed to send packet to {}: {}", remote_addr, e);
                break;
            }
        }

        if last {
            debug!("Closing connection to {}", remote_addr);
            break;
        }
    }

    let _ = writer.shutdown().await;
    closed.notify_one();
}
