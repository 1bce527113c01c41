use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::library::Book;
use crate::presence::ConnectionId;
use crate::world::{BlockPos, ChunkColumn, ChunkIndex, Position};

/// Packet types for network communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    Client(ClientPacket),
    Server(ServerPacket),
}

/// Packets sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientPacket {
    /// Initial connection request
    Login {
        protocol_version: u32,
        username: String,
    },
    /// Movement, with orientation when it changed too
    Position {
        coords: DVec3,
        yaw: Option<f32>,
        pitch: Option<f32>,
        on_ground: bool,
    },
    /// Orientation only
    Look {
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    /// Right click on a block
    UseBlock {
        location: BlockPos,
        hand: Hand,
    },
    /// Click inside an open container window
    ContainerClick {
        slot: i32,
    },
    /// Chat line or `/command`
    Chat {
        message: String,
    },
    /// Acknowledges a server-issued position
    TeleportConfirm {
        teleport_id: u32,
    },
    /// Client display settings
    Settings {
        skin_parts: u8,
        chat_colors: bool,
    },
    /// Disconnect notification
    Disconnect {
        reason: String,
    },
}

/// Packets sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerPacket {
    /// Login accepted
    LoginAccept {
        connection_id: ConnectionId,
        uuid: Uuid,
        motd: String,
    },
    /// Connection is being closed by the server
    Kick {
        reason: String,
    },
    /// Centre of the client's loaded area
    UpdateViewPosition {
        column: ChunkColumn,
    },
    /// Library geometry for one chunk column
    LibraryChunk {
        column: ChunkColumn,
    },
    /// Absolute position the client must move to and confirm
    Position {
        position: Position,
        teleport_id: u32,
    },
    /// Tab list changes
    Roster {
        action: RosterAction,
        entries: Vec<RosterEntry>,
    },
    /// Another occupant became visible
    SpawnOccupant {
        occupant: ConnectionId,
        uuid: Uuid,
        position: Position,
    },
    /// Skin layers shown for an occupant
    OccupantSkin {
        occupant: ConnectionId,
        skin_parts: u8,
    },
    /// Visible occupant moved
    TeleportOccupant {
        occupant: ConnectionId,
        position: Position,
    },
    /// Occupant is no longer visible
    DestroyOccupant {
        occupant: ConnectionId,
    },
    /// Highlight particle
    Marker {
        kind: u32,
        point: DVec3,
    },
    Chat {
        message: ChatMessage,
    },
    /// Container chooser for a shelf
    OpenShelf {
        shelf: u32,
        slots: u32,
    },
    /// Books inside one container
    OpenContainer {
        chunk: ChunkIndex,
        shelf: u32,
        shulker: u32,
        books: Vec<Book>,
    },
    ClearInventory,
}

/// Which hand a block interaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hand {
    Main,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterAction {
    Add,
    Remove,
}

/// One line of the tab list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: ConnectionId,
    pub uuid: Uuid,
    pub username: String,
}

impl ClientPacket {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ClientPacket::Login { .. } => "login",
            ClientPacket::Position { .. } => "position",
            ClientPacket::Look { .. } => "look",
            ClientPacket::UseBlock { .. } => "use_block",
            ClientPacket::ContainerClick { .. } => "container_click",
            ClientPacket::Chat { .. } => "chat",
            ClientPacket::TeleportConfirm { .. } => "teleport_confirm",
            ClientPacket::Settings { .. } => "settings",
            ClientPacket::Disconnect { .. } => "disconnect",
        }
    }
}

impl Packet {
    /// Serialize packet to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize packet from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_packet_bytes() {
        let packet = Packet::Client(ClientPacket::Chat {
            message: "/search exact hello".to_string(),
        });
        let bytes = packet.to_bytes().unwrap();
        match Packet::from_bytes(&bytes).unwrap() {
            Packet::Client(ClientPacket::Chat { message }) => assert_eq!(message, "/search exact hello"),
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        let packet = Packet::Server(ServerPacket::Kick {
            reason: "bye".to_string(),
        });
        let bytes = packet.to_bytes().unwrap();
        assert!(Packet::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
