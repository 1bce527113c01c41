use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

use super::scheduler::RepeatingTask;
use crate::constants::presence::CHAT_HISTORY_LENGTH;
use crate::network::ServerPacket;
use crate::world::{ChunkColumn, ChunkIndex, Position};

/// Server-assigned connection id, unique while the server runs
pub type ConnectionId = u32;

/// What the coordinator needs from a transport connection
pub trait ConnectionHandle: Send + Sync {
    fn id(&self) -> ConnectionId;
    fn uuid(&self) -> Uuid;
    fn username(&self) -> &str;
    /// Queue a packet; never blocks and never fails loudly
    fn send(&self, packet: ServerPacket);
    /// Close the connection with a reason shown to the user
    fn close(&self, reason: &str);
}

/// Whether position updates from the client are trusted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeleportState {
    #[default]
    Idle,
    /// A server-issued position is in flight; client positions are stale until confirmed
    AwaitingConfirmation,
}

/// Shelf the user right-clicked, waiting for a container pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfSelection {
    pub chunk: ChunkIndex,
    pub shelf: u32,
}

/// Everything the server tracks for one viewer
#[derive(Debug)]
pub struct ConnectionState {
    /// Set once login finished; unready sessions are invisible to reconciliation
    pub ready: bool,
    pub position: Option<Position>,
    pub last_chunk: Option<ChunkColumn>,
    pub teleport: TeleportState,
    /// Occupants this viewer currently has spawned
    pub visible: HashSet<ConnectionId>,
    pub highlight: Option<RepeatingTask>,
    pub selection: Option<ShelfSelection>,
    pub chat_enabled: bool,
    pub presence_enabled: bool,
    pub chat_colors: bool,
    pub skin_parts: u8,
    pub recent_messages: VecDeque<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl ConnectionState {
    pub fn new(chat_enabled: bool, presence_enabled: bool) -> Self {
        Self {
            ready: false,
            position: None,
            last_chunk: None,
            teleport: TeleportState::Idle,
            visible: HashSet::new(),
            highlight: None,
            selection: None,
            chat_enabled,
            presence_enabled,
            chat_colors: true,
            skin_parts: 0,
            recent_messages: VecDeque::with_capacity(CHAT_HISTORY_LENGTH),
        }
    }

    /// Remember a chat line, keeping only the most recent ones
    pub fn push_recent_message(&mut self, message: impl Into<String>) {
        self.recent_messages.push_back(message.into());
        while self.recent_messages.len() > CHAT_HISTORY_LENGTH {
            self.recent_messages.pop_front();
        }
    }
}
