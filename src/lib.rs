//! A walkable Library of Babel
//!
//! Every page of up to fifteen letters and spaces sits on exactly one shelf of an enormous
//! grid of rooms. Page locations and page texts are computed from each other on demand,
//! nothing is stored. Visitors connect over TCP, wander the rooms, open books, search for
//! text and see each other when close enough.

pub mod chat;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod library;
pub mod network;
pub mod presence;
pub mod world;

pub use chat::{ChatColor, ChatMessage, ChatPart, ClickAction};
pub use config::{LiveConfig, LiveConfigHandle, ServerConfig};
pub use error::{LibraryError, LibraryResult};
pub use library::{Address, AddressCodec, LibraryGeometry, SearchMode, SearchResult};
pub use network::{LibraryServer, ServerContext};
pub use presence::{ConnectionHandle, ConnectionId, PresenceCoordinator, RepeatingTask};
pub use world::{BlockPos, ChunkColumn, ChunkIndex, Position};
