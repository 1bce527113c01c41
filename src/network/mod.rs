//! TCP transport and the server built on it

pub mod connection;
pub mod error;
pub mod handlers;
pub mod packet;
pub mod protocol;
pub mod server;
pub mod webhook;

pub use connection::{offline_uuid, read_packet, write_packet, ConnectionStats, TcpConnectionHandle};
pub use error::{connection_error, protocol_error, NetworkResult};
pub use handlers::handle_packet;
pub use packet::{ClientPacket, Hand, Packet, RosterAction, RosterEntry, ServerPacket};
pub use protocol::{Protocol, PROTOCOL_VERSION};
pub use server::{LibraryServer, ServerContext};
pub use webhook::{format_report, ReportWebhook};
