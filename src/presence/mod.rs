//! Who sees what: sessions, chunk streaming, occupant visibility and shelf highlights

pub mod connection;
pub mod coordinator;
pub mod highlight;
pub mod scheduler;
pub mod streaming;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionState, ShelfSelection, TeleportState};
pub use coordinator::{PresenceCoordinator, ReconcileReport, Session};
pub use highlight::{marker_kind, resolve_marker, MarkerPoint};
pub use scheduler::RepeatingTask;
pub use streaming::{leading_edge, teleport_neighborhood};
