//! Per-connection session table, chunk streaming and occupant visibility
//!
//! Every session's mutable state sits behind its own lock. No method here holds two session
//! locks at once, so inbound handlers and the reconciliation pass never deadlock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use glam::DVec3;
use log::{debug, info};
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use super::connection::{ConnectionHandle, ConnectionId, ConnectionState, TeleportState};
use super::streaming::{leading_edge, teleport_neighborhood};
use crate::constants::network::TELEPORT_ID;
use crate::error::{LibraryError, LibraryResult};
use crate::library::LibraryGeometry;
use crate::network::ServerPacket;
use crate::world::{ChunkColumn, Position};

/// One connected viewer
pub struct Session {
    handle: Arc<dyn ConnectionHandle>,
    state: Mutex<ConnectionState>,
}

impl Session {
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn uuid(&self) -> Uuid {
        self.handle.uuid()
    }

    pub fn username(&self) -> &str {
        self.handle.username()
    }

    pub fn handle(&self) -> &Arc<dyn ConnectionHandle> {
        &self.handle
    }

    pub fn send(&self, packet: ServerPacket) {
        self.handle.send(packet);
    }

    /// Lock this session's state. Keep the guard short and never await while holding it.
    pub fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("username", &self.username())
            .finish_non_exhaustive()
    }
}

/// Counts of occupant packets emitted by one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub spawned: usize,
    pub updated: usize,
    pub destroyed: usize,
}

/// Position of an occupant as of the start of a reconciliation pass
#[derive(Debug, Clone, Copy)]
struct OccupantSnapshot {
    id: ConnectionId,
    uuid: Uuid,
    position: Position,
    skin_parts: u8,
}

/// Owns every session and decides what each viewer is sent
pub struct PresenceCoordinator {
    sessions: DashMap<ConnectionId, Arc<Session>>,
    geometry: Arc<LibraryGeometry>,
}

impl PresenceCoordinator {
    pub fn new(geometry: Arc<LibraryGeometry>) -> Self {
        Self {
            sessions: DashMap::new(),
            geometry,
        }
    }

    pub fn geometry(&self) -> &LibraryGeometry {
        &self.geometry
    }

    /// Register a new connection standing at `spawn`. It stays invisible until marked ready.
    pub fn connect(
        &self,
        handle: Arc<dyn ConnectionHandle>,
        spawn: Position,
        mut state: ConnectionState,
    ) -> Arc<Session> {
        state.position = Some(spawn);
        let session = Arc::new(Session {
            handle,
            state: Mutex::new(state),
        });
        self.sessions.insert(session.id(), session.clone());
        debug!("Session {} ({}) registered", session.id(), session.username());
        session
    }

    pub fn mark_ready(&self, id: ConnectionId) -> LibraryResult<()> {
        self.require(id)?.state().ready = true;
        Ok(())
    }

    /// Drop a session. Its highlight stops here; viewers lose it on the next reconciliation.
    pub fn disconnect(&self, id: ConnectionId) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(&id)?;
        {
            let mut state = session.state();
            state.ready = false;
            state.highlight = None;
            state.selection = None;
        }
        debug!("Session {} ({}) removed", id, session.username());
        Some(session)
    }

    pub fn session(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    pub fn find_by_username(&self, username: &str) -> Option<Arc<Session>> {
        self.sessions
            .iter()
            .find(|entry| entry.value().username() == username)
            .map(|entry| entry.value().clone())
    }

    /// Every session, in no particular order
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Sessions that finished logging in
    pub fn ready_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions()
            .into_iter()
            .filter(|session| session.state().ready)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run `f` against a session's state under its lock
    pub fn with_state<R>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut ConnectionState) -> R,
    ) -> LibraryResult<R> {
        let session = self.require(id)?;
        let mut state = session.state();
        Ok(f(&mut state))
    }

    pub(crate) fn require(&self, id: ConnectionId) -> LibraryResult<Arc<Session>> {
        self.session(id).ok_or(LibraryError::UnknownConnection { id })
    }

    fn column_of(&self, coords: DVec3) -> ChunkColumn {
        ChunkColumn::containing(coords, self.geometry.blocks_per_chunk)
    }

    /// Move a viewer and front-load the area around the target.
    ///
    /// Client position updates are ignored until the client confirms. The stored position is
    /// left alone; the first confirmed update replaces it. Targets off the library floor plan
    /// are refused before anything is sent.
    pub fn teleport(&self, id: ConnectionId, target: Position) -> LibraryResult<()> {
        let session = self.require(id)?;
        if !self.geometry.contains_horizontal(target.coords) {
            let edge = i64::from(self.geometry.horizontal_chunks) * i64::from(self.geometry.blocks_per_chunk);
            return Err(LibraryError::out_of_range("teleport target", format!("{} blocks", edge)));
        }
        let column = self.column_of(target.coords);

        let mut state = session.state();
        state.teleport = TeleportState::AwaitingConfirmation;
        session.send(ServerPacket::UpdateViewPosition { column });
        for neighbor in teleport_neighborhood(column) {
            session.send(ServerPacket::LibraryChunk { column: neighbor });
        }
        session.send(ServerPacket::Position {
            position: target,
            teleport_id: TELEPORT_ID,
        });
        state.last_chunk = Some(column);

        debug!(
            "{} teleporting to {:.1}, {:.1}, {:.1}",
            session.username(),
            target.coords.x,
            target.coords.y,
            target.coords.z
        );
        Ok(())
    }

    pub fn confirm_teleport(&self, id: ConnectionId, teleport_id: u32) -> LibraryResult<()> {
        let session = self.require(id)?;
        if teleport_id != TELEPORT_ID {
            debug!("{} confirmed unknown teleport {}", session.username(), teleport_id);
        }
        session.state().teleport = TeleportState::Idle;
        Ok(())
    }

    /// Store a client position and stream whatever came into view.
    /// Returns the columns that were streamed. Positions off the library floor plan are dropped.
    pub fn on_position_update(
        &self,
        id: ConnectionId,
        coords: DVec3,
        yaw: Option<f32>,
        pitch: Option<f32>,
        on_ground: bool,
    ) -> LibraryResult<Vec<ChunkColumn>> {
        let session = self.require(id)?;
        let mut state = session.state();
        if state.teleport == TeleportState::AwaitingConfirmation {
            return Ok(Vec::new());
        }
        if !self.geometry.contains_horizontal(coords) {
            debug!("{} sent a position outside the library: {:?}", session.username(), coords);
            return Ok(Vec::new());
        }

        let column = self.column_of(coords);
        let mut streamed = Vec::new();
        if let Some(previous) = state.last_chunk {
            if previous != column {
                session.send(ServerPacket::UpdateViewPosition { column });
                streamed = leading_edge(previous, column);
                for edge in &streamed {
                    session.send(ServerPacket::LibraryChunk { column: *edge });
                }
            }
        }
        state.last_chunk = Some(column);

        let previous = state.position;
        state.position = Some(Position {
            coords,
            yaw: yaw.or(previous.map(|p| p.yaw)).unwrap_or_default(),
            pitch: pitch.or(previous.map(|p| p.pitch)).unwrap_or_default(),
            on_ground,
        });

        Ok(streamed)
    }

    pub fn on_look(&self, id: ConnectionId, yaw: f32, pitch: f32, on_ground: bool) -> LibraryResult<()> {
        let session = self.require(id)?;
        let mut state = session.state();
        if let Some(position) = state.position.as_mut() {
            position.yaw = yaw;
            position.pitch = pitch;
            position.on_ground = on_ground;
        }
        Ok(())
    }

    /// Record client settings. Skin changes are pushed to the viewer and to everyone who sees it.
    pub fn update_settings(&self, id: ConnectionId, skin_parts: u8, chat_colors: bool) -> LibraryResult<()> {
        let session = self.require(id)?;
        let changed = {
            let mut state = session.state();
            state.chat_colors = chat_colors;
            std::mem::replace(&mut state.skin_parts, skin_parts) != skin_parts
        };
        if !changed {
            return Ok(());
        }

        let packet = ServerPacket::OccupantSkin {
            occupant: id,
            skin_parts,
        };
        session.send(packet.clone());
        for viewer in self.sessions() {
            if viewer.id() != id && viewer.state().visible.contains(&id) {
                viewer.send(packet.clone());
            }
        }
        Ok(())
    }

    /// Turn occupant visibility on or off for one viewer.
    ///
    /// Turning it off despawns everyone at once; turning it on waits for the next pass.
    pub fn set_presence_enabled(&self, id: ConnectionId, enabled: bool) -> LibraryResult<()> {
        let session = self.require(id)?;
        let mut state = session.state();
        state.presence_enabled = enabled;
        if !enabled {
            for occupant in state.visible.drain() {
                session.send(ServerPacket::DestroyOccupant { occupant });
            }
        }
        info!(
            "{} toggled player visibility {}",
            session.username(),
            if enabled { "ON" } else { "OFF" }
        );
        Ok(())
    }

    /// Bring every viewer's visible-occupant set up to date.
    ///
    /// Positions are copied first, so the pass works from one consistent moment even while
    /// position updates keep arriving. Cost is quadratic in the number of ready sessions.
    pub fn reconcile(&self) -> ReconcileReport {
        let sessions = self.sessions();
        let snapshot: Vec<OccupantSnapshot> = sessions
            .iter()
            .filter_map(|session| {
                let state = session.state();
                if !state.ready {
                    return None;
                }
                state.position.map(|position| OccupantSnapshot {
                    id: session.id(),
                    uuid: session.uuid(),
                    position,
                    skin_parts: state.skin_parts,
                })
            })
            .collect();
        let positions: HashMap<ConnectionId, Position> = snapshot
            .iter()
            .map(|occupant| (occupant.id, occupant.position))
            .collect();

        let threshold = self.geometry.proximity_threshold;
        let mut report = ReconcileReport::default();

        for session in &sessions {
            let viewer = session.id();
            let Some(own) = positions.get(&viewer) else {
                continue;
            };

            let mut state = session.state();
            if !state.ready || !state.presence_enabled {
                continue;
            }

            let mut gone: HashSet<ConnectionId> = state.visible.clone();
            for other in snapshot.iter().filter(|other| other.id != viewer) {
                gone.remove(&other.id);

                if own.horizontal_separation(&other.position) <= threshold {
                    if state.visible.contains(&other.id) {
                        session.send(ServerPacket::TeleportOccupant {
                            occupant: other.id,
                            position: other.position,
                        });
                        report.updated += 1;
                    } else {
                        session.send(ServerPacket::SpawnOccupant {
                            occupant: other.id,
                            uuid: other.uuid,
                            position: other.position,
                        });
                        session.send(ServerPacket::OccupantSkin {
                            occupant: other.id,
                            skin_parts: other.skin_parts,
                        });
                        state.visible.insert(other.id);
                        report.spawned += 1;
                    }
                } else if state.visible.remove(&other.id) {
                    session.send(ServerPacket::DestroyOccupant { occupant: other.id });
                    report.destroyed += 1;
                }
            }

            for occupant in gone {
                state.visible.remove(&occupant);
                session.send(ServerPacket::DestroyOccupant { occupant });
                report.destroyed += 1;
            }
        }

        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Connection double that records everything sent to it
    #[derive(Default)]
    pub(crate) struct RecordingHandle {
        pub id: ConnectionId,
        pub name: String,
        pub sent: Mutex<Vec<ServerPacket>>,
        pub closed: Mutex<Option<String>>,
    }

    impl RecordingHandle {
        pub fn new(id: ConnectionId, name: &str) -> Arc<Self> {
            Arc::new(Self {
                id,
                name: name.to_string(),
                ..Default::default()
            })
        }

        pub fn take(&self) -> Vec<ServerPacket> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    impl ConnectionHandle for RecordingHandle {
        fn id(&self) -> ConnectionId {
            self.id
        }
        fn uuid(&self) -> Uuid {
            Uuid::from_u128(u128::from(self.id))
        }
        fn username(&self) -> &str {
            &self.name
        }
        fn send(&self, packet: ServerPacket) {
            self.sent.lock().push(packet);
        }
        fn close(&self, reason: &str) {
            *self.closed.lock() = Some(reason.to_string());
        }
    }

    fn at(x: f64, z: f64) -> Position {
        Position::new(DVec3::new(x, 1.0, z), 0.0, 0.0)
    }

    fn coordinator() -> PresenceCoordinator {
        PresenceCoordinator::new(Arc::new(LibraryGeometry::default()))
    }

    fn join(coordinator: &PresenceCoordinator, id: ConnectionId, position: Position) -> Arc<RecordingHandle> {
        let handle = RecordingHandle::new(id, &format!("reader{}", id));
        coordinator.connect(handle.clone(), position, ConnectionState::default());
        coordinator.mark_ready(id).unwrap();
        handle
    }

    #[test]
    fn test_teleport_streams_neighborhood_and_gates_updates() {
        let coordinator = coordinator();
        let handle = join(&coordinator, 1, at(8.0, 8.0));

        coordinator.teleport(1, at(40.0, 40.0)).unwrap();
        let sent = handle.take();
        let chunks = sent
            .iter()
            .filter(|p| matches!(p, ServerPacket::LibraryChunk { .. }))
            .count();
        assert_eq!(chunks, 21);
        assert!(matches!(sent.last(), Some(ServerPacket::Position { teleport_id: TELEPORT_ID, .. })));

        // stale position from before the teleport
        coordinator.on_position_update(1, DVec3::new(100.0, 1.0, 8.0), None, None, true).unwrap();
        let stored = coordinator.with_state(1, |s| s.position).unwrap().unwrap();
        assert_eq!(stored.coords.x, 8.0);

        coordinator.confirm_teleport(1, TELEPORT_ID).unwrap();
        coordinator.on_position_update(1, DVec3::new(40.5, 1.0, 40.5), Some(90.0), None, true).unwrap();
        let stored = coordinator.with_state(1, |s| s.position).unwrap().unwrap();
        assert_eq!(stored.coords.x, 40.5);
        assert_eq!(stored.yaw, 90.0);
    }

    #[test]
    fn test_huge_coordinates_are_refused() {
        let coordinator = coordinator();
        let handle = join(&coordinator, 1, at(8.0, 8.0));

        let far = Position::new(DVec3::new(1e300, 1.0, 1.0), 0.0, 0.0);
        assert!(matches!(
            coordinator.teleport(1, far),
            Err(LibraryError::OutOfRange { .. })
        ));
        assert!(handle.take().is_empty());
        assert_eq!(
            coordinator.with_state(1, |s| s.teleport).unwrap(),
            TeleportState::Idle
        );

        let streamed = coordinator
            .on_position_update(1, DVec3::new(1e300, 1.0, 8.0), None, None, true)
            .unwrap();
        assert!(streamed.is_empty());
        assert!(handle.take().is_empty());
        let stored = coordinator.with_state(1, |s| s.position).unwrap().unwrap();
        assert_eq!(stored.coords.x, 8.0);

        // still a normal session afterwards
        coordinator.on_position_update(1, DVec3::new(17.0, 1.0, 8.0), None, None, true).unwrap();
        assert!(!handle.take().is_empty());
    }

    #[test]
    fn test_presence_toggle_destroys_visible() {
        let coordinator = coordinator();
        let a = join(&coordinator, 1, at(0.0, 0.0));
        join(&coordinator, 2, at(5.0, 5.0));
        coordinator.reconcile();
        a.take();

        coordinator.set_presence_enabled(1, false).unwrap();
        assert_eq!(a.take(), vec![ServerPacket::DestroyOccupant { occupant: 2 }]);

        let report = coordinator.reconcile();
        assert_eq!(report, ReconcileReport { spawned: 0, updated: 1, destroyed: 0 });
        assert!(a.take().is_empty());

        coordinator.set_presence_enabled(1, true).unwrap();
        coordinator.reconcile();
        assert!(matches!(a.take()[0], ServerPacket::SpawnOccupant { occupant: 2, .. }));
    }

    #[test]
    fn test_disconnected_occupant_is_destroyed() {
        let coordinator = coordinator();
        let a = join(&coordinator, 1, at(0.0, 0.0));
        join(&coordinator, 2, at(1.0, 1.0));
        coordinator.reconcile();
        a.take();

        assert!(coordinator.disconnect(2).is_some());
        let report = coordinator.reconcile();
        assert_eq!(report.destroyed, 1);
        assert_eq!(a.take(), vec![ServerPacket::DestroyOccupant { occupant: 2 }]);
    }

    #[test]
    fn test_unready_sessions_are_invisible() {
        let coordinator = coordinator();
        let a = join(&coordinator, 1, at(0.0, 0.0));
        let pending = RecordingHandle::new(2, "pending");
        coordinator.connect(pending, at(1.0, 1.0), ConnectionState::default());

        assert_eq!(coordinator.reconcile(), ReconcileReport::default());
        assert!(a.take().is_empty());
    }

    #[test]
    fn test_skin_change_reaches_viewers() {
        let coordinator = coordinator();
        let a = join(&coordinator, 1, at(0.0, 0.0));
        let b = join(&coordinator, 2, at(3.0, 0.0));
        coordinator.reconcile();
        a.take();
        b.take();

        coordinator.update_settings(2, 0x7f, true).unwrap();
        let expected = ServerPacket::OccupantSkin { occupant: 2, skin_parts: 0x7f };
        assert_eq!(a.take(), vec![expected.clone()]);
        assert_eq!(b.take(), vec![expected]);

        coordinator.update_settings(2, 0x7f, false).unwrap();
        assert!(a.take().is_empty());
    }

    #[test]
    fn test_unknown_connection() {
        let coordinator = coordinator();
        assert!(matches!(
            coordinator.teleport(9, at(0.0, 0.0)).unwrap_err(),
            LibraryError::UnknownConnection { id: 9 }
        ));
    }
}
