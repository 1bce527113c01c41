//! Repeating shelf markers
//!
//! A viewer has at most one highlight. Starting a new one replaces the old timer; stopping is
//! idempotent.

use std::time::Duration;

use glam::DVec3;
use log::info;

use super::connection::ConnectionId;
use super::coordinator::PresenceCoordinator;
use super::scheduler::RepeatingTask;
use crate::constants::presence::{HIGHLIGHT_INTERVAL_MS, STANDARD_MARKER_PARTICLE};
use crate::error::LibraryResult;
use crate::library::{Address, LibraryGeometry};
use crate::network::ServerPacket;
use crate::world::BlockPos;

/// Shelves that get a different particle: (chunk root, shelf, particle)
const SPECIAL_MARKERS: &[([i64; 3], u32, u32)] = &[
    // first shelf at the world origin
    ([0, 0, 0], 0, 14),
    // last shelf at the world origin
    ([0, 0, 0], 80, 14),
];

/// Where and how a highlight is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    pub point: DVec3,
    pub kind: u32,
}

/// Particle used for a shelf in the chunk rooted at `root`
pub fn marker_kind(root: BlockPos, shelf: u32) -> u32 {
    SPECIAL_MARKERS
        .iter()
        .find(|(special_root, special_shelf, _)| {
            *special_root == [root.x, root.y, root.z] && *special_shelf == shelf
        })
        .map(|(_, _, kind)| *kind)
        .unwrap_or(STANDARD_MARKER_PARTICLE)
}

/// Centre of the addressed shelf block and the particle to draw there
pub fn resolve_marker(geometry: &LibraryGeometry, address: &Address) -> LibraryResult<MarkerPoint> {
    let block = geometry.shelf_block(address.chunk, address.shelf)?;
    Ok(MarkerPoint {
        point: block.as_dvec3() + DVec3::splat(0.5),
        kind: marker_kind(geometry.chunk_root(address.chunk), address.shelf),
    })
}

impl PresenceCoordinator {
    /// Mark the addressed shelf once per second until stopped or replaced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_highlight(&self, id: ConnectionId, address: &Address) -> LibraryResult<MarkerPoint> {
        let session = self.require(id)?;
        let marker = resolve_marker(self.geometry(), address)?;

        let handle = session.handle().clone();
        let task = RepeatingTask::spawn(Duration::from_millis(HIGHLIGHT_INTERVAL_MS), move || {
            handle.send(ServerPacket::Marker {
                kind: marker.kind,
                point: marker.point,
            });
        });

        // replacing the old task drops it, which aborts it
        session.state().highlight = Some(task);

        info!(
            "{} is highlighting shelf {} at {:.0}, {:.0}, {:.0}",
            session.username(),
            address.shelf + 1,
            marker.point.x,
            marker.point.y,
            marker.point.z
        );
        Ok(marker)
    }

    /// Stop the viewer's highlight. Returns whether one was running.
    pub fn stop_highlight(&self, id: ConnectionId) -> LibraryResult<bool> {
        let session = self.require(id)?;
        let task = session.state().highlight.take();
        Ok(match task {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        })
    }
}
