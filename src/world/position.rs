use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Position of a chunk in index space (world chunk coordinate + configured offset).
/// Addresses store chunks this way so every index is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkIndex {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A vertical column of chunks in world chunk coordinates. Streaming works on columns:
/// clients receive every chunk section of a column at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkColumn {
    pub x: i32,
    pub z: i32,
}

impl ChunkColumn {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column containing a world position
    pub fn containing(coords: DVec3, blocks_per_chunk: i32) -> Self {
        let size = f64::from(blocks_per_chunk);
        Self::new(
            (coords.x / size).floor() as i32,
            (coords.z / size).floor() as i32,
        )
    }

    /// Create a new column offset by the given amounts, saturating at the `i32` range
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.z.saturating_add(dz))
    }
}

/// Position of a block in the world (world coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Block containing a world position
    pub fn containing(coords: DVec3) -> Self {
        Self::new(
            coords.x.floor() as i64,
            coords.y.floor() as i64,
            coords.z.floor() as i64,
        )
    }

    /// World chunk coordinate of this block on each axis
    pub fn to_world_chunk(&self, blocks_per_chunk: i32) -> (i64, i64, i64) {
        let size = i64::from(blocks_per_chunk);
        (
            self.x.div_euclid(size),
            self.y.div_euclid(size),
            self.z.div_euclid(size),
        )
    }

    /// Get local position within chunk
    pub fn to_local_pos(&self, blocks_per_chunk: i32) -> [i32; 3] {
        let size = i64::from(blocks_per_chunk);
        // rem_euclid keeps the result in [0, size), which fits in i32
        [
            self.x.rem_euclid(size) as i32,
            self.y.rem_euclid(size) as i32,
            self.z.rem_euclid(size) as i32,
        ]
    }

    /// Create a new block position offset by the given amounts
    pub fn offset(&self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn as_dvec3(&self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

/// Where an occupant stands and looks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Position {
    pub fn new(coords: DVec3, yaw: f32, pitch: f32) -> Self {
        Self {
            coords,
            yaw,
            pitch,
            on_ground: true,
        }
    }

    /// Same orientation, different coordinates
    pub fn with_coords(self, coords: DVec3) -> Self {
        Self { coords, ..self }
    }

    /// Largest per-axis horizontal separation (Chebyshev distance on X/Z)
    pub fn horizontal_separation(&self, other: &Position) -> f64 {
        let dx = (self.coords.x - other.coords.x).abs();
        let dz = (self.coords.z - other.coords.z).abs();
        dx.max(dz)
    }
}
