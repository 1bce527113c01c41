//! Library layout: how many chunks, shelves, boxes, books and pages exist and where they sit
//!
//! Everything here is static input data. It is read from the `[library]` table of the server
//! config and defaults to the layout in `constants.rs`, whose page count is exactly 27^15.

use glam::DVec3;
use num_bigint::BigUint;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::numeral::Alphabet;
use crate::constants::{library, presence, spawn, text};
use crate::error::{LibraryError, LibraryResult};
use crate::world::{BlockPos, ChunkIndex, Position};

/// Where a visitor stands to read a shelf, relative to the chunk root
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub offset: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
}

/// One bookshelf position inside a chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfSlot {
    /// Block coordinates relative to the chunk root
    pub local: [i32; 3],
    pub viewpoint: Viewpoint,
}

/// Spawn point inside a randomly chosen chunk column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub offset_x: f64,
    pub y: f64,
    pub offset_z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            offset_x: spawn::SPAWN_OFFSET_X,
            y: spawn::SPAWN_Y,
            offset_z: spawn::SPAWN_OFFSET_Z,
            yaw: spawn::SPAWN_YAW,
            pitch: spawn::SPAWN_PITCH,
        }
    }
}

/// Dimensions of the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryGeometry {
    pub alphabet: String,
    pub page_text_length: usize,
    pub blocks_per_chunk: i32,
    pub horizontal_chunks: u32,
    pub vertical_chunks: u32,
    pub chunk_xz_offset: i32,
    pub chunk_y_offset: i32,
    pub slots_per_container: u32,
    pub pages_per_book: u32,
    pub shelves: Vec<ShelfSlot>,
    pub proximity_threshold: f64,
    pub spawn: SpawnPoint,
}

impl Default for LibraryGeometry {
    fn default() -> Self {
        Self {
            alphabet: text::ALPHABET.to_string(),
            page_text_length: text::PAGE_TEXT_LENGTH,
            blocks_per_chunk: library::BLOCKS_PER_CHUNK,
            horizontal_chunks: library::HORIZONTAL_CHUNKS,
            vertical_chunks: library::VERTICAL_CHUNKS,
            chunk_xz_offset: library::CHUNK_XZ_OFFSET,
            chunk_y_offset: library::CHUNK_Y_OFFSET,
            slots_per_container: library::SLOTS_PER_CONTAINER,
            pages_per_book: library::PAGES_PER_BOOK,
            shelves: default_shelves(),
            proximity_threshold: presence::PROXIMITY_THRESHOLD,
            spawn: SpawnPoint::default(),
        }
    }
}

/// Square wall of shelves against the chunk's +X edge, one row per block of height,
/// with the reading spot two blocks in front of each shelf.
pub fn default_shelves() -> Vec<ShelfSlot> {
    let side = library::SHELF_WALL_SIDE as i32;
    let wall_x = library::BLOCKS_PER_CHUNK - 1;

    (0..side)
        .flat_map(|row| (0..side).map(move |column| (row, column)))
        .map(|(row, column)| {
            let local = [wall_x, 2 + row, 3 + column];
            ShelfSlot {
                local,
                viewpoint: Viewpoint {
                    offset: [
                        f64::from(wall_x) - 1.5,
                        f64::from(local[1] - 1),
                        f64::from(local[2]) + 0.5,
                    ],
                    yaw: -90.0,
                    pitch: 0.0,
                },
            }
        })
        .collect()
}

impl LibraryGeometry {
    pub fn shelf_count(&self) -> u32 {
        self.shelves.len() as u32
    }

    /// Number of pages in the library
    pub fn total_pages(&self) -> BigUint {
        BigUint::from(self.horizontal_chunks)
            * BigUint::from(self.vertical_chunks)
            * BigUint::from(self.horizontal_chunks)
            * BigUint::from(self.shelf_count())
            * BigUint::from(self.slots_per_container)
            * BigUint::from(self.slots_per_container)
            * BigUint::from(self.pages_per_book)
    }

    /// Reject layouts the codec and the streaming code cannot work with
    pub fn validate(&self) -> LibraryResult<()> {
        let invalid = |reason: String| Err(LibraryError::InvalidGeometry { reason });

        if self.blocks_per_chunk <= 0 {
            return invalid(format!("blocks_per_chunk must be positive, got {}", self.blocks_per_chunk));
        }
        if self.page_text_length == 0 {
            return invalid("page_text_length must be positive".to_string());
        }
        for (name, count) in [
            ("horizontal_chunks", self.horizontal_chunks),
            ("vertical_chunks", self.vertical_chunks),
            ("slots_per_container", self.slots_per_container),
            ("pages_per_book", self.pages_per_book),
        ] {
            if count == 0 {
                return invalid(format!("{} must be positive", name));
            }
        }
        for (name, count) in [
            ("horizontal_chunks", self.horizontal_chunks),
            ("vertical_chunks", self.vertical_chunks),
        ] {
            if i32::try_from(count).is_err() {
                return invalid(format!("{} must fit in a signed 32-bit index", name));
            }
        }
        if self.shelves.is_empty() {
            return invalid("the shelf table is empty".to_string());
        }
        for (index, shelf) in self.shelves.iter().enumerate() {
            if shelf.local.iter().any(|c| *c < 0 || *c >= self.blocks_per_chunk) {
                return invalid(format!("shelf {} lies outside its chunk: {:?}", index + 1, shelf.local));
            }
            if self.shelves[..index].iter().any(|other| other.local == shelf.local) {
                return invalid(format!("shelf {} repeats position {:?}", index + 1, shelf.local));
            }
        }
        if self.chunk_xz_offset < 0 || self.chunk_xz_offset as u32 >= self.horizontal_chunks {
            return invalid(format!("chunk_xz_offset {} is outside [0, {})", self.chunk_xz_offset, self.horizontal_chunks));
        }
        if self.chunk_y_offset < 0 || self.chunk_y_offset as u32 >= self.vertical_chunks {
            return invalid(format!("chunk_y_offset {} is outside [0, {})", self.chunk_y_offset, self.vertical_chunks));
        }
        if !(self.proximity_threshold >= 0.0) {
            return invalid("proximity_threshold must be a non-negative number".to_string());
        }

        let alphabet = Alphabet::new(&self.alphabet)?;
        let text_space = BigUint::from(alphabet.radix()).pow(self.page_text_length as u32);
        if self.total_pages() > text_space {
            return invalid(format!(
                "{} pages do not fit in {} page texts",
                self.total_pages(),
                text_space
            ));
        }

        Ok(())
    }

    /// Chunk index containing a world block, or `None` if the index does not fit in `i32`
    pub fn chunk_index_of_block(&self, block: BlockPos) -> Option<ChunkIndex> {
        let (x, y, z) = block.to_world_chunk(self.blocks_per_chunk);
        let shift = |value: i64, offset: i32| {
            value
                .checked_add(i64::from(offset))
                .and_then(|index| i32::try_from(index).ok())
        };
        Some(ChunkIndex::new(
            shift(x, self.chunk_xz_offset)?,
            shift(y, self.chunk_y_offset)?,
            shift(z, self.chunk_xz_offset)?,
        ))
    }

    /// Chunk index containing a world position
    pub fn chunk_index_of(&self, coords: DVec3) -> Option<ChunkIndex> {
        self.chunk_index_of_block(BlockPos::containing(coords))
    }

    /// Library chunk holding a world block; `None` outside the library
    pub fn library_chunk_of_block(&self, block: BlockPos) -> Option<ChunkIndex> {
        self.chunk_index_of_block(block)
            .filter(|chunk| self.contains_chunk(*chunk))
    }

    /// Library chunk holding a world position; `None` outside the library
    pub fn library_chunk_of(&self, coords: DVec3) -> Option<ChunkIndex> {
        self.library_chunk_of_block(BlockPos::containing(coords))
    }

    /// Whether a position lies over the library floor plan. Height is not checked, so visitors
    /// falling or flying past the top and bottom rooms still count as inside.
    pub fn contains_horizontal(&self, coords: DVec3) -> bool {
        if !coords.is_finite() {
            return false;
        }
        let ground = DVec3::new(coords.x, 0.0, coords.z);
        self.chunk_index_of(ground).map_or(false, |chunk| {
            let within = |value: i32| value >= 0 && (value as u32) < self.horizontal_chunks;
            within(chunk.x) && within(chunk.z)
        })
    }

    /// Whether a chunk index lies inside the library
    pub fn contains_chunk(&self, chunk: ChunkIndex) -> bool {
        let within = |value: i32, count: u32| value >= 0 && (value as u32) < count;
        within(chunk.x, self.horizontal_chunks)
            && within(chunk.y, self.vertical_chunks)
            && within(chunk.z, self.horizontal_chunks)
    }

    /// World block at the minimum corner of a chunk
    pub fn chunk_root(&self, chunk: ChunkIndex) -> BlockPos {
        let size = i64::from(self.blocks_per_chunk);
        BlockPos::new(
            (i64::from(chunk.x) - i64::from(self.chunk_xz_offset)) * size,
            (i64::from(chunk.y) - i64::from(self.chunk_y_offset)) * size,
            (i64::from(chunk.z) - i64::from(self.chunk_xz_offset)) * size,
        )
    }

    pub fn shelf(&self, shelf: u32) -> LibraryResult<&ShelfSlot> {
        self.shelves
            .get(shelf as usize)
            .ok_or_else(|| LibraryError::out_of_range("shelf", self.shelf_count()))
    }

    /// Index of the shelf at a world block, if that block holds one
    pub fn shelf_at(&self, block: BlockPos) -> Option<u32> {
        let local = block.to_local_pos(self.blocks_per_chunk);
        self.shelves
            .iter()
            .position(|slot| slot.local == local)
            .map(|index| index as u32)
    }

    /// World block holding a shelf
    pub fn shelf_block(&self, chunk: ChunkIndex, shelf: u32) -> LibraryResult<BlockPos> {
        let [x, y, z] = self.shelf(shelf)?.local;
        Ok(self.chunk_root(chunk).offset(i64::from(x), i64::from(y), i64::from(z)))
    }

    /// Reading spot in front of a shelf
    pub fn shelf_viewpoint(&self, chunk: ChunkIndex, shelf: u32) -> LibraryResult<Position> {
        let viewpoint = self.shelf(shelf)?.viewpoint;
        let root = self.chunk_root(chunk).as_dvec3();
        Ok(Position::new(
            root + DVec3::from_array(viewpoint.offset),
            viewpoint.yaw,
            viewpoint.pitch,
        ))
    }

    /// Random spawn point. The Y chunk is fixed so visitors can always climb up or down.
    pub fn random_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let size = f64::from(self.blocks_per_chunk);
        let chunk_x = i64::from(rng.gen_range(0..self.horizontal_chunks)) - i64::from(self.chunk_xz_offset);
        let chunk_z = i64::from(rng.gen_range(0..self.horizontal_chunks)) - i64::from(self.chunk_xz_offset);

        Position::new(
            DVec3::new(
                chunk_x as f64 * size + self.spawn.offset_x,
                self.spawn.y,
                chunk_z as f64 * size + self.spawn.offset_z,
            ),
            self.spawn.yaw,
            self.spawn.pitch,
        )
    }
}
