//! World coordinate types
//!
//! The library has no mutable world state; these types only describe where things are.
//!
//! - **ChunkIndex**: chunk coordinates shifted into the non-negative index space used by addresses
//! - **ChunkColumn**: world chunk X/Z, the unit of chunk streaming
//! - **BlockPos**: integer block coordinates
//! - **Position**: an occupant's coordinates and orientation

pub mod position;

pub use position::{BlockPos, ChunkColumn, ChunkIndex, Position};
