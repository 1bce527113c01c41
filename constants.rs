// Babel Library Constants - SINGLE SOURCE OF TRUTH
//
// Defaults for every tunable in the server. Runtime configuration (server TOML,
// live JSON feed) starts from these values.
//
// Do NOT define these numbers anywhere else in the codebase!

/// Page text alphabet and length
pub mod text {
    /// Symbols a page may contain, ordered by numeral value. Index 0 is the padding symbol.
    pub const ALPHABET: &str = " ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    /// Every page holds exactly this many symbols
    pub const PAGE_TEXT_LENGTH: usize = 15;
}

/// Library geometry - 27^15 pages exactly
pub mod library {
    /// Blocks along each edge of a chunk
    pub const BLOCKS_PER_CHUNK: i32 = 16;
    /// Chunk columns along X and along Z (3^13)
    pub const HORIZONTAL_CHUNKS: u32 = 1_594_323;
    /// Chunk layers along Y (3^5)
    pub const VERTICAL_CHUNKS: u32 = 243;
    /// World chunk coordinate + offset = chunk index
    pub const CHUNK_XZ_OFFSET: i32 = (HORIZONTAL_CHUNKS / 2) as i32;
    pub const CHUNK_Y_OFFSET: i32 = 4;
    /// Bookshelves per chunk, laid out as a square wall on the chunk's +X edge
    pub const SHELF_WALL_SIDE: u32 = 9;
    pub const SHELVES_PER_CHUNK: u32 = SHELF_WALL_SIDE * SHELF_WALL_SIDE;
    /// Shulker boxes per shelf and books per shulker box
    pub const SLOTS_PER_CONTAINER: u32 = 27;
    /// Pages per book
    pub const PAGES_PER_BOOK: u32 = 81;
}

/// Spawn point inside a chunk
pub mod spawn {
    pub const SPAWN_OFFSET_X: f64 = 7.5;
    pub const SPAWN_OFFSET_Z: f64 = 7.5;
    pub const SPAWN_Y: f64 = 1.0;
    pub const SPAWN_YAW: f32 = -90.0;
    pub const SPAWN_PITCH: f32 = 0.0;
}

/// Presence and streaming
pub mod presence {
    /// Max horizontal distance (blocks, per axis) at which occupants see each other
    pub const PROXIMITY_THRESHOLD: f64 = 32.0;
    /// Default reconciliation interval in milliseconds
    pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 1_000;
    /// Highlight markers are re-emitted on this cadence
    pub const HIGHLIGHT_INTERVAL_MS: u64 = 1_000;
    /// Default particle id for highlight markers
    pub const STANDARD_MARKER_PARTICLE: u32 = 31;
    /// Chat lines kept per connection for reports
    pub const CHAT_HISTORY_LENGTH: usize = 10;
}

/// Network limits and defaults
pub mod network {
    pub const PROTOCOL_VERSION: u32 = 1;
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:25565";
    pub const MAX_PACKET_SIZE: usize = 65536; // 64KB max packet size
    pub const MAX_USERNAME_LENGTH: usize = 16;
    pub const MAX_CHAT_MESSAGE_LENGTH: usize = 256;
    pub const DEFAULT_MAX_PLAYERS: usize = 100;
    /// Teleport id echoed back by clients in their confirmation
    pub const TELEPORT_ID: u32 = 2;
    /// Give up on a report webhook after this long
    pub const REPORT_TIMEOUT_SECS: u64 = 10;
}

/// Links shown in chat
pub mod links {
    pub const LEARN_MORE_URL: &str = "https://libraryofbabel.info/About.html";
    pub const NEARBY_SEARCH_TOOL_URL: &str = "https://babel-library.example/nearby";
}
