//! The library's content: every page location and the text it holds
//!
//! Page text is never stored. It is computed from the page's address on demand:
//!
//! ```text
//! Address --mixed radix--> PageId --numerals--> text --shuffle--> PageText
//! ```
//!
//! and a search runs the same chain backwards.

pub mod address;
pub mod books;
pub mod geometry;
pub mod numeral;
pub mod search;
pub mod shuffle;

pub use address::{Address, AddressCodec};
pub use books::{container_books, Book};
pub use geometry::{LibraryGeometry, ShelfSlot, SpawnPoint, Viewpoint};
pub use numeral::{Alphabet, NumeralCodec};
pub use search::{prepare_query, random_fill, resolve_search, SearchMode, SearchResult};
pub use shuffle::ShuffleCipher;
