//! Bijection between library locations, page ids and page text
//!
//! A page id is a mixed-radix number whose digits are, from most to least significant:
//!
//! | field    | radix               | multiplier                      |
//! |----------|---------------------|---------------------------------|
//! | chunk_x  | horizontal chunks   | chunk_y multiplier × vertical   |
//! | chunk_y  | vertical chunks     | chunk_z multiplier × horizontal |
//! | chunk_z  | horizontal chunks   | P·K·K·S                         |
//! | shelf    | S (shelves)         | P·K·K                           |
//! | shulker  | K (container slots) | P·K                             |
//! | book     | K                   | P                               |
//! | page     | P (pages per book)  | 1                               |
//!
//! Both directions use this order. Changing it changes which text lives where.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::ToPrimitive;

use super::geometry::LibraryGeometry;
use super::numeral::{Alphabet, NumeralCodec};
use super::shuffle::ShuffleCipher;
use crate::error::{LibraryError, LibraryResult};
use crate::world::{BlockPos, ChunkIndex};

/// One page of the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub chunk: ChunkIndex,
    pub shelf: u32,
    pub shulker: u32,
    pub book: u32,
    pub page: u32,
}

impl Address {
    pub fn new(chunk: ChunkIndex, shelf: u32, shulker: u32, book: u32, page: u32) -> Self {
        Self {
            chunk,
            shelf,
            shulker,
            book,
            page,
        }
    }

    /// First page of the first book in a container
    pub fn container_start(chunk: ChunkIndex, shelf: u32, shulker: u32) -> Self {
        Self::new(chunk, shelf, shulker, 0, 0)
    }
}

#[derive(Debug, Clone)]
struct Multipliers {
    book: BigUint,
    shulker: BigUint,
    shelf: BigUint,
    chunk_z: BigUint,
    chunk_y: BigUint,
    chunk_x: BigUint,
}

impl Multipliers {
    fn new(geometry: &LibraryGeometry) -> Self {
        let book = BigUint::from(geometry.pages_per_book);
        let shulker = &book * geometry.slots_per_container;
        let shelf = &shulker * geometry.slots_per_container;
        let chunk_z = &shelf * geometry.shelf_count();
        let chunk_y = &chunk_z * geometry.horizontal_chunks;
        let chunk_x = &chunk_y * geometry.vertical_chunks;
        Self {
            book,
            shulker,
            shelf,
            chunk_z,
            chunk_y,
            chunk_x,
        }
    }
}

/// Converts between [`Address`], page ids and page text for one geometry
#[derive(Debug)]
pub struct AddressCodec {
    geometry: LibraryGeometry,
    numerals: NumeralCodec,
    shuffle: ShuffleCipher,
    multipliers: Multipliers,
    total: BigUint,
}

impl AddressCodec {
    /// Build a codec with the built-in shuffle key
    pub fn new(geometry: LibraryGeometry) -> LibraryResult<Self> {
        geometry.validate()?;

        let alphabet = Alphabet::new(&geometry.alphabet)?;
        let numerals = NumeralCodec::new(alphabet.clone(), geometry.page_text_length);
        let shuffle = ShuffleCipher::new(alphabet, geometry.page_text_length)?;
        let multipliers = Multipliers::new(&geometry);
        let total = &multipliers.chunk_x * geometry.horizontal_chunks;

        Ok(Self {
            geometry,
            numerals,
            shuffle,
            multipliers,
            total,
        })
    }

    pub fn geometry(&self) -> &LibraryGeometry {
        &self.geometry
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.numerals.alphabet()
    }

    pub fn page_text_length(&self) -> usize {
        self.numerals.length()
    }

    /// Number of addressable pages
    pub fn total_space(&self) -> &BigUint {
        &self.total
    }

    pub fn address_to_page_id(&self, address: &Address) -> LibraryResult<BigUint> {
        self.check_bounds(address)?;
        let m = &self.multipliers;

        Ok(BigUint::from(address.page)
            + &m.book * address.book
            + &m.shulker * address.shulker
            + &m.shelf * address.shelf
            + &m.chunk_z * chunk_digit(address.chunk.z)
            + &m.chunk_y * chunk_digit(address.chunk.y)
            + &m.chunk_x * chunk_digit(address.chunk.x))
    }

    pub fn page_id_to_address(&self, page_id: &BigUint) -> LibraryResult<Address> {
        if page_id >= &self.total {
            return Err(LibraryError::out_of_range("page id", &self.total));
        }
        let m = &self.multipliers;
        let g = &self.geometry;

        let (chunk_x, rest) = page_id.div_rem(&m.chunk_x);
        let (chunk_y, rest) = rest.div_rem(&m.chunk_y);
        let (chunk_z, rest) = rest.div_rem(&m.chunk_z);
        let (shelf, rest) = rest.div_rem(&m.shelf);
        let (shulker, rest) = rest.div_rem(&m.shulker);
        let (book, page) = rest.div_rem(&m.book);

        Ok(Address {
            chunk: ChunkIndex::new(
                narrow_chunk(&chunk_x, "chunk x", g.horizontal_chunks)?,
                narrow_chunk(&chunk_y, "chunk y", g.vertical_chunks)?,
                narrow_chunk(&chunk_z, "chunk z", g.horizontal_chunks)?,
            ),
            shelf: narrow(&shelf, "shelf", g.shelf_count())?,
            shulker: narrow(&shulker, "shulker", g.slots_per_container)?,
            book: narrow(&book, "book", g.slots_per_container)?,
            page: narrow(&page, "page", g.pages_per_book)?,
        })
    }

    /// Text shown on the page with this id
    pub fn page_text(&self, page_id: &BigUint) -> LibraryResult<String> {
        if page_id >= &self.total {
            return Err(LibraryError::out_of_range("page id", &self.total));
        }
        self.shuffle.shuffle(&self.numerals.encode(page_id)?)
    }

    pub fn address_to_text(&self, address: &Address) -> LibraryResult<String> {
        self.page_text(&self.address_to_page_id(address)?)
    }

    /// Locate a page from its exact text. The text must already be padded to full length.
    pub fn text_to_address(&self, text: &str) -> LibraryResult<Address> {
        let page_id = self.numerals.decode(&self.shuffle.unshuffle(text)?)?;
        self.page_id_to_address(&page_id)
    }

    /// World block of the shelf holding an address, as shown to users
    pub fn display_coordinates(&self, address: &Address) -> LibraryResult<BlockPos> {
        self.geometry.shelf_block(address.chunk, address.shelf)
    }

    fn check_bounds(&self, address: &Address) -> LibraryResult<()> {
        let g = &self.geometry;
        let chunk_in = |value: i32, bound: u32| value >= 0 && (value as u32) < bound;

        if !chunk_in(address.chunk.x, g.horizontal_chunks) {
            return Err(LibraryError::out_of_range("chunk x", g.horizontal_chunks));
        }
        if !chunk_in(address.chunk.y, g.vertical_chunks) {
            return Err(LibraryError::out_of_range("chunk y", g.vertical_chunks));
        }
        if !chunk_in(address.chunk.z, g.horizontal_chunks) {
            return Err(LibraryError::out_of_range("chunk z", g.horizontal_chunks));
        }
        if address.shelf >= g.shelf_count() {
            return Err(LibraryError::out_of_range("shelf", g.shelf_count()));
        }
        if address.shulker >= g.slots_per_container {
            return Err(LibraryError::out_of_range("shulker", g.slots_per_container));
        }
        if address.book >= g.slots_per_container {
            return Err(LibraryError::out_of_range("book", g.slots_per_container));
        }
        if address.page >= g.pages_per_book {
            return Err(LibraryError::out_of_range("page", g.pages_per_book));
        }
        Ok(())
    }
}

/// Bounds are checked before this is called, so the index is non-negative
fn chunk_digit(index: i32) -> u32 {
    index.unsigned_abs()
}

fn narrow(value: &BigUint, field: &'static str, bound: u32) -> LibraryResult<u32> {
    value
        .to_u32()
        .filter(|v| *v < bound)
        .ok_or_else(|| LibraryError::out_of_range(field, bound))
}

fn narrow_chunk(value: &BigUint, field: &'static str, bound: u32) -> LibraryResult<i32> {
    let index = narrow(value, field, bound)?;
    i32::try_from(index).map_err(|_| LibraryError::out_of_range(field, i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn codec() -> AddressCodec {
        AddressCodec::new(LibraryGeometry::default()).unwrap()
    }

    #[test]
    fn test_zero_address_is_page_zero() {
        let codec = codec();
        let zero = Address::new(ChunkIndex::new(0, 0, 0), 0, 0, 0, 0);
        let id = codec.address_to_page_id(&zero).unwrap();
        assert!(id.is_zero());
        assert_eq!(codec.page_id_to_address(&id).unwrap(), zero);
    }

    #[test]
    fn test_page_is_least_significant() {
        let codec = codec();
        let address = Address::new(ChunkIndex::new(0, 0, 0), 0, 0, 1, 2);
        let id = codec.address_to_page_id(&address).unwrap();
        assert_eq!(id, BigUint::from(81u32 + 2));
    }

    #[test]
    fn test_address_round_trip_at_bounds() {
        let codec = codec();
        let g = codec.geometry().clone();
        let last = Address::new(
            ChunkIndex::new(
                g.horizontal_chunks as i32 - 1,
                g.vertical_chunks as i32 - 1,
                g.horizontal_chunks as i32 - 1,
            ),
            g.shelf_count() - 1,
            g.slots_per_container - 1,
            g.slots_per_container - 1,
            g.pages_per_book - 1,
        );
        let id = codec.address_to_page_id(&last).unwrap();
        assert_eq!(&id + 1u32, *codec.total_space());
        assert_eq!(codec.page_id_to_address(&id).unwrap(), last);
    }

    #[test]
    fn test_text_round_trip() {
        let codec = codec();
        let address = Address::new(ChunkIndex::new(797_161, 4, 12), 40, 13, 26, 80);
        let text = codec.address_to_text(&address).unwrap();
        assert_eq!(text.chars().count(), 15);
        assert_eq!(codec.text_to_address(&text).unwrap(), address);
    }

    #[test]
    fn test_out_of_bounds_fields_rejected() {
        let codec = codec();
        let chunk = ChunkIndex::new(0, 0, 0);
        for address in [
            Address::new(chunk, 81, 0, 0, 0),
            Address::new(chunk, 0, 27, 0, 0),
            Address::new(chunk, 0, 0, 27, 0),
            Address::new(chunk, 0, 0, 0, 81),
            Address::new(ChunkIndex::new(-1, 0, 0), 0, 0, 0, 0),
            Address::new(ChunkIndex::new(0, 243, 0), 0, 0, 0, 0),
        ] {
            assert!(matches!(
                codec.address_to_page_id(&address).unwrap_err(),
                LibraryError::OutOfRange { .. }
            ));
        }
    }

    #[test]
    fn test_page_id_beyond_total_rejected() {
        let codec = codec();
        let total = codec.total_space().clone();
        assert!(codec.page_id_to_address(&total).is_err());
        assert!(codec.page_text(&total).is_err());
    }

    #[test]
    fn test_smaller_geometry_rejects_unreachable_text() {
        let mut geometry = LibraryGeometry::default();
        geometry.vertical_chunks = 3;
        geometry.chunk_y_offset = 1;
        let codec = AddressCodec::new(geometry).unwrap();

        let alphabet = codec.alphabet().clone();
        let numerals = NumeralCodec::new(alphabet.clone(), 15);
        let shuffle = ShuffleCipher::new(alphabet, 15).unwrap();
        let unreachable = shuffle.shuffle(&numerals.encode(codec.total_space()).unwrap()).unwrap();

        assert!(matches!(
            codec.text_to_address(&unreachable).unwrap_err(),
            LibraryError::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_display_coordinates_are_shelf_block() {
        let codec = codec();
        let g = codec.geometry();
        let address = Address::new(
            ChunkIndex::new(g.chunk_xz_offset, g.chunk_y_offset, g.chunk_xz_offset + 1),
            0,
            0,
            0,
            0,
        );
        // first shelf of the default wall sits at local (15, 2, 3)
        assert_eq!(codec.display_coordinates(&address).unwrap(), BlockPos::new(15, 2, 19));
    }
}
