use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::address::{Address, AddressCodec};
use crate::error::LibraryResult;
use crate::world::ChunkIndex;

/// Author shown on every book
pub const BOOK_AUTHOR: &str = "UNKNOWN";

/// A written book as handed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub pages: Vec<String>,
}

/// Every book in one container, in slot order
pub fn container_books(
    codec: &AddressCodec,
    chunk: ChunkIndex,
    shelf: u32,
    shulker: u32,
) -> LibraryResult<Vec<Book>> {
    let geometry = codec.geometry();
    let first = codec.address_to_page_id(&Address::container_start(chunk, shelf, shulker))?;
    let pages_per_book = geometry.pages_per_book;

    (0..geometry.slots_per_container)
        .map(|book| {
            let book_start = &first + BigUint::from(book) * pages_per_book;
            let pages = (0..pages_per_book)
                .map(|page| codec.page_text(&(&book_start + page)))
                .collect::<LibraryResult<Vec<_>>>()?;

            Ok(Book {
                title: format!("Book {}", book + 1),
                author: BOOK_AUTHOR.to_string(),
                pages,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryGeometry;

    #[test]
    fn test_container_books_match_addresses() {
        let codec = AddressCodec::new(LibraryGeometry::default()).unwrap();
        let chunk = ChunkIndex::new(10, 20, 30);
        let books = container_books(&codec, chunk, 5, 6).unwrap();

        assert_eq!(books.len(), 27);
        assert_eq!(books[0].title, "Book 1");
        assert_eq!(books[26].title, "Book 27");
        assert!(books.iter().all(|book| book.pages.len() == 81));

        let address = Address::new(chunk, 5, 6, 3, 40);
        assert_eq!(books[3].pages[40], codec.address_to_text(&address).unwrap());
    }

    #[test]
    fn test_container_books_reject_bad_shelf() {
        let codec = AddressCodec::new(LibraryGeometry::default()).unwrap();
        assert!(container_books(&codec, ChunkIndex::new(0, 0, 0), 81, 0).is_err());
    }
}
