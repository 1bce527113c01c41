//! Turning what a user typed into a page location

use std::str::FromStr;

use rand::Rng;

use super::address::{Address, AddressCodec};
use super::numeral::Alphabet;
use crate::error::{LibraryError, LibraryResult};

/// How a query shorter than a page is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Pad the end with the zero symbol; the same query always finds the same page
    Exact,
    /// Surround the query with random symbols; every search finds a new page
    Fill,
}

impl FromStr for SearchMode {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(SearchMode::Exact),
            "fill" => Ok(SearchMode::Fill),
            other => Err(LibraryError::InvalidSearchMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Exact => write!(f, "exact"),
            SearchMode::Fill => write!(f, "fill"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The query as searched, uppercased
    pub query: String,
    /// Full page text that was located
    pub text: String,
    pub address: Address,
}

/// Place `text` at a random offset and fill the rest with random symbols
pub fn random_fill<R: Rng + ?Sized>(
    text: &str,
    alphabet: &Alphabet,
    length: usize,
    rng: &mut R,
) -> String {
    let missing = length.saturating_sub(text.chars().count());
    let before = rng.gen_range(0..=missing);
    let mut random_symbol = || alphabet.symbols()[rng.gen_range(0..alphabet.symbols().len())];

    let mut filled = String::with_capacity(length);
    for _ in 0..before {
        filled.push(random_symbol());
    }
    filled.push_str(text);
    for _ in before..missing {
        filled.push(random_symbol());
    }
    filled
}

/// Normalize a query into full page text
pub fn prepare_query<R: Rng + ?Sized>(
    query: &str,
    mode: SearchMode,
    alphabet: &Alphabet,
    length: usize,
    rng: &mut R,
) -> LibraryResult<String> {
    let query = query.to_uppercase();
    let query_length = query.chars().count();
    if query_length > length {
        return Err(LibraryError::LengthExceeded {
            length: query_length,
            max: length,
        });
    }

    if let Some(character) = query.chars().find(|c| !alphabet.contains(*c)) {
        return Err(LibraryError::InvalidSymbol { character });
    }

    let mut text = match mode {
        SearchMode::Fill => random_fill(&query, alphabet, length, rng),
        SearchMode::Exact => query,
    };
    while text.chars().count() < length {
        text.push(alphabet.zero());
    }

    Ok(text)
}

/// Find the page holding `query`
pub fn resolve_search<R: Rng + ?Sized>(
    codec: &AddressCodec,
    query: &str,
    mode: SearchMode,
    rng: &mut R,
) -> LibraryResult<SearchResult> {
    let text = prepare_query(query, mode, codec.alphabet(), codec.page_text_length(), rng)?;
    let address = codec.text_to_address(&text)?;

    Ok(SearchResult {
        query: query.to_uppercase(),
        text,
        address,
    })
}
