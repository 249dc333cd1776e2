//! Fixed-width binary row schema
//!
//! A schema describes the layout of one posting row: how wide the key is,
//! how wide the full row is, and the total order applied to key bytes.
//! Two containers can only be merged when their schemas are compatible
//! (same ordering signature, same key position).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Total order over key bytes
///
/// `Base64` ranks bytes by their position in the URL-safe base64 alphabet
/// (`0-9 A-Z a-z - _`), the order document hashes are minted in. `Natural`
/// is plain lexicographic byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOrdering {
    Natural,
    Base64,
}

impl KeyOrdering {
    /// Stable identifier for this ordering; containers combine only when
    /// signatures match
    pub fn signature(&self) -> &'static str {
        match self {
            KeyOrdering::Natural => "nat",
            KeyOrdering::Base64 => "b64u",
        }
    }

    /// Compare two key byte sequences under this order
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            KeyOrdering::Natural => a.cmp(b),
            KeyOrdering::Base64 => {
                for (&x, &y) in a.iter().zip(b.iter()) {
                    let c = base64_rank(x).cmp(&base64_rank(y));
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                a.len().cmp(&b.len())
            }
        }
    }
}

/// Rank of a byte in the URL-safe base64 alphabet; bytes outside the
/// alphabet sort after it, by raw value
fn base64_rank(b: u8) -> u16 {
    match b {
        b'0'..=b'9' => (b - b'0') as u16,
        b'A'..=b'Z' => 10 + (b - b'A') as u16,
        b'a'..=b'z' => 36 + (b - b'a') as u16,
        b'-' => 62,
        b'_' => 63,
        other => 64 + other as u16,
    }
}

/// Layout of one fixed-width posting row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSchema {
    /// Width of the key field in bytes
    pub key_width: usize,
    /// Total row width in bytes (key included)
    pub row_width: usize,
    /// Index of the key field within the row; the key always starts the
    /// row in this crate, but the position participates in compatibility
    /// checks between containers
    pub primary_key_index: usize,
    /// Total order applied to key bytes
    pub ordering: KeyOrdering,
}

impl RowSchema {
    pub fn new(key_width: usize, row_width: usize, ordering: KeyOrdering) -> Self {
        debug_assert!(row_width >= key_width);
        Self {
            key_width,
            row_width,
            primary_key_index: 0,
            ordering,
        }
    }

    /// Compare two keys under this schema's ordering
    pub fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.ordering.compare(a, b)
    }

    /// Whether two schemas order their keys identically; a merge-join over
    /// containers with incompatible orderings would silently produce
    /// garbage, so callers degrade to an empty result instead
    pub fn same_ordering(&self, other: &RowSchema) -> bool {
        self.ordering.signature() == other.ordering.signature()
            && self.primary_key_index == other.primary_key_index
    }

    /// Whether rows from `other` can live in a container with this schema
    pub fn same_layout(&self, other: &RowSchema) -> bool {
        self.key_width == other.key_width && self.row_width == other.row_width
    }
}
