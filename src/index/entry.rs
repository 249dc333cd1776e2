//! Posting entry: one document reference for one term
//!
//! An entry is stored as one fixed-width binary row. The key is the
//! document hash: a local-id prefix followed by a domain fingerprint
//! identifying the owning host. The payload carries occurrence position,
//! term frequency, a quality score, flags, the recency timestamp, and
//! the word distance accumulated across joins.

use crate::error::{KrillError, Result};

use super::schema::{KeyOrdering, RowSchema};

/// Width of a document hash (local id + domain fingerprint)
pub const URL_HASH_WIDTH: usize = 12;
/// Width of the domain fingerprint suffix of a document hash
pub const DOMAIN_WIDTH: usize = 6;
/// Width of the local-id prefix of a document hash
pub const LOCAL_ID_WIDTH: usize = URL_HASH_WIDTH - DOMAIN_WIDTH;
/// Total row width of a URL posting row
pub const URL_ENTRY_ROW_WIDTH: usize = 36;

const POS_OFFSET: usize = URL_HASH_WIDTH;
const TF_OFFSET: usize = POS_OFFSET + 4;
const QUALITY_OFFSET: usize = TF_OFFSET + 4;
const FLAGS_OFFSET: usize = QUALITY_OFFSET + 2;
const MODIFIED_OFFSET: usize = FLAGS_OFFSET + 2;
const DISTANCE_OFFSET: usize = MODIFIED_OFFSET + 8;

/// Sentinel row value for "no distance computed yet"
const DISTANCE_UNBOUND: u32 = u32::MAX;

/// Schema of URL posting rows: 12-byte base64 document hash, 36-byte row
pub fn url_entry_schema() -> RowSchema {
    RowSchema::new(URL_HASH_WIDTH, URL_ENTRY_ROW_WIDTH, KeyOrdering::Base64)
}

/// One posting: a document reference with positional and quality metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceEntry {
    key: Vec<u8>,
    pos_in_text: u32,
    term_frequency: u32,
    quality: u16,
    flags: u16,
    last_modified: u64,
    word_distance: Option<u32>,
}

impl ReferenceEntry {
    /// Create a posting for a document hash with its first occurrence
    /// position and recency timestamp; the word distance starts unbound
    pub fn new(key: impl Into<Vec<u8>>, pos_in_text: u32, last_modified: u64) -> Self {
        Self {
            key: key.into(),
            pos_in_text,
            term_frequency: 1,
            quality: 0,
            flags: 0,
            last_modified,
            word_distance: None,
        }
    }

    pub fn with_term_frequency(mut self, tf: u32) -> Self {
        self.term_frequency = tf;
        self
    }

    pub fn with_quality(mut self, quality: u16) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Decode an entry from one row of a container
    pub fn from_row(row: &[u8]) -> Result<Self> {
        if row.len() != URL_ENTRY_ROW_WIDTH {
            return Err(KrillError::RowWidthMismatch {
                expected: URL_ENTRY_ROW_WIDTH,
                actual: row.len(),
            });
        }
        let distance = u32::from_be_bytes(row[DISTANCE_OFFSET..DISTANCE_OFFSET + 4].try_into().unwrap());
        Ok(Self {
            key: row[..URL_HASH_WIDTH].to_vec(),
            pos_in_text: u32::from_be_bytes(row[POS_OFFSET..POS_OFFSET + 4].try_into().unwrap()),
            term_frequency: u32::from_be_bytes(row[TF_OFFSET..TF_OFFSET + 4].try_into().unwrap()),
            quality: u16::from_be_bytes(row[QUALITY_OFFSET..QUALITY_OFFSET + 2].try_into().unwrap()),
            flags: u16::from_be_bytes(row[FLAGS_OFFSET..FLAGS_OFFSET + 2].try_into().unwrap()),
            last_modified: u64::from_be_bytes(
                row[MODIFIED_OFFSET..MODIFIED_OFFSET + 8].try_into().unwrap(),
            ),
            word_distance: if distance == DISTANCE_UNBOUND {
                None
            } else {
                Some(distance)
            },
        })
    }

    /// Encode this entry as one fixed-width row
    pub fn to_row(&self) -> Vec<u8> {
        let mut row = vec![0u8; URL_ENTRY_ROW_WIDTH];
        let key_len = self.key.len().min(URL_HASH_WIDTH);
        row[..key_len].copy_from_slice(&self.key[..key_len]);
        row[POS_OFFSET..POS_OFFSET + 4].copy_from_slice(&self.pos_in_text.to_be_bytes());
        row[TF_OFFSET..TF_OFFSET + 4].copy_from_slice(&self.term_frequency.to_be_bytes());
        row[QUALITY_OFFSET..QUALITY_OFFSET + 2].copy_from_slice(&self.quality.to_be_bytes());
        row[FLAGS_OFFSET..FLAGS_OFFSET + 2].copy_from_slice(&self.flags.to_be_bytes());
        row[MODIFIED_OFFSET..MODIFIED_OFFSET + 8].copy_from_slice(&self.last_modified.to_be_bytes());
        let distance = self.word_distance.unwrap_or(DISTANCE_UNBOUND);
        row[DISTANCE_OFFSET..DISTANCE_OFFSET + 4].copy_from_slice(&distance.to_be_bytes());
        row
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Local-id prefix of the document hash
    pub fn local_id(&self) -> &[u8] {
        &self.key[..LOCAL_ID_WIDTH.min(self.key.len())]
    }

    /// Domain fingerprint suffix of the document hash
    pub fn domain_fingerprint(&self) -> &[u8] {
        &self.key[LOCAL_ID_WIDTH.min(self.key.len())..]
    }

    pub fn pos_in_text(&self) -> u32 {
        self.pos_in_text
    }

    pub fn term_frequency(&self) -> u32 {
        self.term_frequency
    }

    pub fn quality(&self) -> u16 {
        self.quality
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Word distance accumulated by joins; `None` until the entry has
    /// participated in a conjunction
    pub fn word_distance(&self) -> Option<u32> {
        self.word_distance
    }

    /// Distance as used in accumulation: unbound counts as zero
    pub fn distance_or_zero(&self) -> u32 {
        self.word_distance.unwrap_or(0)
    }

    pub fn set_word_distance(&mut self, distance: u32) {
        self.word_distance = Some(distance);
    }

    /// Fold another term's posting for the same document into this one:
    /// both accumulated distances plus the positional offset between the
    /// two occurrences. Saturates just below the unbound sentinel instead
    /// of wrapping; a saturated distance fails any realistic phrase-window
    /// filter anyway.
    pub fn combine_distance(&mut self, other: &ReferenceEntry) {
        let offset = self.pos_in_text.abs_diff(other.pos_in_text);
        let combined = self
            .distance_or_zero()
            .saturating_add(other.distance_or_zero())
            .saturating_add(offset)
            .min(DISTANCE_UNBOUND - 1);
        self.word_distance = Some(combined);
    }

    /// Recency tie-break: strictly older entries lose against an entry
    /// already present for the same key
    pub fn is_older(&self, other: &ReferenceEntry) -> bool {
        self.last_modified < other.last_modified
    }
}
