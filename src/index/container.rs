//! Ordered posting container
//!
//! A container holds the postings of a single term as a sorted, unique,
//! fixed-width binary row store: one contiguous byte buffer of rows kept
//! in ascending key order under the container's schema. Lookups are
//! binary searches; iteration is always ascending by key regardless of
//! insertion order, which the merge-join path relies on.
//!
//! A container is not internally thread-safe for concurrent mutation.
//! `put_all_recent_shared` locks the *source* side for the duration of
//! its scan; serializing mutation of the destination is the caller's
//! responsibility.

use std::fmt;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{KrillError, Result};

use super::entry::ReferenceEntry;
use super::schema::RowSchema;

/// Sorted unique collection of postings for one term
#[derive(Clone, Debug)]
pub struct ReferenceContainer {
    schema: RowSchema,
    /// Hash of the term this container indexes; `None` for scratch
    /// containers produced by joins
    term_key: Option<Vec<u8>>,
    /// Row storage: `len() * row_width` bytes, sorted by key
    rows: Vec<u8>,
    /// Logical timestamp of the last write into this container
    last_wrote: u64,
}

/// Direct merge callback for generic container merges (e.g. collection
/// maintenance); replaces any need for runtime dispatch
pub type ContainerMerger =
    fn(ReferenceContainer, ReferenceContainer) -> Result<ReferenceContainer>;

impl ReferenceContainer {
    /// Create a container pre-sized for `capacity` rows
    pub fn new(term_key: Option<Vec<u8>>, schema: RowSchema, capacity: usize) -> Self {
        let row_width = schema.row_width;
        Self {
            schema,
            term_key,
            rows: Vec::with_capacity(capacity * row_width),
            last_wrote: 0,
        }
    }

    /// Empty scratch container, the designated empty-result marker of the
    /// set-algebra engine
    pub fn empty(schema: RowSchema) -> Self {
        Self::new(None, schema, 0)
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn term_key(&self) -> Option<&[u8]> {
        self.term_key.as_deref()
    }

    pub fn set_term_key(&mut self, term_key: Option<Vec<u8>>) {
        self.term_key = term_key;
    }

    /// Logical timestamp of the last write
    pub fn updated(&self) -> u64 {
        self.last_wrote
    }

    pub fn len(&self) -> usize {
        self.rows.len() / self.schema.row_width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn row_at(&self, index: usize) -> &[u8] {
        let w = self.schema.row_width;
        &self.rows[index * w..(index + 1) * w]
    }

    pub(crate) fn key_at(&self, index: usize) -> &[u8] {
        &self.row_at(index)[..self.schema.key_width]
    }

    pub(crate) fn entry_at(&self, index: usize) -> Result<ReferenceEntry> {
        ReferenceEntry::from_row(self.row_at(index))
    }

    pub(crate) fn remove_row_at(&mut self, index: usize) {
        let w = self.schema.row_width;
        self.rows.drain(index * w..(index + 1) * w);
    }

    /// Binary search for `key`: `Ok(index)` on a hit, `Err(index)` with
    /// the sorted insertion point on a miss
    fn find(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        let mut lo = 0usize;
        let mut hi = self.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.schema.compare_keys(self.key_at(mid), key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    fn check_entry(&self, entry: &ReferenceEntry) -> Result<()> {
        if entry.key().len() != self.schema.key_width {
            return Err(KrillError::KeyWidthMismatch {
                expected: self.schema.key_width,
                actual: entry.key().len(),
            });
        }
        Ok(())
    }

    fn check_row(&self, row: &[u8]) -> Result<()> {
        if row.len() != self.schema.row_width {
            return Err(KrillError::RowWidthMismatch {
                expected: self.schema.row_width,
                actual: row.len(),
            });
        }
        Ok(())
    }

    fn insert_row(&mut self, index: usize, row: &[u8]) {
        let w = self.schema.row_width;
        let at = index * w;
        self.rows.splice(at..at, row.iter().copied());
    }

    fn overwrite_row(&mut self, index: usize, row: &[u8]) {
        let w = self.schema.row_width;
        self.rows[index * w..(index + 1) * w].copy_from_slice(row);
    }

    /// Insert a posting the caller guarantees is not already present
    /// (bulk construction, e.g. join output); an existing row with the
    /// same key is overwritten to preserve uniqueness
    pub fn add(&mut self, entry: ReferenceEntry) -> Result<()> {
        self.check_entry(&entry)?;
        let row = entry.to_row();
        self.check_row(&row)?;
        match self.find(entry.key()) {
            Ok(i) => self.overwrite_row(i, &row),
            Err(i) => self.insert_row(i, &row),
        }
        Ok(())
    }

    /// `add` that also stamps the container's write clock
    pub fn add_stamped(&mut self, entry: ReferenceEntry, update_time: u64) -> Result<()> {
        self.add(entry)?;
        self.last_wrote = self.last_wrote.max(update_time);
        Ok(())
    }

    /// Upsert by key; returns the replaced posting if one existed
    pub fn put(&mut self, entry: ReferenceEntry) -> Result<Option<ReferenceEntry>> {
        self.check_entry(&entry)?;
        let modified = entry.last_modified();
        let row = entry.to_row();
        self.check_row(&row)?;
        let previous = match self.find(entry.key()) {
            Ok(i) => {
                let old = self.entry_at(i)?;
                self.overwrite_row(i, &row);
                Some(old)
            }
            Err(i) => {
                self.insert_row(i, &row);
                None
            }
        };
        self.last_wrote = self.last_wrote.max(modified);
        Ok(previous)
    }

    /// Upsert with recency tie-break: a strictly older incoming posting
    /// loses against the one already present, which is put back. Returns
    /// whether the incoming posting was kept.
    pub fn put_recent(&mut self, entry: ReferenceEntry) -> Result<bool> {
        let incoming_modified = entry.last_modified();
        match self.put(entry)? {
            None => Ok(true),
            Some(old) => {
                if incoming_modified < old.last_modified() {
                    // a more recent posting is already in this container
                    self.put(old)?;
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
        }
    }

    /// Bulk recency merge: apply `put_recent` for every posting of
    /// `other` and bump the write clock. A posting that fails its width
    /// check is logged and skipped, the merge continues.
    pub fn put_all_recent(&mut self, other: &ReferenceContainer) -> usize {
        let mut inserted = 0;
        for entry in other.entries() {
            match self.put_recent(entry) {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "skipping posting during recency merge"),
            }
        }
        self.last_wrote = self.last_wrote.max(other.last_wrote);
        inserted
    }

    /// `put_all_recent` against a source that other threads may touch;
    /// the source lock is held for the whole scan so its structure cannot
    /// change underneath the merge
    pub fn put_all_recent_shared(&mut self, other: &Mutex<ReferenceContainer>) -> usize {
        let guard = other.lock();
        self.put_all_recent(&guard)
    }

    pub fn get(&self, key: &[u8]) -> Option<ReferenceEntry> {
        let i = self.find(key).ok()?;
        self.entry_at(i).ok()
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<ReferenceEntry> {
        let i = self.find(key).ok()?;
        let entry = self.entry_at(i).ok();
        self.remove_row_at(i);
        entry
    }

    /// Remove every listed key; returns how many were present
    pub fn remove_all<I, K>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut removed = 0;
        for key in keys {
            if self.remove(key.as_ref()).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Ascending read-only iteration over decoded postings
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            container: self,
            index: 0,
        }
    }

    /// Stable mutable cursor: ascending iteration that supports removing
    /// the last-yielded posting without skipping or revisiting rows
    pub fn cursor(&mut self) -> Cursor<'_> {
        Cursor {
            container: self,
            next: 0,
            yielded: false,
        }
    }

    /// Deep copy with identical rows, schema and term key
    pub fn top_level_clone(&self) -> ReferenceContainer {
        let mut rows = Vec::with_capacity(self.rows.len());
        rows.extend_from_slice(&self.rows);
        ReferenceContainer {
            schema: self.schema.clone(),
            term_key: self.term_key.clone(),
            rows,
            last_wrote: self.last_wrote,
        }
    }

    /// Bulk union without recency checks; rows colliding on key keep the
    /// incoming side. Fails when the layouts differ.
    pub fn add_all_unique(&mut self, other: &ReferenceContainer) -> Result<()> {
        if !self.schema.same_layout(other.schema()) {
            return Err(KrillError::SchemaMismatch(format!(
                "cannot merge rows of width {} into container of width {}",
                other.schema().row_width,
                self.schema.row_width
            )));
        }
        for i in 0..other.len() {
            let row = other.row_at(i).to_vec();
            match self.find(&row[..self.schema.key_width]) {
                Ok(j) => self.overwrite_row(j, &row),
                Err(j) => self.insert_row(j, &row),
            }
        }
        self.last_wrote = self.last_wrote.max(other.last_wrote);
        Ok(())
    }

    /// Merge two containers by absorbing the smaller into the larger;
    /// usable as a [`ContainerMerger`]
    pub fn merge_unique(
        a: ReferenceContainer,
        b: ReferenceContainer,
    ) -> Result<ReferenceContainer> {
        let (mut base, other) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        base.add_all_unique(&other)?;
        Ok(base)
    }

    /// Fold a collection of containers into one through the supplied
    /// merge callback, cheapest pair first
    pub fn merge_all(
        containers: Vec<ReferenceContainer>,
        merger: ContainerMerger,
    ) -> Result<Option<ReferenceContainer>> {
        let mut ordered = containers;
        ordered.sort_by_key(|c| c.len());
        let mut iter = ordered.into_iter();
        let mut merged = match iter.next() {
            Some(c) => c,
            None => return Ok(None),
        };
        for next in iter {
            merged = merger(merged, next)?;
        }
        Ok(Some(merged))
    }
}

impl fmt::Display for ReferenceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = self
            .term_key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .unwrap_or_default();
        write!(f, "C[{}] has {} entries", term, self.len())
    }
}

/// Read-only ascending iterator over a container's postings
pub struct Entries<'a> {
    container: &'a ReferenceContainer,
    index: usize,
}

impl Iterator for Entries<'_> {
    type Item = ReferenceEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.container.len() {
            let entry = self.container.entry_at(self.index);
            self.index += 1;
            match entry {
                Ok(e) => return Some(e),
                Err(e) => warn!(error = %e, "skipping undecodable posting row"),
            }
        }
        None
    }
}

/// Mutable cursor over a container; removal through the cursor keeps the
/// iteration position consistent with the shifted rows
pub struct Cursor<'a> {
    container: &'a mut ReferenceContainer,
    next: usize,
    yielded: bool,
}

impl Cursor<'_> {
    pub fn next(&mut self) -> Option<ReferenceEntry> {
        while self.next < self.container.len() {
            let entry = self.container.entry_at(self.next);
            self.next += 1;
            match entry {
                Ok(e) => {
                    self.yielded = true;
                    return Some(e);
                }
                Err(e) => warn!(error = %e, "skipping undecodable posting row"),
            }
        }
        self.yielded = false;
        None
    }

    /// Remove the posting returned by the preceding `next` call
    pub fn remove(&mut self) {
        if self.yielded {
            self.next -= 1;
            self.container.remove_row_at(self.next);
            self.yielded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::url_entry_schema;

    fn entry(key: &[u8], modified: u64) -> ReferenceEntry {
        ReferenceEntry::new(key.to_vec(), 0, modified)
    }

    fn container_with(keys: &[&[u8]]) -> ReferenceContainer {
        let mut c = ReferenceContainer::new(None, url_entry_schema(), keys.len());
        for k in keys {
            c.add(entry(k, 1)).unwrap();
        }
        c
    }

    #[test]
    fn test_sorted_iteration_regardless_of_insertion_order() {
        let c = container_with(&[b"CCCCCC111111", b"AAAAAA111111", b"BBBBBB111111"]);
        let keys: Vec<_> = c.entries().map(|e| e.key().to_vec()).collect();
        assert_eq!(
            keys,
            vec![
                b"AAAAAA111111".to_vec(),
                b"BBBBBB111111".to_vec(),
                b"CCCCCC111111".to_vec()
            ]
        );
    }

    #[test]
    fn test_order_preserved_under_interleaved_mutation() {
        let mut c = container_with(&[]);
        let keys: Vec<Vec<u8>> = (0..16u8)
            .map(|i| {
                let mut k = vec![b'A' + i; 6];
                k.extend_from_slice(b"111111");
                k
            })
            .collect();

        // interleave inserts and removes in a scrambled order
        for (step, key) in keys.iter().rev().enumerate() {
            c.put(entry(key, step as u64)).unwrap();
            if step % 3 == 0 {
                c.remove(keys[(step * 5) % keys.len()].as_slice());
            }
        }
        for key in keys.iter().step_by(2) {
            c.put(entry(key, 99)).unwrap();
        }

        let seen: Vec<Vec<u8>> = c.entries().map(|e| e.key().to_vec()).collect();
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted);
        // strictly ascending: no duplicate keys survive the interleaving
        for pair in seen.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_uniqueness_after_puts() {
        let mut c = container_with(&[]);
        for _ in 0..3 {
            c.put(entry(b"AAAAAA111111", 1)).unwrap();
        }
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_put_returns_previous() {
        let mut c = container_with(&[]);
        assert!(c.put(entry(b"AAAAAA111111", 1)).unwrap().is_none());
        let prev = c.put(entry(b"AAAAAA111111", 2)).unwrap().unwrap();
        assert_eq!(prev.last_modified(), 1);
    }

    #[test]
    fn test_put_recent_stale_entry_loses() {
        let mut c = container_with(&[]);
        assert!(c.put_recent(entry(b"AAAAAA111111", 200)).unwrap());
        // strictly older: container must be unchanged and report false
        assert!(!c.put_recent(entry(b"AAAAAA111111", 100)).unwrap());
        assert_eq!(c.get(b"AAAAAA111111").unwrap().last_modified(), 200);
        // same recency is not older: the incoming entry wins
        assert!(c.put_recent(entry(b"AAAAAA111111", 200)).unwrap());
    }

    #[test]
    fn test_put_all_recent_counts_and_clock() {
        let mut a = container_with(&[]);
        a.put(entry(b"AAAAAA111111", 50)).unwrap();

        let mut b = container_with(&[]);
        b.put(entry(b"AAAAAA111111", 10)).unwrap(); // stale, not counted
        b.put(entry(b"BBBBBB111111", 99)).unwrap();

        let inserted = a.put_all_recent(&b);
        assert_eq!(inserted, 1);
        assert_eq!(a.len(), 2);
        assert_eq!(a.updated(), 99);
    }

    #[test]
    fn test_put_all_recent_shared_locks_source() {
        let mut a = container_with(&[]);
        let b = Mutex::new(container_with(&[b"AAAAAA111111", b"BBBBBB111111"]));
        assert_eq!(a.put_all_recent_shared(&b), 2);
    }

    #[test]
    fn test_key_width_mismatch_rejected() {
        let mut c = container_with(&[]);
        let err = c.add(entry(b"SHORT", 1)).unwrap_err();
        assert!(matches!(err, KrillError::KeyWidthMismatch { .. }));
    }

    #[test]
    fn test_remove_and_remove_all() {
        let mut c = container_with(&[b"AAAAAA111111", b"BBBBBB111111", b"CCCCCC111111"]);
        assert!(c.remove(b"BBBBBB111111").is_some());
        assert!(c.remove(b"BBBBBB111111").is_none());
        let removed = c.remove_all(vec![b"AAAAAA111111".as_slice(), b"ZZZZZZ111111".as_slice()]);
        assert_eq!(removed, 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_cursor_removal_does_not_skip() {
        let mut c = container_with(&[b"AAAAAA111111", b"BBBBBB111111", b"CCCCCC111111"]);
        let mut seen = Vec::new();
        let mut cur = c.cursor();
        while let Some(e) = cur.next() {
            seen.push(e.key().to_vec());
            if e.key() == b"BBBBBB111111" {
                cur.remove();
            }
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(c.len(), 2);
        assert!(c.get(b"BBBBBB111111").is_none());
    }

    #[test]
    fn test_top_level_clone_is_deep() {
        let c = container_with(&[b"AAAAAA111111"]);
        let mut clone = c.top_level_clone();
        clone.remove(b"AAAAAA111111");
        assert_eq!(c.len(), 1);
        assert_eq!(clone.len(), 0);
    }

    #[test]
    fn test_merge_unique() {
        let a = container_with(&[b"AAAAAA111111", b"BBBBBB111111"]);
        let b = container_with(&[b"BBBBBB111111", b"CCCCCC111111"]);
        let merged = ReferenceContainer::merge_unique(a, b).unwrap();
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_all_with_callback() {
        let containers = vec![
            container_with(&[b"AAAAAA111111", b"BBBBBB111111"]),
            container_with(&[b"CCCCCC111111"]),
            container_with(&[b"BBBBBB111111", b"DDDDDD111111"]),
        ];
        let merged = ReferenceContainer::merge_all(containers, ReferenceContainer::merge_unique)
            .unwrap()
            .unwrap();
        assert_eq!(merged.len(), 4);
        assert!(ReferenceContainer::merge_all(vec![], ReferenceContainer::merge_unique)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_display() {
        let mut c = container_with(&[b"AAAAAA111111"]);
        c.set_term_key(Some(b"hello0000000".to_vec()));
        assert_eq!(c.to_string(), "C[hello0000000] has 1 entries");
    }
}
