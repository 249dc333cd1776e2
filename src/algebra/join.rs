//! Conjunctive join (AND) over posting containers
//!
//! A multi-term query intersects one container per term. Containers are
//! combined pairwise, smallest first, with the per-pair algorithm picked
//! by the cost model. Matching postings accumulate word distance; pairs
//! whose combined distance exceeds the phrase window are dropped even
//! though the document matched both terms.

use tracing::{debug, trace};

use crate::index::{url_entry_schema, ReferenceContainer};

use super::cost::{choose_strategy, JoinStrategy};

/// Intersect a collection of containers, one per query term
///
/// A conjunction with an unknown or empty term has no result, so any
/// empty input short-circuits to the empty marker. Containers are
/// combined in ascending size order (ties broken by input order) and the
/// fold stops as soon as an intermediate result drains.
pub fn join_containers(
    containers: Vec<ReferenceContainer>,
    max_distance: u32,
) -> ReferenceContainer {
    let schema = containers
        .first()
        .map(|c| c.schema().clone())
        .unwrap_or_else(url_entry_schema);

    if containers.is_empty() || containers.iter().any(|c| c.is_empty()) {
        return ReferenceContainer::empty(schema);
    }

    // order by size, ties by input position, so the cheapest pairs fold first
    let mut ordered: Vec<(usize, ReferenceContainer)> = containers.into_iter().enumerate().collect();
    ordered.sort_by_key(|(pos, c)| (c.len(), *pos));

    let mut iter = ordered.into_iter().map(|(_, c)| c);
    let mut result = match iter.next() {
        Some(c) => c,
        None => return ReferenceContainer::empty(schema),
    };
    for next in iter {
        result = join(&result, &next, max_distance);
        if result.is_empty() {
            return ReferenceContainer::empty(schema);
        }
    }
    result
}

/// Pairwise intersection with adaptive strategy selection
pub fn join(
    a: &ReferenceContainer,
    b: &ReferenceContainer,
    max_distance: u32,
) -> ReferenceContainer {
    if a.is_empty() || b.is_empty() {
        return ReferenceContainer::empty(a.schema().clone());
    }
    join_with_strategy(a, b, max_distance, choose_strategy(a.len(), b.len()))
}

/// Pairwise intersection with a forced strategy; both strategies must
/// produce identical result sets, which the test harness relies on
pub fn join_with_strategy(
    a: &ReferenceContainer,
    b: &ReferenceContainer,
    max_distance: u32,
    strategy: JoinStrategy,
) -> ReferenceContainer {
    if !a.schema().same_layout(b.schema()) {
        // incompatible inputs degrade to an empty result, not an error
        debug!(
            left = a.schema().row_width,
            right = b.schema().row_width,
            "join over incompatible row layouts"
        );
        return ReferenceContainer::empty(a.schema().clone());
    }
    match strategy {
        JoinStrategy::Probe => {
            trace!("join method by test");
            if a.len() < b.len() {
                join_by_test(a, b, max_distance)
            } else {
                join_by_test(b, a, max_distance)
            }
        }
        JoinStrategy::Merge => {
            trace!("join method by enumeration");
            join_by_enumeration(a, b, max_distance)
        }
    }
}

/// Probe path: look up every posting of the smaller container in the
/// larger one
fn join_by_test(
    small: &ReferenceContainer,
    large: &ReferenceContainer,
    max_distance: u32,
) -> ReferenceContainer {
    let mut conj = ReferenceContainer::new(None, small.schema().clone(), 0);
    for mut e0 in small.entries() {
        if let Some(e1) = large.get(e0.key()) {
            e0.combine_distance(&e1);
            if e0.distance_or_zero() <= max_distance {
                let added = conj.add(e0);
                debug_assert!(added.is_ok(), "layouts verified before the join");
            }
        }
    }
    conj
}

/// Merge path: lock-step walk of both ascending iterators; requires both
/// containers to order keys identically, otherwise the result is empty
fn join_by_enumeration(
    a: &ReferenceContainer,
    b: &ReferenceContainer,
    max_distance: u32,
) -> ReferenceContainer {
    let mut conj = ReferenceContainer::new(None, a.schema().clone(), 0);
    if !a.schema().same_ordering(b.schema()) {
        debug!(
            left = a.schema().ordering.signature(),
            right = b.schema().ordering.signature(),
            "merge join over incompatible orderings"
        );
        return conj;
    }
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a.schema().compare_keys(a.key_at(i), b.key_at(j)) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                // the same document matched both terms
                if let (Ok(mut e1), Ok(e2)) = (a.entry_at(i), b.entry_at(j)) {
                    e1.combine_distance(&e2);
                    if e1.distance_or_zero() <= max_distance {
                        let added = conj.add(e1);
                        debug_assert!(added.is_ok(), "layouts verified before the join");
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    conj
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ReferenceEntry;

    fn container(postings: &[(&[u8], u32)]) -> ReferenceContainer {
        let mut c = ReferenceContainer::new(None, url_entry_schema(), postings.len());
        for (key, pos) in postings {
            c.add(ReferenceEntry::new(key.to_vec(), *pos, 1)).unwrap();
        }
        c
    }

    #[test]
    fn test_join_empty_input_is_empty() {
        let a = container(&[(b"AAAAAA111111", 1)]);
        let empty = container(&[]);
        assert!(join(&a, &empty, 100).is_empty());
        assert!(join(&empty, &a, 100).is_empty());
    }

    #[test]
    fn test_join_containers_any_empty_term_kills_conjunction() {
        let a = container(&[(b"AAAAAA111111", 1)]);
        let empty = container(&[]);
        assert!(join_containers(vec![a, empty], 100).is_empty());
        assert!(join_containers(vec![], 100).is_empty());
    }

    #[test]
    fn test_join_intersects() {
        let a = container(&[(b"AAAAAA111111", 1), (b"BBBBBB111111", 2)]);
        let b = container(&[(b"BBBBBB111111", 4), (b"CCCCCC111111", 9)]);
        let r = join(&a, &b, 100);
        assert_eq!(r.len(), 1);
        let e = r.get(b"BBBBBB111111").unwrap();
        assert_eq!(e.word_distance(), Some(2));
    }

    #[test]
    fn test_distance_window_filters() {
        // term a at position 5, term b at position 8: distance 3
        let a = container(&[(b"DDDDDD111111", 5)]);
        let b = container(&[(b"DDDDDD111111", 8)]);
        assert!(join(&a, &b, 2).is_empty());
        let r = join(&a, &b, 3);
        assert_eq!(r.get(b"DDDDDD111111").unwrap().word_distance(), Some(3));
    }

    #[test]
    fn test_result_is_scratch_container() {
        let a = container(&[(b"AAAAAA111111", 1)]);
        let b = container(&[(b"AAAAAA111111", 1)]);
        let r = join(&a, &b, 10);
        assert!(r.term_key().is_none());
    }

    #[test]
    fn test_three_way_join_accumulates_distance() {
        let a = container(&[(b"AAAAAA111111", 0)]);
        let b = container(&[(b"AAAAAA111111", 2)]);
        let c = container(&[(b"AAAAAA111111", 3)]);
        let r = join_containers(vec![a, b, c], 100);
        assert_eq!(r.len(), 1);
        // pairwise accumulation: |0-2| then (2 + |pos-pos|) against the third
        assert!(r.get(b"AAAAAA111111").unwrap().word_distance().is_some());
    }
}
