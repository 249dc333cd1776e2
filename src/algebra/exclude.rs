//! Destructive exclusion (NOT) over posting containers
//!
//! Exclusion consumes the pivot and hands the same container back with
//! matching postings removed, making the in-place mutation explicit in
//! the signature. The probe-vs-merge cost tradeoff matches the join's.

use tracing::{debug, trace};

use crate::index::ReferenceContainer;

use super::cost::{choose_strategy, JoinStrategy};
use super::join::join_containers;

/// Remove from `pivot` every posting whose key appears in any of the
/// exclusion containers
///
/// An empty exclusion set is a no-op. The scan stops early once the
/// pivot has drained.
pub fn exclude_containers(
    mut pivot: ReferenceContainer,
    excluded: &[ReferenceContainer],
) -> ReferenceContainer {
    for excl in excluded {
        pivot = exclude_destructive(pivot, excl);
        if pivot.is_empty() {
            break;
        }
    }
    pivot
}

/// Pairwise destructive exclusion with adaptive strategy selection
pub fn exclude_destructive(
    pivot: ReferenceContainer,
    excl: &ReferenceContainer,
) -> ReferenceContainer {
    if pivot.is_empty() || excl.is_empty() {
        return pivot;
    }
    let strategy = choose_strategy(pivot.len(), excl.len());
    exclude_with_strategy(pivot, excl, strategy)
}

/// Pairwise destructive exclusion with a forced strategy; both paths
/// must remove exactly the same keys
pub fn exclude_with_strategy(
    pivot: ReferenceContainer,
    excl: &ReferenceContainer,
    strategy: JoinStrategy,
) -> ReferenceContainer {
    if !pivot.schema().same_layout(excl.schema()) {
        // incompatible layouts cannot be compared; leave the pivot alone
        debug!(
            pivot = pivot.schema().row_width,
            excl = excl.schema().row_width,
            "exclusion over incompatible row layouts"
        );
        return pivot;
    }
    match strategy {
        JoinStrategy::Probe => {
            trace!("exclude method by test");
            exclude_by_test(pivot, excl)
        }
        JoinStrategy::Merge => {
            trace!("exclude method by enumeration");
            exclude_by_enumeration(pivot, excl)
        }
    }
}

/// Probe path: point lookups on whichever side is smaller
fn exclude_by_test(mut pivot: ReferenceContainer, excl: &ReferenceContainer) -> ReferenceContainer {
    if pivot.len() < excl.len() {
        let mut cursor = pivot.cursor();
        while let Some(entry) = cursor.next() {
            if excl.get(entry.key()).is_some() {
                cursor.remove();
            }
        }
    } else {
        for entry in excl.entries() {
            pivot.remove(entry.key());
        }
    }
    pivot
}

/// Merge path: lock-step walk removing matched pivot rows; requires both
/// containers to order keys identically, otherwise the pivot is returned
/// untouched
fn exclude_by_enumeration(
    mut pivot: ReferenceContainer,
    excl: &ReferenceContainer,
) -> ReferenceContainer {
    if !pivot.schema().same_ordering(excl.schema()) {
        debug!(
            pivot = pivot.schema().ordering.signature(),
            excl = excl.schema().ordering.signature(),
            "merge exclusion over incompatible orderings"
        );
        return pivot;
    }
    let mut i = 0;
    let mut j = 0;
    while i < pivot.len() && j < excl.len() {
        match pivot.schema().compare_keys(pivot.key_at(i), excl.key_at(j)) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                // removal shifts the next pivot row into place at i
                pivot.remove_row_at(i);
                j += 1;
            }
        }
    }
    pivot
}

/// Conjunction of `include` followed by subtraction of every container
/// in `exclude`; an empty include set yields the empty marker at once
pub fn join_exclude(
    include: Vec<ReferenceContainer>,
    exclude: &[ReferenceContainer],
    max_distance: u32,
) -> ReferenceContainer {
    let joined = join_containers(include, max_distance);
    if joined.is_empty() {
        return joined;
    }
    exclude_containers(joined, exclude)
}
