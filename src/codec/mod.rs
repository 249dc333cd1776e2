//! Domain-compressed wire codec for index fragments
//!
//! Peers exchange partial index state as a compact textual encoding of a
//! container's key set, grouped by domain fingerprint so each domain is
//! written once:
//!
//! ```text
//! {<domain>:<local-id><local-id>...,<domain>:<local-id>...}
//! ```
//!
//! An empty container encodes as `{}`. The format is the externally
//! observable byte contract between peers and must stay stable.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::index::{ReferenceContainer, DOMAIN_WIDTH, LOCAL_ID_WIDTH, URL_HASH_WIDTH};

/// Per-key list of peers claiming to hold the document, filled in by
/// [`decompress`]
pub type PeerMap = BTreeMap<Vec<u8>, Vec<String>>;

/// Encode a container's key set, skipping keys present in `exclude`
///
/// The optional wall-clock budget is a cooperative cutoff checked once
/// per consumed entry and once per emitted domain: when it expires the
/// scan stops early and a well-formed but incomplete buffer is emitted.
pub fn compress(
    input: &ReferenceContainer,
    exclude: Option<&ReferenceContainer>,
    budget: Option<Duration>,
) -> Vec<u8> {
    let deadline = budget.map(|d| Instant::now() + d);

    // collect references per domain fingerprint
    let mut doms: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    for entry in input.entries() {
        let key = entry.key();
        if key.len() == URL_HASH_WIDTH
            && !exclude.is_some_and(|x| x.get(key).is_some())
        {
            doms.entry(key[LOCAL_ID_WIDTH..].to_vec())
                .or_default()
                .extend_from_slice(&key[..LOCAL_ID_WIDTH]);
        }
        if deadline.is_some_and(|t| Instant::now() > t) {
            break;
        }
    }

    let mut out = Vec::with_capacity(input.len() * LOCAL_ID_WIDTH + 2);
    out.push(b'{');
    let mut groups = doms.iter().peekable();
    while let Some((dom, local_ids)) = groups.next() {
        out.extend_from_slice(dom);
        out.push(b':');
        out.extend_from_slice(local_ids);
        if deadline.is_some_and(|t| Instant::now() > t) {
            break;
        }
        if groups.peek().is_some() {
            out.push(b',');
        }
    }
    out.push(b'}');
    out
}

/// Decode a compressed fragment received from `peer_hash`, recording the
/// peer against every reconstructed document key in `target`
///
/// A buffer not wrapped in `{ }` is ignored. Malformed input (missing
/// separators, short trailing fragments) stops the scan at the first
/// structurally invalid position; everything parsed before it stays in
/// `target`.
pub fn decompress(buffer: &[u8], peer_hash: &str, target: &mut PeerMap) {
    if buffer.len() < 2 || buffer[0] != b'{' || buffer[buffer.len() - 1] != b'}' {
        return;
    }
    let inner = &buffer[1..buffer.len() - 1];
    let mut pos = 0;
    while inner.len() - pos > URL_HASH_WIDTH && inner[pos + DOMAIN_WIDTH] == b':' {
        let dom = &inner[pos..pos + DOMAIN_WIDTH];
        pos += DOMAIN_WIDTH + 1;
        while pos < inner.len() && inner[pos] != b',' {
            if inner.len() - pos < LOCAL_ID_WIDTH {
                return; // short trailing fragment
            }
            let mut key = inner[pos..pos + LOCAL_ID_WIDTH].to_vec();
            key.extend_from_slice(dom);
            target.entry(key).or_default().push(peer_hash.to_string());
            pos += LOCAL_ID_WIDTH;
        }
        if pos < inner.len() && inner[pos] == b',' {
            pos += 1;
        }
    }
}
