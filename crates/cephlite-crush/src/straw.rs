//! Straw selection.
//!
//! Each attempt hashes every item still in the pool and draws the one with
//! the smallest hash. The attempt number salts the hash, so successive draws
//! from the same pool pick different winners. A bucket winner is replaced by
//! one leaf drawn recursively from its own children.
//!
//! Weights are not folded into the comparison yet: every item is
//! equiprobable regardless of its declared capacity.
//!
//! Candidate names that resolve to nothing are dropped before the first
//! draw, and a name repeated in the candidate list enters the pool once.
//! A dangling name therefore never wins an attempt, so on a malformed tree
//! the remaining winners can differ from selectors that keep such names in
//! the pool and hash them as ID 0.

use std::collections::HashSet;

use tracing::{trace, warn};

use crate::bucket::{ItemRef, PgId};
use crate::hash::crush_hash;
use crate::topology::Topology;

/// Choose up to `count` leaf devices from `candidates` for placement group
/// `pg`.
///
/// The result holds device keys only, never repeats a key, and is shorter
/// than `count` when the candidates run out.
#[must_use]
pub fn choose_straw(
    topology: &Topology,
    candidates: &[String],
    pg: PgId,
    count: usize,
) -> Vec<String> {
    let mut pool: Vec<(&str, ItemRef)> = Vec::with_capacity(candidates.len());
    let mut seen = HashSet::with_capacity(candidates.len());
    for name in candidates {
        if !seen.insert(name.as_str()) {
            continue;
        }
        match topology.resolve(name) {
            Some(item) => pool.push((name.as_str(), item)),
            None => warn!(item = %name, pg, "Skipping unresolvable placement candidate"),
        }
    }

    let mut selected = Vec::with_capacity(count.min(pool.len()));

    for attempt in 0..count {
        let Some(winner) = draw(&pool, pg, attempt) else {
            break;
        };
        let (name, item) = pool.remove(winner);
        trace!(pg, attempt, item = name, id = %item, "Straw winner");

        let leaves = if item.is_device() {
            vec![name.to_string()]
        } else {
            let children = topology.bucket_items(name).unwrap_or_default();
            choose_straw(topology, children, pg, 1)
        };

        // A device reachable through two candidates counts once.
        for leaf in leaves {
            if !selected.contains(&leaf) {
                selected.push(leaf);
            }
        }
    }

    selected
}

/// Index of the item with the smallest hash for this attempt. Ties go to the
/// item that comes first in the pool.
fn draw(pool: &[(&str, ItemRef)], pg: PgId, attempt: usize) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, (_, item)) in pool.iter().enumerate() {
        let hash = crush_hash(pg, item.numeric_id(), attempt);
        if best.map_or(true, |(_, min)| hash < min) {
            best = Some((idx, hash));
        }
    }
    best.map(|(idx, _)| idx)
}
