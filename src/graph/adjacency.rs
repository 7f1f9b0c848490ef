//! Neighbour-list primitives shared by the array and disk stores
//!
//! Every store keeps its adjacency as lists of `u32` node indices. Removing a
//! node has to strip the removed index out of every list and close the gap
//! by decrementing every higher index, which is what keeps the index space
//! dense in `[0, size)`.

/// Strip `removed` from `list` and decrement every index above it.
///
/// Returns true if the list changed, so callers backed by disk can skip the
/// write-back for untouched lists.
pub fn strip_and_shift(list: &mut Vec<u32>, removed: u32) -> bool {
    let before = list.len();
    list.retain(|&n| n != removed);
    let mut changed = list.len() != before;
    for n in list.iter_mut() {
        if *n > removed {
            *n -= 1;
            changed = true;
        }
    }
    changed
}

/// Remove the first occurrence of `target`. Returns true if one was found.
pub fn remove_one(list: &mut Vec<u32>, target: u32) -> bool {
    match list.iter().position(|&n| n == target) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// Remove every occurrence of `target`, returning how many were removed.
pub fn remove_all(list: &mut Vec<u32>, target: u32) -> usize {
    let before = list.len();
    list.retain(|&n| n != target);
    before - list.len()
}

pub fn count(list: &[u32], target: u32) -> usize {
    list.iter().filter(|&&n| n == target).count()
}

/// Sorted, duplicate-free union of two neighbour lists
pub fn union_dedup(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut all = Vec::with_capacity(a.len() + b.len());
    all.extend_from_slice(a);
    all.extend_from_slice(b);
    all.sort_unstable();
    all.dedup();
    all
}

/// Sorted copy of a neighbour list; used for order-insensitive comparison.
pub fn sorted(list: &[u32]) -> Vec<u32> {
    let mut copy = list.to_vec();
    copy.sort_unstable();
    copy
}
