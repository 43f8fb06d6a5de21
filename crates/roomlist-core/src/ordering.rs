//! Recency ordering for the room display sequence.

use std::{cmp::Reverse, collections::BTreeMap};

/// Compute the recency order for `current`.
///
/// `key_of` returns `None` for rooms without a last message. Rooms are ordered
/// by descending key with keyless rooms last; rooms sharing a key keep their
/// relative order from `current`.
pub fn recency_order<F>(current: &[String], mut key_of: F) -> Vec<String>
where
    F: FnMut(&str) -> Option<u64>,
{
    let mut buckets: BTreeMap<Reverse<Option<u64>>, Vec<&String>> = BTreeMap::new();
    for room_id in current {
        buckets
            .entry(Reverse(key_of(room_id)))
            .or_default()
            .push(room_id);
    }

    buckets
        .into_values()
        .flatten()
        .cloned()
        .collect()
}

/// Rewrite `sequence` into `target` moving only misplaced entries.
///
/// Returns the number of moves performed. `target` must be a permutation of
/// `sequence`.
pub fn apply_order(sequence: &mut Vec<String>, target: &[String]) -> usize {
    debug_assert_eq!(sequence.len(), target.len());

    let mut moves = 0;
    for (new_index, room_id) in target.iter().enumerate() {
        let Some(current_index) = sequence.iter().position(|id| id == room_id) else {
            continue;
        };
        if current_index == new_index {
            continue;
        }
        let moved = sequence.remove(current_index);
        sequence.insert(new_index, moved);
        moves += 1;
    }
    moves
}
