//! High-level helpers built purely on the graph's public surface.
//!
//! Nothing here reaches into the kernel's internals: splitting an
//! edge is a snapshot / delete / re-add transaction, moving a slice
//! is a grow followed by a shrink of the opposite end, and
//! re-materializing a described slice replays its path through the
//! ordinary grow machinery.

use crate::graph::{TrackError, TrackGraph};
use crate::types::{DescribedSlice, End, Key};

/// Split the edge `{a, b}` at distance `at` from `a`, inserting
/// `new_node` between the two halves.
///
/// Negative positions count back from `b` (`length + at`); positions
/// outside the open interval `(0, length)` are refused with
/// `Ok(false)`, as is a missing edge or a half that would duplicate
/// an existing edge of `new_node`. The two halves are connected
/// straight through `new_node`, through links that crossed the old
/// edge at `a` or `b` are re-declared toward `new_node`, and every
/// slice occupying the edge is re-materialized with `new_node`
/// spliced into its path. The whole operation is transactional: any
/// intermediate failure rolls the graph back to its prior state.
///
/// # Errors
///
/// [`TrackError::SelfEdge`] when `new_node` equals either endpoint.
pub fn split_edge<K: Key, S: Key>(
    graph: &mut TrackGraph<K, S>,
    a: &K,
    b: &K,
    at: i64,
    new_node: K,
) -> Result<bool, TrackError<K>> {
    if new_node == *a || new_node == *b {
        return Err(TrackError::SelfEdge(new_node));
    }
    let Some(edge) = graph.lookup_edge(a, b) else {
        return Ok(false);
    };
    let length = edge.length as i64;
    let at = if at < 0 { length + at } else { at };
    if at <= 0 || at >= length {
        return Ok(false);
    }
    let first = at as u64;
    let second = (length - at) as u64;
    if graph.lookup_edge(a, &new_node).is_some() || graph.lookup_edge(&new_node, b).is_some() {
        return Ok(false);
    }

    // snapshot everything the teardown below will destroy
    let snapshots: Vec<(S, DescribedSlice<K>)> = edge
        .slices
        .iter()
        .map(|id| {
            let described = graph
                .lookup_slice(id)
                .expect("edge occupant is missing from the slice table");
            (id.clone(), described)
        })
        .collect();
    let through_a: Vec<K> = graph
        .lookup_node(a)
        .other
        .remove(b)
        .unwrap_or_default();
    let through_b: Vec<K> = graph
        .lookup_node(b)
        .other
        .remove(a)
        .unwrap_or_default();

    for (id, _) in &snapshots {
        graph.delete_slice(id);
    }
    let removed = graph.delete_edge(a, b);
    assert!(removed, "freed edge refused deletion");

    let added = graph
        .add_edge(a.clone(), new_node.clone(), first)
        .expect("validated half rejected")
        && graph
            .add_edge(new_node.clone(), b.clone(), second)
            .expect("validated half rejected");
    assert!(added, "fresh halves collided with existing edges");
    graph
        .connect(a.clone(), new_node.clone(), b.clone())
        .expect("distinct split triple rejected");
    for p in &through_a {
        graph
            .connect(p.clone(), a.clone(), new_node.clone())
            .expect("restored through triple rejected");
    }
    for q in &through_b {
        graph
            .connect(q.clone(), b.clone(), new_node.clone())
            .expect("restored through triple rejected");
    }

    let mut re_added: Vec<S> = Vec::new();
    for (id, described) in &snapshots {
        let patched = splice_node(described, a, b, &new_node, first, second);
        if add_described_slice(graph, id.clone(), &patched) {
            re_added.push(id.clone());
            continue;
        }
        // roll the whole transaction back
        for done in &re_added {
            graph.delete_slice(done);
        }
        graph.delete_edge(a, &new_node);
        graph.delete_edge(&new_node, b);
        let restored = graph
            .add_edge(a.clone(), b.clone(), edge.length)
            .expect("rollback re-add rejected");
        assert!(restored, "rollback re-add collided");
        for p in &through_a {
            graph
                .connect(p.clone(), a.clone(), b.clone())
                .expect("rollback through triple rejected");
        }
        for q in &through_b {
            graph
                .connect(q.clone(), b.clone(), a.clone())
                .expect("rollback through triple rejected");
        }
        for (prev_id, prev) in &snapshots {
            let ok = add_described_slice(graph, prev_id.clone(), prev);
            assert!(ok, "rollback could not restore an occupant");
        }
        return Ok(false);
    }
    Ok(true)
}

/// Rewrite a described path for a split of the edge `{a, b}`.
///
/// Inserts `new_node` between every consecutive crossing of the old
/// edge; when the slice's terminal offset no longer fits on the
/// shortened terminal edge, the offset shrinks and the terminal node
/// is dropped.
fn splice_node<K: Key>(
    described: &DescribedSlice<K>,
    a: &K,
    b: &K,
    new_node: &K,
    first: u64,
    second: u64,
) -> DescribedSlice<K> {
    let mut along: Vec<K> = Vec::with_capacity(described.along.len() + 1);
    for node in &described.along {
        if let Some(prev) = along.last() {
            if (prev == a && node == b) || (prev == b && node == a) {
                along.push(new_node.clone());
            }
        }
        along.push(node.clone());
    }

    let mut back = described.back;
    let mut front = described.front;
    let count = described.along.len();
    if count >= 2 {
        let lead = &described.along[0];
        let lead_next = &described.along[1];
        let new_first = if lead == a && lead_next == b {
            Some(first)
        } else if lead == b && lead_next == a {
            Some(second)
        } else {
            None
        };
        if let Some(len) = new_first {
            if back >= len {
                back -= len;
                along.remove(0);
            }
        }

        let tail = &described.along[count - 1];
        let tail_prev = &described.along[count - 2];
        let new_last = if tail_prev == a && tail == b {
            Some(second)
        } else if tail_prev == b && tail == a {
            Some(first)
        } else {
            None
        };
        if let Some(len) = new_last {
            if front >= len {
                front -= len;
                along.pop();
            }
        }
    }

    DescribedSlice {
        along,
        back,
        front,
        length: described.length,
    }
}

/// Shift a slice along the track: grow at `end` by `by`, then shrink
/// the opposite end by the amount actually grown.
///
/// Returns the applied shift. The chooser resolves branches for
/// whichever end is growing.
///
/// # Panics
///
/// If the trailing end cannot mirror the leading end's movement;
/// that would leave the slice resized, which the operation's
/// contract rules out.
pub fn move_slice<K: Key, S: Key>(
    graph: &mut TrackGraph<K, S>,
    id: &S,
    end: End,
    by: i64,
    mut chooser: impl FnMut(&[K]) -> Option<K>,
) -> i64 {
    let moved = graph.modify_slice(id, end, by, &mut chooser);
    let trailed = graph.modify_slice(id, end.opposite(), -moved, &mut chooser);
    assert_eq!(trailed, -moved, "slice ends moved by different amounts");
    moved
}

/// Reconstruct a slice matching `described` under the id `id`.
///
/// The path is replayed through the ordinary grow machinery: seed on
/// the first node, walk the front tip edge by edge, then retract the
/// back tip to its offset. Returns `false`, tearing down any
/// partial slice, when the id is taken, the description is
/// internally inconsistent, or the track no longer admits the path
/// (a missing edge or connection, or a junction resolving to a
/// different branch).
pub fn add_described_slice<K: Key, S: Key>(
    graph: &mut TrackGraph<K, S>,
    id: S,
    described: &DescribedSlice<K>,
) -> bool {
    let Some((seed, rest)) = described.along.split_first() else {
        return false;
    };
    if rest.is_empty() {
        if described.back != 0 || described.front != 0 || described.length != 0 {
            return false;
        }
        return graph.add_slice(id, seed.clone());
    }

    let mut lengths: Vec<u64> = Vec::with_capacity(described.along.len() - 1);
    for window in described.along.windows(2) {
        match graph.lookup_edge(&window[0], &window[1]) {
            Some(edge) => lengths.push(edge.length),
            None => return false,
        }
    }
    let last = *lengths.last().expect("at least one edge on a multi-node path");
    if described.back >= lengths[0] || described.front >= last {
        return false;
    }
    if lengths.iter().sum::<u64>() != described.back + described.length + described.front {
        return false;
    }

    if !graph.add_slice(id.clone(), seed.clone()) {
        return false;
    }
    let segments = lengths.len();
    for (i, len) in lengths.iter().enumerate() {
        let next = described.along[i + 1].clone();
        let amount = if i + 1 < segments {
            *len
        } else {
            len - described.front
        };
        let grown = graph.modify_slice(&id, End::Front, amount as i64, |_| Some(next.clone()));
        if grown != amount as i64 {
            graph.delete_slice(&id);
            return false;
        }
    }
    if described.back > 0 {
        let pulled = graph.modify_slice(&id, End::Back, -(described.back as i64), |_| None);
        debug_assert_eq!(pulled, -(described.back as i64));
    }
    // junctions with a single branch resolve without consulting the
    // chooser and may have led somewhere else entirely
    if graph.lookup_slice(&id).as_ref() != Some(described) {
        graph.delete_slice(&id);
        return false;
    }
    true
}

/// Duplicate the slice `prev` under the id `new`.
///
/// Returns `false` when `prev` is unknown or the duplicate cannot be
/// materialized.
pub fn clone_slice<K: Key, S: Key>(graph: &mut TrackGraph<K, S>, prev: &S, new: S) -> bool {
    match graph.lookup_slice(prev) {
        Some(described) => add_described_slice(graph, new, &described),
        None => false,
    }
}
