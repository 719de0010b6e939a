//! Slice engine: creation, lookup, deletion and the composite
//! grow/shrink mutator.
//!
//! A slice is a contiguous occupant of the track, anchored on a node
//! path with an inward offset at each end. Each end is in one of
//! three states: a single-node point, inside an edge (offset > 0),
//! or abutting a node (offset 0). Growth consumes the remaining room
//! on the terminal edge, then crosses junctions one declared
//! connection at a time, consulting the caller only when more than
//! one branch is available. Shrinkage retracts the same transitions
//! in reverse and never moves past the opposite tip.
//!
//! Membership bookkeeping is incremental: nodes count a slice once
//! per touching presence (interior positions always, terminal
//! positions while their offset is zero), and edges count one per
//! anchored presence: both end anchors for a two-node slice, one
//! per traversal position otherwise. `delete_edge`'s occupancy
//! refusal and `lookup_node`/`lookup_edge` views read these bags
//! directly.

use tracing::trace;

use crate::graph::TrackGraph;
use crate::types::{DescribedSlice, End, Key, SliceRecord};

impl<K: Key, S: Key> TrackGraph<K, S> {
    /// Create a zero-length slice anchored on the node `on`,
    /// creating the node if needed.
    ///
    /// Returns `false` when the id is already taken.
    pub fn add_slice(&mut self, id: S, on: K) -> bool {
        if self.slices.contains_key(&id) {
            return false;
        }
        self.nodes
            .entry(on.clone())
            .or_default()
            .slices
            .add(id.clone());
        self.slices.insert(id, SliceRecord::point(on));
        true
    }

    /// Deep-copy description of the slice `id`, if it exists.
    pub fn lookup_slice(&self, id: &S) -> Option<DescribedSlice<K>> {
        self.slices.get(id).map(SliceRecord::describe)
    }

    /// Remove the slice `id` and every membership it holds.
    ///
    /// Returns `false` when the id is unknown.
    pub fn delete_slice(&mut self, id: &S) -> bool {
        let Some(slice) = self.slices.remove(id) else {
            return false;
        };

        let count = slice.along.len();
        if count == 1 {
            self.node_mut(&slice.along[0]).slices.delete(id);
            return true;
        }

        for window in slice.along.windows(2) {
            let edge_id = self
                .edge_id(&window[0], &window[1])
                .expect("slice path names a missing edge");
            let edge = self.edge_mut(edge_id);
            edge.slices.delete(id);
            if count == 2 {
                // both end anchors reside in the single edge
                edge.slices.delete(id);
            }
        }

        for (position, node) in slice.along.iter().enumerate() {
            let touching = if position == 0 {
                slice.back == 0
            } else if position == count - 1 {
                slice.front == 0
            } else {
                true
            };
            if touching {
                self.node_mut(node).slices.delete(id);
            }
        }
        true
    }

    /// Grow or shrink one end of the slice `id`.
    ///
    /// Positive `by` grows the chosen end outward; negative `by`
    /// shrinks it, clamped so the slice never retracts past its own
    /// length. The returned value is the signed amount actually
    /// applied; `0` for an unknown id, a zero `by`, or a clamped
    /// magnitude of zero.
    ///
    /// While growing, the engine consumes the room left on the
    /// terminal edge, then resolves the next edge: from a point
    /// every neighbour is a candidate; otherwise only the neighbours
    /// connected through the terminal node with the current
    /// predecessor. An empty candidate set halts growth (the
    /// shortfall is simply not applied). A single candidate is taken
    /// without consulting `chooser`; among several, `chooser`
    /// receives the sorted candidates and growth halts unless it
    /// answers with one of them. The chooser must behave as a pure
    /// function for the duration of the call.
    pub fn modify_slice(
        &mut self,
        id: &S,
        end: End,
        by: i64,
        mut chooser: impl FnMut(&[K]) -> Option<K>,
    ) -> i64 {
        if by == 0 || !self.slices.contains_key(id) {
            return 0;
        }
        if by > 0 {
            self.grow(id, end, by as u64, &mut chooser) as i64
        } else {
            let magnitude = by.unsigned_abs().min(self.slices[id].length);
            -(self.shrink(id, end, magnitude) as i64)
        }
    }

    fn grow(
        &mut self,
        id: &S,
        end: End,
        mut remaining: u64,
        chooser: &mut dyn FnMut(&[K]) -> Option<K>,
    ) -> u64 {
        let want = remaining;
        loop {
            // consume the room left on the terminal edge
            if !self.slices[id].is_point() {
                let offset = self.slices[id].offset(end);
                let take = offset.min(remaining);
                if take > 0 {
                    let slice = self.slices.get_mut(id).expect("slice vanished mid-grow");
                    *slice.offset_mut(end) -= take;
                    slice.length += take;
                    remaining -= take;
                    if slice.offset(end) == 0 {
                        // newly abutting the terminal node
                        let terminal = slice.terminal(end).clone();
                        self.node_mut(&terminal).slices.add(id.clone());
                    }
                }
            }
            if remaining == 0 {
                break;
            }

            // pick the edge to traverse next; the end is at a node
            // boundary here (a point, or offset zero)
            let candidates: Vec<K> = {
                let slice = &self.slices[id];
                let terminal = slice.terminal(end);
                if slice.is_point() {
                    self.nodes
                        .get(terminal)
                        .map(|node| node.other.keys().cloned().collect())
                        .unwrap_or_default()
                } else {
                    self.side(terminal, slice.inward(end))
                        .map(|side| side.through.iter().cloned().collect())
                        .unwrap_or_default()
                }
            };
            if candidates.is_empty() {
                trace!(slice = ?id, shortfall = remaining, "growth halted at dead end");
                break;
            }
            let chosen = if candidates.len() == 1 {
                candidates[0].clone()
            } else {
                match chooser(&candidates) {
                    Some(choice) if candidates.contains(&choice) => choice,
                    _ => {
                        trace!(slice = ?id, shortfall = remaining, "growth halted by chooser");
                        break;
                    }
                }
            };

            // enter the chosen edge fully; the offset is driven back
            // toward zero by the consume step of the next round
            let terminal = self.slices[id].terminal(end).clone();
            let edge_id = self
                .edge_id(&terminal, &chosen)
                .expect("candidate names a missing edge");
            let edge_length = self.edge(edge_id).length;
            let was_point = self.slices[id].is_point();
            let departed = if self.slices[id].along.len() == 2 {
                // the moving anchor departs the formerly shared edge
                Some(
                    self.edge_id(&self.slices[id].along[0], &self.slices[id].along[1])
                        .expect("slice path names a missing edge"),
                )
            } else {
                None
            };
            let edge = self.edge_mut(edge_id);
            edge.slices.add(id.clone());
            if was_point {
                // both end anchors land in the first edge
                edge.slices.add(id.clone());
            }
            if let Some(shared) = departed {
                self.edge_mut(shared).slices.delete(id);
            }
            let slice = self.slices.get_mut(id).expect("slice vanished mid-grow");
            slice.push(end, chosen);
            *slice.offset_mut(end) = edge_length;
        }
        want - remaining
    }

    fn shrink(&mut self, id: &S, end: End, mut remaining: u64) -> u64 {
        let want = remaining;
        while remaining > 0 {
            let (terminal, offset, edge_id, edge_length) = {
                let slice = &self.slices[id];
                let edge_id = self
                    .edge_id(slice.terminal(end), slice.inward(end))
                    .expect("slice path names a missing edge");
                (
                    slice.terminal(end).clone(),
                    slice.offset(end),
                    edge_id,
                    self.edge(edge_id).length,
                )
            };

            if offset == 0 {
                // retracting off the terminal node
                self.node_mut(&terminal).slices.delete(id);
            }

            let take = remaining.min(edge_length - offset);
            let slice = self.slices.get_mut(id).expect("slice vanished mid-shrink");
            *slice.offset_mut(end) += take;
            slice.length -= take;
            remaining -= take;

            if slice.offset(end) == edge_length {
                // the end has left this edge; pop the terminal node
                let was_pair = slice.along.len() == 2;
                slice.pop(end);
                *slice.offset_mut(end) = 0;
                let arrived = if self.slices[id].along.len() == 2 {
                    // the retreating anchor arrives on the edge the
                    // opposite anchor already occupies
                    Some(
                        self.edge_id(&self.slices[id].along[0], &self.slices[id].along[1])
                            .expect("slice path names a missing edge"),
                    )
                } else {
                    None
                };
                let edge = self.edge_mut(edge_id);
                edge.slices.delete(id);
                if was_pair {
                    // collapsing to a point releases the other anchor too
                    edge.slices.delete(id);
                }
                if let Some(shared) = arrived {
                    self.edge_mut(shared).slices.add(id.clone());
                }
            }
        }
        want - remaining
    }
}
