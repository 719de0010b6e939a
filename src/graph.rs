//! Track graph topology.
//!
//! The [`TrackGraph`] owns the authoritative network state: nodes
//! arise implicitly on first mention and persist forever, undirected
//! edges of positive length join distinct nodes, and each node keeps
//! a symmetric "through" relation declaring which of its edges may be
//! traversed as one continuous path. The slice inventory lives here
//! too; its mutation rules are in [`crate::slices`].
//!
//! Every committed edge insertion or removal is published on the
//! graph's [`EdgeFeed`] after the mutation commits, so subscribers
//! always observe the state the event describes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::feed::{EdgeChange, EdgeFeed};
use crate::multiset::Multiset;
use crate::seq::contains_run;
use crate::types::{
    EdgeId, EdgeRecord, EdgeView, Key, NodeRecord, NodeView, Side, SliceRecord,
};

/// Hard-failure taxonomy for track mutations.
///
/// Refusals (duplicate edges, occupied edges, absent entities) are
/// plain `false`/`None` returns, not errors; this enum covers only
/// arguments that are invalid in themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError<K: Key> {
    /// Edge lengths must be positive.
    #[error("edge {a:?} - {b:?} must have positive length")]
    ZeroLength {
        /// First endpoint of the rejected edge.
        a: K,
        /// Second endpoint of the rejected edge.
        b: K,
    },
    /// Edges join two distinct nodes.
    #[error("self edge on {0:?} is not allowed")]
    SelfEdge(K),
    /// Connection triples name three distinct nodes.
    #[error("nodes {a:?}, {through:?}, {b:?} must be pairwise distinct")]
    NotDistinct {
        /// One outer node of the rejected triple.
        a: K,
        /// The junction node of the rejected triple.
        through: K,
        /// The other outer node of the rejected triple.
        b: K,
    },
}

/// In-memory track network: topology, through-connections, slices.
///
/// `K` identifies nodes and `S` identifies slices; both are
/// caller-provided value-equal keys. All containers are ordered, so
/// iteration and query results are deterministic. Instances are
/// fully independent of one another.
#[derive(Debug)]
pub struct TrackGraph<K: Key, S: Key> {
    pub(crate) nodes: BTreeMap<K, NodeRecord<K, S>>,
    pub(crate) edges: BTreeMap<EdgeId, EdgeRecord<K, S>>,
    pub(crate) slices: BTreeMap<S, SliceRecord<K>>,
    next_edge: u64,
    feed: EdgeFeed<K>,
}

impl<K: Key, S: Key> Default for TrackGraph<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, S: Key> TrackGraph<K, S> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            slices: BTreeMap::new(),
            next_edge: 0,
            feed: EdgeFeed::new(),
        }
    }

    /// Handle on the edge-change feed.
    ///
    /// Clones share the same subscriber list; events are delivered
    /// synchronously after each edge mutation commits.
    pub fn changes(&self) -> EdgeFeed<K> {
        self.feed.clone()
    }

    /// Insert an undirected edge of positive `length` between `low`
    /// and `high`, creating both nodes if needed.
    ///
    /// Returns `Ok(false)` when the unordered pair already has an
    /// edge. On success an [`EdgeChange`] carrying the new length is
    /// emitted.
    ///
    /// # Errors
    ///
    /// [`TrackError::ZeroLength`] for a zero length and
    /// [`TrackError::SelfEdge`] when both endpoints coincide.
    pub fn add_edge(&mut self, low: K, high: K, length: u64) -> Result<bool, TrackError<K>> {
        if length == 0 {
            return Err(TrackError::ZeroLength { a: low, b: high });
        }
        if low == high {
            return Err(TrackError::SelfEdge(low));
        }
        if self.side(&low, &high).is_some() {
            return Ok(false);
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.nodes
            .entry(low.clone())
            .or_default()
            .other
            .insert(high.clone(), Side::new(id));
        self.nodes
            .entry(high.clone())
            .or_default()
            .other
            .insert(low.clone(), Side::new(id));
        self.edges.insert(
            id,
            EdgeRecord {
                low: low.clone(),
                high: high.clone(),
                length,
                slices: Multiset::new(),
            },
        );
        debug!(low = ?low, high = ?high, length, "edge added");
        self.feed.emit(&EdgeChange {
            a: low,
            b: high,
            length,
        });
        Ok(true)
    }

    /// Deep-copy view of the edge joining `a` and `b`, if any.
    ///
    /// Endpoints come back in the orientation given at insertion,
    /// regardless of the query order.
    pub fn lookup_edge(&self, a: &K, b: &K) -> Option<EdgeView<K, S>> {
        let id = self.edge_id(a, b)?;
        Some(self.edge(id).view())
    }

    /// Remove the edge joining `a` and `b`.
    ///
    /// Returns `false` when no such edge exists, or when any slice
    /// currently occupies it (the edge cannot be pulled out from
    /// under an occupant). On success every through link on either
    /// endpoint that referenced the vanished neighbour is cleared
    /// and an [`EdgeChange`] with length `0` is emitted.
    pub fn delete_edge(&mut self, a: &K, b: &K) -> bool {
        let Some(id) = self.edge_id(a, b) else {
            return false;
        };
        if self.edge(id).slices.total() > 0 {
            return false;
        }

        let record = self.edges.remove(&id).expect("edge table out of sync");
        for (at, gone) in [(a, b), (b, a)] {
            let node = self.nodes.get_mut(at).expect("side table out of sync");
            node.other.remove(gone);
            for side in node.other.values_mut() {
                side.through.remove(gone);
            }
        }
        debug!(low = ?record.low, high = ?record.high, "edge removed");
        self.feed.emit(&EdgeChange {
            a: record.low,
            b: record.high,
            length: 0,
        });
        true
    }

    /// Declare that the edges `(through, a)` and `(through, b)` may
    /// be traversed straight through `through`.
    ///
    /// Returns `Ok(false)` when either edge is missing or the link
    /// is already declared. The relation is symmetric.
    ///
    /// # Errors
    ///
    /// [`TrackError::NotDistinct`] unless the three nodes are
    /// pairwise distinct.
    pub fn connect(&mut self, a: K, through: K, b: K) -> Result<bool, TrackError<K>> {
        if a == through || b == through || a == b {
            return Err(TrackError::NotDistinct { a, through, b });
        }
        if self.side(&through, &a).is_none() || self.side(&through, &b).is_none() {
            return Ok(false);
        }

        let node = self.nodes.get_mut(&through).expect("side table out of sync");
        let side_a = node.other.get_mut(&a).expect("side table out of sync");
        if !side_a.through.insert(b.clone()) {
            return Ok(false);
        }
        let side_b = node.other.get_mut(&b).expect("side table out of sync");
        side_b.through.insert(a);
        Ok(true)
    }

    /// Remove a declared through link.
    ///
    /// Returns `false` when the link is absent, and refuses (also
    /// `false`) while any slice crosses `through` via this
    /// connection in either direction.
    pub fn disconnect(&mut self, a: &K, through: &K, b: &K) -> bool {
        let Some(node) = self.nodes.get(through) else {
            return false;
        };
        let Some(side_a) = node.other.get(a) else {
            return false;
        };
        if !side_a.through.contains(b) {
            return false;
        }

        let forward = [a.clone(), through.clone(), b.clone()];
        let backward = [b.clone(), through.clone(), a.clone()];
        for id in node.slices.uniques() {
            let slice = &self.slices[id];
            if contains_run(&slice.along, &forward) || contains_run(&slice.along, &backward) {
                return false;
            }
        }

        let node = self.nodes.get_mut(through).expect("side table out of sync");
        node.other
            .get_mut(a)
            .expect("side table out of sync")
            .through
            .remove(b);
        node.other
            .get_mut(b)
            .expect("through relation out of sync")
            .through
            .remove(a);
        true
    }

    /// Deep-copy view of the node `at`.
    ///
    /// Unknown keys yield the empty view; the kernel does not
    /// distinguish "never mentioned" from "currently bare".
    pub fn lookup_node(&self, at: &K) -> NodeView<K, S> {
        self.nodes.get(at).map(NodeRecord::view).unwrap_or_default()
    }

    /// Number of nodes ever mentioned.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of live slices.
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    /// Iterate over deep-copy views of every live edge, in insertion
    /// order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<K, S>> + '_ {
        self.edges.values().map(EdgeRecord::view)
    }

    /// Iterate over the ids of every live slice, in order.
    pub fn slices(&self) -> impl Iterator<Item = &S> {
        self.slices.keys()
    }

    /// `true` when a slice with this id exists.
    pub fn contains_slice(&self, id: &S) -> bool {
        self.slices.contains_key(id)
    }

    pub(crate) fn side(&self, at: &K, toward: &K) -> Option<&Side<K>> {
        self.nodes.get(at).and_then(|node| node.other.get(toward))
    }

    pub(crate) fn edge_id(&self, a: &K, b: &K) -> Option<EdgeId> {
        self.side(a, b).map(|side| side.edge)
    }

    pub(crate) fn edge(&self, id: EdgeId) -> &EdgeRecord<K, S> {
        self.edges.get(&id).expect("edge table out of sync")
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut EdgeRecord<K, S> {
        self.edges.get_mut(&id).expect("edge table out of sync")
    }

    pub(crate) fn node_mut(&mut self, at: &K) -> &mut NodeRecord<K, S> {
        self.nodes.get_mut(at).expect("node table out of sync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Graph = TrackGraph<&'static str, u32>;

    fn line_graph() -> Graph {
        // a - b - c with lengths 123 and 10
        let mut graph = Graph::new();
        assert!(graph.add_edge("a", "b", 123).unwrap());
        assert!(graph.add_edge("b", "c", 10).unwrap());
        graph
    }

    #[test]
    fn test_edges_and_lookups() {
        let mut graph = Graph::new();
        assert!(graph.add_edge("a", "b", 123).unwrap());
        assert!(!graph.add_edge("a", "b", 123).unwrap());
        assert!(!graph.add_edge("b", "a", 5).unwrap());
        assert!(graph.add_edge("b", "c", 10).unwrap());

        let edge = graph.lookup_edge(&"b", &"a").unwrap();
        assert_eq!(edge.low, "a");
        assert_eq!(edge.high, "b");
        assert_eq!(edge.length, 123);
        assert!(edge.slices.is_empty());

        let node = graph.lookup_node(&"b");
        assert_eq!(node.other.len(), 2);
        assert_eq!(node.other[&"a"], Vec::<&str>::new());
        assert_eq!(node.other[&"c"], Vec::<&str>::new());
    }

    #[test]
    fn test_add_edge_rejects_bad_arguments() {
        let mut graph = Graph::new();
        assert_eq!(
            graph.add_edge("a", "b", 0),
            Err(TrackError::ZeroLength { a: "a", b: "b" })
        );
        assert_eq!(graph.add_edge("a", "a", 3), Err(TrackError::SelfEdge("a")));
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_length_one_edge() {
        let mut graph = Graph::new();
        assert!(graph.add_edge("a", "b", 1).unwrap());
        assert_eq!(graph.lookup_edge(&"a", &"b").unwrap().length, 1);
    }

    #[test]
    fn test_connections() {
        let mut graph = line_graph();

        assert!(graph.connect("a", "b", "c").unwrap());
        assert!(!graph.connect("a", "b", "c").unwrap());
        assert!(!graph.connect("c", "b", "a").unwrap());

        let node = graph.lookup_node(&"b");
        assert_eq!(node.other[&"a"], vec!["c"]);
        assert_eq!(node.other[&"c"], vec!["a"]);

        assert!(graph.disconnect(&"c", &"b", &"a"));
        assert!(!graph.disconnect(&"c", &"b", &"a"));
        let node = graph.lookup_node(&"b");
        assert_eq!(node.other[&"a"], Vec::<&str>::new());
    }

    #[test]
    fn test_connect_requires_distinct_triple() {
        let mut graph = line_graph();
        assert!(matches!(
            graph.connect("a", "b", "a"),
            Err(TrackError::NotDistinct { .. })
        ));
        assert!(matches!(
            graph.connect("b", "b", "c"),
            Err(TrackError::NotDistinct { .. })
        ));
    }

    #[test]
    fn test_connect_requires_both_edges() {
        let mut graph = line_graph();
        assert!(!graph.connect("a", "b", "missing").unwrap());
        assert!(!graph.connect("missing", "b", "c").unwrap());
    }

    #[test]
    fn test_delete_edge_clears_through_links() {
        let mut graph = line_graph();
        graph.connect("a", "b", "c").unwrap();

        assert!(graph.delete_edge(&"b", &"c"));
        assert!(graph.lookup_edge(&"b", &"c").is_none());
        let node = graph.lookup_node(&"b");
        assert_eq!(node.other.len(), 1);
        assert_eq!(node.other[&"a"], Vec::<&str>::new());

        // re-adding the edge must not revive the old connection
        assert!(graph.add_edge("b", "c", 10).unwrap());
        let node = graph.lookup_node(&"b");
        assert_eq!(node.other[&"a"], Vec::<&str>::new());
        assert_eq!(node.other[&"c"], Vec::<&str>::new());
    }

    #[test]
    fn test_delete_absent_edge() {
        let mut graph = Graph::new();
        assert!(!graph.delete_edge(&"a", &"b"));
    }

    #[test]
    fn test_lookup_unknown_node_is_empty() {
        let graph = Graph::new();
        let node = graph.lookup_node(&"ghost");
        assert!(node.other.is_empty());
        assert!(node.slices.is_empty());
    }

    #[test]
    fn test_edge_feed_reports_additions_and_removals() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut graph = Graph::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        graph
            .changes()
            .subscribe(crate::feed::CancelToken::new(), move |ev| {
                sink.borrow_mut().push((ev.a, ev.b, ev.length));
            });

        graph.add_edge("a", "b", 4).unwrap();
        graph.add_edge("a", "b", 4).unwrap(); // duplicate: no event
        graph.delete_edge(&"b", &"a");

        assert_eq!(*seen.borrow(), vec![("a", "b", 4), ("a", "b", 0)]);
    }

    #[test]
    fn test_counts() {
        let graph = line_graph();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.num_slices(), 0);

        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].low, "a");
        assert_eq!(edges[1].low, "b");
    }
}
