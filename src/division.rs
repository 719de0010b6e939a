//! Division-aware edge connectivity.
//!
//! A division blocks a node: two edges share a division-component
//! iff one can be reached from the other without crossing a blocked
//! node. Rather than solving edge-level connectivity directly, each
//! track edge gets a surrogate token paired with its two endpoint
//! nodes inside a [`ComponentGraph`]; blocking a node just removes
//! that node's pairs to its incident tokens, and unblocking restores
//! them.
//!
//! The graph wires itself to the track graph's edge-change feed on
//! construction (after replaying the edges that already exist) and
//! tracks insertions and removals from then on. Divisions never
//! touch the track topology itself.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::debug;

use crate::component::ComponentGraph;
use crate::feed::{CancelToken, EdgeChange};
use crate::graph::TrackGraph;
use crate::pairmap::PairMap;
use crate::types::Key;

/// Surrogate component-graph key for one track edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeToken(u64);

/// Component-graph universe: real nodes plus edge surrogates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum DivKey<K> {
    Node(K),
    Edge(EdgeToken),
}

#[derive(Debug)]
struct DivisionState<K: Key> {
    comp: ComponentGraph<DivKey<K>>,
    tokens: PairMap<K, EdgeToken>,
    pairs: BTreeMap<EdgeToken, (K, K)>,
    blocked: BTreeSet<K>,
    next_token: u64,
}

impl<K: Key> DivisionState<K> {
    fn new() -> Self {
        Self {
            comp: ComponentGraph::new(),
            tokens: PairMap::new(),
            pairs: BTreeMap::new(),
            blocked: BTreeSet::new(),
            next_token: 0,
        }
    }

    fn apply(&mut self, change: &EdgeChange<K>) {
        if change.is_removal() {
            self.edge_removed(&change.a, &change.b);
        } else {
            self.edge_added(&change.a, &change.b);
        }
    }

    fn edge_added(&mut self, a: &K, b: &K) {
        let token = EdgeToken(self.next_token);
        self.next_token += 1;
        self.tokens.set(a.clone(), b.clone(), token);
        self.pairs.insert(token, (a.clone(), b.clone()));
        for side in [a, b] {
            if !self.blocked.contains(side) {
                self.comp
                    .add(DivKey::Node(side.clone()), DivKey::Edge(token));
            }
        }
    }

    fn edge_removed(&mut self, a: &K, b: &K) {
        let Some(token) = self.tokens.remove(a, b) else {
            return;
        };
        for side in [a, b] {
            // absent while the side is blocked
            self.comp
                .delete(&DivKey::Node(side.clone()), &DivKey::Edge(token));
        }
        self.pairs.remove(&token);
    }
}

/// Edge-level connectivity query surface over blocked nodes.
///
/// Holds only a subscription to the track graph's feed; once its
/// [`CancelToken`] is signalled the subscription is dropped and
/// every query answers empty or `false`.
#[derive(Debug)]
pub struct DivisionGraph<K: Key> {
    state: Rc<RefCell<DivisionState<K>>>,
    cancel: CancelToken,
}

impl<K: Key + 'static> DivisionGraph<K> {
    /// Build a division graph over `graph`.
    ///
    /// Existing edges are replayed first, then the instance follows
    /// the edge-change feed until `cancel` is signalled.
    pub fn new<S: Key>(graph: &TrackGraph<K, S>, cancel: CancelToken) -> Self {
        let mut state = DivisionState::new();
        for edge in graph.edges() {
            state.edge_added(&edge.low, &edge.high);
        }
        let state = Rc::new(RefCell::new(state));

        let feed_state = Rc::clone(&state);
        graph.changes().subscribe(cancel.clone(), move |change| {
            feed_state.borrow_mut().apply(change);
        });
        Self { state, cancel }
    }

    /// Place a division on the node `at`.
    ///
    /// Returns `false` when the node is already divided or the
    /// instance is cancelled. Severs `at` from its incident edge
    /// tokens; topology is untouched.
    pub fn add_division(&mut self, at: K) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        if !state.blocked.insert(at.clone()) {
            return false;
        }
        let incident: Vec<EdgeToken> = state
            .tokens
            .other_entries(&at)
            .map(|(_, token)| *token)
            .collect();
        for token in incident {
            state
                .comp
                .delete(&DivKey::Node(at.clone()), &DivKey::Edge(token));
        }
        debug!(node = ?at, "division placed");
        true
    }

    /// Remove the division on the node `at`, restoring its pairs.
    ///
    /// Returns `false` when the node is not divided or the instance
    /// is cancelled.
    pub fn delete_division(&mut self, at: &K) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        if !state.blocked.remove(at) {
            return false;
        }
        let incident: Vec<EdgeToken> = state
            .tokens
            .other_entries(at)
            .map(|(_, token)| *token)
            .collect();
        for token in incident {
            state
                .comp
                .add(DivKey::Node(at.clone()), DivKey::Edge(token));
        }
        debug!(node = ?at, "division removed");
        true
    }

    /// `true` while a division is placed on `at`.
    pub fn is_divided(&self, at: &K) -> bool {
        !self.cancel.is_cancelled() && self.state.borrow().blocked.contains(at)
    }

    /// Endpoint pairs of every edge sharing the division-component
    /// of the edge `{a, b}`, the queried edge included.
    ///
    /// Empty when no such edge exists or the instance is cancelled.
    /// Pairs come back in edge-token allocation order.
    pub fn lookup_division_by_edge(&self, a: &K, b: &K) -> Vec<(K, K)> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }
        let state = self.state.borrow();
        let Some(token) = state.tokens.get(a, b).copied() else {
            return Vec::new();
        };
        state
            .comp
            .shared_with(&DivKey::Edge(token))
            .filter_map(|key| match key {
                DivKey::Edge(token) => state.pairs.get(token).cloned(),
                DivKey::Node(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Graph = TrackGraph<&'static str, u32>;

    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph.add_edge("n1", "n2", 100).unwrap();
        graph.add_edge("n2", "n3", 100).unwrap();
        graph
    }

    #[test]
    fn test_division_scenario() {
        let mut graph = chain();
        let mut divisions = DivisionGraph::new(&graph, CancelToken::new());

        assert_eq!(
            divisions.lookup_division_by_edge(&"n1", &"n2"),
            vec![("n1", "n2"), ("n2", "n3")]
        );

        assert!(divisions.add_division("n2"));
        assert!(!divisions.add_division("n2"));
        assert_eq!(
            divisions.lookup_division_by_edge(&"n1", &"n2"),
            vec![("n1", "n2")]
        );
        assert_eq!(
            divisions.lookup_division_by_edge(&"n3", &"n2"),
            vec![("n2", "n3")]
        );

        // keep the graph borrowed mutably afterwards to show the
        // division graph needs no further access to it
        graph.add_edge("n3", "n4", 10).unwrap();
        assert_eq!(
            divisions.lookup_division_by_edge(&"n2", &"n3"),
            vec![("n2", "n3"), ("n3", "n4")]
        );
    }

    #[test]
    fn test_delete_division_restores_reachability() {
        let graph = chain();
        let mut divisions = DivisionGraph::new(&graph, CancelToken::new());
        let before = divisions.lookup_division_by_edge(&"n1", &"n2");

        divisions.add_division("n2");
        let blocked = divisions.lookup_division_by_edge(&"n1", &"n2");
        assert!(blocked.len() < before.len());
        assert!(blocked.iter().all(|pair| before.contains(pair)));

        assert!(divisions.delete_division(&"n2"));
        assert!(!divisions.delete_division(&"n2"));
        assert_eq!(divisions.lookup_division_by_edge(&"n1", &"n2"), before);
    }

    #[test]
    fn test_edges_arriving_while_endpoint_is_divided() {
        let mut graph = chain();
        let mut divisions = DivisionGraph::new(&graph, CancelToken::new());
        divisions.add_division("n2");

        // the new edge pairs only with its unblocked endpoint
        graph.add_edge("n2", "n4", 10).unwrap();
        assert_eq!(
            divisions.lookup_division_by_edge(&"n2", &"n4"),
            vec![("n2", "n4")]
        );

        divisions.delete_division(&"n2");
        assert_eq!(
            divisions.lookup_division_by_edge(&"n2", &"n4"),
            vec![("n1", "n2"), ("n2", "n3"), ("n2", "n4")]
        );
    }

    #[test]
    fn test_edge_removal_drops_its_token() {
        let mut graph = chain();
        let divisions = DivisionGraph::new(&graph, CancelToken::new());

        assert!(graph.delete_edge(&"n2", &"n3"));
        assert_eq!(divisions.lookup_division_by_edge(&"n2", &"n3"), vec![]);
        assert_eq!(
            divisions.lookup_division_by_edge(&"n1", &"n2"),
            vec![("n1", "n2")]
        );
    }

    #[test]
    fn test_unknown_edge_is_empty() {
        let graph = chain();
        let divisions = DivisionGraph::new(&graph, CancelToken::new());
        assert!(divisions.lookup_division_by_edge(&"x", &"y").is_empty());
    }

    #[test]
    fn test_cancellation_makes_the_graph_inert() {
        let mut graph = chain();
        let cancel = CancelToken::new();
        let mut divisions = DivisionGraph::new(&graph, cancel.clone());

        cancel.cancel();
        assert!(divisions.lookup_division_by_edge(&"n1", &"n2").is_empty());
        assert!(!divisions.add_division("n2"));
        assert!(!divisions.is_divided(&"n2"));

        // events after cancellation are no longer observed
        graph.add_edge("n5", "n6", 1).unwrap();
        assert_eq!(graph.changes().subscriber_count(), 0);
    }

    #[test]
    fn test_divided_flag() {
        let graph = chain();
        let mut divisions = DivisionGraph::new(&graph, CancelToken::new());
        assert!(!divisions.is_divided(&"n2"));
        divisions.add_division("n2");
        assert!(divisions.is_divided(&"n2"));
    }

    #[test]
    fn test_fully_blocked_edge_is_its_own_component() {
        let graph = chain();
        let mut divisions = DivisionGraph::new(&graph, CancelToken::new());
        divisions.add_division("n1");
        divisions.add_division("n2");

        assert_eq!(
            divisions.lookup_division_by_edge(&"n1", &"n2"),
            vec![("n1", "n2")]
        );
    }
}
