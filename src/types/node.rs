//! Node types for the track kernel.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{EdgeId, Key};
use crate::multiset::Multiset;

/// One node-local endpoint of an edge.
///
/// `through` lists the other neighbours of the same node that this
/// side is connected to; the relation is kept symmetric across the
/// node's sides.
#[derive(Debug, Clone)]
pub(crate) struct Side<K: Key> {
    pub(crate) edge: EdgeId,
    pub(crate) through: BTreeSet<K>,
}

impl<K: Key> Side<K> {
    pub(crate) fn new(edge: EdgeId) -> Self {
        Self {
            edge,
            through: BTreeSet::new(),
        }
    }
}

/// Stored state of one node.
///
/// Nodes arise on first mention and persist as empty records; an
/// unknown key is indistinguishable from a node that lost all its
/// edges and slices.
#[derive(Debug, Clone)]
pub(crate) struct NodeRecord<K: Key, S: Key> {
    pub(crate) other: BTreeMap<K, Side<K>>,
    pub(crate) slices: Multiset<S>,
}

impl<K: Key, S: Key> Default for NodeRecord<K, S> {
    fn default() -> Self {
        Self {
            other: BTreeMap::new(),
            slices: Multiset::new(),
        }
    }
}

/// Deep-copy view of a node, as returned by lookups.
///
/// Unknown keys yield the empty view; callers cannot distinguish
/// "never mentioned" from "mentioned but currently bare".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView<K: Ord, S> {
    /// Each neighbour, mapped to the sorted list of other neighbours
    /// reachable straight through this node from it.
    pub other: BTreeMap<K, Vec<K>>,
    /// Ids of slices touching this node, deduplicated and sorted.
    pub slices: Vec<S>,
}

impl<K: Ord, S> Default for NodeView<K, S> {
    fn default() -> Self {
        Self {
            other: BTreeMap::new(),
            slices: Vec::new(),
        }
    }
}

impl<K: Key, S: Key> NodeRecord<K, S> {
    pub(crate) fn view(&self) -> NodeView<K, S> {
        NodeView {
            other: self
                .other
                .iter()
                .map(|(neighbour, side)| {
                    (neighbour.clone(), side.through.iter().cloned().collect())
                })
                .collect(),
            slices: self.slices.uniques().cloned().collect(),
        }
    }
}
