//! Edge types for the track kernel.

use serde::{Deserialize, Serialize};

use super::Key;
use crate::multiset::Multiset;

/// Stable arena index of an edge.
///
/// Allocated from a per-graph counter and never reused, so a stale
/// index can never alias a later edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EdgeId(pub(crate) u64);

/// Stored state of one undirected edge.
///
/// `low`/`high` keep the orientation given at insertion; lookups
/// canonicalize to it regardless of how the pair is queried. The
/// slice bag holds one count per anchored slice presence.
#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord<K: Key, S: Key> {
    pub(crate) low: K,
    pub(crate) high: K,
    pub(crate) length: u64,
    pub(crate) slices: Multiset<S>,
}

/// Deep-copy view of an edge, as returned by lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView<K, S> {
    /// First endpoint, as stored at insertion.
    pub low: K,
    /// Second endpoint, as stored at insertion.
    pub high: K,
    /// Positive length in track units.
    pub length: u64,
    /// Ids of slices currently occupying any part of the edge,
    /// deduplicated and sorted.
    pub slices: Vec<S>,
}

impl<K: Key, S: Key> EdgeRecord<K, S> {
    pub(crate) fn view(&self) -> EdgeView<K, S> {
        EdgeView {
            low: self.low.clone(),
            high: self.high.clone(),
            length: self.length,
            slices: self.slices.uniques().cloned().collect(),
        }
    }
}
