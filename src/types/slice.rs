//! Slice types for the track kernel.

use serde::{Deserialize, Serialize};

use super::Key;

/// Selector for one end of a slice.
///
/// The front end sits toward the last node of the anchor path, the
/// back end toward the first. Growth moves an end outward along the
/// track; shrinkage retracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum End {
    /// The end anchored toward the first node of the path.
    Back,
    /// The end anchored toward the last node of the path.
    Front,
}

impl End {
    /// The other end.
    pub fn opposite(self) -> Self {
        match self {
            End::Back => End::Front,
            End::Front => End::Back,
        }
    }
}

/// Stored state of one slice.
///
/// `along` is the anchor path; consecutive nodes are joined by edges
/// and every interior triple is a declared connection. `back` is the
/// distance from `along[0]` into the first edge at which the back
/// tip lies; `front` is the distance remaining on the last edge from
/// the front tip to the last node. `length` is the occupied distance
/// between the tips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SliceRecord<K: Key> {
    pub(crate) along: Vec<K>,
    pub(crate) back: u64,
    pub(crate) front: u64,
    pub(crate) length: u64,
}

impl<K: Key> SliceRecord<K> {
    pub(crate) fn point(on: K) -> Self {
        Self {
            along: vec![on],
            back: 0,
            front: 0,
            length: 0,
        }
    }

    /// `true` when the anchor path is a single node.
    pub(crate) fn is_point(&self) -> bool {
        self.along.len() == 1
    }

    /// Node the given end is anchored toward.
    pub(crate) fn terminal(&self, end: End) -> &K {
        match end {
            End::Back => &self.along[0],
            End::Front => &self.along[self.along.len() - 1],
        }
    }

    /// Interior neighbour of the terminal node on the terminal edge.
    ///
    /// Must not be called on a single-node slice.
    pub(crate) fn inward(&self, end: End) -> &K {
        match end {
            End::Back => &self.along[1],
            End::Front => &self.along[self.along.len() - 2],
        }
    }

    /// Offset of the given end.
    pub(crate) fn offset(&self, end: End) -> u64 {
        match end {
            End::Back => self.back,
            End::Front => self.front,
        }
    }

    pub(crate) fn offset_mut(&mut self, end: End) -> &mut u64 {
        match end {
            End::Back => &mut self.back,
            End::Front => &mut self.front,
        }
    }

    /// Append a node at the given end.
    pub(crate) fn push(&mut self, end: End, node: K) {
        match end {
            End::Back => self.along.insert(0, node),
            End::Front => self.along.push(node),
        }
    }

    /// Remove and return the terminal node at the given end.
    pub(crate) fn pop(&mut self, end: End) -> K {
        match end {
            End::Back => self.along.remove(0),
            End::Front => self.along.pop().expect("slice path is never empty"),
        }
    }

    pub(crate) fn describe(&self) -> DescribedSlice<K> {
        DescribedSlice {
            along: self.along.clone(),
            back: self.back,
            front: self.front,
            length: self.length,
        }
    }
}

/// Deep-copy description of a slice, as returned by lookups and
/// accepted by re-materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedSlice<K> {
    /// Anchor path; non-empty.
    pub along: Vec<K>,
    /// Distance from the first node into the first edge at which the
    /// back tip lies. Zero for single-node slices.
    pub back: u64,
    /// Distance remaining on the last edge from the front tip to the
    /// last node. Zero for single-node slices.
    pub front: u64,
    /// Occupied distance between the two tips.
    pub length: u64,
}

impl<K> DescribedSlice<K> {
    /// `true` when the description is a single anchored node.
    pub fn is_point(&self) -> bool {
        self.along.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_described_slice_serialization_shape() {
        let described = DescribedSlice {
            along: vec!["a", "b"],
            back: 1,
            front: 2,
            length: 3,
        };
        let json = serde_json::to_string(&described).unwrap();
        assert_eq!(json, r#"{"along":["a","b"],"back":1,"front":2,"length":3}"#);

        let parsed: DescribedSlice<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.along, vec!["a", "b"]);
        assert!(!parsed.is_point());
    }

    #[test]
    fn test_end_opposite() {
        assert_eq!(End::Back.opposite(), End::Front);
        assert_eq!(End::Front.opposite(), End::Back);
    }
}
