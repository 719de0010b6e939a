//! Core types for the track kernel.

pub mod edge;
pub mod node;
pub mod slice;

pub use edge::EdgeView;
pub use node::NodeView;
pub use slice::{DescribedSlice, End};

pub(crate) use edge::{EdgeId, EdgeRecord};
pub(crate) use node::{NodeRecord, Side};
pub(crate) use slice::SliceRecord;

/// Identity usable as a node or slice key.
///
/// Keys are caller-provided and compared by value; ordering backs the
/// kernel's associative containers and gives queries a deterministic
/// iteration order. Implemented for every type with the required
/// bounds.
pub trait Key: Clone + Ord + std::fmt::Debug {}

impl<T: Clone + Ord + std::fmt::Debug> Key for T {}
