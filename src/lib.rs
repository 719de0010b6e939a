//! # track-kernel
//!
//! In-memory mutable graph of a railway-style track network.
//!
//! The kernel couples three concerns on one undirected multigraph:
//!
//! 1. **Topology**: junction nodes joined by edges of positive
//!    integer length, with explicit per-junction connections
//!    declaring which pairs of edges a run may pass straight through.
//! 2. **Slices**: contiguous occupants of the track, anchored on a
//!    node path with an inward offset at each end, grown and shrunk
//!    incrementally with caller-guided branch choice.
//! 3. **Divisions**: blocks placed on junctions, partitioning the
//!    edges into division-components for connectivity queries
//!    without touching the topology.
//!
//! ## Architecture
//!
//! ```text
//! split_edge / move_slice / clone_slice        (ops)
//!                  │
//!             TrackGraph ── slices ── EdgeFeed events
//!                  │                       │
//!          Multiset / PairMap        DivisionGraph ── ComponentGraph
//! ```
//!
//! The [`TrackGraph`] owns the authoritative state and publishes an
//! [`EdgeChange`] after every committed edge mutation. The
//! [`DivisionGraph`] consumes that feed, modelling each edge as a
//! surrogate key inside a [`ComponentGraph`] so that blocking a
//! junction reduces to dropping its pairs. The helpers in [`ops`]
//! never reach inside the kernel.
//!
//! ## Guarantees
//!
//! - Every operation is synchronous and single-threaded; a refused
//!   or failed call leaves no partial mutation behind.
//! - Edge deletion refuses while any slice occupies the edge, and
//!   connection removal refuses while any slice crosses it.
//! - All containers iterate in key order, so equal histories yield
//!   identical query results.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod division;
pub mod feed;
pub mod graph;
pub mod multiset;
pub mod ops;
pub mod pairmap;
pub mod seq;
pub mod slices;
pub mod types;

// Re-exports
pub use component::ComponentGraph;
pub use division::DivisionGraph;
pub use feed::{CancelToken, EdgeChange, EdgeFeed};
pub use graph::{TrackError, TrackGraph};
pub use multiset::Multiset;
pub use ops::{add_described_slice, clone_slice, move_slice, split_edge};
pub use pairmap::PairMap;
pub use seq::contains_run;
pub use types::{DescribedSlice, EdgeView, End, Key, NodeView};
