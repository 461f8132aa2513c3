//! # Trees
//!
//! Tree placement: per-column classification packed into 16 bits, the region-cached
//! map that computes it, and the per-chunk footprint handed to workers.

pub mod footprint;
pub mod tree_map;
pub mod tree_value;

pub use footprint::TreeFootprint;
pub use tree_map::{TreeMap, TREE_EXCLUSION_RADIUS};
pub use tree_value::{TreeKind, TreeValue};
