//! Hash-based collections.

pub(crate) mod split_key;
pub mod split_ordered_hash_set;

pub use split_ordered_hash_set::{SplitOrderedEntry, SplitOrderedHashSet, Values};
