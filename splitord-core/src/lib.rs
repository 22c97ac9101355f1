//! Lock-free split-ordered hash set over a Harris-style ordered list.
//!
//! The core types are [`OrderedList`], a non-blocking sorted linked list
//! whose traversals can start from any long-lived node, and
//! [`SplitOrderedHashSet`], a dynamically resizable hash set that indexes
//! bucket sentinels into that list. Both are generic over a [`Guard`]
//! choosing the memory reclamation scheme; `splitord-crossbeam` provides
//! the epoch-based production guard.

pub mod data_structures;
pub mod guard;

pub use data_structures::{OrderedList, SplitOrderedHashSet};
pub use guard::{DeferredGuard, Guard};
