//! Data structures for concurrent collections.
//!
//! # Organization
//!
//! - [`sorted`] - the lock-free ordered list every element lives in
//! - [`hash`] - the split-ordered hash set indexing into that list
//! - [`internal`] - implementation details (pub(crate))
//!
//! Collections are generic over a guard type `G: Guard` selecting the
//! memory reclamation strategy:
//!
//! ```ignore
//! use splitord_core::{DeferredGuard, SplitOrderedHashSet};
//!
//! let set: SplitOrderedHashSet<DeferredGuard> = SplitOrderedHashSet::new();
//! set.add(42);
//! ```

pub mod hash;
pub(crate) mod internal;
pub mod sorted;

pub use hash::{SplitOrderedEntry, SplitOrderedHashSet, Values};
pub use sorted::{OrderedList, OrderedListNode};

pub(crate) use internal::MarkedPtr;
