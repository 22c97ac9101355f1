//! Crossbeam-based memory reclamation for splitord collections.
//!
//! This crate provides [`EpochGuard`], an implementation of the
//! `splitord_core::Guard` trait backed by crossbeam-epoch. It is the
//! production guard: retired nodes and bucket tables are reclaimed in
//! batches once every pinned thread has moved past the epoch in which
//! they were unlinked.
//!
//! # Usage
//!
//! ```ignore
//! use splitord_core::SplitOrderedHashSet;
//! use splitord_crossbeam::EpochGuard;
//!
//! let set: SplitOrderedHashSet<EpochGuard> = SplitOrderedHashSet::new();
//! set.add(42);
//! ```

pub mod epoch_guard;

pub use epoch_guard::EpochGuard;
